// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-variable overrides for the daemon.

use std::time::Duration;

/// Timer check interval override (`LOAM_TICK_MS`). The tick loop fires
/// call-outs at this resolution; tests shrink it to keep scenarios
/// fast.
pub fn tick_interval() -> Duration {
    std::env::var("LOAM_TICK_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(1))
}

/// Config path override (`LOAM_CONFIG`).
pub fn config_path() -> Option<std::path::PathBuf> {
    std::env::var("LOAM_CONFIG").ok().map(Into::into)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
