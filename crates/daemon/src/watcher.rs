// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot-reload watcher over the mudlib root.
//!
//! Filesystem events are mapped to virtual paths and forwarded as
//! engine events. Modification never recompiles by itself; the engine
//! loop only marks the blueprint stale; deletion retires it.

use loam_core::{Event, VirtualPath};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Running watcher; dropping it stops the watch.
pub struct MudlibWatcher {
    // NOTE(lifetime): held so the notify backend keeps running
    #[allow(dead_code)]
    watcher: RecommendedWatcher,
}

impl MudlibWatcher {
    /// Watch a mudlib root recursively, emitting source events into the
    /// engine loop.
    pub fn start(
        root: &Path,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> Result<Self, notify::Error> {
        let canonical: PathBuf = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        let mut watcher = notify::recommended_watcher(move |result: Result<notify::Event, _>| {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "watch error");
                    return;
                }
            };
            let removed = match event.kind {
                EventKind::Modify(_) | EventKind::Create(_) => false,
                EventKind::Remove(_) => true,
                _ => return,
            };
            for path in &event.paths {
                let Some(vpath) = VirtualPath::from_fs_path(&canonical, path) else {
                    continue;
                };
                debug!(%vpath, removed, "mudlib source event");
                let engine_event = if removed {
                    Event::SourceRemoved { path: vpath }
                } else {
                    Event::SourceModified { path: vpath }
                };
                if event_tx.send(engine_event).is_err() {
                    return; // engine loop is gone
                }
            }
        })?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self { watcher })
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
