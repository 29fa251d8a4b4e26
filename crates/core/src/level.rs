// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission levels.
//!
//! Levels form a total order; authorization decisions compare a user's
//! level against a required minimum, with path-prefix domains layered on
//! top for write access (see the engine's permission store).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User permission level, lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Player,
    Builder,
    SeniorBuilder,
    Administrator,
}

/// Error for unrecognized level names
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown permission level: {0}")]
pub struct ParseLevelError(pub String);

impl Level {
    /// All levels in ascending order.
    pub const ALL: [Level; 4] = [
        Level::Player,
        Level::Builder,
        Level::SeniorBuilder,
        Level::Administrator,
    ];

    pub fn is_admin(self) -> bool {
        self == Level::Administrator
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Level::Player => "player",
            Level::Builder => "builder",
            Level::SeniorBuilder => "senior_builder",
            Level::Administrator => "administrator",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" => Ok(Level::Player),
            "builder" => Ok(Level::Builder),
            "senior_builder" | "seniorbuilder" | "senior" => Ok(Level::SeniorBuilder),
            "administrator" | "admin" => Ok(Level::Administrator),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "level_tests.rs"]
mod tests;
