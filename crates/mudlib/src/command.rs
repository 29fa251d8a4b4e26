// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mudlib command definitions

use crate::action::Action;
use loam_core::Level;
use serde::{Deserialize, Serialize};

/// A verb defined by the mudlib.
///
/// Built-in driver commands share the same registry; mudlib commands
/// carry declarative action bodies instead of native executors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandDef {
    /// Injected from the block label during parsing.
    #[serde(skip)]
    pub name: String,
    pub aliases: Vec<String>,
    /// Minimum permission level required to run the command.
    pub level: Level,
    /// One-line usage string (`cast <spell> [target]`).
    pub usage: String,
    pub help: String,
    pub actions: Vec<Action>,
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
