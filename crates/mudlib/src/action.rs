// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative hook actions.
//!
//! Hooks carry lists of actions the engine interprets against the live
//! world. Message strings support `${...}` interpolation (see
//! [`crate::template`]).

use serde::{Deserialize, Serialize};

/// Who an action addresses, relative to the object running the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The object the hook runs on.
    #[default]
    This,
    /// The acting player, when there is one.
    Player,
    /// The object's environment.
    Environment,
}

/// A single hook action.
///
/// Externally tagged: in HCL an action is written as a one-entry map,
/// e.g. `{ tell = { target = "player", message = "Hello." } }`, or the
/// bare string `"destruct"` for the unit action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Send a message line to a target.
    Tell {
        #[serde(default)]
        target: Target,
        message: String,
    },

    /// Broadcast a message to everything in this object's environment.
    TellRoom {
        message: String,
        /// Leave the acting player out of the broadcast.
        #[serde(default)]
        exclude_player: bool,
    },

    /// Set a property on a target.
    Set {
        #[serde(default)]
        target: Target,
        key: String,
        value: serde_json::Value,
    },

    /// Move this object into the canonical instance at `path`.
    MoveTo { path: String },

    /// Clone a blueprint into a target's inventory.
    CloneInto {
        path: String,
        #[serde(default)]
        target: Target,
    },

    /// Run more actions after a delay.
    CallOut {
        delay_ms: u64,
        actions: Vec<Action>,
    },

    /// Turn this object's heartbeat on or off.
    Heartbeat { enabled: bool },

    /// Destroy this object.
    Destruct,

    /// Send an opaque GUI envelope to the acting player.
    Gui { payload: serde_json::Value },
}

impl Action {
    /// Action name for log spans.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Tell { .. } => "tell",
            Action::TellRoom { .. } => "tell_room",
            Action::Set { .. } => "set",
            Action::MoveTo { .. } => "move_to",
            Action::CloneInto { .. } => "clone_into",
            Action::CallOut { .. } => "call_out",
            Action::Heartbeat { .. } => "heartbeat",
            Action::Destruct => "destruct",
            Action::Gui { .. } => "gui",
        }
    }

    /// Nesting depth of `call_out` actions (1 for a flat action).
    pub fn depth(&self) -> usize {
        match self {
            Action::CallOut { actions, .. } => {
                1 + actions.iter().map(Action::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
