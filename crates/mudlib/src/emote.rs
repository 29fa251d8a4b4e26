// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Social emote definitions: the command dispatcher's fallback table.

use serde::{Deserialize, Serialize};

/// A social verb (`smile`, `nod`, ...).
///
/// Message templates interpolate `${player}` (acting player's name) and
/// `${target}` (the argument, verbatim). The targeted forms are optional;
/// when absent, a targeted use falls back to appending the argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmoteDef {
    /// Injected from the block label during parsing.
    #[serde(skip)]
    pub name: String,
    /// Line echoed to the actor (`You smile.`).
    pub you: String,
    /// Line broadcast to the room (`${player} smiles.`).
    pub room: String,
    /// Targeted form for the actor (`You smile at ${target}.`).
    pub you_target: String,
    /// Targeted form for the room (`${player} smiles at ${target}.`).
    pub room_target: String,
}

#[cfg(test)]
#[path = "emote_tests.rs"]
mod tests;
