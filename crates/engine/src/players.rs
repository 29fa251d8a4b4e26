// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active-players table.
//!
//! One entry per authenticated player, keyed by case-folded name, from
//! successful login until explicit quit or disconnect-timeout expiry.
//! A LIMBO player (connection `None`) is still active.

use crate::error::EfunError;
use loam_core::{ConnectionId, Level, ObjectId, VirtualPath};
use loam_storage::player_key;
use std::collections::HashMap;

/// Driver-side state for one active player.
#[derive(Debug, Clone)]
pub struct PlayerEntry {
    /// Display name, original case.
    pub name: String,
    /// The player's live object.
    pub object: ObjectId,
    pub level: Level,
    /// Bound connection; `None` while in LIMBO.
    pub connection: Option<ConnectionId>,
    /// Environment snapshot taken when the socket dropped; the resume
    /// path returns the player here.
    pub previous_location: Option<VirtualPath>,
    /// Trailing output captured from the dropped connection, replayed
    /// (capped) after a successful resume.
    pub pending_replay: Vec<String>,
    pub aliases: HashMap<String, String>,
}

impl PlayerEntry {
    pub fn key(&self) -> String {
        player_key(&self.name)
    }
}

/// Case-folded name → player entry, with an object-id reverse index.
#[derive(Debug, Default)]
pub struct ActivePlayers {
    by_key: HashMap<String, PlayerEntry>,
    by_object: HashMap<ObjectId, String>,
}

impl ActivePlayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly authenticated player. Duplicate names (under
    /// case folding) are a conflict; the caller resolves takeover
    /// before inserting.
    pub fn insert(&mut self, entry: PlayerEntry) -> Result<(), EfunError> {
        let key = entry.key();
        if self.by_key.contains_key(&key) {
            return Err(EfunError::Conflict(format!(
                "player \"{key}\" is already active"
            )));
        }
        self.by_object.insert(entry.object, key.clone());
        self.by_key.insert(key, entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PlayerEntry> {
        self.by_key.get(&player_key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PlayerEntry> {
        self.by_key.get_mut(&player_key(name))
    }

    pub fn get_by_object(&self, object: ObjectId) -> Option<&PlayerEntry> {
        self.by_object
            .get(&object)
            .and_then(|key| self.by_key.get(key))
    }

    pub fn get_by_object_mut(&mut self, object: ObjectId) -> Option<&mut PlayerEntry> {
        let key = self.by_object.get(&object)?.clone();
        self.by_key.get_mut(&key)
    }

    pub fn key_of_object(&self, object: ObjectId) -> Option<&str> {
        self.by_object.get(&object).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<PlayerEntry> {
        let entry = self.by_key.remove(&player_key(name))?;
        self.by_object.remove(&entry.object);
        Some(entry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_key.contains_key(&player_key(name))
    }

    /// All active players (ACTIVE and LIMBO), in key order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerEntry> {
        let mut keys: Vec<&String> = self.by_key.keys().collect();
        keys.sort();
        keys.into_iter().filter_map(|key| self.by_key.get(key))
    }

    /// Players with a live connection.
    pub fn connected(&self) -> Vec<&PlayerEntry> {
        self.iter()
            .filter(|entry| entry.connection.is_some())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
#[path = "players_tests.rs"]
mod tests;
