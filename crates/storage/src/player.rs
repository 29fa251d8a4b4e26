// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-player save blobs (`/data/players/<name>.json`).
//!
//! The save blob is the single persisted truth for a player: credential
//! digest, permission level, property bag, alias table, last location,
//! and inventory descriptors (blueprint path + properties; inventory is
//! re-cloned from blueprints on load, never pickled live).

use crate::store::{Store, StoreError};
use loam_core::Level;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Case-folded table key for a player name.
pub fn player_key(name: &str) -> String {
    name.to_lowercase()
}

/// Player name policy: 3–16 characters, letter first, then letters,
/// digits, `_` or `-`.
pub fn valid_player_name(name: &str) -> bool {
    let len = name.chars().count();
    if !(3..=16).contains(&len) {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Virtual path of a player's save blob.
pub fn player_path(name: &str) -> String {
    format!("/data/players/{}.json", player_key(name))
}

/// Salted SHA-256 credential digest, hex-encoded.
pub fn digest_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// An item in a saved inventory: enough to re-clone it on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub path: String,
    #[serde(default)]
    pub props: BTreeMap<String, Value>,
}

/// A player's persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Display name (original case). The save file and all tables key on
    /// [`player_key`].
    pub name: String,
    pub password_digest: String,
    pub salt: String,
    #[serde(default)]
    pub level: Level,
    /// Last known environment path; restored on login and resume.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub props: BTreeMap<String, Value>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default)]
    pub last_login_ms: u64,
}

impl PlayerRecord {
    /// Create a fresh record with a random salt.
    pub fn new(name: &str, password: &str, now_ms: u64) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        Self {
            name: name.to_string(),
            password_digest: digest_password(&salt, password),
            salt,
            level: Level::Player,
            location: None,
            props: BTreeMap::new(),
            aliases: BTreeMap::new(),
            inventory: Vec::new(),
            email: None,
            gender: None,
            created_at_ms: now_ms,
            last_login_ms: now_ms,
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        digest_password(&self.salt, password) == self.password_digest
    }

    pub fn set_password(&mut self, password: &str) {
        self.salt = uuid::Uuid::new_v4().simple().to_string();
        self.password_digest = digest_password(&self.salt, password);
    }
}

/// Save a player record atomically.
pub fn save_player(store: &Store, record: &PlayerRecord) -> Result<(), StoreError> {
    store.save_json(&player_path(&record.name), record)
}

/// Load a player record; `Ok(None)` when no such player exists.
pub fn load_player(store: &Store, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
    store.load_json(&player_path(name))
}

#[cfg(test)]
#[path = "player_tests.rs"]
mod tests;
