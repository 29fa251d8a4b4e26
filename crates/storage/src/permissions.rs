// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permissions snapshot (`/data/permissions.json`): levels, writable
//! domains, and the recent audit tail.

use crate::store::{Store, StoreError};
use chrono::{DateTime, Utc};
use loam_core::Level;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Virtual path of the permissions snapshot.
pub const PERMISSIONS_PATH: &str = "/data/permissions.json";

/// A user's permission grant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub level: Level,
    /// Sorted path prefixes the user may write under.
    #[serde(default)]
    pub domains: Vec<String>,
}

/// One authorization decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at_ms: u64,
    pub actor: String,
    pub action: String,
    pub target: String,
    pub success: bool,
    #[serde(default)]
    pub details: String,
}

/// The persisted permissions state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsFile {
    #[serde(default)]
    pub users: BTreeMap<String, PermissionRecord>,
    /// Recent audit decisions, oldest first.
    #[serde(default)]
    pub audit: Vec<AuditEntry>,
    pub saved_at: DateTime<Utc>,
}

impl PermissionsFile {
    pub fn new(users: BTreeMap<String, PermissionRecord>, audit: Vec<AuditEntry>) -> Self {
        Self {
            users,
            audit,
            saved_at: Utc::now(),
        }
    }
}

/// Load the permissions snapshot; `Ok(None)` on first boot.
pub fn load_permissions(store: &Store) -> Result<Option<PermissionsFile>, StoreError> {
    store.load_json(PERMISSIONS_PATH)
}

/// Save the permissions snapshot atomically.
pub fn save_permissions(store: &Store, file: &PermissionsFile) -> Result<(), StoreError> {
    store.save_json(PERMISSIONS_PATH, file)
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod tests;
