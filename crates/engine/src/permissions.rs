// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission store: levels, writable domains, audit ring.
//!
//! Decision procedure for a write/destroy on path P by user U:
//! administrators always pass; otherwise some domain of U must prefix P
//! with the boundary at `/`; otherwise deny. Every decision lands in
//! the audit ring, flushed periodically into the permissions snapshot.

use crate::error::EfunError;
use loam_core::{Level, VirtualPath};
use loam_storage::{AuditEntry, PermissionRecord, PermissionsFile};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// In-memory audit bound; older entries fall off the ring.
const AUDIT_CAP: usize = 1000;

/// Audit tail carried into the persisted snapshot.
const AUDIT_SNAPSHOT_TAIL: usize = 200;

/// Levels, domains, and the audit ring.
#[derive(Debug, Default)]
pub struct PermissionStore {
    users: HashMap<String, PermissionRecord>,
    audit: VecDeque<AuditEntry>,
    dirty: bool,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from the persisted snapshot (if any).
    pub fn from_file(file: Option<PermissionsFile>) -> Self {
        let Some(file) = file else {
            return Self::default();
        };
        Self {
            users: file.users.into_iter().collect(),
            audit: file.audit.into(),
            dirty: false,
        }
    }

    /// Build the snapshot for persistence.
    pub fn to_file(&self) -> PermissionsFile {
        let users: BTreeMap<String, PermissionRecord> = self
            .users
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let skip = self.audit.len().saturating_sub(AUDIT_SNAPSHOT_TAIL);
        let audit: Vec<AuditEntry> = self.audit.iter().skip(skip).cloned().collect();
        PermissionsFile::new(users, audit)
    }

    // ---------------------------------------------------------------
    // Grants
    // ---------------------------------------------------------------

    /// Number of users holding any grant.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn level_of(&self, user_key: &str) -> Level {
        self.users
            .get(user_key)
            .map(|record| record.level)
            .unwrap_or(Level::Player)
    }

    pub fn record(&self, user_key: &str) -> Option<&PermissionRecord> {
        self.users.get(user_key)
    }

    pub fn grant(&mut self, user_key: &str, level: Level) {
        self.users
            .entry(user_key.to_string())
            .or_default()
            .level = level;
        self.dirty = true;
    }

    /// Drop a user back to plain Player with no domains.
    pub fn revoke(&mut self, user_key: &str) -> bool {
        let removed = self.users.remove(user_key).is_some();
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub fn add_domain(&mut self, user_key: &str, domain: &str) -> Result<(), EfunError> {
        let normalized = normalize_domain(domain)?;
        let record = self.users.entry(user_key.to_string()).or_default();
        if record.domains.contains(&normalized) {
            return Err(EfunError::Conflict(format!(
                "{user_key} already holds domain {normalized}"
            )));
        }
        record.domains.push(normalized);
        record.domains.sort();
        self.dirty = true;
        Ok(())
    }

    pub fn remove_domain(&mut self, user_key: &str, domain: &str) -> Result<(), EfunError> {
        let normalized = normalize_domain(domain)?;
        let record = self
            .users
            .get_mut(user_key)
            .ok_or_else(|| EfunError::NotFound(format!("no grants for {user_key}")))?;
        let before = record.domains.len();
        record.domains.retain(|d| *d != normalized);
        if record.domains.len() == before {
            return Err(EfunError::NotFound(format!(
                "{user_key} does not hold domain {normalized}"
            )));
        }
        self.dirty = true;
        Ok(())
    }

    pub fn domains(&self, user_key: &str) -> &[String] {
        self.users
            .get(user_key)
            .map(|record| record.domains.as_slice())
            .unwrap_or(&[])
    }

    // ---------------------------------------------------------------
    // Decisions
    // ---------------------------------------------------------------

    /// Authorize a write/destroy action on `path`. Records the decision
    /// either way.
    pub fn authorize_write(
        &mut self,
        actor_key: &str,
        action: &str,
        path: &VirtualPath,
        now_ms: u64,
    ) -> Result<(), EfunError> {
        let (allowed, details) = self.decide(actor_key, path);
        self.push_audit(AuditEntry {
            at_ms: now_ms,
            actor: actor_key.to_string(),
            action: action.to_string(),
            target: path.to_string(),
            success: allowed,
            details,
        });
        if allowed {
            Ok(())
        } else {
            Err(EfunError::PermissionDenied(format!(
                "{actor_key} may not {action} {path}"
            )))
        }
    }

    fn decide(&self, actor_key: &str, path: &VirtualPath) -> (bool, String) {
        let Some(record) = self.users.get(actor_key) else {
            return (false, "no grants".to_string());
        };
        if record.level.is_admin() {
            return (true, "administrator".to_string());
        }
        for domain in &record.domains {
            if path.in_domain(domain) {
                return (true, format!("domain {domain}"));
            }
        }
        (false, "outside granted domains".to_string())
    }

    // ---------------------------------------------------------------
    // Audit
    // ---------------------------------------------------------------

    fn push_audit(&mut self, entry: AuditEntry) {
        if self.audit.len() == AUDIT_CAP {
            self.audit.pop_front();
        }
        self.audit.push_back(entry);
        self.dirty = true;
    }

    /// Most recent entries, oldest first.
    pub fn audit_tail(&self, limit: usize) -> Vec<AuditEntry> {
        let skip = self.audit.len().saturating_sub(limit);
        self.audit.iter().skip(skip).cloned().collect()
    }

    pub fn audit_len(&self) -> usize {
        self.audit.len()
    }

    /// Whether unsaved changes exist; clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

fn normalize_domain(domain: &str) -> Result<String, EfunError> {
    let trimmed = domain.trim();
    if trimmed == "/" {
        return Ok("/".to_string());
    }
    let path = VirtualPath::new(trimmed)
        .map_err(|e| EfunError::Validation(format!("bad domain {trimmed}: {e}")))?;
    Ok(path.to_string())
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod tests;
