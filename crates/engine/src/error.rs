// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Efun error taxonomy.
//!
//! Every bridge call fails with one of these named variants; a faulty
//! mudlib object never takes down the driver. Only `Fatal` moves the
//! orchestrator toward `stopping`.

use thiserror::Error;

/// Typed failure of an efun or driver operation.
#[derive(Debug, Error)]
pub enum EfunError {
    /// Blueprint path unknown, or instance id absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Source unreadable or definition invalid; nothing was cached.
    #[error("load failure for {path}: {message}")]
    LoadFailure { path: String, message: String },

    /// Write or destroy outside the actor's domains.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed request, command, or argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// Duplicate id within a scope.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence I/O failure with no guaranteed state change; retryable.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A registry/scheduler/orchestrator invariant was violated.
    #[error("fatal driver error: {0}")]
    Fatal(String),
}

impl EfunError {
    pub fn load_failure(path: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        EfunError::LoadFailure {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Stable kind name for logs and player-visible reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            EfunError::NotFound(_) => "not_found",
            EfunError::LoadFailure { .. } => "load_failure",
            EfunError::PermissionDenied(_) => "permission_denied",
            EfunError::Validation(_) => "validation",
            EfunError::Conflict(_) => "conflict",
            EfunError::Transient(_) => "transient",
            EfunError::Fatal(_) => "fatal",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, EfunError::Fatal(_))
    }
}

impl From<loam_core::PathError> for EfunError {
    fn from(e: loam_core::PathError) -> Self {
        EfunError::Validation(e.to_string())
    }
}

impl From<loam_storage::StoreError> for EfunError {
    fn from(e: loam_storage::StoreError) -> Self {
        use loam_storage::StoreError;
        match e {
            StoreError::InvalidPath(p) => EfunError::Validation(format!("invalid data path: {p}")),
            StoreError::Malformed { .. } => EfunError::Validation(e.to_string()),
            StoreError::Io { .. } => EfunError::Transient(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
