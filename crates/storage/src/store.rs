// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key/value blob store over a filesystem tree.

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid data path: {0}")]
    InvalidPath(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Blob store rooted at the configured data directory.
///
/// Virtual paths must live under `/data/`; the prefix maps to the root.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a virtual `/data/...` path to its concrete location.
    ///
    /// Rejects paths outside the data namespace and any traversal
    /// segment; the virtual namespace is the only way in or out.
    pub fn resolve(&self, vpath: &str) -> Result<PathBuf, StoreError> {
        let rest = vpath
            .strip_prefix("/data/")
            .ok_or_else(|| StoreError::InvalidPath(vpath.to_string()))?;
        if rest.is_empty() {
            return Err(StoreError::InvalidPath(vpath.to_string()));
        }

        let mut out = self.root.clone();
        for seg in rest.split('/') {
            match seg {
                "" | "." | ".." => return Err(StoreError::InvalidPath(vpath.to_string())),
                s => out.push(s),
            }
        }
        Ok(out)
    }

    /// Save a JSON blob atomically: temp file in the same directory,
    /// fsync, rename. A failed write leaves the previous blob intact.
    pub fn save_json<T: Serialize>(&self, vpath: &str, value: &T) -> Result<(), StoreError> {
        let path = self.resolve(vpath)?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Malformed {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &bytes).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "blob saved");
        Ok(())
    }

    /// Load a JSON blob. A missing file is `Ok(None)`; malformed content
    /// is a typed error.
    pub fn load_json<T: DeserializeOwned>(&self, vpath: &str) -> Result<Option<T>, StoreError> {
        let path = self.resolve(vpath)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Malformed { path, source })
    }

    /// Whether a blob exists.
    pub fn exists(&self, vpath: &str) -> bool {
        self.resolve(vpath).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Delete a blob. Returns whether anything was removed.
    pub fn delete(&self, vpath: &str) -> Result<bool, StoreError> {
        let path = self.resolve(vpath)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Create a directory under the data root.
    pub fn make_dir(&self, vpath: &str, recursive: bool) -> Result<(), StoreError> {
        let path = self.resolve(vpath)?;
        let result = if recursive {
            fs::create_dir_all(&path)
        } else {
            fs::create_dir(&path)
        };
        result.map_err(|source| StoreError::Io { path, source })
    }

    /// Append a line to a blob (bug-report sink and similar logs).
    /// Appends are not atomic; they are only used for append-only logs.
    pub fn append_line(&self, vpath: &str, line: &str) -> Result<(), StoreError> {
        let path = self.resolve(vpath)?;
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        writeln!(file, "{}", line).map_err(io_err)?;
        Ok(())
    }
}

/// Write bytes atomically: temp file, fsync, rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");

    // Write to temp file and sync
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    // Atomic rename
    fs::rename(&tmp_path, path)?;

    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
