// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Virtual mudlib paths.
//!
//! Every path the driver hands to the mudlib (and accepts back) is
//! virtual: absolute within the mudlib root, `/`-separated, normalized.
//! Permission domains are matched against these paths with the prefix
//! boundary fixed at `/`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from virtual path validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path must be absolute (leading '/'): {0}")]
    NotAbsolute(String),

    #[error("path contains invalid segment: {0}")]
    InvalidSegment(String),

    #[error("path is empty")]
    Empty,
}

/// A normalized absolute virtual path (`/areas/town/square`).
///
/// Invariants: starts with `/`, no empty / `.` / `..` segments, no
/// trailing slash. The bare root is not representable; a path always
/// names something under the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// Validate and normalize a virtual path.
    pub fn new(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PathError::NotAbsolute(raw.to_string()));
        }

        let mut segments = Vec::new();
        for seg in raw.split('/').skip(1) {
            match seg {
                "" => continue, // collapse duplicate and trailing slashes
                "." | ".." => return Err(PathError::InvalidSegment(raw.to_string())),
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Err(PathError::Empty);
        }

        Ok(Self(format!("/{}", segments.join("/"))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The containing directory, or `None` for top-level paths.
    pub fn parent(&self) -> Option<VirtualPath> {
        let idx = self.0.rfind('/')?;
        if idx == 0 {
            return None;
        }
        Some(VirtualPath(self.0[..idx].to_string()))
    }

    /// Whether `domain` is a prefix of this path with the boundary at `/`.
    ///
    /// `/areas/valdoria` covers `/areas/valdoria/inn` and
    /// `/areas/valdoria` itself, but not `/areas/valdoria2/inn`.
    /// The root domain `/` covers everything.
    pub fn in_domain(&self, domain: &str) -> bool {
        let d = domain.trim_end_matches('/');
        if d.is_empty() {
            return true;
        }
        self.0 == d
            || self
                .0
                .strip_prefix(d)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Map to a concrete filesystem path under `root`.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for seg in self.0.split('/').skip(1) {
            out.push(seg);
        }
        out
    }

    /// Derive the virtual path of a mudlib source file from its concrete
    /// location, stripping a recognized source extension.
    pub fn from_fs_path(root: &Path, file: &Path) -> Option<VirtualPath> {
        let rel = file.strip_prefix(root).ok()?;
        let mut joined = String::new();
        for comp in rel.components() {
            joined.push('/');
            joined.push_str(comp.as_os_str().to_str()?);
        }
        for ext in [".hcl", ".toml", ".json"] {
            if let Some(stripped) = joined.strip_suffix(ext) {
                return VirtualPath::new(stripped).ok();
            }
        }
        VirtualPath::new(&joined).ok()
    }
}

impl std::fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VirtualPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VirtualPath::new(s)
    }
}

impl Serialize for VirtualPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for VirtualPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        VirtualPath::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "vpath_tests.rs"]
mod tests;
