// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mudlib source resolution and hashing.
//!
//! Virtual paths map to concrete files under the mudlib root by probing
//! the recognized extensions in a fixed order, so `/std/room` finds
//! `std/room.hcl` before `std/room.toml` before `std/room.json`.

use crate::parser::Format;
use loam_core::VirtualPath;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Probe order for source files.
const EXTENSIONS: [(&str, Format); 3] = [
    ("hcl", Format::Hcl),
    ("toml", Format::Toml),
    ("json", Format::Json),
];

/// Resolve a virtual path to a concrete source file.
pub fn resolve_source(root: &Path, path: &VirtualPath) -> Option<(PathBuf, Format)> {
    let base = path.to_fs_path(root);
    for (ext, format) in EXTENSIONS {
        let candidate = base.with_extension(ext);
        if candidate.is_file() {
            return Some((candidate, format));
        }
    }
    None
}

/// Hex SHA-256 of a source file's content, recorded per blueprint
/// generation.
pub fn source_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Recursively collect the virtual paths of every source file under a
/// mudlib directory. Results are sorted for deterministic scan order.
pub fn scan_sources(root: &Path, dir: &VirtualPath) -> Vec<VirtualPath> {
    let mut found = Vec::new();
    walk(root, &dir.to_fs_path(root), &mut found);
    found.sort();
    found.dedup();
    found
}

fn walk(root: &Path, dir: &Path, found: &mut Vec<VirtualPath>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, found);
            continue;
        }
        let recognized = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| EXTENSIONS.iter().any(|(known, _)| *known == e));
        if !recognized {
            continue;
        }
        if let Some(vpath) = VirtualPath::from_fs_path(root, &path) {
            found.push(vpath);
        }
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
