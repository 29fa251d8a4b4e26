// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blueprint loading: virtual path → parsed definition + source hash.

use crate::error::EfunError;
use loam_core::VirtualPath;
use loam_mudlib::{parse_file, resolve_source, source_hash, CommandDef, EmoteDef, ObjectDef};
use std::path::{Path, PathBuf};

/// Resolves and parses mudlib sources under one root.
#[derive(Debug, Clone)]
pub struct Loader {
    root: PathBuf,
}

impl Loader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and parse a blueprint source. A failure caches nothing.
    pub fn read_def(&self, path: &VirtualPath) -> Result<(ObjectDef, String), EfunError> {
        let (file, format) = resolve_source(&self.root, path)
            .ok_or_else(|| EfunError::NotFound(format!("no source for {path}")))?;
        let content = std::fs::read_to_string(&file)
            .map_err(|e| EfunError::load_failure(path, format!("unreadable source: {e}")))?;
        let hash = source_hash(&content);
        let def = parse_file(&content, format)
            .and_then(loam_mudlib::MudlibFile::into_object)
            .map_err(|e| EfunError::load_failure(path, e))?;
        Ok((def, hash))
    }

    /// Whether a source file exists for the path.
    pub fn source_exists(&self, path: &VirtualPath) -> bool {
        resolve_source(&self.root, path).is_some()
    }

    /// Parse every command file under a directory. Per-file failures
    /// are collected, not propagated; one broken file must not take
    /// down the scan.
    pub fn scan_commands(
        &self,
        dir: &VirtualPath,
    ) -> (Vec<CommandDef>, Vec<(VirtualPath, EfunError)>) {
        let mut defs = Vec::new();
        let mut failures = Vec::new();
        for path in loam_mudlib::scan_sources(&self.root, dir) {
            match self.read_command_file(&path) {
                Ok(mut file_defs) => defs.append(&mut file_defs),
                Err(e) => failures.push((path, e)),
            }
        }
        (defs, failures)
    }

    fn read_command_file(&self, path: &VirtualPath) -> Result<Vec<CommandDef>, EfunError> {
        let (file, format) = resolve_source(&self.root, path)
            .ok_or_else(|| EfunError::NotFound(format!("no source for {path}")))?;
        let content = std::fs::read_to_string(&file)
            .map_err(|e| EfunError::load_failure(path, format!("unreadable source: {e}")))?;
        let parsed =
            parse_file(&content, format).map_err(|e| EfunError::load_failure(path, e))?;
        if !parsed.objects.is_empty() {
            return Err(EfunError::load_failure(
                path,
                "command files must not define objects",
            ));
        }
        Ok(parsed.command_defs())
    }

    /// Parse every emote file under a directory, same failure policy as
    /// [`Loader::scan_commands`].
    pub fn scan_emotes(&self, dir: &VirtualPath) -> (Vec<EmoteDef>, Vec<(VirtualPath, EfunError)>) {
        let mut defs = Vec::new();
        let mut failures = Vec::new();
        for path in loam_mudlib::scan_sources(&self.root, dir) {
            let result = resolve_source(&self.root, &path)
                .ok_or_else(|| EfunError::NotFound(format!("no source for {path}")))
                .and_then(|(file, format)| {
                    std::fs::read_to_string(&file)
                        .map_err(|e| {
                            EfunError::load_failure(&path, format!("unreadable source: {e}"))
                        })
                        .and_then(|content| {
                            parse_file(&content, format)
                                .map_err(|e| EfunError::load_failure(&path, e))
                        })
                });
            match result {
                Ok(parsed) => defs.append(&mut parsed.emote_defs()),
                Err(e) => failures.push((path, e)),
            }
        }
        (defs, failures)
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
