// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The master object: the mudlib's policy surface.
//!
//! A well-known blueprint the driver loads first. Its definition
//! carries the preload list, safelist extras, and an optional start
//! room; its lifecycle hooks are the policy callbacks (`on_create`
//! fires at driver start, `on_destroy` at shutdown) and its receive
//! capability is offered every contained runtime error.

use loam_core::{ObjectId, SystemClock, VirtualPath};
use loam_engine::{EfunError, World};
use loam_mudlib::HookKind;
use std::collections::HashSet;
use tracing::{info, warn};

/// Policy facade over the loaded master object.
pub struct MasterPolicy {
    object: ObjectId,
    preload: Vec<VirtualPath>,
    safelist: HashSet<VirtualPath>,
    start_location: Option<VirtualPath>,
}

impl MasterPolicy {
    /// Load the master object and read its policy surface. The
    /// critical blueprints (master, void, player base) are always
    /// safelisted; the master's own list adds to that.
    pub fn load(world: &mut World<SystemClock>) -> Result<Self, EfunError> {
        let path = world.config.master_object.clone();
        let object = world.load_object(&path)?;

        let def = match world.registry.get(object) {
            Some(live) => live.def.clone(),
            None => return Err(EfunError::Fatal("master vanished during load".to_string())),
        };

        let mut preload = Vec::new();
        for raw in &def.preload {
            match VirtualPath::new(raw) {
                Ok(p) => preload.push(p),
                Err(e) => warn!(entry = raw.as_str(), error = %e, "bad preload entry"),
            }
        }

        let mut safelist: HashSet<VirtualPath> = HashSet::new();
        safelist.insert(world.config.master_object.clone());
        safelist.insert(world.config.void_object.clone());
        safelist.insert(world.config.player_object.clone());
        for raw in &def.safelist {
            match VirtualPath::new(raw) {
                Ok(p) => {
                    safelist.insert(p);
                }
                Err(e) => warn!(entry = raw.as_str(), error = %e, "bad safelist entry"),
            }
        }

        let start_location = def
            .props
            .get("start")
            .and_then(|v| v.as_str())
            .and_then(|raw| VirtualPath::new(raw).ok());

        info!(
            %path,
            preloads = preload.len(),
            safelisted = safelist.len(),
            "master object loaded"
        );

        Ok(Self {
            object,
            preload,
            safelist,
            start_location,
        })
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn preload(&self) -> &[VirtualPath] {
        &self.preload
    }

    pub fn is_safelisted(&self, path: &VirtualPath) -> bool {
        self.safelist.contains(path)
    }

    pub fn start_location(&self) -> Option<&VirtualPath> {
        self.start_location.as_ref()
    }

    /// Offer a contained runtime error to the master's receive
    /// capability. Failures inside the hook are swallowed; the error
    /// path must never become its own error source.
    pub fn report_error(&self, world: &mut World<SystemClock>, actor: &str, error: &EfunError) {
        world.send(
            self.object,
            &format!("runtime-error {} {}: {}", error.kind(), actor, error),
        );
    }

    /// The shutdown policy callback: the master's `on_destroy` hook.
    pub fn on_shutdown(&self, world: &mut World<SystemClock>) {
        if let Err(e) = world.run_hook(self.object, HookKind::Destroy, &[]) {
            warn!(error = %e, "master shutdown hook failed");
        }
    }
}

#[cfg(test)]
#[path = "master_tests.rs"]
mod tests;
