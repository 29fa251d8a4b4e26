// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The world aggregate the driver orchestrates.
//!
//! One instance, owned by the engine-loop task. No locks: every
//! subsystem here is only touched from that task.

use crate::command::CommandManager;
use crate::connection::ConnectionTable;
use crate::context::ContextStack;
use crate::error::EfunError;
use crate::loader::Loader;
use crate::permissions::PermissionStore;
use crate::players::ActivePlayers;
use crate::registry::Registry;
use crate::scheduler::Scheduler;
use crate::session::SessionManager;
use loam_core::{Clock, MudConfig, ObjectId, SystemClock, VirtualPath};
use loam_storage::Store;
use std::time::Instant;

/// Everything the driver owns, threaded explicitly (no globals).
pub struct World<C: Clock = SystemClock> {
    pub config: MudConfig,
    pub clock: C,
    pub loader: Loader,
    pub registry: Registry,
    pub scheduler: Scheduler,
    pub connections: ConnectionTable,
    pub players: ActivePlayers,
    pub permissions: PermissionStore,
    pub sessions: SessionManager,
    pub commands: CommandManager,
    pub store: Store,
    pub context: ContextStack,
    /// Blueprints whose source changed on disk since their last
    /// compile. Modification only marks; recompiles stay explicit.
    pub stale_sources: std::collections::HashSet<VirtualPath>,
    /// Guard against hooks that recursively trigger hooks without end.
    pub(crate) hook_depth: u32,
}

impl<C: Clock> World<C> {
    pub fn new(config: MudConfig, clock: C) -> Self {
        let loader = Loader::new(&config.mudlib_path);
        let store = Store::new(&config.data_path);
        let sessions = SessionManager::new(
            &config.session.secret,
            config.session.validate_ip,
            config.session.token_ttl_ms,
        );
        Self {
            loader,
            store,
            sessions,
            clock,
            registry: Registry::new(),
            scheduler: Scheduler::new(),
            connections: ConnectionTable::new(),
            players: ActivePlayers::new(),
            permissions: PermissionStore::new(),
            commands: CommandManager::new(),
            context: ContextStack::new(),
            stale_sources: std::collections::HashSet::new(),
            hook_depth: 0,
            config,
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn epoch_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// The player entry for the current actor context, if the context
    /// names a live, registered player.
    pub fn context_player(&self) -> Option<&crate::players::PlayerEntry> {
        let player = self.context.current().this_player?;
        self.players.get_by_object(player)
    }

    /// Well-known void instance, loading it on first use.
    pub fn void(&mut self) -> Result<ObjectId, EfunError> {
        let path = self.config.void_object.clone();
        self.load_object(&path)
    }

    /// Resolve the environment path of an instance, if it has one.
    pub fn environment_path(&self, id: ObjectId) -> Option<VirtualPath> {
        let env = self.registry.get(id)?.environment?;
        Some(self.registry.get(env)?.path.clone())
    }
}

#[cfg(test)]
#[path = "world_tests.rs"]
mod tests;
