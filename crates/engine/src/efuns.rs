// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The efun surface: the single API mudlib code sees.
//!
//! Every operation returns a typed [`EfunError`]; callers at the
//! network boundary contain failures instead of propagating them into
//! the driver. File efuns take virtual paths, gate writes through the
//! permission store, and write atomically.

use crate::connection::BoundHandler;
use crate::error::EfunError;
use crate::registry::Blueprint;
use crate::world::World;
use loam_core::{Clock, Level, ObjectId, ObjectRef, ServerEnvelope, VirtualPath};
use loam_mudlib::{Action, HookKind};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a hot reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadOutcome {
    /// Generation of the freshly registered blueprint.
    pub generation: u64,
    /// Live clones still answering to older generations.
    pub existing_clones: usize,
}

/// Stat result for a virtual file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified_ms: u64,
    pub is_dir: bool,
}

/// One entry from a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl<C: Clock> World<C> {
    // ---------------------------------------------------------------
    // Object efuns
    // ---------------------------------------------------------------

    /// Compile-if-needed: returns the current blueprint generation for
    /// a path, loading and registering the source on first use.
    pub fn load_blueprint(&mut self, path: &VirtualPath) -> Result<u64, EfunError> {
        if let Some(blueprint) = self.registry.lookup_blueprint(path) {
            return Ok(blueprint.generation);
        }
        let (def, hash) = self.loader.read_def(path)?;
        let generation = self.registry.register_blueprint(path.clone(), def, hash);
        debug!(%path, generation, "blueprint compiled");
        Ok(generation)
    }

    pub fn blueprint(&self, path: &VirtualPath) -> Option<&Blueprint> {
        self.registry.lookup_blueprint(path)
    }

    /// Get-or-create the canonical instance for a path (daemons,
    /// rooms, the master object).
    pub fn load_object(&mut self, path: &VirtualPath) -> Result<ObjectId, EfunError> {
        if let Some(id) = self.registry.canonical(path) {
            return Ok(id);
        }
        self.load_blueprint(path)?;
        let id = self.registry.instantiate(path)?;
        self.registry.set_canonical(path.clone(), id);
        self.finish_create(id)?;
        Ok(id)
    }

    /// Always-new instance; fires `on_create`.
    pub fn clone_object(&mut self, path: &VirtualPath) -> Result<ObjectId, EfunError> {
        self.load_blueprint(path)?;
        let id = self.registry.instantiate(path)?;
        self.finish_create(id)?;
        Ok(id)
    }

    /// Post-instantiation lifecycle: heartbeat subscription and
    /// `on_create`. A failing constructor hook tears the instance back
    /// down; no partially constructed object stays indexed.
    fn finish_create(&mut self, id: ObjectId) -> Result<(), EfunError> {
        let wants_heartbeat = self
            .registry
            .get(id)
            .is_some_and(|object| object.def.hooks.has(HookKind::Heartbeat));
        if wants_heartbeat {
            self.scheduler.register_heartbeat(id);
        }

        if let Err(e) = self.run_hook(id, HookKind::Create, &[]) {
            let path = self
                .registry
                .get(id)
                .map(|object| object.path.to_string())
                .unwrap_or_else(|| id.to_string());
            self.scheduler.unregister_heartbeat(id);
            self.scheduler.cancel_for_object(id);
            self.registry.remove(id);
            return Err(EfunError::load_failure(
                path,
                format!("on_create failed: {e}"),
            ));
        }
        Ok(())
    }

    /// Lookup by blueprint path (canonical instance) or `#id`.
    pub fn find_object(&self, reference: &str) -> Option<ObjectId> {
        let parsed = ObjectRef::parse(reference).ok()?;
        self.registry.resolve(&parsed)
    }

    /// Recompile a path. Existing clones keep their generation; the
    /// count comes back so callers can report it.
    pub fn reload_object(&mut self, path: &VirtualPath) -> Result<ReloadOutcome, EfunError> {
        let (def, hash) = self.loader.read_def(path)?;
        let generation = self.registry.register_blueprint(path.clone(), def, hash);
        let outcome = ReloadOutcome {
            generation,
            existing_clones: self.registry.clone_count(path),
        };
        debug!(%path, generation, clones = outcome.existing_clones, "blueprint reloaded");
        Ok(outcome)
    }

    /// Destroy an instance: `on_destroy`, detach (firing the
    /// environment's `on_leave`), recursively destroy inventory unless
    /// opted out, drop every index and subscription. Returns how many
    /// instances went away.
    pub fn destruct(&mut self, id: ObjectId, destroy_inventory: bool) -> Result<usize, EfunError> {
        if !self.registry.contains(id) {
            return Err(EfunError::NotFound(format!("instance {id}")));
        }

        let targets: Vec<ObjectId> = if destroy_inventory {
            let mut deep = self.registry.deep_inventory(id);
            deep.push(id);
            deep
        } else {
            vec![id]
        };

        let mut removed = 0;
        for target in targets {
            if !self.registry.contains(target) {
                continue; // a hook earlier in the sweep got here first
            }

            let _ = self.run_hook(target, HookKind::Destroy, &[]);

            let env = self.registry.get(target).and_then(|o| o.environment);
            if let Some(env) = env {
                let mover = self
                    .registry
                    .get(target)
                    .map(|o| o.display_name())
                    .unwrap_or_default();
                self.registry.unlink(target);
                let vars = [
                    ("mover.name", mover),
                    ("mover.id", target.to_string()),
                ];
                let _ = self.run_hook(env, HookKind::Leave, &vars);
            }

            self.scheduler.unregister_heartbeat(target);
            self.scheduler.cancel_for_object(target);
            if let Some(key) = self.players.key_of_object(target).map(str::to_string) {
                self.players.remove(&key);
            }
            self.registry.remove(target);
            removed += 1;
        }
        Ok(removed)
    }

    /// Move an instance into a new environment, firing the old
    /// environment's `on_leave` and the new one's `on_enter`.
    pub fn move_object(&mut self, id: ObjectId, dest: ObjectId) -> Result<(), EfunError> {
        let old_env = self
            .registry
            .get(id)
            .ok_or_else(|| EfunError::NotFound(format!("instance {id}")))?
            .environment;
        if old_env == Some(dest) {
            return Ok(());
        }
        self.registry.move_object(id, Some(dest))?;

        let mover = self
            .registry
            .get(id)
            .map(|o| o.display_name())
            .unwrap_or_default();
        let vars = [("mover.name", mover), ("mover.id", id.to_string())];
        if let Some(old) = old_env {
            let _ = self.run_hook(old, HookKind::Leave, &vars);
        }
        let _ = self.run_hook(dest, HookKind::Enter, &vars);
        Ok(())
    }

    /// Deliver a message to an instance. Never raises: connected
    /// players get the line, objects with a receive capability get
    /// their hook, everything else swallows it.
    pub fn send(&mut self, target: ObjectId, message: &str) {
        if let Some(entry) = self.players.get_by_object(target) {
            if let Some(conn) = entry.connection {
                if let Some(handle) = self.connections.get_mut(conn) {
                    handle.send_line(message);
                }
                return;
            }
        }

        let has_receive = self
            .registry
            .get(target)
            .is_some_and(|object| object.def.hooks.has(HookKind::Receive));
        if has_receive {
            let vars = [("message", message.to_string())];
            if let Err(e) = self.run_hook(target, HookKind::Receive, &vars) {
                warn!(%target, error = %e, "on_receive failed");
            }
        }
    }

    /// Broadcast a line to a room's inventory, minus `exclude`.
    pub fn broadcast_room(&mut self, room: ObjectId, message: &str, exclude: &[ObjectId]) {
        let members: Vec<ObjectId> = self
            .registry
            .get(room)
            .map(|object| object.inventory.clone())
            .unwrap_or_default();
        for member in members {
            if !exclude.contains(&member) {
                self.send(member, message);
            }
        }
    }

    // ---------------------------------------------------------------
    // Player projections
    // ---------------------------------------------------------------

    /// Connected players, in table order.
    pub fn all_players(&self) -> Vec<ObjectId> {
        self.players
            .connected()
            .into_iter()
            .map(|entry| entry.object)
            .collect()
    }

    pub fn find_connected_player(&self, name: &str) -> Option<ObjectId> {
        self.players
            .get(name)
            .filter(|entry| entry.connection.is_some())
            .map(|entry| entry.object)
    }

    /// Active includes LIMBO (disconnected, grace window running).
    pub fn find_active_player(&self, name: &str) -> Option<ObjectId> {
        self.players.get(name).map(|entry| entry.object)
    }

    /// Persist a player: level, aliases, location, property bag, and
    /// inventory descriptors merged into the existing save blob.
    pub fn save_player(&mut self, player: ObjectId) -> Result<(), EfunError> {
        let entry = self
            .players
            .get_by_object(player)
            .ok_or_else(|| EfunError::NotFound(format!("no active player for {player}")))?
            .clone();

        let mut record = loam_storage::load_player(&self.store, &entry.name)?
            .ok_or_else(|| EfunError::NotFound(format!("no save blob for {}", entry.name)))?;

        record.level = entry.level;
        record.aliases = entry.aliases.into_iter().collect();
        // The void is a holding area, never a home: a player parked
        // there keeps their last real location.
        record.location = self
            .environment_path(player)
            .filter(|path| *path != self.config.void_object)
            .map(|path| path.to_string())
            .or_else(|| entry.previous_location.map(|p| p.to_string()))
            .or(record.location);

        if let Some(object) = self.registry.get(player) {
            record.props = object
                .props
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            record.inventory = object
                .inventory
                .iter()
                .filter_map(|item| self.registry.get(*item))
                .map(|item| loam_storage::InventoryEntry {
                    path: item.path.to_string(),
                    props: item
                        .props
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<BTreeMap<_, _>>(),
                })
                .collect();
        }

        loam_storage::save_player(&self.store, &record)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Misc efuns
    // ---------------------------------------------------------------

    /// Typed settings lookup over dotted keys.
    pub fn get_mud_config(&self, key: &str) -> Option<serde_json::Value> {
        self.config.get(key)
    }

    /// Pipe an opaque JSON envelope to the acting player's connection.
    pub fn gui_send(&mut self, payload: serde_json::Value) -> Result<(), EfunError> {
        let entry = self
            .context_player()
            .ok_or_else(|| EfunError::Validation("no player in actor context".to_string()))?;
        let conn = entry
            .connection
            .ok_or_else(|| EfunError::NotFound("player has no bound connection".to_string()))?;
        let handle = self
            .connections
            .get_mut(conn)
            .ok_or_else(|| EfunError::NotFound(format!("connection {conn}")))?;
        handle.send_envelope(&ServerEnvelope::Gui(payload));
        Ok(())
    }

    /// Subscribe or unsubscribe an instance's heartbeat. Returns
    /// whether the subscription state changed.
    pub fn set_heartbeat(&mut self, id: ObjectId, enabled: bool) -> Result<bool, EfunError> {
        if !self.registry.contains(id) {
            return Err(EfunError::NotFound(format!("instance {id}")));
        }
        Ok(if enabled {
            self.scheduler.register_heartbeat(id)
        } else {
            self.scheduler.unregister_heartbeat(id)
        })
    }

    /// Schedule actions against an instance after a delay.
    pub fn call_out(
        &mut self,
        target: ObjectId,
        actions: Vec<Action>,
        delay_ms: u64,
    ) -> Result<loam_core::CalloutHandle, EfunError> {
        if !self.registry.contains(target) {
            return Err(EfunError::NotFound(format!("instance {target}")));
        }
        let now = self.now();
        Ok(self.scheduler.call_out(
            crate::scheduler::CalloutPayload::Script { target, actions },
            Duration::from_millis(delay_ms),
            now,
        ))
    }

    /// Cancel a call-out. Idempotent, safe after expiry.
    pub fn remove_call_out(&mut self, handle: loam_core::CalloutHandle) -> bool {
        self.scheduler.remove_call_out(handle)
    }

    /// Tab-completion candidates: visible commands, emotes, and loaded
    /// blueprint paths.
    pub fn completion_candidates(&self, prefix: &str, level: Level) -> Vec<String> {
        let mut out = self.commands.completion_candidates(prefix, level);
        out.extend(
            self.registry
                .blueprint_paths()
                .iter()
                .map(ToString::to_string)
                .filter(|path| path.starts_with(prefix)),
        );
        out.sort();
        out.dedup();
        out.truncate(50);
        out
    }

    // ---------------------------------------------------------------
    // File efuns (mudlib tree, permission-gated writes)
    // ---------------------------------------------------------------

    fn file_actor(&self) -> Result<(String, Level), EfunError> {
        let entry = self
            .context_player()
            .ok_or_else(|| EfunError::PermissionDenied("no actor context".to_string()))?;
        Ok((entry.key(), entry.level))
    }

    fn require_reader(&self) -> Result<(), EfunError> {
        let (_, level) = self.file_actor()?;
        if level < Level::Builder {
            return Err(EfunError::PermissionDenied(
                "file access requires builder level".to_string(),
            ));
        }
        Ok(())
    }

    fn authorize_file_write(&mut self, action: &str, path: &VirtualPath) -> Result<(), EfunError> {
        let (key, _) = self.file_actor()?;
        let now_ms = self.epoch_ms();
        self.permissions.authorize_write(&key, action, path, now_ms)
    }

    pub async fn read_file(&self, path: &VirtualPath) -> Result<String, EfunError> {
        self.require_reader()?;
        let fs_path = path.to_fs_path(self.loader.root());
        tokio::fs::read_to_string(&fs_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EfunError::NotFound(path.to_string()),
                _ => EfunError::Transient(format!("read {path}: {e}")),
            })
    }

    /// Atomic write: temp file in the same directory, fsync, rename.
    /// A failed write leaves the tree unchanged.
    pub async fn write_file(&mut self, path: &VirtualPath, content: &str) -> Result<(), EfunError> {
        self.authorize_file_write("write_file", path)?;
        let fs_path = path.to_fs_path(self.loader.root());

        if let Some(parent) = fs_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EfunError::Transient(format!("mkdir for {path}: {e}")))?;
        }
        let tmp = fs_path.with_extension("tmp");
        let write = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            tokio::io::AsyncWriteExt::write_all(&mut file, content.as_bytes()).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &fs_path).await
        };
        write
            .await
            .map_err(|e| EfunError::Transient(format!("write {path}: {e}")))
    }

    pub fn file_exists(&self, path: &VirtualPath) -> bool {
        let fs_path = path.to_fs_path(self.loader.root());
        fs_path.exists() || self.loader.source_exists(path)
    }

    pub async fn file_stat(&self, path: &VirtualPath) -> Result<FileStat, EfunError> {
        self.require_reader()?;
        let fs_path = path.to_fs_path(self.loader.root());
        let meta = tokio::fs::metadata(&fs_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EfunError::NotFound(path.to_string()),
                _ => EfunError::Transient(format!("stat {path}: {e}")),
            })?;
        let modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(FileStat {
            size: meta.len(),
            modified_ms,
            is_dir: meta.is_dir(),
        })
    }

    pub async fn read_dir(&self, path: &VirtualPath) -> Result<Vec<DirEntry>, EfunError> {
        self.require_reader()?;
        let fs_path = path.to_fs_path(self.loader.root());
        let mut reader = tokio::fs::read_dir(&fs_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EfunError::NotFound(path.to_string()),
                _ => EfunError::Transient(format!("readdir {path}: {e}")),
            })?;
        let mut entries = Vec::new();
        while let Ok(Some(entry)) = reader.next_entry().await {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub async fn make_dir(&mut self, path: &VirtualPath, recursive: bool) -> Result<(), EfunError> {
        self.authorize_file_write("make_dir", path)?;
        let fs_path = path.to_fs_path(self.loader.root());
        let result = if recursive {
            tokio::fs::create_dir_all(&fs_path).await
        } else {
            tokio::fs::create_dir(&fs_path).await
        };
        result.map_err(|e| EfunError::Transient(format!("mkdir {path}: {e}")))
    }

    pub async fn delete_file(&mut self, path: &VirtualPath) -> Result<(), EfunError> {
        self.authorize_file_write("delete_file", path)?;
        let fs_path = path.to_fs_path(self.loader.root());
        tokio::fs::remove_file(&fs_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EfunError::NotFound(path.to_string()),
                _ => EfunError::Transient(format!("delete {path}: {e}")),
            })
    }

    // ---------------------------------------------------------------
    // Connection helpers used by handlers and builtins
    // ---------------------------------------------------------------

    /// Send a line to a player's bound connection, if any.
    pub fn tell_player(&mut self, player: ObjectId, line: &str) {
        self.send(player, line);
    }

    /// Send a line directly to a connection.
    pub fn tell_connection(&mut self, conn: loam_core::ConnectionId, line: &str) {
        if let Some(handle) = self.connections.get_mut(conn) {
            handle.send_line(line);
        }
    }

    /// Bind a connection to a handler.
    pub fn bind_connection(&mut self, conn: loam_core::ConnectionId, handler: BoundHandler) {
        if let Some(handle) = self.connections.get_mut(conn) {
            handle.handler = handler;
        }
    }
}

#[cfg(test)]
#[path = "efuns_tests.rs"]
mod tests;
