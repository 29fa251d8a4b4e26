// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Player session state machine: bind, takeover, LIMBO, resume, GONE.
//!
//! LOGIN → ACTIVE on successful auth (with takeover when the name is
//! already bound); ACTIVE → LIMBO on socket drop (void parking plus a
//! grace timer); LIMBO → ACTIVE on a valid `session_resume`; LIMBO →
//! GONE on timer expiry or a clean quit.

use crate::builtins;
use crate::driver::Driver;
use loam_core::{ConnectionId, ServerEnvelope, TimerId, VirtualPath};
use loam_engine::{BoundHandler, PlayerEntry, TokenError};
use loam_storage::{player_key, PlayerRecord};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// The exact notice a replaced connection sees, once.
const TAKEOVER_NOTICE: &str = "Another connection has taken over this session.";

const REPLAY_START: &str = "Replaying missed messages";
const REPLAY_END: &str = "End of replay";

/// LOGIN → ACTIVE. Duplicate names trigger takeover of the existing
/// player object; otherwise a fresh player is cloned and restored from
/// its save blob.
pub fn bind_player(driver: &mut Driver, conn: ConnectionId, record: PlayerRecord, fresh: bool) {
    driver.login.forget(conn);
    let key = player_key(&record.name);

    if driver.world.players.contains(&key) {
        take_over(driver, conn, &key);
        return;
    }

    // Bootstrap: the very first account on a fresh world runs it.
    if fresh
        && driver.world.config.bootstrap_admin
        && driver.world.permissions.user_count() == 0
    {
        driver
            .world
            .permissions
            .grant(&key, loam_core::Level::Administrator);
        info!(player = %record.name, "first account granted administrator");
    }

    // Permission store is authoritative once a grant exists; the save
    // blob carries the level for everyone else.
    let granted = driver.world.permissions.level_of(&key);
    let level = granted.max(record.level);

    let player_path = driver.world.config.player_object.clone();
    let player = match driver.world.clone_object(&player_path) {
        Ok(player) => player,
        Err(e) => {
            warn!(error = %e, "player object failed to load");
            driver
                .world
                .tell_connection(conn, "The world cannot hold you right now.");
            if let Some(handle) = driver.world.connections.get(conn) {
                handle.close();
            }
            return;
        }
    };

    // Restore the property bag, display name included.
    if let Some(object) = driver.world.registry.get_mut(player) {
        for (prop_key, value) in &record.props {
            object.set_prop(prop_key.clone(), value.clone());
        }
        object.set_prop("short", serde_json::json!(record.name.clone()));
    }

    // Re-clone saved inventory; failures lose the item, not the login.
    for item in &record.inventory {
        let restored = VirtualPath::new(&item.path)
            .map_err(|e| e.to_string())
            .and_then(|path| {
                driver
                    .world
                    .clone_object(&path)
                    .map_err(|e| e.to_string())
            });
        match restored {
            Ok(id) => {
                if let Some(object) = driver.world.registry.get_mut(id) {
                    for (prop_key, value) in &item.props {
                        object.set_prop(prop_key.clone(), value.clone());
                    }
                }
                let _ = driver.world.move_object(id, player);
            }
            Err(e) => warn!(item = %item.path, error = %e, "inventory restore failed"),
        }
    }

    let previous_location = record
        .location
        .as_deref()
        .and_then(|raw| VirtualPath::new(raw).ok());

    let entry = PlayerEntry {
        name: record.name.clone(),
        object: player,
        level,
        connection: Some(conn),
        previous_location: previous_location.clone(),
        pending_replay: Vec::new(),
        aliases: record.aliases.clone().into_iter().collect::<HashMap<_, _>>(),
    };
    if let Err(e) = driver.world.players.insert(entry) {
        // contains() was checked above; a conflict here is a driver bug
        warn!(error = %e, "player table insert failed");
        return;
    }
    driver
        .world
        .bind_connection(conn, BoundHandler::Player(player));

    place_player(driver, player, previous_location);

    let greeting = if fresh {
        format!("Welcome, {}.", record.name)
    } else {
        format!("Welcome back, {}.", record.name)
    };
    driver.world.send(player, &greeting);
    builtins::send_look(&mut driver.world, player);
    issue_token(driver, conn, &record.name);

    // Stamp the visit.
    let mut updated = record;
    updated.level = level;
    updated.last_login_ms = driver.world.epoch_ms();
    if let Err(e) = loam_storage::save_player(&driver.world.store, &updated) {
        warn!(error = %e, "login stamp failed");
    }

    info!(player = %updated.name, %conn, "player bound");
}

/// Duplicate login: the existing player object survives; the old
/// connection (if any) gets the notice and closes; the new connection
/// inherits the session.
fn take_over(driver: &mut Driver, new_conn: ConnectionId, key: &str) {
    let (player, name, old_conn, previous_location) = {
        let Some(entry) = driver.world.players.get(key) else {
            return;
        };
        (
            entry.object,
            entry.name.clone(),
            entry.connection,
            entry.previous_location.clone(),
        )
    };

    let mut captured: Vec<String> = Vec::new();
    if let Some(old) = old_conn {
        if let Some(handle) = driver.world.connections.get_mut(old) {
            captured = handle.recent_tail(usize::MAX);
            handle.send_line(TAKEOVER_NOTICE);
            handle.close();
        }
        driver.world.connections.remove(old);
        info!(player = %name, old = %old, new = %new_conn, "session taken over");
    } else {
        // LIMBO: the fresh login supersedes the grace window.
        driver
            .world
            .scheduler
            .cancel_timer(&TimerId::disconnect(key));
        if let Some(entry) = driver.world.players.get_mut(key) {
            captured = std::mem::take(&mut entry.pending_replay);
        }
        place_player(driver, player, previous_location);
        info!(player = %name, new = %new_conn, "limbo session reclaimed by login");
    }

    if let Some(entry) = driver.world.players.get_mut(key) {
        entry.connection = Some(new_conn);
    }
    driver
        .world
        .bind_connection(new_conn, BoundHandler::Player(player));
    if let Some(handle) = driver.world.connections.get_mut(new_conn) {
        handle.seed_recent(captured);
    }

    driver.world.send(player, &format!("Welcome back, {name}."));
    builtins::send_look(&mut driver.world, player);
    issue_token(driver, new_conn, &name);
}

/// ACTIVE → LIMBO on socket drop: snapshot the location, announce the
/// fade, park in the void, start the grace timer, persist.
pub fn handle_disconnect(driver: &mut Driver, conn: ConnectionId) {
    driver.login.forget(conn);
    let Some(handle) = driver.world.connections.remove(conn) else {
        return;
    };
    let BoundHandler::Player(player) = handle.handler else {
        info!(%conn, "unauthenticated connection closed");
        return;
    };

    let key = {
        let Some(entry) = driver.world.players.get_by_object(player) else {
            // Clean quit already retired the player.
            return;
        };
        if entry.connection != Some(conn) {
            // Stale close racing a takeover; the session lives on.
            return;
        }
        entry.key()
    };

    let location = driver.world.environment_path(player);
    let room = driver.world.registry.get(player).and_then(|o| o.environment);
    let name = driver
        .world
        .players
        .get(&key)
        .map(|entry| entry.name.clone())
        .unwrap_or_default();

    if let Some(entry) = driver.world.players.get_mut(&key) {
        entry.connection = None;
        entry.pending_replay = handle.recent_tail(usize::MAX);
        if location.is_some() {
            entry.previous_location = location.clone();
        }
    }

    if let Some(room) = room {
        driver
            .world
            .broadcast_room(room, &format!("{name} fades from view."), &[player]);
    }

    match driver.world.void() {
        Ok(void) => {
            let _ = driver.world.move_object(player, void);
        }
        Err(e) => warn!(error = %e, "void unavailable for limbo parking"),
    }

    let window = Duration::from_millis(driver.world.config.disconnect.window_ms());
    let now = driver.world.now();
    driver
        .world
        .scheduler
        .set_timer(TimerId::disconnect(&key), window, now);

    if let Err(e) = driver.world.save_player(player) {
        warn!(player = %name, error = %e, "limbo save failed");
    }

    info!(player = %name, grace_ms = window.as_millis() as u64, "player in limbo");
}

/// LIMBO → ACTIVE via a `session_resume` envelope. Failures answer
/// `session_invalid` only; the connection falls through to normal
/// login.
pub fn handle_resume(driver: &mut Driver, conn: ConnectionId, token: &str) {
    let Some(remote_ip) = driver
        .world
        .connections
        .get(conn)
        .map(|handle| handle.remote_ip())
    else {
        return;
    };
    let now_ms = driver.world.epoch_ms();

    let claims = match driver.world.sessions.validate(token, &remote_ip, now_ms) {
        Ok(claims) => claims,
        Err(e) => {
            send_invalid(driver, conn, &e);
            return;
        }
    };

    let key = player_key(&claims.name);
    let (player, name, old_conn, previous_location) = {
        let Some(entry) = driver.world.players.get(&key) else {
            send_invalid(driver, conn, &TokenError::Unknown);
            return;
        };
        (
            entry.object,
            entry.name.clone(),
            entry.connection,
            entry.previous_location.clone(),
        )
    };

    // A still-bound connection loses to the resume, same as takeover.
    if let Some(old) = old_conn {
        if old != conn {
            if let Some(handle) = driver.world.connections.get_mut(old) {
                handle.send_line(TAKEOVER_NOTICE);
                handle.close();
            }
            driver.world.connections.remove(old);
        }
    }

    driver
        .world
        .scheduler
        .cancel_timer(&TimerId::disconnect(&key));

    place_player(driver, player, previous_location);

    let pending = driver
        .world
        .players
        .get_mut(&key)
        .map(|entry| {
            entry.connection = Some(conn);
            std::mem::take(&mut entry.pending_replay)
        })
        .unwrap_or_default();
    driver
        .world
        .bind_connection(conn, BoundHandler::Player(player));
    driver.login.forget(conn);

    if let Some(handle) = driver.world.connections.get_mut(conn) {
        handle.send_envelope(&ServerEnvelope::SessionResume { success: true });
    }
    issue_token(driver, conn, &name);

    if !pending.is_empty() {
        let cap = driver.world.config.replay.cap;
        let skip = pending.len().saturating_sub(cap);
        driver.world.send(player, REPLAY_START);
        for line in pending.into_iter().skip(skip) {
            driver.world.send(player, &line);
        }
        driver.world.send(player, REPLAY_END);
    }

    builtins::send_look(&mut driver.world, player);
    info!(player = %name, %conn, "session resumed");
}

/// LIMBO → GONE: the grace window lapsed. Save, unregister, destroy.
pub fn limbo_expired(driver: &mut Driver, key: &str) {
    let (player, name) = {
        let Some(entry) = driver.world.players.get(key) else {
            return;
        };
        if entry.connection.is_some() {
            // Resumed before the stale timer drained; nothing to do.
            return;
        }
        (entry.object, entry.name.clone())
    };

    if let Err(e) = driver.world.save_player(player) {
        warn!(player = %name, error = %e, "final save failed");
    }
    match driver.world.destruct(player, true) {
        Ok(removed) => {
            info!(player = %name, removed, "limbo player retired");
        }
        Err(e) => warn!(player = %name, error = %e, "limbo destroy failed"),
    }
}

/// Issue a fresh session token and push it as an envelope.
pub fn issue_token(driver: &mut Driver, conn: ConnectionId, name: &str) {
    let Some(remote_ip) = driver
        .world
        .connections
        .get(conn)
        .map(|handle| handle.remote_ip())
    else {
        return;
    };
    let now_ms = driver.world.epoch_ms();
    let issued = driver
        .world
        .sessions
        .create_token(name, conn, &remote_ip, now_ms);
    if let Some(handle) = driver.world.connections.get_mut(conn) {
        handle.send_envelope(&ServerEnvelope::SessionToken {
            token: issued.token,
            expires_at: issued.expires_at_ms,
        });
    }
}

fn send_invalid(driver: &mut Driver, conn: ConnectionId, error: &TokenError) {
    info!(%conn, error = %error, "session resume rejected");
    if let Some(handle) = driver.world.connections.get_mut(conn) {
        handle.send_envelope(&ServerEnvelope::SessionInvalid {
            reason: error.to_string(),
        });
    }
}

/// Drop a player into their previous location, the master's start
/// room, or the void; first of those that resolves.
fn place_player(driver: &mut Driver, player: loam_core::ObjectId, previous: Option<VirtualPath>) {
    let start = driver
        .master
        .as_ref()
        .and_then(|master| master.start_location().cloned());
    for candidate in previous.into_iter().chain(start) {
        if let Ok(room) = driver.world.load_object(&candidate) {
            if driver.world.move_object(player, room).is_ok() {
                return;
            }
        }
    }
    if let Ok(void) = driver.world.void() {
        let _ = driver.world.move_object(player, void);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
