// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The login daemon: session authority for unauthenticated
//! connections.
//!
//! Speaks two protocols: the classic line prompt (name → password,
//! with inline registration) and the `[AUTH_REQ]` JSON path for GUI
//! clients. Either way, success hands a verified
//! [`PlayerRecord`] back to the driver for binding.

use loam_core::{AuthRequest, ConnectionId, ServerEnvelope, SystemClock};
use loam_engine::World;
use loam_storage::{load_player, save_player, valid_player_name, PlayerRecord};
use std::collections::HashMap;
use tracing::{info, warn};

const MIN_PASSWORD_LEN: usize = 6;

const BANNER: [&str; 3] = [
    "{bold}Welcome to Loam.{/}",
    "A small world, still warm from the forge.",
    "",
];

/// Per-connection login progress.
#[derive(Debug, Clone)]
enum LoginState {
    AskName,
    AskPassword { record: Box<PlayerRecord> },
    NewPassword { name: String },
    ConfirmPassword { name: String, first: String },
}

/// Authentication outcome: the verified record, and whether the
/// account was created just now.
pub type Authenticated = (PlayerRecord, bool);

/// Session authority for pre-auth connections.
#[derive(Debug, Default)]
pub struct LoginDaemon {
    states: HashMap<ConnectionId, LoginState>,
}

impl LoginDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Greet a fresh connection and start the name prompt.
    pub fn greet(&mut self, world: &mut World<SystemClock>, conn: ConnectionId) {
        for line in BANNER {
            world.tell_connection(conn, line);
        }
        world.tell_connection(conn, "By what name are you known?");
        self.states.insert(conn, LoginState::AskName);
    }

    /// Drop a connection's login state (bound or gone).
    pub fn forget(&mut self, conn: ConnectionId) {
        self.states.remove(&conn);
    }

    /// Handle one line from an unauthenticated connection.
    pub fn handle_line(
        &mut self,
        world: &mut World<SystemClock>,
        conn: ConnectionId,
        line: &str,
    ) -> Option<Authenticated> {
        let state = self.states.remove(&conn).unwrap_or(LoginState::AskName);
        let input = line.trim();

        match state {
            LoginState::AskName => {
                self.step_name(world, conn, input);
                None
            }

            LoginState::AskPassword { record } => {
                if record.verify_password(input) {
                    info!(player = %record.name, "authenticated");
                    Some((*record, false))
                } else {
                    world.tell_connection(conn, "Wrong password.");
                    world.tell_connection(conn, "By what name are you known?");
                    self.states.insert(conn, LoginState::AskName);
                    None
                }
            }

            LoginState::NewPassword { name } => {
                if input.len() < MIN_PASSWORD_LEN {
                    world.tell_connection(
                        conn,
                        "Too short. Choose a password of at least 6 characters:",
                    );
                    self.states.insert(conn, LoginState::NewPassword { name });
                } else {
                    world.tell_connection(conn, "Again, to be sure:");
                    self.states.insert(
                        conn,
                        LoginState::ConfirmPassword {
                            name,
                            first: input.to_string(),
                        },
                    );
                }
                None
            }

            LoginState::ConfirmPassword { name, first } => {
                if input != first {
                    world.tell_connection(conn, "The passwords do not match.");
                    world.tell_connection(conn, "Choose a password:");
                    self.states.insert(conn, LoginState::NewPassword { name });
                    return None;
                }
                match self.create_account(world, &name, &first, None, None) {
                    Ok(record) => Some((record, true)),
                    Err(message) => {
                        world.tell_connection(conn, &message);
                        world.tell_connection(conn, "By what name are you known?");
                        self.states.insert(conn, LoginState::AskName);
                        None
                    }
                }
            }
        }
    }

    fn step_name(&mut self, world: &mut World<SystemClock>, conn: ConnectionId, input: &str) {
        let name = pretty_name(input);
        if !valid_player_name(&name.to_lowercase()) {
            world.tell_connection(
                conn,
                "Names are 3-16 characters, letters first. Try another:",
            );
            self.states.insert(conn, LoginState::AskName);
            return;
        }

        match load_player(&world.store, &name) {
            Ok(Some(record)) => {
                world.tell_connection(conn, "Password:");
                self.states.insert(
                    conn,
                    LoginState::AskPassword {
                        record: Box::new(record),
                    },
                );
            }
            Ok(None) => {
                world.tell_connection(
                    conn,
                    &format!("{name}? A new face. Choose a password:"),
                );
                self.states.insert(conn, LoginState::NewPassword { name });
            }
            Err(e) => {
                warn!(error = %e, "player load failed during login");
                world.tell_connection(conn, "The vaults are jammed. Try again:");
                self.states.insert(conn, LoginState::AskName);
            }
        }
    }

    /// Handle a `[AUTH_REQ]` envelope. Responses go out as
    /// `auth_response` envelopes either way.
    pub fn handle_auth(
        &mut self,
        world: &mut World<SystemClock>,
        conn: ConnectionId,
        request: AuthRequest,
    ) -> Option<Authenticated> {
        match request {
            AuthRequest::Login { name, password } => {
                let (Some(name), Some(password)) = (name, password) else {
                    respond(world, conn, false, "name and password are required", None);
                    return None;
                };
                let name = pretty_name(&name);
                match load_player(&world.store, &name) {
                    Ok(Some(record)) if record.verify_password(&password) => {
                        respond(world, conn, true, "authenticated", Some(&record.name));
                        info!(player = %record.name, "authenticated via auth_req");
                        Some((record, false))
                    }
                    Ok(_) => {
                        respond(world, conn, false, "unknown name or wrong password", None);
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "player load failed during auth_req");
                        respond(world, conn, false, "storage failure; try again", None);
                        None
                    }
                }
            }

            AuthRequest::Register {
                name,
                password,
                confirm_password,
                email,
                gender,
            } => {
                let (Some(name), Some(password)) = (name, password) else {
                    respond(world, conn, false, "name and password are required", None);
                    return None;
                };
                let name = pretty_name(&name);
                if !valid_player_name(&name.to_lowercase()) {
                    respond(world, conn, false, "invalid name", None);
                    return None;
                }
                if password.len() < MIN_PASSWORD_LEN {
                    respond(world, conn, false, "password too short", None);
                    return None;
                }
                if confirm_password.as_deref() != Some(password.as_str()) {
                    respond(world, conn, false, "passwords do not match", None);
                    return None;
                }
                match self.create_account(world, &name, &password, email, gender) {
                    Ok(record) => {
                        respond(world, conn, true, "account created", Some(&record.name));
                        Some((record, true))
                    }
                    Err(message) => {
                        respond(world, conn, false, &message, None);
                        None
                    }
                }
            }
        }
    }

    fn create_account(
        &mut self,
        world: &mut World<SystemClock>,
        name: &str,
        password: &str,
        email: Option<String>,
        gender: Option<String>,
    ) -> Result<PlayerRecord, String> {
        // A save blob appearing mid-registration means the name is taken.
        match load_player(&world.store, name) {
            Ok(Some(_)) => return Err(format!("The name {name} is already taken.")),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "player probe failed during registration");
                return Err("The vaults are jammed. Try again later.".to_string());
            }
        }

        let now_ms = world.epoch_ms();
        let mut record = PlayerRecord::new(name, password, now_ms);
        record.email = email;
        record.gender = gender;
        if let Err(e) = save_player(&world.store, &record) {
            warn!(error = %e, "account save failed");
            return Err("The vaults are jammed. Try again later.".to_string());
        }
        info!(player = %name, "account created");
        Ok(record)
    }
}

fn respond(
    world: &mut World<SystemClock>,
    conn: ConnectionId,
    success: bool,
    message: &str,
    name: Option<&str>,
) {
    let envelope = ServerEnvelope::AuthResponse {
        success,
        message: message.to_string(),
        name: name.map(str::to_string),
    };
    if let Some(handle) = world.connections.get_mut(conn) {
        handle.send_envelope(&envelope);
    }
}

/// Canonical display form: first letter upper, rest lower.
pub fn pretty_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
