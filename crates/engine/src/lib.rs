// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! loam-engine: the world the driver orchestrates.
//!
//! Owns the object registry, the blueprint loader, the cooperative
//! scheduler, the connection and player tables, permissions, session
//! tokens, and the efun surface the mudlib sees. Everything here is
//! mutated from the driver's single engine-loop task; connection I/O
//! tasks only ever hold outbound channel senders.

#[cfg(test)]
pub(crate) mod test_support;

mod command;
mod connection;
mod context;
mod efuns;
mod error;
mod hooks;
mod loader;
mod permissions;
mod players;
mod registry;
mod scheduler;
mod session;
mod world;

pub use command::{CommandBody, CommandManager, CommandSpec, Resolution};
pub use connection::{BoundHandler, ConnectionHandle, ConnectionTable, OutMsg};
pub use context::{ActorContext, ContextStack};
pub use efuns::{DirEntry, FileStat, ReloadOutcome};
pub use error::EfunError;
pub use loader::Loader;
pub use permissions::PermissionStore;
pub use players::{ActivePlayers, PlayerEntry};
pub use registry::{Blueprint, LiveObject, Registry};
pub use scheduler::{CalloutPayload, Fired, Scheduler};
pub use session::{IssuedToken, SessionClaims, SessionManager, TokenError};
pub use world::World;
