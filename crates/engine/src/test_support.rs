// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::connection::OutMsg;
use crate::players::PlayerEntry;
use crate::world::World;
use loam_core::{ConnectionId, FakeClock, Level, MudConfig, ObjectId, VirtualPath};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// A world over temp directories with a controllable clock.
pub struct Fixture {
    // Held for its Drop; the directories live as long as the fixture.
    #[allow(dead_code)]
    pub dir: tempfile::TempDir,
    pub world: World<FakeClock>,
    pub clock: FakeClock,
}

/// Build a world whose mudlib contains the given `(relative path,
/// content)` source files.
pub fn world_with(files: &[(&str, &str)]) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let mudlib = dir.path().join("mudlib");
    let data = dir.path().join("data");
    std::fs::create_dir_all(&mudlib).expect("mudlib dir");
    std::fs::create_dir_all(&data).expect("data dir");

    for (rel, content) in files {
        let path = mudlib.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("source dir");
        }
        std::fs::write(path, content).expect("source file");
    }

    let mut config = MudConfig {
        mudlib_path: mudlib,
        data_path: data,
        ..MudConfig::default()
    };
    config.normalize();

    let clock = FakeClock::new();
    Fixture {
        dir,
        world: World::new(config, clock.clone()),
        clock,
    }
}

pub fn vp(path: &str) -> VirtualPath {
    VirtualPath::new(path).expect("valid test path")
}

/// Register a connection and return its id plus the outbound receiver.
pub fn connect(
    world: &mut World<FakeClock>,
    port: u16,
) -> (ConnectionId, mpsc::UnboundedReceiver<OutMsg>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let remote = format!("127.0.0.1:{port}").parse().expect("socket addr");
    let cap = world.config.replay.buffer;
    let conn = world.connections.register(remote, tx, cap);
    (conn, rx)
}

/// Drain a connection's outbound queue into plain strings.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<OutMsg>) -> Vec<OutMsg> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

/// Text lines only, dropping OOB frames and close markers.
pub fn drain_lines(rx: &mut mpsc::UnboundedReceiver<OutMsg>) -> Vec<String> {
    drain(rx)
        .into_iter()
        .filter_map(|msg| match msg {
            OutMsg::Line(line) => Some(line),
            _ => None,
        })
        .collect()
}

/// Insert an active player backed by an existing object.
pub fn add_player(
    world: &mut World<FakeClock>,
    name: &str,
    object: ObjectId,
    level: Level,
    connection: Option<ConnectionId>,
) {
    world
        .players
        .insert(PlayerEntry {
            name: name.to_string(),
            object,
            level,
            connection,
            previous_location: None,
            pending_replay: Vec::new(),
            aliases: HashMap::new(),
        })
        .expect("player entry");
    if let Some(conn) = connection {
        world
            .bind_connection(conn, crate::connection::BoundHandler::Player(object));
    }
}

/// The standard minimal mudlib most world tests start from.
pub const BASIC_MUDLIB: &[(&str, &str)] = &[
    (
        "std/void.hcl",
        r#"
object "void" {
  kind  = "room"
  short = "The Void"
  long  = "A featureless nothing."
}
"#,
    ),
    (
        "std/player.hcl",
        r#"
object "player" {
  short = "a player"
}
"#,
    ),
    (
        "std/room.hcl",
        r#"
object "room" {
  kind  = "room"
  short = "a bare room"
}
"#,
    ),
    (
        "std/torch.hcl",
        r#"
object "torch" {
  short = "a torch"
  props = { lit = false }
}
"#,
    ),
];
