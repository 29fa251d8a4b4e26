// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for daemon tests: a started driver over a demo
//! mudlib in a temp directory, plus fake connections driven by events.

use crate::driver::Driver;
use loam_core::{ConnectionId, Event, MudConfig, VirtualPath};
use loam_engine::OutMsg;
use tokio::sync::mpsc;

pub const TEST_MUDLIB: &[(&str, &str)] = &[
    (
        "secure/master.hcl",
        r#"
object "master" {
  kind     = "daemon"
  short    = "the master"
  preload  = ["/areas/square"]
  safelist = ["/areas/square"]
  props    = { start = "/areas/square" }
}
"#,
    ),
    (
        "std/void.hcl",
        r#"
object "void" {
  kind  = "room"
  short = "The Void"
  long  = "A featureless nothing between places."
}
"#,
    ),
    (
        "std/player.hcl",
        r#"
object "player" {
  short = "an adventurer"
}
"#,
    ),
    (
        "areas/square.hcl",
        r#"
object "square" {
  kind  = "room"
  short = "Town Square"
  long  = "The cobbled heart of town."
  exits = { north = "/areas/inn" }
}
"#,
    ),
    (
        "areas/inn.hcl",
        r#"
object "inn" {
  kind  = "room"
  short = "The Inn"
  exits = { south = "/areas/square" }
}
"#,
    ),
    (
        "cmds/ponder.hcl",
        r#"
command "ponder" {
  aliases = ["think"]
  actions = [
    { tell = { target = "player", message = "You ponder." } },
  ]
}
"#,
    ),
    (
        "soul/core.hcl",
        r#"
emote "smile" {
  you  = "You smile."
  room = "${player} smiles."
}
"#,
    ),
];

pub struct Fixture {
    #[allow(dead_code)]
    pub dir: tempfile::TempDir,
    pub driver: Driver,
}

/// Write a mudlib tree and return a config rooted on it with an
/// ephemeral port and a short disconnect window.
pub fn test_config(files: &[(&str, &str)]) -> (tempfile::TempDir, MudConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mudlib = dir.path().join("mudlib");
    for (rel, content) in files {
        let path = mudlib.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("source dir");
        }
        std::fs::write(path, content).expect("source file");
    }

    let mut config = MudConfig {
        mudlib_path: mudlib,
        data_path: dir.path().join("data"),
        port: 0,
        ..MudConfig::default()
    };
    config.disconnect.timeout_ms = Some(200);
    config.normalize();
    (dir, config)
}

/// A started driver over the standard test mudlib.
pub async fn started_driver() -> Fixture {
    started_driver_with(TEST_MUDLIB).await
}

pub async fn started_driver_with(files: &[(&str, &str)]) -> Fixture {
    let (dir, config) = test_config(files);
    let mut driver = Driver::new(config);
    driver.start().await.expect("driver start");
    Fixture { dir, driver }
}

/// Register a fake connection (no socket) and run the login greeting.
pub fn connect(driver: &mut Driver, port: u16) -> (ConnectionId, mpsc::UnboundedReceiver<OutMsg>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let remote = format!("127.0.0.1:{port}").parse().expect("addr");
    let cap = driver.world.config.replay.buffer;
    let conn = driver.world.connections.register(remote, tx, cap);
    driver.login.greet(&mut driver.world, conn);
    (conn, rx)
}

/// Feed one input line through the event path.
pub fn line(driver: &mut Driver, conn: ConnectionId, text: &str) {
    driver.handle_event(Event::Line {
        conn,
        line: text.to_string(),
    });
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<OutMsg>) -> Vec<OutMsg> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

pub fn drain_lines(rx: &mut mpsc::UnboundedReceiver<OutMsg>) -> Vec<String> {
    drain(rx)
        .into_iter()
        .filter_map(|msg| match msg {
            OutMsg::Line(text) => Some(text),
            _ => None,
        })
        .collect()
}

/// OOB frames only, decoded to JSON payloads.
pub fn drain_oob(rx: &mut mpsc::UnboundedReceiver<OutMsg>) -> Vec<serde_json::Value> {
    drain(rx)
        .into_iter()
        .filter_map(|msg| match msg {
            OutMsg::Oob(frame) => {
                let end = frame.find(']')?;
                serde_json::from_str(&frame[end + 1..]).ok()
            }
            _ => None,
        })
        .collect()
}

/// Register a brand-new player through the line protocol.
pub fn register_player(
    driver: &mut Driver,
    conn: ConnectionId,
    rx: &mut mpsc::UnboundedReceiver<OutMsg>,
    name: &str,
    password: &str,
) {
    line(driver, conn, name);
    line(driver, conn, password);
    line(driver, conn, password);
    let _ = drain(rx);
}

pub fn vp(path: &str) -> VirtualPath {
    VirtualPath::new(path).expect("valid test path")
}
