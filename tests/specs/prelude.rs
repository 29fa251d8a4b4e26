//! Test helpers for behavioral specifications.
//!
//! Boots an in-process driver over a temp mudlib and exposes a small
//! client DSL over real TCP sockets.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use loam_core::{Event, MudConfig};
use loam_daemon::Driver;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;

/// Per-read timeout; specs fail fast instead of hanging.
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Disconnect grace window used by the spec worlds.
pub const GRACE_MS: u64 = 300;

const DEMO_MUDLIB: &[(&str, &str)] = &[
    (
        "secure/master.hcl",
        r#"
object "master" {
  kind     = "daemon"
  short    = "the master"
  preload  = ["/areas/town/square", "/areas/town/inn"]
  safelist = ["/areas/town/square"]
  props    = { start = "/areas/town/square" }
}
"#,
    ),
    (
        "std/void.hcl",
        r#"
object "void" {
  kind  = "room"
  short = "The Void"
  long  = "A featureless grey nothing."
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
        "std/room.hcl",
        r#"
object "room" {
  kind  = "room"
  short = "a bare room"
}
"#,
    ),
    (
        "areas/town/square.hcl",
        r#"
object "square" {
  kind  = "room"
  short = "Town Square"
  long  = "The cobbled heart of town."
  exits = { north = "/areas/town/inn" }
}
"#,
    ),
    (
        "areas/town/inn.hcl",
        r#"
object "inn" {
  kind  = "room"
  short = "The Inn"
  exits = { south = "/areas/town/square" }
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

/// A running driver on an ephemeral port over a temp mudlib.
pub struct TestMud {
    pub dir: tempfile::TempDir,
    pub addr: SocketAddr,
    tx: UnboundedSender<Event>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestMud {
    pub async fn shutdown(self) {
        let _ = self.tx.send(Event::Shutdown);
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Config over a freshly written demo mudlib, ephemeral port, short
/// grace window.
pub fn spec_config() -> (tempfile::TempDir, MudConfig) {
    let dir = tempfile::tempdir().unwrap();
    let mudlib = dir.path().join("mudlib");
    for (rel, content) in DEMO_MUDLIB {
        let path = mudlib.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    let mut config = MudConfig {
        mudlib_path: mudlib,
        data_path: dir.path().join("data"),
        port: 0,
        // First account registered in a spec world runs it.
        bootstrap_admin: true,
        ..MudConfig::default()
    };
    config.disconnect.timeout_ms = Some(GRACE_MS);
    config.normalize();
    (dir, config)
}

/// Boot a full driver with a fast timer tick and run it in the
/// background.
pub async fn boot_mud() -> TestMud {
    // The tick loop resolution gates how fast grace timers fire.
    std::env::set_var("LOAM_TICK_MS", "25");

    let (dir, config) = spec_config();
    let mut driver = Driver::new(config);
    driver.start().await.expect("driver start");
    let addr = driver.local_addr().expect("bound addr");
    let tx = driver.sender();
    let handle = tokio::spawn(async move {
        let _ = driver.run().await;
    });
    TestMud {
        dir,
        addr,
        tx,
        handle,
    }
}

/// A line-protocol client.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Client {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read_half, write_half) = stream.into_split();
        Client {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("send");
    }

    /// Send a raw frame (OOB prefixes included).
    pub async fn send_frame(&mut self, frame: &str) {
        self.writer
            .write_all(format!("{frame}\r\n").as_bytes())
            .await
            .expect("send frame");
    }

    /// Next line (OOB frames included), or `None` on EOF/timeout.
    pub async fn recv(&mut self) -> Option<String> {
        let mut buf = String::new();
        match tokio::time::timeout(READ_TIMEOUT, self.reader.read_line(&mut buf)).await {
            Ok(Ok(0)) => None,
            Ok(Ok(_)) => Some(buf.trim_end_matches(['\r', '\n']).to_string()),
            _ => None,
        }
    }

    /// Read until a line contains `needle`; panics on EOF/timeout.
    pub async fn expect(&mut self, needle: &str) -> String {
        loop {
            match self.recv().await {
                Some(line) if line.contains(needle) => return line,
                Some(_) => continue,
                None => panic!("connection ended while waiting for {needle:?}"),
            }
        }
    }

    /// Read until an OOB envelope of the given type arrives.
    pub async fn expect_oob(&mut self, type_name: &str) -> serde_json::Value {
        loop {
            let Some(line) = self.recv().await else {
                panic!("connection ended while waiting for oob {type_name:?}");
            };
            if let Some(payload) = parse_oob_frame(&line) {
                if payload["type"] == type_name {
                    return payload;
                }
            }
        }
    }

    /// The connection should close without further text lines of
    /// interest.
    pub async fn expect_eof(&mut self) {
        for _ in 0..50 {
            if self.recv().await.is_none() {
                return;
            }
        }
        panic!("connection did not close");
    }

    /// Register a brand-new account and wait for the welcome.
    pub async fn register(&mut self, name: &str, password: &str) {
        self.expect("By what name are you known?").await;
        self.send(name).await;
        self.expect("Choose a password").await;
        self.send(password).await;
        self.expect("Again").await;
        self.send(password).await;
        self.expect("Welcome,").await;
    }

    /// Log into an existing account and wait for the welcome-back.
    pub async fn login(&mut self, name: &str, password: &str) {
        self.expect("By what name are you known?").await;
        self.send(name).await;
        self.expect("Password:").await;
        self.send(password).await;
        self.expect("Welcome back,").await;
    }
}

/// Decode `\x00[TAG]{json}` into the JSON payload.
pub fn parse_oob_frame(line: &str) -> Option<serde_json::Value> {
    let rest = line.strip_prefix('\u{0}')?;
    let end = rest.find(']')?;
    serde_json::from_str(&rest[end + 1..]).ok()
}
