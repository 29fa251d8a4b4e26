//! Permission-gated writes and the audit trail.
//!
//! These drive the efun surface through the library API against a
//! started (but not socket-driven) driver, where the filesystem and
//! audit effects are directly observable.

use crate::prelude::*;
use loam_core::{Level, VirtualPath};
use loam_daemon::Driver;
use loam_engine::{ActorContext, EfunError, PlayerEntry};
use std::collections::HashMap;

async fn builder_driver() -> (tempfile::TempDir, Driver, loam_core::ObjectId) {
    let (dir, config) = spec_config();
    let mut driver = Driver::new(config);
    driver.start().await.expect("driver start");

    let player_path = VirtualPath::new("/std/player").unwrap();
    let player = driver.world.clone_object(&player_path).unwrap();
    driver
        .world
        .players
        .insert(PlayerEntry {
            name: "Alice".to_string(),
            object: player,
            level: Level::Builder,
            connection: None,
            previous_location: None,
            pending_replay: Vec::new(),
            aliases: HashMap::new(),
        })
        .unwrap();
    driver.world.permissions.grant("alice", Level::Builder);
    driver
        .world
        .permissions
        .add_domain("alice", "/areas/valdoria")
        .unwrap();
    driver.world.context.push(ActorContext::for_player(player));
    (dir, driver, player)
}

#[tokio::test]
async fn write_inside_domain_succeeds_with_a_true_audit_entry() {
    let (_dir, mut driver, _player) = builder_driver().await;

    let path = VirtualPath::new("/areas/valdoria/inn.hcl").unwrap();
    driver
        .world
        .write_file(&path, "object \"inn\" { kind = \"room\" }\n")
        .await
        .unwrap();

    let on_disk = driver
        .world
        .loader
        .root()
        .join("areas/valdoria/inn.hcl");
    assert!(on_disk.is_file());

    let tail = driver.world.permissions.audit_tail(1);
    assert!(tail[0].success);
    assert_eq!(tail[0].actor, "alice");
    assert_eq!(tail[0].target, "/areas/valdoria/inn.hcl");

    driver.stop();
}

#[tokio::test]
async fn write_outside_domain_is_denied_audited_and_leaves_no_file() {
    let (_dir, mut driver, _player) = builder_driver().await;

    let path = VirtualPath::new("/std/room.hcl").unwrap();
    let result = driver.world.write_file(&path, "object \"room\" {}\n").await;
    assert!(matches!(result, Err(EfunError::PermissionDenied(_))));

    // No mutation: the stock source is untouched
    let on_disk = driver.world.loader.root().join("std/room.hcl");
    let content = std::fs::read_to_string(on_disk).unwrap();
    assert!(content.contains("a bare room"));

    let tail = driver.world.permissions.audit_tail(1);
    assert!(!tail[0].success);
    assert_eq!(tail[0].actor, "alice");

    // The driver keeps serving: a legal write still works afterwards
    let legal = VirtualPath::new("/areas/valdoria/shed.hcl").unwrap();
    driver
        .world
        .write_file(&legal, "object \"shed\" {}\n")
        .await
        .unwrap();

    driver.stop();
}

#[tokio::test]
async fn audit_survives_the_periodic_flush_into_the_snapshot() {
    let (_dir, mut driver, _player) = builder_driver().await;

    let path = VirtualPath::new("/areas/valdoria/inn.hcl").unwrap();
    driver.world.write_file(&path, "x").await.unwrap();

    // stop() flushes the permissions snapshot
    driver.stop();

    let snapshot = loam_storage::load_permissions(&driver.world.store)
        .unwrap()
        .expect("snapshot written");
    assert!(snapshot.users.contains_key("alice"));
    assert!(snapshot
        .audit
        .iter()
        .any(|entry| entry.target == "/areas/valdoria/inn.hcl" && entry.success));
}
