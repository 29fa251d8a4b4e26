// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::vp;

#[test]
fn unknown_users_are_players() {
    let store = PermissionStore::new();
    assert_eq!(store.level_of("nobody"), Level::Player);
    assert!(store.domains("nobody").is_empty());
}

#[test]
fn grant_and_revoke() {
    let mut store = PermissionStore::new();
    store.grant("alice", Level::Builder);
    assert_eq!(store.level_of("alice"), Level::Builder);

    assert!(store.revoke("alice"));
    assert_eq!(store.level_of("alice"), Level::Player);
    assert!(!store.revoke("alice"));
}

#[test]
fn domains_are_sorted_and_duplicate_free() {
    let mut store = PermissionStore::new();
    store.grant("alice", Level::Builder);
    store.add_domain("alice", "/areas/valdoria").unwrap();
    store.add_domain("alice", "/areas/ashford").unwrap();
    assert_eq!(
        store.domains("alice"),
        ["/areas/ashford", "/areas/valdoria"]
    );

    assert!(matches!(
        store.add_domain("alice", "/areas/valdoria/"),
        Err(EfunError::Conflict(_))
    ));
}

#[test]
fn remove_missing_domain_is_not_found() {
    let mut store = PermissionStore::new();
    store.grant("alice", Level::Builder);
    assert!(matches!(
        store.remove_domain("alice", "/areas/valdoria"),
        Err(EfunError::NotFound(_))
    ));
    assert!(matches!(
        store.remove_domain("ghost", "/areas/valdoria"),
        Err(EfunError::NotFound(_))
    ));
}

#[test]
fn admin_writes_anywhere() {
    let mut store = PermissionStore::new();
    store.grant("root", Level::Administrator);
    store
        .authorize_write("root", "write_file", &vp("/std/room"), 1)
        .unwrap();
}

#[test]
fn builder_writes_only_inside_domains() {
    let mut store = PermissionStore::new();
    store.grant("alice", Level::Builder);
    store.add_domain("alice", "/areas/valdoria").unwrap();

    store
        .authorize_write("alice", "write_file", &vp("/areas/valdoria/inn"), 1)
        .unwrap();
    assert!(matches!(
        store.authorize_write("alice", "write_file", &vp("/std/room"), 2),
        Err(EfunError::PermissionDenied(_))
    ));
    // boundary at '/': valdoria2 is not inside /areas/valdoria
    assert!(store
        .authorize_write("alice", "write_file", &vp("/areas/valdoria2/inn"), 3)
        .is_err());
}

#[test]
fn ungranted_user_is_denied() {
    let mut store = PermissionStore::new();
    assert!(store
        .authorize_write("nobody", "write_file", &vp("/areas/x"), 1)
        .is_err());
}

#[test]
fn every_decision_is_audited() {
    let mut store = PermissionStore::new();
    store.grant("alice", Level::Builder);
    store.add_domain("alice", "/areas/valdoria").unwrap();

    store
        .authorize_write("alice", "write_file", &vp("/areas/valdoria/inn"), 10)
        .unwrap();
    let _ = store.authorize_write("alice", "write_file", &vp("/std/room"), 11);

    let tail = store.audit_tail(10);
    assert_eq!(tail.len(), 2);
    assert!(tail[0].success);
    assert_eq!(tail[0].target, "/areas/valdoria/inn");
    assert!(!tail[1].success);
    assert_eq!(tail[1].actor, "alice");
    assert_eq!(tail[1].at_ms, 11);
}

#[test]
fn audit_ring_is_bounded() {
    let mut store = PermissionStore::new();
    for i in 0..1500 {
        let _ = store.authorize_write("nobody", "write_file", &vp("/std/x"), i);
    }
    assert_eq!(store.audit_len(), 1000);
    let tail = store.audit_tail(1);
    assert_eq!(tail[0].at_ms, 1499, "newest entries survive");
}

#[test]
fn snapshot_round_trip_keeps_grants_and_tail() {
    let mut store = PermissionStore::new();
    store.grant("alice", Level::SeniorBuilder);
    store.add_domain("alice", "/areas/valdoria").unwrap();
    for i in 0..300 {
        let _ = store.authorize_write("alice", "write_file", &vp("/areas/valdoria/inn"), i);
    }

    let file = store.to_file();
    assert_eq!(file.audit.len(), 200, "snapshot carries a bounded tail");

    let restored = PermissionStore::from_file(Some(file));
    assert_eq!(restored.level_of("alice"), Level::SeniorBuilder);
    assert_eq!(restored.domains("alice"), ["/areas/valdoria"]);
    assert_eq!(restored.audit_len(), 200);
}

#[test]
fn dirty_flag_tracks_changes() {
    let mut store = PermissionStore::new();
    assert!(!store.take_dirty());
    store.grant("alice", Level::Builder);
    assert!(store.take_dirty());
    assert!(!store.take_dirty(), "flag clears on take");
}

#[test]
fn root_domain_covers_everything() {
    let mut store = PermissionStore::new();
    store.grant("keeper", Level::Builder);
    store.add_domain("keeper", "/").unwrap();
    store
        .authorize_write("keeper", "write_file", &vp("/anything/at/all"), 1)
        .unwrap();
}
