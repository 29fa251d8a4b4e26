// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    simple = { "bob", true },
    mixed = { "Bobby_Two", true },
    hyphen = { "old-bob", true },
    too_short = { "bo", false },
    too_long = { "abcdefghijklmnopq", false },
    digit_first = { "1bob", false },
    space = { "bob smith", false },
    symbols = { "bob!", false },
)]
fn name_policy(name: &str, expected: bool) {
    assert_eq!(valid_player_name(name), expected);
}

#[test]
fn key_and_path_are_case_folded() {
    assert_eq!(player_key("Alice"), "alice");
    assert_eq!(player_path("Alice"), "/data/players/alice.json");
}

#[test]
fn password_verification() {
    let record = PlayerRecord::new("bob", "hunter2", 1000);
    assert!(record.verify_password("hunter2"));
    assert!(!record.verify_password("hunter3"));
}

#[test]
fn set_password_rotates_salt() {
    let mut record = PlayerRecord::new("bob", "old", 1000);
    let old_salt = record.salt.clone();
    record.set_password("new");
    assert_ne!(record.salt, old_salt);
    assert!(record.verify_password("new"));
    assert!(!record.verify_password("old"));
}

#[test]
fn digest_depends_on_salt() {
    assert_ne!(
        digest_password("salt-a", "pw"),
        digest_password("salt-b", "pw")
    );
}

#[test]
fn save_load_round_trip_preserves_persisted_properties() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(dir.path());

    let mut record = PlayerRecord::new("Bob", "pw", 1000);
    record.level = Level::Builder;
    record.location = Some("/areas/town/square".to_string());
    record
        .props
        .insert("hp".to_string(), serde_json::json!(42));
    record
        .aliases
        .insert("l".to_string(), "look".to_string());
    record.inventory.push(InventoryEntry {
        path: "/std/torch".to_string(),
        props: BTreeMap::new(),
    });

    save_player(&store, &record).unwrap();
    let loaded = load_player(&store, "bob").unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn load_by_any_case_finds_the_same_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(dir.path());
    save_player(&store, &PlayerRecord::new("Alice", "pw", 0)).unwrap();
    assert!(load_player(&store, "ALICE").unwrap().is_some());
    assert!(load_player(&store, "alice").unwrap().is_some());
}

#[test]
fn missing_player_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(dir.path());
    assert!(load_player(&store, "ghost").unwrap().is_none());
}
