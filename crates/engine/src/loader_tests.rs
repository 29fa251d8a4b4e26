// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::vp;

fn loader_with(files: &[(&str, &str)]) -> (tempfile::TempDir, Loader) {
    let dir = tempfile::tempdir().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    let loader = Loader::new(dir.path());
    (dir, loader)
}

#[test]
fn reads_a_blueprint_definition() {
    let (_dir, loader) = loader_with(&[(
        "std/room.hcl",
        "object \"room\" {\n  kind = \"room\"\n  short = \"a room\"\n}\n",
    )]);
    let (def, hash) = loader.read_def(&vp("/std/room")).unwrap();
    assert_eq!(def.name, "room");
    assert_eq!(hash.len(), 64);
    assert!(loader.source_exists(&vp("/std/room")));
}

#[test]
fn missing_source_is_not_found() {
    let (_dir, loader) = loader_with(&[]);
    assert!(matches!(
        loader.read_def(&vp("/std/ghost")),
        Err(EfunError::NotFound(_))
    ));
    assert!(!loader.source_exists(&vp("/std/ghost")));
}

#[test]
fn broken_source_is_load_failure() {
    let (_dir, loader) = loader_with(&[("std/bad.hcl", "object \"bad\" {{{")]);
    assert!(matches!(
        loader.read_def(&vp("/std/bad")),
        Err(EfunError::LoadFailure { .. })
    ));
}

#[test]
fn two_objects_in_one_file_is_load_failure() {
    let (_dir, loader) = loader_with(&[(
        "std/twins.hcl",
        "object \"a\" {}\nobject \"b\" {}\n",
    )]);
    assert!(matches!(
        loader.read_def(&vp("/std/twins")),
        Err(EfunError::LoadFailure { .. })
    ));
}

#[test]
fn scan_commands_collects_and_isolates_failures() {
    let (_dir, loader) = loader_with(&[
        (
            "cmds/who.hcl",
            "command \"who\" {\n  aliases = [\"users\"]\n}\n",
        ),
        (
            "cmds/two.hcl",
            "command \"ping\" {}\ncommand \"pong\" {}\n",
        ),
        ("cmds/broken.hcl", "command \"x\" {{{"),
        ("cmds/sneaky.hcl", "object \"nope\" {}\n"),
    ]);

    let (defs, failures) = loader.scan_commands(&vp("/cmds"));
    let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["ping", "pong", "who"]);
    assert_eq!(failures.len(), 2, "broken and sneaky both recorded");
}

#[test]
fn scan_emotes_reads_the_soul() {
    let (_dir, loader) = loader_with(&[(
        "soul/core.hcl",
        concat!(
            "emote \"smile\" {\n  you = \"You smile.\"\n  room = \"${player} smiles.\"\n}\n",
            "emote \"nod\" {\n  you = \"You nod.\"\n  room = \"${player} nods.\"\n}\n",
        ),
    )]);
    let (defs, failures) = loader.scan_emotes(&vp("/soul"));
    assert!(failures.is_empty());
    let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["nod", "smile"]);
}
