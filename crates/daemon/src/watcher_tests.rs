// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use loam_core::Event;
use std::time::Duration;
use tokio::sync::mpsc;

/// Wait for a matching event, tolerating platform-specific extras
/// (editors and backends emit create+modify storms).
async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<Event>,
    mut predicate: impl FnMut(&Event) -> bool,
) -> Option<Event> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) => {
                if predicate(&event) {
                    return Some(event);
                }
            }
            _ => return None,
        }
    }
}

#[tokio::test]
async fn modification_emits_source_modified() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("std").join("room.hcl");
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, "object \"room\" {}\n").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _watcher = MudlibWatcher::start(dir.path(), tx).unwrap();
    // allow the backend to arm
    tokio::time::sleep(Duration::from_millis(200)).await;

    std::fs::write(&file, "object \"room\" { short = \"a room\" }\n").unwrap();

    let event = wait_for(&mut rx, |event| {
        matches!(event, Event::SourceModified { path } if path.as_str() == "/std/room")
    })
    .await;
    assert!(event.is_some(), "expected a SourceModified for /std/room");
}

#[tokio::test]
async fn deletion_emits_source_removed() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("std").join("gone.hcl");
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, "object \"gone\" {}\n").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _watcher = MudlibWatcher::start(dir.path(), tx).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    std::fs::remove_file(&file).unwrap();

    let event = wait_for(&mut rx, |event| {
        matches!(event, Event::SourceRemoved { path } if path.as_str() == "/std/gone")
    })
    .await;
    assert!(event.is_some(), "expected a SourceRemoved for /std/gone");
}

#[tokio::test]
async fn watcher_stops_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("room.hcl");
    std::fs::write(&file, "object \"room\" {}\n").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let watcher = MudlibWatcher::start(dir.path(), tx).unwrap();
    drop(watcher);
    tokio::time::sleep(Duration::from_millis(100)).await;

    std::fs::write(&file, "object \"room\" { short = \"x\" }\n").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err(), "no events after drop");
}
