// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use loam_core::ObjectId;

fn table_with_conn(cap: usize) -> (ConnectionTable, ConnectionId, mpsc::UnboundedReceiver<OutMsg>) {
    let mut table = ConnectionTable::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = table.register("127.0.0.1:4100".parse().unwrap(), tx, cap);
    (table, conn, rx)
}

#[test]
fn new_connections_start_at_login() {
    let (table, conn, _rx) = table_with_conn(10);
    assert_eq!(table.get(conn).unwrap().handler, BoundHandler::Login);
}

#[test]
fn connection_ids_are_monotonic() {
    let mut table = ConnectionTable::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let a = table.register("127.0.0.1:1".parse().unwrap(), tx.clone(), 10);
    let b = table.register("127.0.0.1:2".parse().unwrap(), tx, 10);
    assert!(b > a);
}

#[test]
fn send_line_delivers_and_records() {
    let (mut table, conn, mut rx) = table_with_conn(10);
    table.get_mut(conn).unwrap().send_line("hello");
    assert_eq!(rx.try_recv().unwrap(), OutMsg::Line("hello".to_string()));
    assert_eq!(
        table.get(conn).unwrap().recent_tail(5),
        vec!["hello".to_string()]
    );
}

#[test]
fn ring_buffer_is_bounded() {
    let (mut table, conn, _rx) = table_with_conn(3);
    let handle = table.get_mut(conn).unwrap();
    for i in 0..10 {
        handle.send_line(&format!("line {i}"));
    }
    assert_eq!(
        handle.recent_tail(100),
        vec!["line 7".to_string(), "line 8".to_string(), "line 9".to_string()]
    );
}

#[test]
fn recent_tail_caps_and_preserves_order() {
    let (mut table, conn, _rx) = table_with_conn(50);
    let handle = table.get_mut(conn).unwrap();
    for i in 0..30 {
        handle.send_line(&format!("line {i}"));
    }
    let tail = handle.recent_tail(20);
    assert_eq!(tail.len(), 20);
    assert_eq!(tail.first().map(String::as_str), Some("line 10"));
    assert_eq!(tail.last().map(String::as_str), Some("line 29"));
}

#[test]
fn envelopes_are_not_recorded_for_replay() {
    let (mut table, conn, mut rx) = table_with_conn(10);
    let handle = table.get_mut(conn).unwrap();
    handle.send_envelope(&loam_core::ServerEnvelope::SessionResume { success: true });
    assert!(matches!(rx.try_recv().unwrap(), OutMsg::Oob(_)));
    assert!(handle.recent_tail(10).is_empty());
}

#[test]
fn clear_recent_empties_the_ring() {
    let (mut table, conn, _rx) = table_with_conn(10);
    let handle = table.get_mut(conn).unwrap();
    handle.send_line("a");
    handle.clear_recent();
    assert!(handle.recent_tail(10).is_empty());
}

#[test]
fn send_to_gone_peer_does_not_error() {
    let (mut table, conn, rx) = table_with_conn(10);
    drop(rx);
    // Writer task is gone; send is best-effort
    table.get_mut(conn).unwrap().send_line("into the void");
}

#[test]
fn find_by_player_follows_binding() {
    let (mut table, conn, _rx) = table_with_conn(10);
    let player = ObjectId(42);
    assert_eq!(table.find_by_player(player), None);

    table.get_mut(conn).unwrap().handler = BoundHandler::Player(player);
    assert_eq!(table.find_by_player(player), Some(conn));

    table.remove(conn);
    assert_eq!(table.find_by_player(player), None);
    assert!(table.is_empty());
}

#[test]
fn close_sends_the_marker() {
    let (table, conn, mut rx) = table_with_conn(10);
    table.get(conn).unwrap().close();
    assert_eq!(rx.try_recv().unwrap(), OutMsg::Close);
}
