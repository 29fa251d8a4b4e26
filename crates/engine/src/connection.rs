// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection table: outbound handles for the driver's peers.
//!
//! Socket I/O lives in per-connection tasks owned by the daemon; the
//! engine only holds each connection's outbound sender, its bound
//! handler, and the ring buffer of recent lines kept for resume replay.

use loam_core::{ConnectionId, ObjectId, ServerEnvelope};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Message to a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum OutMsg {
    /// A text line; the writer appends the newline.
    Line(String),
    /// A pre-encoded OOB frame.
    Oob(String),
    /// Flush and close the socket.
    Close,
}

/// Who consumes this connection's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundHandler {
    /// The login daemon (pre-auth).
    Login,
    /// A bound player object.
    Player(ObjectId),
}

/// Engine-side handle to one network connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub remote: SocketAddr,
    pub handler: BoundHandler,
    tx: mpsc::UnboundedSender<OutMsg>,
    recent: VecDeque<String>,
    recent_cap: usize,
}

impl ConnectionHandle {
    /// Send a text line, recording it in the replay ring. Delivery is
    /// best-effort: a gone peer surfaces later as a `Closed` event.
    pub fn send_line(&mut self, line: &str) {
        if self.recent_cap > 0 {
            if self.recent.len() == self.recent_cap {
                self.recent.pop_front();
            }
            self.recent.push_back(line.to_string());
        }
        let _ = self.tx.send(OutMsg::Line(line.to_string()));
    }

    /// Send an OOB envelope. Envelopes are not recorded for replay.
    pub fn send_envelope(&mut self, envelope: &ServerEnvelope) {
        let _ = self.tx.send(OutMsg::Oob(envelope.encode()));
    }

    /// Ask the writer task to close the socket.
    pub fn close(&self) {
        let _ = self.tx.send(OutMsg::Close);
    }

    /// The last `n` buffered lines, oldest first.
    pub fn recent_tail(&self, n: usize) -> Vec<String> {
        let skip = self.recent.len().saturating_sub(n);
        self.recent.iter().skip(skip).cloned().collect()
    }

    /// Clear the replay ring (after a transfer to a new physical
    /// connection).
    pub fn clear_recent(&mut self) {
        self.recent.clear();
    }

    /// Seed the replay ring with lines captured from a replaced
    /// connection, without delivering them.
    pub fn seed_recent(&mut self, lines: Vec<String>) {
        for line in lines {
            if self.recent_cap > 0 {
                if self.recent.len() == self.recent_cap {
                    self.recent.pop_front();
                }
                self.recent.push_back(line);
            }
        }
    }

    pub fn remote_ip(&self) -> String {
        self.remote.ip().to_string()
    }
}

/// All live connections, keyed by id. Ids are never reused.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    map: HashMap<ConnectionId, ConnectionHandle>,
    next: u64,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection; new connections start
    /// bound to the login daemon.
    pub fn register(
        &mut self,
        remote: SocketAddr,
        tx: mpsc::UnboundedSender<OutMsg>,
        recent_cap: usize,
    ) -> ConnectionId {
        self.next += 1;
        let id = ConnectionId(self.next);
        self.map.insert(
            id,
            ConnectionHandle {
                id,
                remote,
                handler: BoundHandler::Login,
                tx,
                recent: VecDeque::new(),
                recent_cap,
            },
        );
        id
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ConnectionHandle> {
        self.map.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut ConnectionHandle> {
        self.map.get_mut(&id)
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.map.remove(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.map.contains_key(&id)
    }

    /// The connection currently bound to a player object, if any.
    pub fn find_by_player(&self, player: ObjectId) -> Option<ConnectionId> {
        self.map
            .values()
            .find(|handle| handle.handler == BoundHandler::Player(player))
            .map(|handle| handle.id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.map.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
