// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events processed sequentially by the driver's engine loop.
//!
//! Connection I/O tasks and the hot-reload watcher only ever emit events;
//! all world mutation happens on the engine loop that consumes them.

use crate::id::ConnectionId;
use crate::oob::ClientEnvelope;
use crate::vpath::VirtualPath;

/// An input to the engine loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A plain text line arrived on a connection.
    Line { conn: ConnectionId, line: String },

    /// A parsed out-of-band envelope arrived on a connection.
    Oob {
        conn: ConnectionId,
        envelope: ClientEnvelope,
    },

    /// An out-of-band frame failed to parse.
    OobInvalid { conn: ConnectionId, error: String },

    /// The peer closed its socket (or the transport failed).
    Closed { conn: ConnectionId },

    /// A mudlib source file was modified on disk.
    SourceModified { path: VirtualPath },

    /// A mudlib source file was deleted from disk.
    SourceRemoved { path: VirtualPath },

    /// Orderly shutdown was requested.
    Shutdown,
}

impl Event {
    /// Terse description for log lines.
    pub fn log_summary(&self) -> String {
        match self {
            Event::Line { conn, line } => format!("line {} ({} bytes)", conn, line.len()),
            Event::Oob { conn, envelope } => format!("oob {} {:?}", conn, envelope_kind(envelope)),
            Event::OobInvalid { conn, error } => format!("oob-invalid {} {}", conn, error),
            Event::Closed { conn } => format!("closed {}", conn),
            Event::SourceModified { path } => format!("source-modified {}", path),
            Event::SourceRemoved { path } => format!("source-removed {}", path),
            Event::Shutdown => "shutdown".to_string(),
        }
    }

    /// The connection this event belongs to, if any.
    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            Event::Line { conn, .. }
            | Event::Oob { conn, .. }
            | Event::OobInvalid { conn, .. }
            | Event::Closed { conn } => Some(*conn),
            _ => None,
        }
    }
}

fn envelope_kind(envelope: &ClientEnvelope) -> &'static str {
    match envelope {
        ClientEnvelope::Auth(_) => "auth",
        ClientEnvelope::SessionResume { .. } => "session_resume",
        ClientEnvelope::Gui(_) => "gui",
        ClientEnvelope::Complete { .. } => "complete",
        ClientEnvelope::BugReport(_) => "bug_report",
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
