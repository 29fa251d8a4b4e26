// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types for driver-managed entities.
//!
//! String-keyed ids (timers) use the `define_id!` newtype macro; the
//! numeric ids (instances, connections, call-out handles) are monotonic
//! counters that are never reused within a process lifetime.

use serde::{Deserialize, Serialize};

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Unique identifier for a named driver timer.
    ///
    /// Named timers are driver-internal scheduled actions (disconnect
    /// grace windows, the reset cycle, audit flushing). Mudlib call-outs
    /// are addressed by [`CalloutHandle`] instead.
    pub struct TimerId;
}

impl TimerId {
    /// Timer ID for a player's disconnect-to-void grace window.
    pub fn disconnect(player_key: &str) -> Self {
        Self::new(format!("disconnect:{}", player_key))
    }

    /// Returns true if this is a disconnect grace timer.
    pub fn is_disconnect(&self) -> bool {
        self.0.starts_with("disconnect:")
    }

    /// Extracts the player key from a disconnect grace timer.
    pub fn disconnect_player(&self) -> Option<&str> {
        self.0.strip_prefix("disconnect:")
    }

    /// Timer ID for the periodic area reset cycle.
    pub fn reset_cycle() -> Self {
        Self::new("reset-cycle")
    }

    /// Timer ID for the periodic audit-log flush.
    pub fn audit_flush() -> Self {
        Self::new("audit-flush")
    }
}

/// Unique identifier for a live object instance.
///
/// Assigned monotonically by the registry and never reused within a
/// process lifetime. Displayed in the traditional `#n` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for a network connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opaque handle to a scheduled call-out.
///
/// Handles are monotonically assigned and safe to cancel after expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalloutHandle(pub u64);

impl std::fmt::Display for CalloutHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "callout-{}", self.0)
    }
}

/// A reference to a live object: either a blueprint path (resolving to
/// the path's canonical instance) or an explicit instance id (`#n`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    Path(crate::vpath::VirtualPath),
    Instance(ObjectId),
}

impl ObjectRef {
    /// Parse a textual reference. `#42` addresses an instance; anything
    /// else must be a valid virtual path.
    pub fn parse(s: &str) -> Result<Self, crate::vpath::PathError> {
        if let Some(rest) = s.strip_prefix('#') {
            if let Ok(n) = rest.parse::<u64>() {
                return Ok(ObjectRef::Instance(ObjectId(n)));
            }
        }
        Ok(ObjectRef::Path(crate::vpath::VirtualPath::new(s)?))
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectRef::Path(p) => write!(f, "{}", p),
            ObjectRef::Instance(id) => write!(f, "{}", id),
        }
    }
}

impl From<ObjectId> for ObjectRef {
    fn from(id: ObjectId) -> Self {
        ObjectRef::Instance(id)
    }
}

impl From<crate::vpath::VirtualPath> for ObjectRef {
    fn from(path: crate::vpath::VirtualPath) -> Self {
        ObjectRef::Path(path)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
