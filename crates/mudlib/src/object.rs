// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object definitions: the blueprint "constructor".

use crate::action::Action;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Broad object category. Only `Daemon` changes driver behavior (daemons
/// are preloaded singletons); the rest is mudlib-facing metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Item,
    Room,
    Npc,
    Daemon,
}

/// Lifecycle hooks. An absent hook is a no-op; the engine queries
/// capabilities, never concrete classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Hooks {
    pub on_create: Vec<Action>,
    pub on_reset: Vec<Action>,
    pub on_enter: Vec<Action>,
    pub on_leave: Vec<Action>,
    pub on_destroy: Vec<Action>,
    pub heartbeat: Vec<Action>,
    pub on_receive: Vec<Action>,
    pub on_gui: Vec<Action>,
}

/// The hook selector used by the engine's capability dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Create,
    Reset,
    Enter,
    Leave,
    Destroy,
    Heartbeat,
    Receive,
    Gui,
}

impl HookKind {
    pub fn name(self) -> &'static str {
        match self {
            HookKind::Create => "on_create",
            HookKind::Reset => "on_reset",
            HookKind::Enter => "on_enter",
            HookKind::Leave => "on_leave",
            HookKind::Destroy => "on_destroy",
            HookKind::Heartbeat => "heartbeat",
            HookKind::Receive => "on_receive",
            HookKind::Gui => "on_gui",
        }
    }
}

impl Hooks {
    /// Actions for a hook; empty slice when the capability is absent.
    pub fn get(&self, kind: HookKind) -> &[Action] {
        match kind {
            HookKind::Create => &self.on_create,
            HookKind::Reset => &self.on_reset,
            HookKind::Enter => &self.on_enter,
            HookKind::Leave => &self.on_leave,
            HookKind::Destroy => &self.on_destroy,
            HookKind::Heartbeat => &self.heartbeat,
            HookKind::Receive => &self.on_receive,
            HookKind::Gui => &self.on_gui,
        }
    }

    pub fn has(&self, kind: HookKind) -> bool {
        !self.get(kind).is_empty()
    }

    /// All hooks, for validation sweeps.
    pub fn iter(&self) -> impl Iterator<Item = (HookKind, &[Action])> {
        [
            HookKind::Create,
            HookKind::Reset,
            HookKind::Enter,
            HookKind::Leave,
            HookKind::Destroy,
            HookKind::Heartbeat,
            HookKind::Receive,
            HookKind::Gui,
        ]
        .into_iter()
        .map(move |kind| (kind, self.get(kind)))
    }
}

/// A parsed object definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObjectDef {
    /// Injected from the block label during parsing.
    #[serde(skip)]
    pub name: String,
    pub kind: ObjectKind,
    /// One-line description (`a rusty lantern`).
    pub short: String,
    /// Long description shown by `look`.
    pub long: String,
    /// Room exits: direction → blueprint path.
    pub exits: IndexMap<String, String>,
    /// Initial property bag copied onto each instance.
    pub props: IndexMap<String, serde_json::Value>,
    /// Master object only: blueprints loaded at startup.
    pub preload: Vec<String>,
    /// Master object only: extra blueprints protected from
    /// delete-triggered destruction.
    pub safelist: Vec<String>,
    pub hooks: Hooks,
}

impl ObjectDef {
    /// Display name: explicit `short`, falling back to the block label.
    pub fn display_name(&self) -> &str {
        if self.short.is_empty() {
            &self.name
        } else {
            &self.short
        }
    }

    pub fn is_daemon(&self) -> bool {
        self.kind == ObjectKind::Daemon
    }
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
