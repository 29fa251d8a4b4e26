// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook and action evaluation.
//!
//! Capability-set dispatch: the driver asks an instance for a hook's
//! actions and runs whatever is there; an absent hook is a no-op. A
//! depth guard stops hooks that recursively trigger hooks without end
//! (two objects `tell_room`-ing at each other, for instance).

use crate::error::EfunError;
use crate::world::World;
use loam_core::{Clock, ObjectId, VirtualPath};
use loam_mudlib::{interpolate, Action, HookKind, Target};
use std::collections::HashMap;
use tracing::warn;

/// Hooks triggering hooks bottom out here.
const MAX_HOOK_DEPTH: u32 = 8;

impl<C: Clock> World<C> {
    /// Run an instance's hook with extra template variables. Absent
    /// hooks succeed trivially; a dead instance is `NotFound`.
    pub fn run_hook(
        &mut self,
        target: ObjectId,
        kind: HookKind,
        extra: &[(&str, String)],
    ) -> Result<(), EfunError> {
        let actions: Vec<Action> = match self.registry.get(target) {
            Some(object) => object.def.hooks.get(kind).to_vec(),
            None => return Err(EfunError::NotFound(format!("instance {target}"))),
        };
        if actions.is_empty() {
            return Ok(());
        }
        self.run_actions(target, &actions, extra)
    }

    /// Run a list of actions against an instance.
    pub fn run_actions(
        &mut self,
        target: ObjectId,
        actions: &[Action],
        extra: &[(&str, String)],
    ) -> Result<(), EfunError> {
        if self.hook_depth >= MAX_HOOK_DEPTH {
            return Err(EfunError::Validation(format!(
                "hook recursion deeper than {MAX_HOOK_DEPTH} at {target}"
            )));
        }
        self.hook_depth += 1;
        let result = self.run_actions_inner(target, actions, extra);
        self.hook_depth -= 1;
        result
    }

    fn run_actions_inner(
        &mut self,
        target: ObjectId,
        actions: &[Action],
        extra: &[(&str, String)],
    ) -> Result<(), EfunError> {
        for action in actions {
            // The target may destruct itself partway through.
            if !self.registry.contains(target) {
                break;
            }
            self.exec_action(target, action, extra)?;
        }
        Ok(())
    }

    fn exec_action(
        &mut self,
        target: ObjectId,
        action: &Action,
        extra: &[(&str, String)],
    ) -> Result<(), EfunError> {
        match action {
            Action::Tell {
                target: selector,
                message,
            } => {
                let rendered = self.render(target, message, extra);
                if let Some(dest) = self.select(target, *selector) {
                    self.send(dest, &rendered);
                }
                Ok(())
            }

            Action::TellRoom {
                message,
                exclude_player,
            } => {
                let rendered = self.render(target, message, extra);
                let Some(room) = self.registry.get(target).and_then(|o| o.environment) else {
                    return Ok(());
                };
                let mut exclude = Vec::new();
                if *exclude_player {
                    if let Some(player) = self.context.current().this_player {
                        exclude.push(player);
                    }
                }
                self.broadcast_room(room, &rendered, &exclude);
                Ok(())
            }

            Action::Set {
                target: selector,
                key,
                value,
            } => {
                if let Some(dest) = self.select(target, *selector) {
                    if let Some(object) = self.registry.get_mut(dest) {
                        object.set_prop(key.clone(), value.clone());
                    }
                }
                Ok(())
            }

            Action::MoveTo { path } => {
                let path = VirtualPath::new(path)?;
                let room = self.load_object(&path)?;
                self.move_object(target, room)
            }

            Action::CloneInto {
                path,
                target: selector,
            } => {
                let path = VirtualPath::new(path)?;
                let Some(dest) = self.select(target, *selector) else {
                    return Ok(());
                };
                let id = self.clone_object(&path)?;
                self.move_object(id, dest)
            }

            Action::CallOut { delay_ms, actions } => {
                self.call_out(target, actions.clone(), *delay_ms)?;
                Ok(())
            }

            Action::Heartbeat { enabled } => {
                self.set_heartbeat(target, *enabled)?;
                Ok(())
            }

            Action::Destruct => {
                self.destruct(target, true)?;
                Ok(())
            }

            Action::Gui { payload } => {
                // GUI without a connected player in context is a no-op.
                if let Err(e) = self.gui_send(payload.clone()) {
                    warn!(%target, error = %e, "gui action dropped");
                }
                Ok(())
            }
        }
    }

    /// Template variables for a hook message: the running object, its
    /// environment, the acting player, and call-site extras.
    fn render(&self, target: ObjectId, message: &str, extra: &[(&str, String)]) -> String {
        let mut vars: HashMap<String, String> = HashMap::new();

        if let Some(object) = self.registry.get(target) {
            vars.insert("this.name".to_string(), object.display_name());
            vars.insert("this.id".to_string(), object.id.to_string());
            vars.insert("this.path".to_string(), object.path.to_string());
            if let Some(env) = object.environment.and_then(|e| self.registry.get(e)) {
                vars.insert("env.name".to_string(), env.display_name());
                vars.insert("env.path".to_string(), env.path.to_string());
            }
        }
        if let Some(entry) = self
            .context
            .current()
            .this_player
            .and_then(|p| self.players.get_by_object(p))
        {
            vars.insert("player.name".to_string(), entry.name.clone());
        }
        for (key, value) in extra {
            vars.insert((*key).to_string(), value.clone());
        }

        interpolate(message, &vars)
    }

    fn select(&self, base: ObjectId, selector: Target) -> Option<ObjectId> {
        match selector {
            Target::This => Some(base),
            Target::Player => self.context.current().this_player,
            Target::Environment => self.registry.get(base)?.environment,
        }
    }

    // ---------------------------------------------------------------
    // Periodic sweeps driven by the orchestrator
    // ---------------------------------------------------------------

    /// One heartbeat sweep. A failing instance never stops the others;
    /// dead subscriptions are dropped on the way through. Returns how
    /// many heartbeats ran.
    pub fn run_heartbeats(&mut self) -> usize {
        let members = self.scheduler.heartbeat_members();
        let mut ran = 0;
        for id in members {
            if !self.registry.contains(id) {
                self.scheduler.unregister_heartbeat(id);
                continue;
            }
            self.context.push(crate::context::ActorContext::for_object(id));
            let result = self.run_hook(id, HookKind::Heartbeat, &[]);
            self.context.pop();
            match result {
                Ok(()) => ran += 1,
                Err(e) => {
                    warn!(%id, error = %e, "heartbeat failed");
                }
            }
        }
        ran
    }

    /// One reset sweep over canonical instances with an `on_reset`
    /// capability.
    pub fn run_resets(&mut self) -> usize {
        let targets: Vec<ObjectId> = self
            .registry
            .blueprint_paths()
            .iter()
            .filter_map(|path| self.registry.canonical(path))
            .filter(|id| {
                self.registry
                    .get(*id)
                    .is_some_and(|o| o.def.hooks.has(HookKind::Reset))
            })
            .collect();

        let mut ran = 0;
        for id in targets {
            self.context.push(crate::context::ActorContext::for_object(id));
            let result = self.run_hook(id, HookKind::Reset, &[]);
            self.context.pop();
            match result {
                Ok(()) => ran += 1,
                Err(e) => warn!(%id, error = %e, "reset failed"),
            }
        }
        ran
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
