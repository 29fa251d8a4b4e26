// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object registry: blueprints, live instances, and the containment
//! graph.
//!
//! Inventories own their members; environments are back references.
//! Invariants maintained by every mutator:
//! - an instance appears in at most one inventory, and exactly when its
//!   environment points at the container
//! - instance ids are never reused
//! - a removed instance is referenced from no inventory and no index

use crate::error::EfunError;
use loam_core::{ObjectId, ObjectRef, VirtualPath};
use loam_mudlib::ObjectDef;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// An immutable (per generation) compiled class definition.
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub path: VirtualPath,
    /// Incremented on every recompile of the same path.
    pub generation: u64,
    pub def: Arc<ObjectDef>,
    /// Hex SHA-256 of the source this generation was compiled from.
    pub source_hash: String,
}

/// A live instance.
#[derive(Debug, Clone)]
pub struct LiveObject {
    pub id: ObjectId,
    pub path: VirtualPath,
    /// Generation of the blueprint this instance was created from.
    /// Recompiles do not touch existing instances.
    pub generation: u64,
    pub def: Arc<ObjectDef>,
    pub environment: Option<ObjectId>,
    pub inventory: Vec<ObjectId>,
    pub props: HashMap<String, serde_json::Value>,
}

impl LiveObject {
    /// Display name: `short` property override, else the definition's.
    pub fn display_name(&self) -> String {
        if let Some(serde_json::Value::String(s)) = self.props.get("short") {
            return s.clone();
        }
        self.def.display_name().to_string()
    }

    pub fn prop(&self, key: &str) -> Option<&serde_json::Value> {
        self.props.get(key)
    }

    pub fn set_prop(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.props.insert(key.into(), value);
    }
}

/// Canonical object indexes.
#[derive(Debug, Default)]
pub struct Registry {
    blueprints: HashMap<VirtualPath, Blueprint>,
    instances: HashMap<ObjectId, LiveObject>,
    /// Path → the instance `load_object` hands out (daemons, rooms).
    canonical: HashMap<VirtualPath, ObjectId>,
    /// Path → every live instance of that blueprint.
    clones: HashMap<VirtualPath, BTreeSet<ObjectId>>,
    next_instance: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Blueprints
    // ---------------------------------------------------------------

    /// Register (or supersede) the blueprint for a path. Returns the new
    /// generation. Existing instances keep the generation they were
    /// created with.
    pub fn register_blueprint(
        &mut self,
        path: VirtualPath,
        def: ObjectDef,
        source_hash: String,
    ) -> u64 {
        let generation = self
            .blueprints
            .get(&path)
            .map(|b| b.generation + 1)
            .unwrap_or(1);
        self.blueprints.insert(
            path.clone(),
            Blueprint {
                path,
                generation,
                def: Arc::new(def),
                source_hash,
            },
        );
        generation
    }

    pub fn lookup_blueprint(&self, path: &VirtualPath) -> Option<&Blueprint> {
        self.blueprints.get(path)
    }

    /// Drop a blueprint from the index (hot-reload deletion path).
    /// Live instances are untouched; the caller destroys them first.
    pub fn unregister_blueprint(&mut self, path: &VirtualPath) -> bool {
        self.blueprints.remove(path).is_some()
    }

    pub fn blueprint_paths(&self) -> Vec<VirtualPath> {
        let mut paths: Vec<VirtualPath> = self.blueprints.keys().cloned().collect();
        paths.sort();
        paths
    }

    // ---------------------------------------------------------------
    // Instances
    // ---------------------------------------------------------------

    /// Create a fresh instance of a registered blueprint. The caller
    /// runs lifecycle hooks; failure before indexing leaves no trace.
    pub fn instantiate(&mut self, path: &VirtualPath) -> Result<ObjectId, EfunError> {
        let blueprint = self
            .blueprints
            .get(path)
            .ok_or_else(|| EfunError::NotFound(format!("blueprint {path}")))?;

        self.next_instance += 1;
        let id = ObjectId(self.next_instance);

        let props = blueprint
            .def
            .props
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let object = LiveObject {
            id,
            path: path.clone(),
            generation: blueprint.generation,
            def: Arc::clone(&blueprint.def),
            environment: None,
            inventory: Vec::new(),
            props,
        };

        self.instances.insert(id, object);
        self.clones.entry(path.clone()).or_default().insert(id);
        Ok(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&LiveObject> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut LiveObject> {
        self.instances.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Resolve a reference: an instance id directly, a path via the
    /// canonical index.
    pub fn resolve(&self, reference: &ObjectRef) -> Option<ObjectId> {
        match reference {
            ObjectRef::Instance(id) => self.contains(*id).then_some(*id),
            ObjectRef::Path(path) => self.canonical.get(path).copied(),
        }
    }

    pub fn canonical(&self, path: &VirtualPath) -> Option<ObjectId> {
        self.canonical.get(path).copied()
    }

    /// Mark an instance as its path's canonical singleton.
    pub fn set_canonical(&mut self, path: VirtualPath, id: ObjectId) {
        self.canonical.insert(path, id);
    }

    pub fn enumerate(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.instances.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn clone_count(&self, path: &VirtualPath) -> usize {
        self.clones.get(path).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn clones_of(&self, path: &VirtualPath) -> Vec<ObjectId> {
        self.clones
            .get(path)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------
    // Containment graph
    // ---------------------------------------------------------------

    /// Move an instance to a new environment (or out of any, with
    /// `None`). Maintains the inventory/environment invariant and
    /// rejects containment cycles.
    pub fn move_object(
        &mut self,
        id: ObjectId,
        new_env: Option<ObjectId>,
    ) -> Result<(), EfunError> {
        if !self.contains(id) {
            return Err(EfunError::NotFound(format!("instance {id}")));
        }
        if let Some(env) = new_env {
            if env == id {
                return Err(EfunError::Validation(format!(
                    "{id} cannot contain itself"
                )));
            }
            if !self.contains(env) {
                return Err(EfunError::NotFound(format!("environment {env}")));
            }
            // Inventory is a tree: the destination must not sit inside
            // the object being moved.
            let mut cursor = self.instances.get(&env).and_then(|o| o.environment);
            while let Some(up) = cursor {
                if up == id {
                    return Err(EfunError::Validation(format!(
                        "moving {id} into {env} would create a containment cycle"
                    )));
                }
                cursor = self.instances.get(&up).and_then(|o| o.environment);
            }
        }

        self.unlink(id);

        if let Some(env) = new_env {
            if let Some(container) = self.instances.get_mut(&env) {
                container.inventory.push(id);
            }
            if let Some(object) = self.instances.get_mut(&id) {
                object.environment = Some(env);
            }
        }
        Ok(())
    }

    /// Detach an instance from its environment (if any).
    pub fn unlink(&mut self, id: ObjectId) {
        let old_env = match self.instances.get_mut(&id) {
            Some(object) => object.environment.take(),
            None => return,
        };
        if let Some(env) = old_env {
            if let Some(container) = self.instances.get_mut(&env) {
                container.inventory.retain(|member| *member != id);
            }
        }
    }

    /// All transitively contained instances, deepest first; the
    /// destruction order for a recursive destroy.
    pub fn deep_inventory(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let Some(object) = self.instances.get(&id) else {
            return out;
        };
        for member in &object.inventory {
            out.extend(self.deep_inventory(*member));
            out.push(*member);
        }
        out
    }

    /// Drop a single instance from every index. The caller has already
    /// handled its inventory and run lifecycle hooks.
    pub fn remove(&mut self, id: ObjectId) -> Option<LiveObject> {
        let object = self.instances.remove(&id)?;

        // Detach from the container's inventory.
        if let Some(env) = object.environment {
            if let Some(container) = self.instances.get_mut(&env) {
                container.inventory.retain(|member| *member != id);
            }
        }
        // Orphan anything still inside (opt-out destroy path).
        for member in &object.inventory {
            if let Some(child) = self.instances.get_mut(member) {
                child.environment = None;
            }
        }

        if let Some(set) = self.clones.get_mut(&object.path) {
            set.remove(&id);
            if set.is_empty() {
                self.clones.remove(&object.path);
            }
        }
        if self.canonical.get(&object.path) == Some(&id) {
            self.canonical.remove(&object.path);
        }
        Some(object)
    }

    /// Verify the environment/inventory invariants; returns the first
    /// violation found. Used by tests and the workspace spec suite.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (id, object) in &self.instances {
            if let Some(env) = object.environment {
                let container = self
                    .instances
                    .get(&env)
                    .ok_or_else(|| format!("{id} has dangling environment {env}"))?;
                if !container.inventory.contains(id) {
                    return Err(format!("{id} not in inventory of its environment {env}"));
                }
            }
            for member in &object.inventory {
                let child = self
                    .instances
                    .get(member)
                    .ok_or_else(|| format!("{id} inventory holds dead instance {member}"))?;
                if child.environment != Some(*id) {
                    return Err(format!(
                        "{member} in {id}'s inventory but environment is {:?}",
                        child.environment
                    ));
                }
            }
        }
        for (path, id) in &self.canonical {
            if !self.instances.contains_key(id) {
                return Err(format!("canonical index for {path} holds dead {id}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
