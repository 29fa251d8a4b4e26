// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command manager: verb registry, alias substitution, emote fallback.
//!
//! Dispatch for input `I`:
//! 1. `verb` = lowercased first token, `args` = the rest, trimmed.
//! 2. If the player's alias table has `verb` (and `verb` is not one of
//!    the alias-management commands), substitute once and recompute.
//! 3. A registered command with sufficient level wins.
//! 4. Otherwise the social emote table is consulted; then the input is
//!    unknown.

use loam_core::Level;
use loam_mudlib::{Action, CommandDef, EmoteDef};
use std::collections::HashMap;

/// Verbs that are never alias-expanded, so a player cannot alias
/// themselves out of alias management.
const ALIAS_PROOF: [&str; 3] = ["alias", "unalias", "aliases"];

/// What a registered command does.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandBody {
    /// Declarative mudlib actions.
    Actions(Vec<Action>),
    /// A driver built-in, dispatched by key.
    Builtin(&'static str),
}

/// A registered verb.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub level: Level,
    pub usage: String,
    pub body: CommandBody,
}

impl CommandSpec {
    pub fn builtin(name: &str, aliases: &[&str], level: Level, key: &'static str) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            level,
            usage: String::new(),
            body: CommandBody::Builtin(key),
        }
    }
}

/// Outcome of dispatch resolution.
#[derive(Debug, PartialEq)]
pub enum Resolution<'a> {
    /// A command matched and the level gate passed.
    Command { spec: &'a CommandSpec, args: String },
    /// A command matched but the player's level is insufficient.
    Denied { spec: &'a CommandSpec },
    /// No command; a social emote matched.
    Emote { emote: &'a EmoteDef, args: String },
    /// Nothing matched.
    Unknown { verb: String, args: String },
    /// Blank input.
    Empty,
}

/// Verb registry with level gating and the emote fallback table.
#[derive(Debug, Default)]
pub struct CommandManager {
    specs: Vec<CommandSpec>,
    /// name / alias → index into `specs`
    index: HashMap<String, usize>,
    emotes: HashMap<String, EmoteDef>,
}

impl CommandManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Later registrations of the same name win;
    /// aliases never shadow an existing primary name.
    pub fn register(&mut self, spec: CommandSpec) {
        let idx = self.specs.len();
        let name = spec.name.to_lowercase();
        let aliases: Vec<String> = spec.aliases.iter().map(|a| a.to_lowercase()).collect();
        self.specs.push(spec);

        self.index.insert(name, idx);
        for alias in aliases {
            let taken_by_primary = self
                .index
                .get(&alias)
                .is_some_and(|i| self.specs[*i].name.to_lowercase() == alias);
            if !taken_by_primary {
                self.index.insert(alias, idx);
            }
        }
    }

    /// Register a mudlib command definition.
    pub fn register_mudlib(&mut self, def: CommandDef) {
        self.register(CommandSpec {
            name: def.name,
            aliases: def.aliases,
            level: def.level,
            usage: def.usage,
            body: CommandBody::Actions(def.actions),
        });
    }

    /// Install emote definitions (the social fallback table).
    pub fn register_emotes(&mut self, defs: Vec<EmoteDef>) {
        for def in defs {
            self.emotes.insert(def.name.to_lowercase(), def);
        }
    }

    pub fn lookup(&self, verb: &str) -> Option<&CommandSpec> {
        self.index
            .get(&verb.to_lowercase())
            .map(|idx| &self.specs[*idx])
    }

    pub fn emote(&self, verb: &str) -> Option<&EmoteDef> {
        self.emotes.get(&verb.to_lowercase())
    }

    pub fn command_count(&self) -> usize {
        self.specs.len()
    }

    pub fn emote_count(&self) -> usize {
        self.emotes.len()
    }

    /// Resolve an input line for a player at `level` with a personal
    /// alias table.
    pub fn resolve<'a>(
        &'a self,
        input: &str,
        level: Level,
        aliases: &HashMap<String, String>,
    ) -> Resolution<'a> {
        let (mut verb, mut args) = split_verb(input);
        if verb.is_empty() {
            return Resolution::Empty;
        }

        // Alias expansion happens exactly once; it is not
        // fixpoint-iterated.
        if !ALIAS_PROOF.contains(&verb.as_str()) {
            if let Some(expansion) = aliases.get(&verb) {
                let substituted = if args.is_empty() {
                    expansion.clone()
                } else {
                    format!("{expansion} {args}")
                };
                (verb, args) = split_verb(&substituted);
                if verb.is_empty() {
                    return Resolution::Empty;
                }
            }
        }

        if let Some(spec) = self.lookup(&verb) {
            if level >= spec.level {
                return Resolution::Command { spec, args };
            }
            return Resolution::Denied { spec };
        }

        if let Some(emote) = self.emote(&verb) {
            return Resolution::Emote { emote, args };
        }

        Resolution::Unknown { verb, args }
    }

    /// Completion candidates for a prefix: visible command names first,
    /// then emotes. Sorted, deduplicated, bounded.
    pub fn completion_candidates(&self, prefix: &str, level: Level) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        let mut out: Vec<String> = self
            .specs
            .iter()
            .filter(|spec| level >= spec.level)
            .map(|spec| spec.name.to_lowercase())
            .chain(self.emotes.keys().cloned())
            .filter(|name| name.starts_with(&prefix))
            .collect();
        out.sort();
        out.dedup();
        out.truncate(50);
        out
    }
}

fn split_verb(input: &str) -> (String, String) {
    let trimmed = input.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb.to_lowercase(), rest.trim().to_string()),
        None => (trimmed.to_lowercase(), String::new()),
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
