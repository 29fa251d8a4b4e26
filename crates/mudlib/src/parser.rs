// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mudlib file parsing (HCL, TOML, and JSON)

use crate::action::Action;
use crate::command::CommandDef;
use crate::emote::EmoteDef;
use crate::object::ObjectDef;
use loam_core::VirtualPath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Maximum `call_out` nesting inside a single hook.
const MAX_CALLOUT_DEPTH: usize = 4;

/// Mudlib file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Hcl,
    Toml,
    Json,
}

/// Errors that can occur during mudlib parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("HCL parse error: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid definition in {location}: {message}")]
    InvalidFormat { location: String, message: String },
}

fn invalid(location: impl Into<String>, message: impl Into<String>) -> ParseError {
    ParseError::InvalidFormat {
        location: location.into(),
        message: message.into(),
    }
}

/// A parsed mudlib source file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MudlibFile {
    #[serde(default, alias = "object")]
    pub objects: HashMap<String, ObjectDef>,
    #[serde(default, alias = "command")]
    pub commands: HashMap<String, CommandDef>,
    #[serde(default, alias = "emote")]
    pub emotes: HashMap<String, EmoteDef>,
}

impl MudlibFile {
    /// Extract the file's single object definition.
    ///
    /// A blueprint source must define exactly one object and nothing
    /// else; the "one default export" contract.
    pub fn into_object(mut self) -> Result<ObjectDef, ParseError> {
        if !self.commands.is_empty() || !self.emotes.is_empty() {
            return Err(invalid(
                "file",
                "a blueprint source must not define commands or emotes",
            ));
        }
        match self.objects.len() {
            0 => Err(invalid("file", "no object block found")),
            1 => {
                let key = match self.objects.keys().next() {
                    Some(k) => k.clone(),
                    None => return Err(invalid("file", "no object block found")),
                };
                self.objects
                    .remove(&key)
                    .ok_or_else(|| invalid("file", "no object block found"))
            }
            n => Err(invalid(
                "file",
                format!("expected exactly one object block, found {}", n),
            )),
        }
    }

    /// Command definitions in name order.
    pub fn command_defs(self) -> Vec<CommandDef> {
        let mut defs: Vec<CommandDef> = self.commands.into_values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Emote definitions in name order.
    pub fn emote_defs(self) -> Vec<EmoteDef> {
        let mut defs: Vec<EmoteDef> = self.emotes.into_values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

/// Parse a mudlib file in the given format and validate it.
pub fn parse_file(content: &str, format: Format) -> Result<MudlibFile, ParseError> {
    // 1. Serde does the heavy lifting
    let mut file: MudlibFile = match format {
        Format::Hcl => hcl::from_str(content)?,
        Format::Toml => toml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    };

    // 2. Name fixup; inject map keys into .name fields
    for (name, object) in &mut file.objects {
        object.name = name.clone();
    }
    for (name, command) in &mut file.commands {
        command.name = name.clone();
    }
    for (name, emote) in &mut file.emotes {
        emote.name = name.clone();
    }

    // 3. Validation
    for object in file.objects.values() {
        validate_object(object)?;
    }
    for command in file.commands.values() {
        validate_command(command)?;
    }
    for emote in file.emotes.values() {
        validate_emote(emote)?;
    }

    Ok(file)
}

fn validate_object(object: &ObjectDef) -> Result<(), ParseError> {
    let location = format!("object \"{}\"", object.name);

    for (direction, path) in &object.exits {
        if direction.trim().is_empty() {
            return Err(invalid(&location, "exit direction must not be empty"));
        }
        VirtualPath::new(path).map_err(|e| {
            invalid(&location, format!("exit \"{}\": {}", direction, e))
        })?;
    }

    for path in object.preload.iter().chain(&object.safelist) {
        VirtualPath::new(path)
            .map_err(|e| invalid(&location, format!("preload/safelist: {}", e)))?;
    }

    for (kind, actions) in object.hooks.iter() {
        validate_actions(&format!("{}.{}", location, kind.name()), actions)?;
    }

    Ok(())
}

fn validate_command(command: &CommandDef) -> Result<(), ParseError> {
    let location = format!("command \"{}\"", command.name);

    if command.name.trim().is_empty() {
        return Err(invalid(&location, "command name must not be empty"));
    }
    for alias in &command.aliases {
        if alias.trim().is_empty() || alias.contains(char::is_whitespace) {
            return Err(invalid(
                &location,
                format!("alias \"{}\" must be a single word", alias),
            ));
        }
    }
    validate_actions(&location, &command.actions)
}

fn validate_emote(emote: &EmoteDef) -> Result<(), ParseError> {
    let location = format!("emote \"{}\"", emote.name);
    if emote.you.trim().is_empty() || emote.room.trim().is_empty() {
        return Err(invalid(&location, "emote requires both you and room messages"));
    }
    Ok(())
}

fn validate_actions(location: &str, actions: &[Action]) -> Result<(), ParseError> {
    for action in actions {
        if action.depth() > MAX_CALLOUT_DEPTH {
            return Err(invalid(
                location,
                format!("call_out nesting exceeds {}", MAX_CALLOUT_DEPTH),
            ));
        }
        validate_action(location, action)?;
    }
    Ok(())
}

fn validate_action(location: &str, action: &Action) -> Result<(), ParseError> {
    match action {
        Action::MoveTo { path } | Action::CloneInto { path, .. } => {
            VirtualPath::new(path)
                .map_err(|e| invalid(location, format!("{}: {}", action.name(), e)))?;
        }
        Action::Set { key, .. } => {
            if key.trim().is_empty() {
                return Err(invalid(location, "set: property key must not be empty"));
            }
        }
        Action::CallOut { actions, .. } => {
            for nested in actions {
                validate_action(location, nested)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
