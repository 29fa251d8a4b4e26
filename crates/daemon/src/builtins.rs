// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in driver commands.
//!
//! The operator surface is in-game: world commands everyone gets,
//! builder tools, and the administrator's permission commands. Mudlib
//! commands share the registry; these are the native ones.

use loam_core::{Level, ObjectId, SystemClock, TimerId, VirtualPath};
use loam_engine::{CommandManager, CommandSpec, EfunError, World};
use loam_mudlib::{interpolate, EmoteDef};
use std::collections::HashMap;
use tracing::info;

/// What a builtin asks the driver to do afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuiltinOutcome {
    pub shutdown: bool,
}

/// Register every built-in verb.
pub fn register_all(commands: &mut CommandManager) {
    let table: &[(&str, &[&str], Level, &'static str)] = &[
        ("look", &["l"], Level::Player, "look"),
        ("say", &["'"], Level::Player, "say"),
        ("who", &[], Level::Player, "who"),
        ("quit", &[], Level::Player, "quit"),
        ("alias", &[], Level::Player, "alias"),
        ("unalias", &[], Level::Player, "unalias"),
        ("aliases", &[], Level::Player, "aliases"),
        ("goto", &[], Level::Builder, "goto"),
        ("clone", &[], Level::Builder, "clone"),
        ("dest", &[], Level::Builder, "dest"),
        ("update", &[], Level::Builder, "update"),
        ("grant", &[], Level::Administrator, "grant"),
        ("revoke", &[], Level::Administrator, "revoke"),
        ("adddomain", &[], Level::Administrator, "adddomain"),
        ("rmdomain", &[], Level::Administrator, "rmdomain"),
        ("domains", &[], Level::Administrator, "domains"),
        ("audit", &[], Level::Administrator, "audit"),
        ("shutdown", &[], Level::Administrator, "shutdown"),
    ];
    for (name, aliases, level, key) in table {
        commands.register(CommandSpec::builtin(name, aliases, *level, key));
    }
}

/// Execute a builtin for a bound player. Player-facing problems are
/// reported as lines; `Err` is reserved for unexpected failures the
/// driver should contain.
pub fn execute(
    world: &mut World<SystemClock>,
    key: &'static str,
    player: ObjectId,
    args: &str,
) -> Result<BuiltinOutcome, EfunError> {
    let mut outcome = BuiltinOutcome::default();
    match key {
        "look" => send_look(world, player),
        "say" => do_say(world, player, args),
        "who" => do_who(world, player),
        "quit" => do_quit(world, player)?,
        "alias" => do_alias(world, player, args),
        "unalias" => do_unalias(world, player, args),
        "aliases" => do_aliases(world, player),
        "goto" => do_goto(world, player, args),
        "clone" => do_clone(world, player, args),
        "dest" => do_dest(world, player, args),
        "update" => do_update(world, player, args),
        "grant" => do_grant(world, player, args),
        "revoke" => do_revoke(world, player, args),
        "adddomain" => do_domain_change(world, player, args, true),
        "rmdomain" => do_domain_change(world, player, args, false),
        "domains" => do_domains(world, player, args),
        "audit" => do_audit(world, player, args),
        "shutdown" => {
            world.send(player, "You still the world's heart.");
            outcome.shutdown = true;
        }
        other => world.send(player, &format!("The {other} command is not wired up.")),
    }
    Ok(outcome)
}

// -------------------------------------------------------------------
// World commands
// -------------------------------------------------------------------

/// Render the player's surroundings: title, description, exits,
/// visible contents.
pub fn send_look(world: &mut World<SystemClock>, player: ObjectId) {
    let Some(room_id) = world.registry.get(player).and_then(|o| o.environment) else {
        world.send(player, "You drift in a place without places.");
        return;
    };

    let mut lines: Vec<String> = Vec::new();
    let mut occupants: Vec<ObjectId> = Vec::new();
    if let Some(room) = world.registry.get(room_id) {
        lines.push(format!("{{bold}}{}{{/}}", room.display_name()));
        if !room.def.long.is_empty() {
            lines.push(room.def.long.clone());
        }
        if room.def.exits.is_empty() {
            lines.push("There are no obvious exits.".to_string());
        } else {
            let dirs: Vec<&str> = room.def.exits.keys().map(String::as_str).collect();
            lines.push(format!("Obvious exits: {}.", dirs.join(", ")));
        }
        occupants = room
            .inventory
            .iter()
            .copied()
            .filter(|id| *id != player)
            .collect();
    }
    for id in occupants {
        let described = match world.players.get_by_object(id) {
            Some(entry) => format!("{} is here.", entry.name),
            None => world
                .registry
                .get(id)
                .map(|o| format!("  {}", o.display_name()))
                .unwrap_or_default(),
        };
        if !described.is_empty() {
            lines.push(described);
        }
    }

    for line in lines {
        world.send(player, &line);
    }
}

fn do_say(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    if args.is_empty() {
        world.send(player, "Say what?");
        return;
    }
    let name = world
        .players
        .get_by_object(player)
        .map(|entry| entry.name.clone())
        .unwrap_or_default();
    world.send(player, &format!("You say: {args}"));
    if let Some(room) = world.registry.get(player).and_then(|o| o.environment) {
        world.broadcast_room(room, &format!("{name} says: {args}"), &[player]);
    }
}

fn do_who(world: &mut World<SystemClock>, player: ObjectId) {
    let connected: Vec<(String, Level)> = world
        .players
        .connected()
        .iter()
        .map(|entry| (entry.name.clone(), entry.level))
        .collect();
    world.send(
        player,
        &format!("{} adventurer(s) walk the world:", connected.len()),
    );
    for (name, level) in connected {
        let tag = match level {
            Level::Player => String::new(),
            other => format!(" [{other}]"),
        };
        world.send(player, &format!("  {name}{tag}"));
    }
}

/// Clean quit: save, farewell, close, retire the player instance.
fn do_quit(world: &mut World<SystemClock>, player: ObjectId) -> Result<(), EfunError> {
    if let Err(e) = world.save_player(player) {
        world.send(player, &format!("Your soul resists the scribe: {e}"));
        return Ok(());
    }
    let (name, conn, key) = match world.players.get_by_object(player) {
        Some(entry) => (entry.name.clone(), entry.connection, entry.key()),
        None => return Ok(()),
    };
    world
        .scheduler
        .cancel_timer(&TimerId::disconnect(&key));
    if let Some(room) = world.registry.get(player).and_then(|o| o.environment) {
        world.broadcast_room(room, &format!("{name} leaves the world."), &[player]);
    }
    if let Some(conn) = conn {
        world.tell_connection(conn, "Until next time.");
        if let Some(handle) = world.connections.get(conn) {
            handle.close();
        }
    }
    world.destruct(player, true)?;
    info!(player = %name, "clean quit");
    Ok(())
}

// -------------------------------------------------------------------
// Alias management (never alias-expanded themselves)
// -------------------------------------------------------------------

fn do_alias(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    if args.is_empty() {
        do_aliases(world, player);
        return;
    }
    let Some((name, expansion)) = args.split_once(char::is_whitespace) else {
        world.send(player, "Usage: alias <word> <expansion>");
        return;
    };
    let name = name.to_lowercase();
    let expansion = expansion.trim().to_string();
    if ["alias", "unalias", "aliases"].contains(&name.as_str()) {
        world.send(player, "That word cannot be aliased.");
        return;
    }
    if let Some(entry) = world.players.get_by_object_mut(player) {
        entry.aliases.insert(name.clone(), expansion.clone());
    }
    world.send(player, &format!("Alias {name} => {expansion}."));
}

fn do_unalias(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    let name = args.to_lowercase();
    if name.is_empty() {
        world.send(player, "Usage: unalias <word>");
        return;
    }
    let removed = world
        .players
        .get_by_object_mut(player)
        .is_some_and(|entry| entry.aliases.remove(&name).is_some());
    if removed {
        world.send(player, &format!("Alias {name} removed."));
    } else {
        world.send(player, &format!("You have no alias {name}."));
    }
}

fn do_aliases(world: &mut World<SystemClock>, player: ObjectId) {
    let aliases: Vec<(String, String)> = world
        .players
        .get_by_object(player)
        .map(|entry| {
            let mut pairs: Vec<(String, String)> = entry
                .aliases
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            pairs.sort();
            pairs
        })
        .unwrap_or_default();
    if aliases.is_empty() {
        world.send(player, "You have no aliases.");
        return;
    }
    world.send(player, "Your aliases:");
    for (name, expansion) in aliases {
        world.send(player, &format!("  {name} => {expansion}"));
    }
}

// -------------------------------------------------------------------
// Builder tools
// -------------------------------------------------------------------

fn do_goto(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    let path = match VirtualPath::new(args) {
        Ok(path) => path,
        Err(e) => {
            world.send(player, &format!("Bad destination: {e}"));
            return;
        }
    };
    match world.load_object(&path) {
        Ok(room) => match world.move_object(player, room) {
            Ok(()) => {
                world.send(player, &format!("You step through the weave to {path}."));
                send_look(world, player);
            }
            Err(e) => world.send(player, &format!("The weave resists: {e}")),
        },
        Err(e) => world.send(player, &format!("Cannot reach {path}: {e}")),
    }
}

fn do_clone(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    let path = match VirtualPath::new(args) {
        Ok(path) => path,
        Err(e) => {
            world.send(player, &format!("Bad blueprint path: {e}"));
            return;
        }
    };
    match world.clone_object(&path) {
        Ok(id) => {
            let _ = world.move_object(id, player);
            let name = world
                .registry
                .get(id)
                .map(|o| o.display_name())
                .unwrap_or_default();
            world.send(player, &format!("You conjure {name} ({id})."));
        }
        Err(e) => world.send(player, &format!("Cannot clone {path}: {e}")),
    }
}

/// Destroy by `#id` or blueprint path. Gated through the domain model
/// like any other destructive act on a path.
fn do_dest(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    let Some(target) = world.find_object(args.trim()) else {
        world.send(player, &format!("Nothing answers to {args}."));
        return;
    };
    if target == player {
        world.send(player, "Not while you are wearing it.");
        return;
    }
    let Some(path) = world.registry.get(target).map(|o| o.path.clone()) else {
        return;
    };
    let actor_key = world
        .players
        .get_by_object(player)
        .map(|entry| entry.key())
        .unwrap_or_default();
    let now_ms = world.epoch_ms();
    if let Err(e) = world
        .permissions
        .authorize_write(&actor_key, "destruct", &path, now_ms)
    {
        world.send(player, &format!("{e}"));
        return;
    }
    match world.destruct(target, true) {
        Ok(removed) => world.send(
            player,
            &format!("Gone. {removed} object(s) returned to the weave."),
        ),
        Err(e) => world.send(player, &format!("{e}")),
    }
}

fn do_update(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    let target = if args == "here" {
        match world.environment_path(player) {
            Some(path) => path,
            None => {
                world.send(player, "You are nowhere to update.");
                return;
            }
        }
    } else if args.is_empty() {
        world.send(player, "Usage: update <path> | update here");
        return;
    } else {
        match VirtualPath::new(args) {
            Ok(path) => path,
            Err(e) => {
                world.send(player, &format!("Bad path: {e}"));
                return;
            }
        }
    };

    match world.reload_object(&target) {
        Ok(outcome) => {
            world.stale_sources.remove(&target);
            world.send(
                player,
                &format!(
                    "Reloaded {target}: generation {}, {} existing clone(s) keep the old code.",
                    outcome.generation, outcome.existing_clones
                ),
            );
        }
        Err(e) => world.send(player, &format!("Reload failed: {e}")),
    }
}

// -------------------------------------------------------------------
// Administrator surface
// -------------------------------------------------------------------

fn do_grant(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    let Some((user, level_raw)) = args.split_once(char::is_whitespace) else {
        world.send(player, "Usage: grant <user> <level>");
        return;
    };
    let user = user.to_lowercase();
    let level: Level = match level_raw.trim().parse() {
        Ok(level) => level,
        Err(e) => {
            world.send(player, &format!("{e}"));
            return;
        }
    };
    world.permissions.grant(&user, level);
    if let Some(entry) = world.players.get_mut(&user) {
        entry.level = level;
    }
    world.send(player, &format!("{user} is now {level}."));
}

fn do_revoke(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    let user = args.to_lowercase();
    if user.is_empty() {
        world.send(player, "Usage: revoke <user>");
        return;
    }
    if world.permissions.revoke(&user) {
        if let Some(entry) = world.players.get_mut(&user) {
            entry.level = Level::Player;
        }
        world.send(player, &format!("{user} is a plain player again."));
    } else {
        world.send(player, &format!("{user} holds no grants."));
    }
}

fn do_domain_change(world: &mut World<SystemClock>, player: ObjectId, args: &str, add: bool) {
    let Some((user, domain)) = args.split_once(char::is_whitespace) else {
        let verb = if add { "adddomain" } else { "rmdomain" };
        world.send(player, &format!("Usage: {verb} <user> <prefix>"));
        return;
    };
    let user = user.to_lowercase();
    let domain = domain.trim();
    let result = if add {
        world.permissions.add_domain(&user, domain)
    } else {
        world.permissions.remove_domain(&user, domain)
    };
    match result {
        Ok(()) if add => world.send(player, &format!("{user} may now write under {domain}.")),
        Ok(()) => world.send(player, &format!("{user} loses {domain}.")),
        Err(e) => world.send(player, &format!("{e}")),
    }
}

fn do_domains(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    let user = if args.is_empty() {
        world
            .players
            .get_by_object(player)
            .map(|entry| entry.key())
            .unwrap_or_default()
    } else {
        args.to_lowercase()
    };
    let level = world.permissions.level_of(&user);
    let domains = world.permissions.domains(&user).to_vec();
    world.send(player, &format!("{user}: {level}"));
    if domains.is_empty() {
        world.send(player, "  (no writable domains)");
    }
    for domain in domains {
        world.send(player, &format!("  {domain}"));
    }
}

fn do_audit(world: &mut World<SystemClock>, player: ObjectId, args: &str) {
    let limit = args.parse::<usize>().unwrap_or(20);
    let entries = world.permissions.audit_tail(limit);
    if entries.is_empty() {
        world.send(player, "The audit log is empty.");
        return;
    }
    world.send(player, &format!("Last {} decision(s):", entries.len()));
    for entry in entries {
        let verdict = if entry.success { "OK" } else { "DENY" };
        let details = if entry.details.is_empty() {
            String::new()
        } else {
            format!(" ({})", entry.details)
        };
        world.send(
            player,
            &format!(
                "  [{}] {} {} {} {}{}",
                entry.at_ms, entry.actor, entry.action, entry.target, verdict, details
            ),
        );
    }
}

// -------------------------------------------------------------------
// Social fallback
// -------------------------------------------------------------------

/// Perform a social emote: actor line plus room broadcast, with the
/// targeted forms when an argument names someone present.
pub fn perform_emote(
    world: &mut World<SystemClock>,
    player: ObjectId,
    emote: &EmoteDef,
    args: &str,
) {
    let name = world
        .players
        .get_by_object(player)
        .map(|entry| entry.name.clone())
        .unwrap_or_default();

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("player".to_string(), name);

    let (you, room_msg) = if args.is_empty() {
        (emote.you.clone(), emote.room.clone())
    } else {
        vars.insert("target".to_string(), args.to_string());
        let you = if emote.you_target.is_empty() {
            format!("{} ({})", emote.you, args)
        } else {
            emote.you_target.clone()
        };
        let room_msg = if emote.room_target.is_empty() {
            format!("{} ({})", emote.room, args)
        } else {
            emote.room_target.clone()
        };
        (you, room_msg)
    };

    world.send(player, &interpolate(&you, &vars));
    if let Some(room) = world.registry.get(player).and_then(|o| o.environment) {
        world.broadcast_room(room, &interpolate(&room_msg, &vars), &[player]);
    }
}

#[cfg(test)]
#[path = "builtins_tests.rs"]
mod tests;
