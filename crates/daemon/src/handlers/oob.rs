// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band envelope routing.
//!
//! OOB prefixes take priority over verb dispatch and are routed here
//! before any line handling happens.

use crate::driver::Driver;
use crate::handlers::session;
use loam_core::{ClientEnvelope, ConnectionId, Level, ServerEnvelope};
use loam_engine::{ActorContext, BoundHandler};
use loam_mudlib::HookKind;
use tracing::{debug, warn};

/// Sink for `[BUG_REPORT]` payloads.
const BUG_REPORT_PATH: &str = "/data/bug-reports.jsonl";

pub fn route(driver: &mut Driver, conn: ConnectionId, envelope: ClientEnvelope) {
    match envelope {
        ClientEnvelope::Auth(request) => {
            if let Some((record, fresh)) = driver.login.handle_auth(&mut driver.world, conn, request)
            {
                session::bind_player(driver, conn, record, fresh);
            }
        }

        ClientEnvelope::SessionResume { token } => {
            session::handle_resume(driver, conn, &token);
        }

        ClientEnvelope::Gui(payload) => {
            let Some(player) = bound_player(driver, conn) else {
                debug!(%conn, "GUI envelope before binding dropped");
                return;
            };
            driver.world.context.push(ActorContext::for_player(player));
            let extra = [("gui.payload", payload.to_string())];
            let result = driver.world.run_hook(player, HookKind::Gui, &extra);
            driver.world.context.pop();
            if let Err(e) = result {
                warn!(%player, error = %e, "on_gui failed");
            }
        }

        ClientEnvelope::Complete { prefix } => {
            let Some(player) = bound_player(driver, conn) else {
                return;
            };
            let level = driver
                .world
                .players
                .get_by_object(player)
                .map(|entry| entry.level)
                .unwrap_or(Level::Player);
            // Completion is a builder tool; players get silence.
            if level < Level::Builder {
                return;
            }
            let candidates = driver.world.completion_candidates(&prefix, level);
            if let Some(handle) = driver.world.connections.get_mut(conn) {
                handle.send_envelope(&ServerEnvelope::Completion { candidates });
            }
        }

        ClientEnvelope::BugReport(payload) => {
            let reporter = bound_player(driver, conn)
                .and_then(|player| driver.world.players.get_by_object(player))
                .map(|entry| entry.name.clone())
                .unwrap_or_else(|| "anonymous".to_string());
            let line = serde_json::json!({
                "at_ms": driver.world.epoch_ms(),
                "reporter": reporter,
                "report": payload,
            });
            if let Err(e) = driver
                .world
                .store
                .append_line(BUG_REPORT_PATH, &line.to_string())
            {
                warn!(error = %e, "bug report sink failed");
            }
        }
    }
}

fn bound_player(driver: &Driver, conn: ConnectionId) -> Option<loam_core::ObjectId> {
    match driver.world.connections.get(conn)?.handler {
        BoundHandler::Player(player) => Some(player),
        BoundHandler::Login => None,
    }
}

#[cfg(test)]
#[path = "oob_tests.rs"]
mod tests;
