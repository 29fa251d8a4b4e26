// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band envelopes on the line transport.
//!
//! Inbound frames beginning with a zero byte carry a bracketed tag and a
//! JSON payload: `\x00[SESSION]{"type":"session_resume","token":"..."}`.
//! Outbound envelopes use the same framing. Everything else on the wire
//! is plain newline-framed UTF-8 text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Leading byte that marks an out-of-band frame.
pub const OOB_MARK: char = '\u{0}';

/// Errors from OOB frame parsing
#[derive(Debug, Error)]
pub enum OobError {
    #[error("malformed OOB frame (missing tag)")]
    MissingTag,

    #[error("unknown OOB prefix: [{0}]")]
    UnknownPrefix(String),

    #[error("invalid {tag} payload: {source}")]
    Payload {
        tag: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// GUI-initiated authentication request (`[AUTH_REQ]`).
///
/// Forwarded verbatim to the login daemon's auth handler. Fields are
/// optional at the wire level; the login daemon validates presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthRequest {
    Login {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
    Register {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(rename = "confirmPassword", default)]
        confirm_password: Option<String>,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        gender: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct SessionPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    token: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct CompletePayload {
    #[serde(default)]
    prefix: String,
}

/// A parsed inbound out-of-band envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEnvelope {
    /// `[AUTH_REQ]`: GUI-initiated authentication.
    Auth(AuthRequest),
    /// `[SESSION]`: session resume attempt.
    SessionResume { token: String },
    /// `[GUI]`: opaque payload for the bound player's GUI hook.
    Gui(Value),
    /// `[COMPLETE]`: tab-completion request (Builder+ only).
    Complete { prefix: String },
    /// `[BUG_REPORT]`: opaque report for the bug sink.
    BugReport(Value),
}

/// Parse an inbound frame. Returns `None` when the frame is not
/// out-of-band (no leading zero byte) and should be treated as a plain
/// text line.
pub fn parse_frame(frame: &str) -> Option<Result<ClientEnvelope, OobError>> {
    let rest = frame.strip_prefix(OOB_MARK)?;
    Some(parse_tagged(rest))
}

fn parse_tagged(rest: &str) -> Result<ClientEnvelope, OobError> {
    let rest = rest.strip_prefix('[').ok_or(OobError::MissingTag)?;
    let end = rest.find(']').ok_or(OobError::MissingTag)?;
    let (tag, payload) = (&rest[..end], &rest[end + 1..]);

    match tag {
        "AUTH_REQ" => serde_json::from_str(payload)
            .map(ClientEnvelope::Auth)
            .map_err(|source| OobError::Payload {
                tag: "AUTH_REQ",
                source,
            }),
        "SESSION" => {
            let p: SessionPayload =
                serde_json::from_str(payload).map_err(|source| OobError::Payload {
                    tag: "SESSION",
                    source,
                })?;
            if p.kind != "session_resume" {
                return Err(OobError::UnknownPrefix(format!("SESSION:{}", p.kind)));
            }
            Ok(ClientEnvelope::SessionResume { token: p.token })
        }
        "GUI" => serde_json::from_str(payload)
            .map(ClientEnvelope::Gui)
            .map_err(|source| OobError::Payload {
                tag: "GUI",
                source,
            }),
        "COMPLETE" => {
            let p: CompletePayload =
                serde_json::from_str(payload).map_err(|source| OobError::Payload {
                    tag: "COMPLETE",
                    source,
                })?;
            Ok(ClientEnvelope::Complete { prefix: p.prefix })
        }
        "BUG_REPORT" => serde_json::from_str(payload)
            .map(ClientEnvelope::BugReport)
            .map_err(|source| OobError::Payload {
                tag: "BUG_REPORT",
                source,
            }),
        other => Err(OobError::UnknownPrefix(other.to_string())),
    }
}

/// An outbound out-of-band envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEnvelope {
    /// Fresh resume token, issued on login and on every resume.
    SessionToken { token: String, expires_at: u64 },
    /// Resume outcome.
    SessionResume { success: bool },
    /// Resume rejected; client should fall through to normal login.
    SessionInvalid { reason: String },
    /// Tab-completion candidates.
    Completion { candidates: Vec<String> },
    /// Authentication outcome for `[AUTH_REQ]`.
    AuthResponse {
        success: bool,
        message: String,
        name: Option<String>,
    },
    /// Opaque GUI payload, forwarded verbatim.
    Gui(Value),
}

impl ServerEnvelope {
    /// Wire tag for this envelope's channel.
    pub fn tag(&self) -> &'static str {
        match self {
            ServerEnvelope::SessionToken { .. }
            | ServerEnvelope::SessionResume { .. }
            | ServerEnvelope::SessionInvalid { .. } => "SESSION",
            ServerEnvelope::Completion { .. } => "COMPLETE",
            ServerEnvelope::AuthResponse { .. } => "AUTH_RESP",
            ServerEnvelope::Gui(_) => "GUI",
        }
    }

    /// JSON payload. GUI envelopes pass through untouched; everything
    /// else carries a `type` discriminator.
    pub fn payload(&self) -> Value {
        match self {
            ServerEnvelope::SessionToken { token, expires_at } => serde_json::json!({
                "type": "session_token",
                "token": token,
                "expiresAt": expires_at,
            }),
            ServerEnvelope::SessionResume { success } => serde_json::json!({
                "type": "session_resume",
                "success": success,
            }),
            ServerEnvelope::SessionInvalid { reason } => serde_json::json!({
                "type": "session_invalid",
                "reason": reason,
            }),
            ServerEnvelope::Completion { candidates } => serde_json::json!({
                "type": "completion",
                "candidates": candidates,
            }),
            ServerEnvelope::AuthResponse {
                success,
                message,
                name,
            } => {
                let mut obj = serde_json::json!({
                    "type": "auth_response",
                    "success": success,
                    "message": message,
                });
                if let (Some(map), Some(n)) = (obj.as_object_mut(), name) {
                    map.insert("name".into(), Value::String(n.clone()));
                }
                obj
            }
            ServerEnvelope::Gui(value) => value.clone(),
        }
    }

    /// Encode as a single wire frame (no trailing newline).
    pub fn encode(&self) -> String {
        format!("{}[{}]{}", OOB_MARK, self.tag(), self.payload())
    }
}

#[cfg(test)]
#[path = "oob_tests.rs"]
mod tests;
