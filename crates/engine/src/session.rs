// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session resume tokens.
//!
//! A token is `base64url(claims-json) . base64url(hmac-sha256)` under a
//! process secret. Tokens are single-use: validation consumes the nonce
//! and the resume path issues a fresh token. The remote-address check is
//! optional for clients behind NAT.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use loam_core::ConnectionId;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Signed token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Player name (display case).
    pub name: String,
    /// Connection the token was issued on.
    pub connection: u64,
    /// Remote IP the token was issued to.
    pub remote: String,
    pub issued_at_ms: u64,
    pub expires_at_ms: u64,
    /// Single-use marker.
    pub nonce: String,
}

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at_ms: u64,
}

/// Token validation failures. Never shown on the player stream; they
/// surface only as a `session_invalid` envelope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("bad signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("remote address mismatch")]
    AddressMismatch,

    #[error("token already used or revoked")]
    Unknown,
}

/// Issues and validates single-use resume tokens.
pub struct SessionManager {
    secret: Vec<u8>,
    validate_ip: bool,
    ttl_ms: u64,
    /// Nonces of outstanding (unused, unexpired) tokens.
    live: std::collections::HashMap<String, SessionClaims>,
}

impl SessionManager {
    /// Build from config. An empty secret gets a random one; resume
    /// then works within a process lifetime but not across restarts.
    pub fn new(secret: &str, validate_ip: bool, ttl_ms: u64) -> Self {
        let secret = if secret.is_empty() {
            format!(
                "{}{}",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            )
        } else {
            secret.to_string()
        };
        Self {
            secret: secret.into_bytes(),
            validate_ip,
            ttl_ms,
            live: std::collections::HashMap::new(),
        }
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Issue a token bound to (player, connection, remote address).
    pub fn create_token(
        &mut self,
        name: &str,
        connection: ConnectionId,
        remote_ip: &str,
        now_ms: u64,
    ) -> IssuedToken {
        let claims = SessionClaims {
            name: name.to_string(),
            connection: connection.as_u64(),
            remote: remote_ip.to_string(),
            issued_at_ms: now_ms,
            expires_at_ms: now_ms + self.ttl_ms,
            nonce: uuid::Uuid::new_v4().simple().to_string(),
        };
        let token = self.encode(&claims);
        let expires_at_ms = claims.expires_at_ms;
        self.live.insert(claims.nonce.clone(), claims);
        IssuedToken {
            token,
            expires_at_ms,
        }
    }

    /// Validate and consume a token. Success removes the nonce, so a
    /// second validation of the same token fails with `Unknown`.
    pub fn validate(
        &mut self,
        token: &str,
        remote_ip: &str,
        now_ms: u64,
    ) -> Result<SessionClaims, TokenError> {
        let claims = self.decode(token)?;

        if now_ms >= claims.expires_at_ms {
            // Expired nonces are dead either way.
            self.live.remove(&claims.nonce);
            return Err(TokenError::Expired);
        }
        if self.validate_ip && claims.remote != remote_ip {
            return Err(TokenError::AddressMismatch);
        }
        // Single use: the nonce must still be outstanding.
        self.live
            .remove(&claims.nonce)
            .ok_or(TokenError::Unknown)?;
        Ok(claims)
    }

    /// Explicitly revoke a token (logout, takeover).
    pub fn invalidate(&mut self, token: &str) -> bool {
        match self.decode(token) {
            Ok(claims) => self.live.remove(&claims.nonce).is_some(),
            Err(_) => false,
        }
    }

    /// Drop expired nonces; called opportunistically by the driver.
    pub fn prune_expired(&mut self, now_ms: u64) -> usize {
        let before = self.live.len();
        self.live.retain(|_, claims| claims.expires_at_ms > now_ms);
        before - self.live.len()
    }

    pub fn outstanding(&self) -> usize {
        self.live.len()
    }

    fn encode(&self, claims: &SessionClaims) -> String {
        // Claims are a closed serde struct; serialization cannot fail.
        let json = serde_json::to_vec(claims).unwrap_or_default();
        let body = URL_SAFE_NO_PAD.encode(&json);
        let sig = URL_SAFE_NO_PAD.encode(self.sign(&json));
        format!("{body}.{sig}")
    }

    fn decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let (body, sig) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| TokenError::Malformed)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac();
        mac.update(&json);
        mac.verify_slice(&sig).map_err(|_| TokenError::BadSignature)?;

        serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("hmac accepts any key length"),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
