//! Upload gate: trades the configured upload code for short-lived session tokens.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::GateError;

const MAX_TTL_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct UploadGate {
    code_digest: Option<[u8; 32]>,
    ttl: Duration,
    sessions: HashMap<String, DateTime<Utc>>,
}

fn digest(s: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(s.as_bytes()));
    out
}

fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl UploadGate {
    /// A blank or missing code disables uploads.
    pub fn new(code: Option<&str>, ttl_minutes: i64) -> Self {
        let code_digest = code.filter(|c| !c.trim().is_empty()).map(digest);
        Self {
            code_digest,
            ttl: Duration::minutes(ttl_minutes.clamp(1, MAX_TTL_MINUTES)),
            sessions: HashMap::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.code_digest.is_some()
    }

    pub fn unlock(&mut self, presented: &str, now: DateTime<Utc>) -> Result<Session, GateError> {
        let Some(expected) = self.code_digest.as_ref() else {
            return Err(GateError::Disabled);
        };
        if !digests_match(expected, &digest(presented)) {
            tracing::warn!("upload unlock rejected");
            return Err(GateError::InvalidCode);
        }
        self.purge_expired(now);
        let session = Session {
            token: Uuid::new_v4().to_string(),
            expires_at: now + self.ttl,
        };
        self.sessions
            .insert(session.token.clone(), session.expires_at);
        tracing::info!(expires_at = %session.expires_at, "upload session issued");
        Ok(session)
    }

    pub fn authorize(&mut self, token: &str, now: DateTime<Utc>) -> Result<(), GateError> {
        if !self.enabled() {
            return Err(GateError::Disabled);
        }
        self.purge_expired(now);
        if self.sessions.contains_key(token) {
            Ok(())
        } else {
            Err(GateError::InvalidSession)
        }
    }

    /// Revokes a session. Returns whether it was live.
    pub fn lock(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.sessions.retain(|_, expires_at| *expires_at > now);
    }
}
