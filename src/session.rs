//! Session payload and the signed token codec.
//!
//! A token is two base64 segments joined by a dot: the JSON-encoded payload,
//! and an HMAC-SHA256 tag computed over the payload segment. Verification is
//! stateless. There is no server-side registry of live tokens, so a token
//! stays valid until its expiry or until the client deletes the cookie.
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::config::session_duration;
use crate::crypto::{base64_decode, base64_encode, sign, verify};
use crate::error::Error;

/// Authorization level carried by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// The payload carried inside a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identity string, e.g. a GitHub login. Not validated.
    pub username: String,
    /// Authorization level.
    pub role: Role,
    /// Absolute expiry, UNIX epoch milliseconds. Stamped at creation;
    /// a payload without one never expires by clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

impl Session {
    /// Create a session expiring after the standard duration (7 days).
    pub fn new(username: impl ToString, role: Role) -> Self {
        Self {
            username: username.to_string(),
            role,
            exp: Some(now_ms() + session_duration().whole_milliseconds() as i64),
        }
    }

    /// Create an admin session.
    pub fn admin(username: impl ToString) -> Self {
        Self::new(username, Role::Admin)
    }

    /// Serialize and sign this session into a token.
    ///
    /// # Example
    ///
    /// ```
    /// use signed_session::{Session, Role};
    ///
    /// let token = Session::new("alice", Role::Admin).token().expect("sign");
    /// let session = Session::verify(&token).expect("valid");
    ///
    /// assert_eq!(session.username, "alice");
    /// assert_eq!(session.role, Role::Admin);
    /// ```
    pub fn token(&self) -> Result<String, Error> {
        let json = serde_json::to_string(self)?;
        let payload = base64_encode(json.as_bytes());
        let signature = sign(payload.as_bytes());

        Ok(format!("{}.{}", payload, signature))
    }

    /// Verify a token received from a client and decode its payload.
    ///
    /// Returns `None` for any invalid token: bad signature, malformed
    /// segments, undecodable payload, or past expiry. The causes are
    /// deliberately indistinguishable to the caller, so a rejected request
    /// carries no hint about which check failed. Safe to call on
    /// attacker-controlled input straight off a `Cookie` header.
    pub fn verify(token: &str) -> Option<Self> {
        Self::verify_at(token, now_ms())
    }

    fn verify_at(token: &str, now: i64) -> Option<Self> {
        let (payload, signature) = match token.split_once('.') {
            Some(parts) => parts,
            None => {
                debug!("session token is not two segments");
                return None;
            }
        };

        if payload.is_empty() || signature.is_empty() {
            debug!("session token has an empty segment");
            return None;
        }

        // Check the signature before touching the payload bytes.
        if !verify(payload.as_bytes(), signature) {
            debug!("session token signature mismatch");
            return None;
        }

        let json = match base64_decode(payload) {
            Ok(json) => json,
            Err(_) => {
                debug!("session token payload is not valid base64");
                return None;
            }
        };

        let session: Session = match serde_json::from_slice(&json) {
            Ok(session) => session,
            Err(_) => {
                debug!("session token payload is not a session");
                return None;
            }
        };

        if let Some(exp) = session.exp {
            if exp < now {
                debug!("session token expired");
                return None;
            }
        }

        Some(session)
    }

    /// Check if the session has passed its expiry.
    pub fn expired(&self) -> bool {
        match self.exp {
            Some(exp) => exp < now_ms(),
            None => false,
        }
    }

    /// This session belongs to an admin and hasn't expired.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin && !self.expired()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip() {
        let token = Session::new("alice", Role::Admin).token().expect("sign");

        let parts = token.split('.').collect::<Vec<_>>();
        assert_eq!(parts.len(), 2);

        let session = Session::verify(&token).expect("valid token");
        assert_eq!(session.username, "alice");
        assert_eq!(session.role, Role::Admin);
        assert!(session.is_admin());

        // Expiry stamped roughly seven days out.
        let exp = session.exp.expect("exp set");
        let week = session_duration().whole_milliseconds() as i64;
        let drift = exp - now_ms() - week;
        assert!(drift.abs() < 1_000);
    }

    #[test]
    fn test_unicode_username() {
        let token = Session::new("李雷和韩梅梅", Role::User).token().expect("sign");
        let session = Session::verify(&token).expect("valid token");
        assert_eq!(session.username, "李雷和韩梅梅");
        assert_eq!(session.role, Role::User);
        assert!(!session.is_admin());
    }

    #[test]
    fn test_tampered_signature() {
        let token = Session::new("alice", Role::Admin).token().expect("sign");

        // Truncated.
        assert!(Session::verify(&token[..token.len() - 1]).is_none());

        // Last character flipped.
        let last = token.chars().last().unwrap();
        let flipped = if last == 'A' { 'B' } else { 'A' };
        let mut tampered = token[..token.len() - 1].to_string();
        tampered.push(flipped);
        assert!(Session::verify(&tampered).is_none());
    }

    #[test]
    fn test_tampered_payload() {
        // Take a user session's signature and pair it with an
        // escalated payload.
        let user = Session::new("mallory", Role::User);
        let token = user.token().expect("sign");
        let signature = token.split_once('.').unwrap().1;

        let mut escalated = user.clone();
        escalated.role = Role::Admin;
        let json = serde_json::to_string(&escalated).expect("json");
        let forged = format!("{}.{}", base64_encode(json.as_bytes()), signature);

        assert!(Session::verify(&forged).is_none());
    }

    #[test]
    fn test_expired() {
        let session = Session {
            username: "alice".into(),
            role: Role::Admin,
            exp: Some(now_ms() - 1),
        };
        let token = session.token().expect("sign");

        assert!(session.expired());
        assert!(!session.is_admin());
        assert!(Session::verify(&token).is_none());

        // The same token was valid a minute ago.
        assert!(Session::verify_at(&token, now_ms() - 60_000).is_some());
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let session = Session {
            username: "alice".into(),
            role: Role::User,
            exp: None,
        };
        let token = session.token().expect("sign");

        assert!(!session.expired());
        assert_eq!(Session::verify(&token), Some(session));
    }

    #[test]
    fn test_malformed_tokens() {
        let malformed = [
            "",
            ".",
            "..",
            "no dot here",
            "a.",
            ".b",
            "%%%.$$$",
            "not-base64!.also-not-base64!",
        ];

        for token in malformed {
            assert_eq!(Session::verify(token), None, "token: {:?}", token);
        }
    }

    #[test]
    fn test_signed_but_not_json() {
        // Correctly signed payload segment that doesn't decode to a session.
        let payload = base64_encode(b"hello world");
        let token = format!("{}.{}", payload, sign(payload.as_bytes()));

        assert_eq!(Session::verify(&token), None);
    }

    #[test]
    fn test_wire_format() {
        let session = Session {
            username: "alice".into(),
            role: Role::Admin,
            exp: Some(1735689600000),
        };

        let json = serde_json::to_string(&session).expect("json");
        assert_eq!(
            json,
            r#"{"username":"alice","role":"admin","exp":1735689600000}"#
        );
    }
}
