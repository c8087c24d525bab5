//! Signing secret and session settings.
use std::env::var;

use time::Duration;
use tracing::warn;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

// Reachable only when no secret is configured in the environment.
const DEV_SECRET: &str = "dev-secret-key";

/// How long a session stays valid after signing.
pub fn session_duration() -> Duration {
    Duration::days(7)
}

/// Resolve the signing secret from the process environment.
///
/// The secret is read on every call rather than cached at startup. Hosted
/// runtimes inject secrets into the environment on their own schedule, and a
/// copy taken at module load could sign and verify with a stale key for the
/// lifetime of the process.
///
/// Checks `SESSION_SECRET` first, then `GITHUB_CLIENT_SECRET` (deployments
/// that log in through GitHub OAuth can reuse the client secret as the
/// signing key). If neither is set, a fixed development key is used; that
/// key must not reach production.
pub fn secret() -> String {
    if let Ok(secret) = var("SESSION_SECRET") {
        return secret;
    }

    if let Ok(secret) = var("GITHUB_CLIENT_SECRET") {
        return secret;
    }

    warn!("no signing secret configured, sessions are signed with the development key");

    DEV_SECRET.to_string()
}
