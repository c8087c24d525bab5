//! Stateless, tamper-evident session tokens for cookie-based authentication.
//!
//! A session is a small JSON payload — username, role, absolute expiry —
//! signed with HMAC-SHA256 using a shared secret. The token is two base64
//! segments joined by a dot and fits in a single cookie; no session state is
//! kept on the server, so any number of instances can verify a token and a
//! redeploy doesn't log anyone out.
//!
//! # Getting started
//!
//! Sign a session after the user proves their identity (e.g. an OAuth
//! callback), and verify it on every request that requires authorization:
//!
//! ```
//! use signed_session::prelude::*;
//!
//! // OAuth callback: set the cookie.
//! let mut cookies = Cookies::new();
//! cookies.add_session(&Session::admin("alice")).expect("sign");
//! let headers = cookies.to_headers();
//! assert!(headers.starts_with(b"set-cookie: session="));
//!
//! // Later, on an authenticated route.
//! let cookies = Cookies::parse("session=not-a-real-token");
//! assert!(cookies.get_session().is_none());
//! ```
//!
//! A forged, expired, malformed, or absent token all look the same to the
//! caller: no session. Treat that as "please log in".
//!
//! The signing secret is read from the `SESSION_SECRET` (or
//! `GITHUB_CLIENT_SECRET`) environment variable on every call; see
//! [`config::secret`].
pub mod config;
pub mod cookies;
pub mod crypto;
pub mod error;
pub mod prelude;
pub mod session;

pub use cookies::{Cookie, CookieBuilder, Cookies};
pub use error::Error;
pub use session::{Role, Session};
