//! Commonly used types, re-exported in one place.
pub use crate::config::SESSION_COOKIE;
pub use crate::cookies::{Cookie, CookieBuilder, Cookies, ToCookie};
pub use crate::error::Error;
pub use crate::session::{Role, Session};
