//! HTTP cookies.
//!
//! This module handles decoding the `Cookie` header, generating `Set-Cookie`
//! headers, and moving session tokens in and out of the `session` cookie.
use std::collections::HashMap;

use time::{Duration, OffsetDateTime};

use crate::config::{session_duration, SESSION_COOKIE};
use crate::error::Error;
use crate::session::Session;

/// Cookies storage.
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    cookies: HashMap<String, Cookie>,
}

impl Cookies {
    /// Create new empty cookies storage.
    pub fn new() -> Self {
        Self {
            cookies: HashMap::new(),
        }
    }

    /// Parse cookies from the `Cookie` header.
    ///
    /// # Example
    ///
    /// ```
    /// # use signed_session::Cookies;
    /// let cookies = Cookies::parse("theme=dark; session=foo");
    /// assert_eq!(cookies.get("theme").unwrap().value(), "dark");
    /// ```
    pub fn parse(value: &str) -> Cookies {
        let parts = value.split(";");
        let mut cookies = HashMap::new();

        for part in parts {
            if let Some(cookie) = Cookie::parse(part.trim()) {
                cookies.insert(cookie.name.to_string(), cookie);
            }
        }

        Cookies { cookies }
    }

    /// Add a cookie.
    ///
    /// If this is done to the response, the cookie will be sent to the client
    /// using the `Set-Cookie` header.
    pub fn add(&mut self, cookie: impl ToCookie) {
        let cookie = cookie.to_cookie();
        self.cookies.insert(cookie.name.clone(), cookie);
    }

    /// Get a cookie sent by the client.
    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    /// Get the verified session, if a valid session cookie is set.
    ///
    /// A missing cookie, a forged or malformed token, and an expired
    /// session all look the same to the caller: no session.
    pub fn get_session(&self) -> Option<Session> {
        let cookie = self.get(SESSION_COOKIE)?;
        Session::verify(cookie.value())
    }

    /// Sign a session and set it as a cookie to be sent to the client.
    /// The cookie expires when the session does.
    pub fn add_session(&mut self, session: &Session) -> Result<(), Error> {
        let mut builder = CookieBuilder::new()
            .name(SESSION_COOKIE)
            .value(session.token()?)
            .max_age(session_duration())
            .path("/")
            .secure()
            .http_only()
            .lax();

        if let Some(exp) = session.exp {
            builder = builder.expiration(OffsetDateTime::from_unix_timestamp(exp / 1000)?);
        }

        self.add(builder.build());

        Ok(())
    }

    /// Set an already-expired, empty session cookie, telling the client
    /// to delete it. Deleting the cookie is the only way to revoke a
    /// session before its expiry.
    pub fn delete_session(&mut self) {
        self.add(
            CookieBuilder::new()
                .name(SESSION_COOKIE)
                .value("")
                .max_age(Duration::seconds(0))
                .path("/")
                .secure()
                .http_only()
                .lax()
                .build(),
        );
    }

    /// Convert cookies to `Set-Cookie` headers which will be sent to the client.
    pub fn to_headers(&self) -> Vec<u8> {
        let mut headers = vec![];
        for (_, cookie) in &self.cookies {
            headers.extend_from_slice(format!("set-cookie: {}\r\n", cookie).as_bytes());
        }
        headers
    }
}

/// Convert a value to a cookie.
///
/// This is syntax sugar to help create cookies more easily. Most use cases
/// would want to use the [`CookieBuilder`] instead.
pub trait ToCookie {
    fn to_cookie(self) -> Cookie;
}

impl ToCookie for (&str, &str) {
    fn to_cookie(self) -> Cookie {
        CookieBuilder::new().name(self.0).value(self.1).build()
    }
}

impl ToCookie for (String, String) {
    fn to_cookie(self) -> Cookie {
        CookieBuilder::new().name(self.0).value(self.1).build()
    }
}

impl ToCookie for Cookie {
    fn to_cookie(self) -> Cookie {
        self
    }
}

/// A browser cookie.
#[derive(Debug, Clone, Default)]
pub struct Cookie {
    name: String,
    value: String,
    expiration: Option<OffsetDateTime>,
    max_age: Option<Duration>,
    path: Option<String>,
    domain: Option<String>,
    http_only: bool,
    secure: bool,
    same_site: Option<String>,
}

impl Cookie {
    /// Parse a single cookie from the `Cookie` header.
    fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(";");
        let mut builder = CookieBuilder::new();

        match parts.next().map(Self::key_value) {
            Some((Some(key), Some(value))) => {
                builder = builder.name(key).value(percent_decode(&value))
            }
            Some((Some(key), None)) => builder = builder.name(key),
            _ => return None,
        }

        for part in parts {
            match Self::key_value(part) {
                (Some(key), value) => match key.trim() {
                    "Domain" => {
                        if let Some(value) = value {
                            builder = builder.domain(value);
                        }
                    }
                    "Path" => {
                        if let Some(value) = value {
                            builder = builder.path(value);
                        }
                    }
                    "HttpOnly" => {
                        builder = builder.http_only();
                    }
                    "Secure" => {
                        builder = builder.secure();
                    }
                    "Max-Age" => {
                        if let Some(value) = value {
                            match value.parse::<i64>() {
                                Ok(value) => {
                                    builder = builder.max_age(Duration::seconds(value));
                                }
                                Err(_) => continue,
                            }
                        }
                    }
                    _ => continue,
                },

                _ => continue,
            };
        }

        Some(builder.build())
    }

    fn key_value(s: &str) -> (Option<String>, Option<String>) {
        // Split on the first `=` only; cookie values may contain `=`.
        match s.split_once('=') {
            Some((key, value)) => (Some(key.to_owned()), Some(value.to_owned())),
            None if !s.is_empty() => (Some(s.to_owned()), None),
            None => (None, None),
        }
    }

    /// Get cookie value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the cookie is secure.
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Check if the cookie is HTTP-only.
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    /// Get the cookie's `Max-Age` attribute if any is set.
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }
}

impl std::fmt::Display for Cookie {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;

        if let Some(ref max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.whole_seconds())?;
        }

        if self.secure {
            write!(f, "; Secure")?;
        }

        if self.http_only {
            write!(f, "; HttpOnly")?;
        }

        if let Some(ref path) = self.path {
            write!(f, "; Path={}", path)?;
        } else {
            write!(f, "; Path=/")?;
        }

        if let Some(ref domain) = self.domain {
            write!(f, "; Domain={}", domain)?;
        }

        if let Some(ref same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site)?;
        } else {
            write!(f, "; SameSite=Lax")?;
        }

        if let Some(ref expiration) = self.expiration {
            if let Ok(expires) =
                expiration.format(&time::format_description::well_known::Rfc2822)
            {
                write!(f, "; Expires={}", expires)?;
            }
        }

        Ok(())
    }
}

/// Decode percent-encoded bytes in a cookie value.
///
/// Some clients percent-encode values; session tokens use the URL-safe
/// base64 alphabet and pass through unchanged.
fn percent_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut iter = s.bytes().peekable();

    while let Some(b) = iter.next() {
        if b == b'%' {
            let hex = [iter.next(), iter.next()];
            match hex {
                [Some(hi), Some(lo)] => {
                    let pair = [hi, lo];
                    match u8::from_str_radix(std::str::from_utf8(&pair).unwrap_or(""), 16) {
                        Ok(byte) => bytes.push(byte),
                        Err(_) => bytes.extend_from_slice(&[b, hi, lo]),
                    }
                }
                _ => bytes.push(b),
            }
        } else {
            bytes.push(b);
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Cookie builder which helps with creating cookies with multiple attributes.
///
/// # Example
///
/// ```
/// # use signed_session::CookieBuilder;
/// use time::Duration;
///
/// let cookie = CookieBuilder::new()
///     .name("theme")
///     .value("dark")
///     .max_age(Duration::days(4))
///     .secure()
///     .http_only()
///     .build();
/// ```
#[derive(Clone, Debug, Default)]
pub struct CookieBuilder {
    cookie: Cookie,
}

impl CookieBuilder {
    /// Create new cookie builder.
    pub fn new() -> Self {
        Self {
            cookie: Cookie::default(),
        }
    }

    /// Set cookie name.
    pub fn name(mut self, name: impl ToString) -> Self {
        self.cookie.name = name.to_string();
        self
    }

    /// Set cookie value.
    pub fn value(mut self, value: impl ToString) -> Self {
        self.cookie.value = value.to_string();
        self
    }

    /// Set cookie `Expires` attribute.
    pub fn expiration(mut self, expiration: OffsetDateTime) -> Self {
        self.cookie.expiration = Some(expiration);
        self
    }

    /// Set cookie `Max-Age` attribute.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.cookie.max_age = Some(max_age);
        self
    }

    /// Set cookie `Path` attribute.
    pub fn path(mut self, path: impl ToString) -> Self {
        self.cookie.path = Some(path.to_string());
        self
    }

    /// Set cookie `Domain` attribute.
    pub fn domain(mut self, domain: impl ToString) -> Self {
        self.cookie.domain = Some(domain.to_string());
        self
    }

    /// Hide the cookie from JavaScript running in the browser.
    /// This is the `HttpOnly` attribute.
    pub fn http_only(mut self) -> Self {
        self.cookie.http_only = true;
        self
    }

    /// Make sure the cookie is sent only via HTTPS connections.
    /// This is the `Secure` attribute.
    pub fn secure(mut self) -> Self {
        self.cookie.secure = true;
        self
    }

    /// Set cookie `SameSite` attribute to `Lax`.
    ///
    /// This setting is desirable if you want the cookie set on redirects
    /// from external sites, e.g. an OAuth provider.
    pub fn lax(mut self) -> Self {
        self.cookie.same_site = Some("Lax".to_string());
        self
    }

    /// Set cookie `SameSite` attribute to `Strict`.
    ///
    /// This cookie won't be set on redirects from external links,
    /// breaking OAuth logins.
    pub fn strict(mut self) -> Self {
        self.cookie.same_site = Some("Strict".to_string());
        self
    }

    /// Build the cookie.
    ///
    /// This consumes the builder.
    pub fn build(self) -> Cookie {
        self.cookie
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session::Role;

    #[test]
    fn test_parsing_cookies() {
        let value = "name=some_value; Max-Age=55; Secure";
        let cookie = Cookie::parse(value).expect("cookie parse");
        assert_eq!(cookie.name(), "name");
        assert_eq!(cookie.value(), "some_value");
        assert!(cookie.secure());
        assert_eq!(cookie.max_age(), Some(Duration::seconds(55)));

        let value = "random=hello_world";
        let cookie = Cookie::parse(value).expect("cookie parse");
        assert_eq!(cookie.name(), "random");
        assert_eq!(cookie.value(), "hello_world");

        // Values may contain `=`.
        let cookie = Cookie::parse("data=a=b=c").expect("cookie parse");
        assert_eq!(cookie.value(), "a=b=c");

        // Percent-encoded values are decoded.
        let cookie = Cookie::parse("greeting=hello%20world").expect("cookie parse");
        assert_eq!(cookie.value(), "hello world");
    }

    #[test]
    fn test_session_cookie_round_trip() {
        let session = Session::new("alice", Role::Admin);

        let mut cookies = Cookies::new();
        cookies.add_session(&session).expect("add session");

        let header = cookies.get(SESSION_COOKIE).expect("session cookie");
        assert!(header.secure());
        assert!(header.http_only());
        assert_eq!(header.max_age(), Some(Duration::days(7)));

        let formatted = header.to_string();
        assert!(formatted.contains("Max-Age=604800"));
        assert!(formatted.contains("SameSite=Lax"));
        assert!(formatted.contains("Path=/"));

        // Client sends the cookie back.
        let cookies = Cookies::parse(&format!("{}={}", SESSION_COOKIE, header.value()));
        let verified = cookies.get_session().expect("valid session");
        assert_eq!(verified.username, "alice");
        assert_eq!(verified.role, Role::Admin);
    }

    #[test]
    fn test_tampered_session_cookie() {
        let mut cookies = Cookies::new();
        cookies
            .add_session(&Session::new("alice", Role::User))
            .expect("add session");

        let token = cookies.get(SESSION_COOKIE).unwrap().value().to_string();
        let tampered = format!("{}={}x", SESSION_COOKIE, token);

        assert!(Cookies::parse(&tampered).get_session().is_none());
        assert!(Cookies::parse("other=value").get_session().is_none());
        assert!(Cookies::parse("").get_session().is_none());
    }

    #[test]
    fn test_delete_session() {
        let mut cookies = Cookies::new();
        cookies.delete_session();

        let cookie = cookies.get(SESSION_COOKIE).expect("session cookie");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::seconds(0)));

        let headers = String::from_utf8(cookies.to_headers()).expect("utf8");
        assert!(headers.starts_with("set-cookie: session="));
        assert!(headers.contains("Max-Age=0"));
    }
}
