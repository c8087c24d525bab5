//! HMAC-SHA256 signing primitives used by the session codec.
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::config::secret;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

fn mac() -> HmacSha256 {
    // HMAC accepts keys of any length.
    HmacSha256::new_from_slice(secret().as_bytes()).expect("hmac key")
}

/// Base64-encode bytes using the URL-safe, unpadded alphabet.
///
/// Every character of the output is a valid cookie octet, so encoded values
/// can be stored in a `Set-Cookie` header without escaping. The input is
/// arbitrary bytes; UTF-8 text round-trips exactly.
pub fn base64_encode(data: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(data)
}

/// Decode a string produced by [`base64_encode`].
pub fn base64_decode(value: &str) -> Result<Vec<u8>, Error> {
    Ok(general_purpose::URL_SAFE_NO_PAD.decode(value)?)
}

/// Sign some bytes using the configured secret.
///
/// Returns the base64-encoded HMAC-SHA256 tag.
///
/// # Example
///
/// ```
/// use signed_session::crypto::{sign, verify};
///
/// let signature = sign(b"hello world");
/// assert!(verify(b"hello world", &signature));
/// ```
pub fn sign(data: &[u8]) -> String {
    let mut mac = mac();
    mac.update(data);

    base64_encode(&mac.finalize().into_bytes())
}

/// Check a signature produced by [`sign`].
///
/// The tag comparison is constant-time, provided by the `hmac` crate.
/// Comparing tags with `==` would leak how many leading bytes matched.
pub fn verify(data: &[u8], signature: &str) -> bool {
    let signature = match base64_decode(signature) {
        Ok(signature) => signature,
        Err(_) => return false,
    };

    let mut mac = mac();
    mac.update(data);

    mac.verify_slice(&signature).is_ok()
}
