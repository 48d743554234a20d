//! Byte/string codecs shared across the crate.
//!
//! Every binary field on the wire is base64 with the URL-safe alphabet and
//! no padding. Collection and item identifiers additionally narrow the
//! alphabet to stay alphanumeric: `-` becomes `a`, `_` becomes `b`. That
//! concentrates two of the 64 alphabet slots; the bias is accepted because
//! a uid is an identifier, not key material.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::Error;

/// Raw length of a freshly generated object uid (encodes to 32 chars).
pub const UID_RAW_BYTES: usize = 24;

pub fn to_base64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn from_base64(encoded: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| Error::encoding(format!("malformed base64 ({} chars)", encoded.len())))
}

/// Draw `N` bytes of fresh entropy from the process CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], Error> {
    let mut out = [0u8; N];
    getrandom::getrandom(&mut out).map_err(|_| Error::encoding("system rng unavailable"))?;
    Ok(out)
}

/// Encode bytes as an alphanumeric identifier.
pub fn to_uid(bytes: &[u8]) -> String {
    to_base64(bytes).replace('-', "a").replace('_', "b")
}

/// Generate a fresh 32-character alphanumeric object identifier.
pub fn random_uid() -> Result<String, Error> {
    let raw: [u8; UID_RAW_BYTES] = random_bytes()?;
    Ok(to_uid(&raw))
}
