//! AEAD: XChaCha20-Poly1305 with a fresh random 24-byte nonce per call.
//!
//! Ciphertexts always carry their nonce as a prefix:
//!
//!   nonce[24] || body
//!
//! where body is ciphertext+tag (attached) or bare ciphertext (detached).
//! No function here accepts a caller-chosen nonce.

use chacha20poly1305::aead::{Aead, AeadInPlace, KeyInit, Payload};
use chacha20poly1305::{Key, Tag, XChaCha20Poly1305, XNonce};

use crate::encoding::random_bytes;
use crate::error::Error;

pub const NONCE_BYTES: usize = 24;
pub const TAG_BYTES: usize = 16;
pub const KEY_BYTES: usize = 32;

fn cipher(key: &[u8; KEY_BYTES]) -> XChaCha20Poly1305 {
    XChaCha20Poly1305::new(Key::from_slice(key))
}

/// Seal with attached tag. Output: nonce || ciphertext || tag.
pub fn seal(key: &[u8; KEY_BYTES], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, Error> {
    let nonce: [u8; NONCE_BYTES] = random_bytes()?;
    let body = cipher(key)
        .encrypt(XNonce::from_slice(&nonce), Payload { msg: plaintext, aad })
        .map_err(|_| Error::encoding("aead seal failed"))?;

    let mut out = Vec::with_capacity(NONCE_BYTES + body.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Open an attached-tag ciphertext.
///
/// Failure is uniform: bad key, bad nonce and bad tag are indistinguishable
/// to the caller and take the same verification path.
pub fn open(key: &[u8; KEY_BYTES], nonce_ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, Error> {
    if nonce_ciphertext.len() < NONCE_BYTES + TAG_BYTES {
        return Err(Error::integrity("ciphertext too short"));
    }
    let (nonce, body) = nonce_ciphertext.split_at(NONCE_BYTES);
    cipher(key)
        .decrypt(XNonce::from_slice(nonce), Payload { msg: body, aad })
        .map_err(|_| Error::integrity("aead verification failed"))
}

/// Seal with detached tag. Returns (tag, nonce || ciphertext).
pub fn seal_detached(
    key: &[u8; KEY_BYTES],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<([u8; TAG_BYTES], Vec<u8>), Error> {
    let nonce: [u8; NONCE_BYTES] = random_bytes()?;
    let mut body = plaintext.to_vec();
    let tag = cipher(key)
        .encrypt_in_place_detached(XNonce::from_slice(&nonce), aad, &mut body)
        .map_err(|_| Error::encoding("aead seal failed"))?;

    let mut tag_bytes = [0u8; TAG_BYTES];
    tag_bytes.copy_from_slice(&tag);

    let mut out = Vec::with_capacity(NONCE_BYTES + body.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&body);
    Ok((tag_bytes, out))
}

/// Open a detached-tag ciphertext (nonce || ciphertext) against `tag`.
pub fn open_detached(
    key: &[u8; KEY_BYTES],
    nonce_ciphertext: &[u8],
    tag: &[u8; TAG_BYTES],
    aad: &[u8],
) -> Result<Vec<u8>, Error> {
    if nonce_ciphertext.len() < NONCE_BYTES {
        return Err(Error::integrity("ciphertext too short"));
    }
    let (nonce, body) = nonce_ciphertext.split_at(NONCE_BYTES);
    let mut buf = body.to_vec();
    cipher(key)
        .decrypt_in_place_detached(XNonce::from_slice(nonce), aad, &mut buf, Tag::from_slice(tag))
        .map_err(|_| Error::integrity("aead verification failed"))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_BYTES] = [0x42; KEY_BYTES];

    #[test]
    fn attached_roundtrip() {
        let ct = seal(&KEY, b"payload", b"aad").unwrap();
        assert_eq!(open(&KEY, &ct, b"aad").unwrap(), b"payload");
    }

    #[test]
    fn nonces_are_fresh_per_call() {
        let a = seal(&KEY, b"same", b"").unwrap();
        let b = seal(&KEY, b"same", b"").unwrap();
        assert_ne!(a[..NONCE_BYTES], b[..NONCE_BYTES]);
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_aad_fails() {
        let ct = seal(&KEY, b"payload", b"good").unwrap();
        assert!(matches!(open(&KEY, &ct, b"bad"), Err(Error::Integrity(_))));
    }

    #[test]
    fn wrong_key_fails() {
        let ct = seal(&KEY, b"payload", b"").unwrap();
        let other = [0x43; KEY_BYTES];
        assert!(matches!(open(&other, &ct, b""), Err(Error::Integrity(_))));
    }

    #[test]
    fn truncated_fails() {
        assert!(open(&KEY, b"short", b"").is_err());
        assert!(open(&KEY, b"", b"").is_err());
    }

    #[test]
    fn detached_roundtrip() {
        let (tag, ct) = seal_detached(&KEY, b"payload", b"aad").unwrap();
        assert_eq!(ct.len(), NONCE_BYTES + b"payload".len());
        assert_eq!(open_detached(&KEY, &ct, &tag, b"aad").unwrap(), b"payload");
    }

    #[test]
    fn detached_bad_tag_fails() {
        let (mut tag, ct) = seal_detached(&KEY, b"payload", b"").unwrap();
        tag[0] ^= 0x01;
        assert!(matches!(
            open_detached(&KEY, &ct, &tag, b""),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let ct = seal(&KEY, b"", b"").unwrap();
        assert_eq!(ct.len(), NONCE_BYTES + TAG_BYTES);
        assert_eq!(open(&KEY, &ct, b"").unwrap(), b"");
    }
}
