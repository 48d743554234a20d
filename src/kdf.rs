//! Key derivation: password to master key (Argon2id) and the context-labeled
//! subkey tree (keyed BLAKE2b).
//!
//! subkey = BLAKE2b-256(key = parent, salt = le64(subkey_id), personal = context)
//!
//! over an empty message. The salt and personalization fields are zero-
//! extended to their 16-byte width. Separate subkeys per construction keep
//! AEAD, MAC and signature-seed material domain-separated: no construction
//! can leak material usable by another.

use argon2::{Algorithm, Argon2, Params, Version};
use blake2::digest::consts::U32;
use blake2::digest::Mac;
use blake2::Blake2bMac;
use zeroize::Zeroizing;

use crate::error::Error;

pub const SALT_BYTES: usize = 16;
pub const KEY_BYTES: usize = 32;

/// Argon2id cost parameters: sensitive ops (deliberately slow, roughly
/// 0.5-1 s), moderate memory (256 MiB). Interoperability depends on these
/// exact values.
const ARGON2_OPS: u32 = 4;
const ARGON2_MEM_KIB: u32 = 262_144;
const ARGON2_LANES: u32 = 1;

type Blake2bMac256 = Blake2bMac<U32>;

// ---------------------------------------------------------------------------
// Context labels
// ---------------------------------------------------------------------------

/// An 8-byte ASCII label that domain-separates a KDF subtree.
///
/// Labels shorter than 8 bytes are right-padded with ASCII space (0x20).
/// Padding with 0x00 would derive different keys; the space-padded form is
/// the interoperable one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Context([u8; 8]);

impl Context {
    /// Account root.
    pub const MAIN: Context = Context(*b"Main    ");
    /// Per-collection subtree.
    pub const COLLECTION: Context = Context(*b"Col     ");
    /// Per-item subtree.
    pub const ITEM: Context = Context(*b"ColItem ");

    /// Build a label from up to 8 ASCII bytes.
    pub fn new(label: &str) -> Result<Self, Error> {
        if label.len() > 8 || !label.is_ascii() {
            return Err(Error::encoding(format!(
                "context label {:?} is not at most 8 ascii bytes",
                label
            )));
        }
        let mut padded = [0x20u8; 8];
        padded[..label.len()].copy_from_slice(label.as_bytes());
        Ok(Self(padded))
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the 32-byte subkey of `parent` selected by (`context`, `subkey_id`).
pub fn derive_subkey(
    parent: &[u8; KEY_BYTES],
    context: &Context,
    subkey_id: u64,
) -> Result<Zeroizing<[u8; KEY_BYTES]>, Error> {
    let mac = Blake2bMac256::new_with_salt_and_personal(
        parent,
        &subkey_id.to_le_bytes(),
        context.as_bytes(),
    )
    .map_err(|_| Error::encoding("kdf parameters rejected"))?;

    let mut out = [0u8; KEY_BYTES];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(Zeroizing::new(out))
}

/// Derive the 32-byte master key from a password and the per-user salt.
///
/// Deterministic in (password, salt). This is the only operation in the
/// core that takes noticeable wall-clock time; callers may offload it to a
/// worker thread, correctness does not depend on it.
pub fn derive_master_key(
    password: &str,
    salt: &[u8; SALT_BYTES],
) -> Result<Zeroizing<[u8; KEY_BYTES]>, Error> {
    let params = Params::new(ARGON2_MEM_KIB, ARGON2_OPS, ARGON2_LANES, Some(KEY_BYTES))
        .map_err(|_| Error::encoding("argon2 parameters rejected"))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut out = [0u8; KEY_BYTES];
    argon
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| Error::encoding(format!("argon2id failed: {}", e)))?;
    Ok(Zeroizing::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_pads_with_spaces() {
        let ctx = Context::new("Col").unwrap();
        assert_eq!(ctx.as_bytes(), b"Col     ");
        assert_eq!(ctx, Context::COLLECTION);
    }

    #[test]
    fn context_rejects_overlong_labels() {
        assert!(Context::new("TooLongLabel").is_err());
    }

    #[test]
    fn subkeys_are_deterministic() {
        let parent = [3u8; KEY_BYTES];
        let a = derive_subkey(&parent, &Context::MAIN, 1).unwrap();
        let b = derive_subkey(&parent, &Context::MAIN, 1).unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn subkeys_separate_by_id_context_and_parent() {
        let parent = [3u8; KEY_BYTES];
        let other_parent = [4u8; KEY_BYTES];
        let base = derive_subkey(&parent, &Context::MAIN, 1).unwrap();

        assert_ne!(*base, *derive_subkey(&parent, &Context::MAIN, 2).unwrap());
        assert_ne!(*base, *derive_subkey(&parent, &Context::COLLECTION, 1).unwrap());
        assert_ne!(*base, *derive_subkey(&other_parent, &Context::MAIN, 1).unwrap());
    }

    #[test]
    fn master_key_is_deterministic_in_password_and_salt() {
        let salt = [7u8; SALT_BYTES];
        let a = derive_master_key("strong passphrase", &salt).unwrap();
        let b = derive_master_key("strong passphrase", &salt).unwrap();
        assert_eq!(*a, *b);

        let other_salt = [8u8; SALT_BYTES];
        assert_ne!(*a, *derive_master_key("strong passphrase", &other_salt).unwrap());
    }

    #[test]
    fn space_and_zero_padding_differ() {
        // "Col" padded with 0x20 vs a label whose trailing bytes are 0x00
        let parent = [9u8; KEY_BYTES];
        let spaces = derive_subkey(&parent, &Context::COLLECTION, 1).unwrap();
        let zeros = derive_subkey(&parent, &Context(*b"Col\0\0\0\0\0"), 1).unwrap();
        assert_ne!(*spaces, *zeros);
    }
}
