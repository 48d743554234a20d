//! Per-object symmetric crypto.
//!
//! A `CryptoManager` binds the (cipher key, MAC key, asymmetric seed) triple
//! derived from one parent key under one context label. Managers are
//! immutable after construction and zeroize their key material on drop;
//! their identity is the (parent key, context label, version) triple.

use blake2::digest::consts::U32;
use blake2::digest::Mac;
use blake2::Blake2bMac;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{self, KEY_BYTES, TAG_BYTES};
use crate::error::Error;
use crate::kdf::{self, Context};

/// Newest protocol version this build understands.
pub const CURRENT_VERSION: u8 = 1;

pub const MAC_BYTES: usize = 32;

const SUBKEY_CIPHER: u64 = 1;
const SUBKEY_MAC: u64 = 2;
const SUBKEY_ASYM_SEED: u64 = 3;

type Blake2bMac256 = Blake2bMac<U32>;

// ---------------------------------------------------------------------------
// Crypto manager
// ---------------------------------------------------------------------------

#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CryptoManager {
    version: u8,
    cipher_key: [u8; KEY_BYTES],
    mac_key: [u8; KEY_BYTES],
    asym_key_seed: [u8; KEY_BYTES],
}

impl std::fmt::Debug for CryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoManager")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl CryptoManager {
    /// Derive a manager from `parent_key` under `context`.
    ///
    /// Refuses versions newer than [`CURRENT_VERSION`] before touching any
    /// key material.
    pub fn new(parent_key: &[u8; KEY_BYTES], context: Context, version: u8) -> Result<Self, Error> {
        if version > CURRENT_VERSION {
            return Err(Error::unsupported_version(version));
        }
        let cipher_key = kdf::derive_subkey(parent_key, &context, SUBKEY_CIPHER)?;
        let mac_key = kdf::derive_subkey(parent_key, &context, SUBKEY_MAC)?;
        let asym_key_seed = kdf::derive_subkey(parent_key, &context, SUBKEY_ASYM_SEED)?;
        Ok(Self {
            version,
            cipher_key: *cipher_key,
            mac_key: *mac_key,
            asym_key_seed: *asym_key_seed,
        })
    }

    /// Account-root manager (context `"Main    "`).
    pub fn main(master_key: &[u8; KEY_BYTES], version: u8) -> Result<Self, Error> {
        Self::new(master_key, Context::MAIN, version)
    }

    /// Per-collection manager (context `"Col     "`).
    pub fn collection(collection_key: &[u8; KEY_BYTES], version: u8) -> Result<Self, Error> {
        Self::new(collection_key, Context::COLLECTION, version)
    }

    /// Per-item manager (context `"ColItem "`).
    pub fn item(item_key: &[u8; KEY_BYTES], version: u8) -> Result<Self, Error> {
        Self::new(item_key, Context::ITEM, version)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Seed for the deterministic keypair tied to this manager's scope.
    pub(crate) fn asym_key_seed(&self) -> &[u8; KEY_BYTES] {
        &self.asym_key_seed
    }

    /// Encrypt with attached tag and a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8], additional_data: Option<&[u8]>) -> Result<Vec<u8>, Error> {
        aead::seal(&self.cipher_key, plaintext, additional_data.unwrap_or_default())
    }

    /// Decrypt an attached-tag ciphertext produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, nonce_ciphertext: &[u8], additional_data: Option<&[u8]>) -> Result<Vec<u8>, Error> {
        aead::open(&self.cipher_key, nonce_ciphertext, additional_data.unwrap_or_default())
    }

    /// Encrypt with detached tag. Returns (mac, nonce || ciphertext).
    pub fn encrypt_detached(
        &self,
        plaintext: &[u8],
        additional_data: Option<&[u8]>,
    ) -> Result<([u8; TAG_BYTES], Vec<u8>), Error> {
        aead::seal_detached(&self.cipher_key, plaintext, additional_data.unwrap_or_default())
    }

    /// Decrypt a detached-tag ciphertext against `mac`.
    pub fn decrypt_detached(
        &self,
        nonce_ciphertext: &[u8],
        mac: &[u8; TAG_BYTES],
        additional_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, Error> {
        aead::open_detached(
            &self.cipher_key,
            nonce_ciphertext,
            mac,
            additional_data.unwrap_or_default(),
        )
    }

    /// Fresh incremental keyed hash over this manager's MAC key.
    pub fn crypto_mac(&self) -> Result<MacBuilder, Error> {
        MacBuilder::new(&self.mac_key)
    }

    /// One-shot MAC of `data`.
    pub fn calculate_mac(&self, data: &[u8]) -> Result<[u8; MAC_BYTES], Error> {
        let mut mac = self.crypto_mac()?;
        mac.update(data);
        Ok(mac.finalize())
    }
}

// ---------------------------------------------------------------------------
// Incremental MAC
// ---------------------------------------------------------------------------

/// Incremental keyed BLAKE2b with 32-byte output.
pub struct MacBuilder {
    inner: Blake2bMac256,
}

impl MacBuilder {
    fn new(key: &[u8; KEY_BYTES]) -> Result<Self, Error> {
        let inner =
            Blake2bMac256::new_from_slice(key).map_err(|_| Error::encoding("mac key rejected"))?;
        Ok(Self { inner })
    }

    pub fn update(&mut self, data: &[u8]) {
        Mac::update(&mut self.inner, data);
    }

    pub fn finalize(self) -> [u8; MAC_BYTES] {
        let mut out = [0u8; MAC_BYTES];
        out.copy_from_slice(&self.inner.finalize().into_bytes());
        out
    }

    /// Finalize and compare against `expected` in constant time.
    pub fn verify(self, expected: &[u8]) -> Result<(), Error> {
        let computed = self.finalize();
        if bool::from(computed[..].ct_eq(expected)) {
            Ok(())
        } else {
            Err(Error::integrity("mac mismatch"))
        }
    }
}
