//! Encrypted revisions: the MAC-identified unit of collection/item state.
//!
//! A revision's uid is the MAC of its canonical byte feed, in this order:
//!
//!   1. one byte: 0x01 if deleted, else 0x00
//!   2. each chunk reference's raw bytes, in order
//!   3. the 16-byte AEAD tag of the meta ciphertext, when meta is present
//!   4. each additional-data element, in order
//!
//! The feed carries the meta tag rather than the meta ciphertext: the tag
//! already authenticates the meta under the cipher key, and the feed stays
//! short and independent of meta size. The uid is therefore simultaneously
//! identifier and integrity tag, binding the revision to its position in
//! history through the additional data.

use crate::aead::TAG_BYTES;
use crate::encoding::{from_base64, to_base64};
use crate::error::Error;
use crate::symmetric::{CryptoManager, MacBuilder, MAC_BYTES};

// ---------------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------------

/// One content-addressed chunk of revision content.
///
/// The reference is the MAC of the chunk's plaintext; the data is its AEAD
/// ciphertext. Data may be absent when the transport returned download URLs
/// instead of inlining chunk bodies.
#[derive(Clone, Debug)]
pub struct Chunk {
    uid: [u8; MAC_BYTES],
    data: Option<Vec<u8>>,
}

impl Chunk {
    pub(crate) fn new(uid: [u8; MAC_BYTES], data: Option<Vec<u8>>) -> Self {
        Self { uid, data }
    }

    pub fn uid(&self) -> &[u8; MAC_BYTES] {
        &self.uid
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// An encrypted, MAC-identified snapshot of an object's state.
///
/// Revisions are value-like: every mutation of the owning object creates a
/// fresh one and replaces the current pointer. Existing revisions are never
/// modified.
#[derive(Clone, Debug)]
pub struct Revision {
    uid: String,
    meta: Option<Vec<u8>>,
    chunks: Vec<Chunk>,
    deleted: bool,
}

impl Revision {
    /// Create a fresh revision.
    ///
    /// `meta` is the serialized plaintext meta object (encrypted here under
    /// a fresh nonce). Non-empty `content` becomes a single content-
    /// addressed chunk; empty content carries no chunks.
    pub fn create(
        cm: &CryptoManager,
        additional_data: &[&[u8]],
        meta: Option<&[u8]>,
        content: &[u8],
        deleted: bool,
    ) -> Result<Self, Error> {
        let meta = match meta {
            Some(plain) => Some(cm.encrypt(plain, None)?),
            None => None,
        };

        let chunks = if content.is_empty() {
            Vec::new()
        } else {
            let uid = cm.calculate_mac(content)?;
            let data = cm.encrypt(content, None)?;
            vec![Chunk::new(uid, Some(data))]
        };

        let uid = compute_uid(cm, deleted, &chunks, meta.as_deref(), additional_data)?;
        Ok(Self { uid, meta, chunks, deleted })
    }

    /// Tombstone form: deleted, chunks cleared, the previous meta plaintext
    /// re-encrypted under a fresh nonce so listings can still render it.
    pub fn tombstone(
        cm: &CryptoManager,
        additional_data: &[&[u8]],
        previous_meta: Option<&[u8]>,
    ) -> Result<Self, Error> {
        Self::create(cm, additional_data, previous_meta, &[], true)
    }

    /// Recompute the MAC feed and compare against the stored uid in
    /// constant time.
    ///
    /// The feed covers only the meta's AEAD tag, so a tampered meta body
    /// leaves it unchanged; the AEAD pass over the meta catches that case.
    pub fn verify(&self, cm: &CryptoManager, additional_data: &[&[u8]]) -> Result<(), Error> {
        let expected = from_base64(&self.uid)?;
        let mut mac = cm.crypto_mac()?;
        feed(&mut mac, self.deleted, &self.chunks, self.meta.as_deref())?;
        for data in additional_data {
            mac.update(data);
        }
        mac.verify(&expected)
            .map_err(|_| Error::integrity(format!("revision {} failed verification", self.uid)))?;

        if self.meta.is_some() {
            self.decrypt_meta(cm)?;
        }
        Ok(())
    }

    /// Decrypt the meta ciphertext, if any.
    pub fn decrypt_meta(&self, cm: &CryptoManager) -> Result<Option<Vec<u8>>, Error> {
        match &self.meta {
            Some(ciphertext) => Ok(Some(cm.decrypt(ciphertext, None).map_err(|_| {
                Error::integrity(format!("revision {}: meta failed verification", self.uid))
            })?)),
            None => Ok(None),
        }
    }

    /// Decrypt and concatenate all chunks, in order.
    pub fn decrypt_content(&self, cm: &CryptoManager) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        for chunk in &self.chunks {
            let data = chunk.data().ok_or_else(|| {
                Error::encoding(format!(
                    "revision {}: chunk {} has no inline data",
                    self.uid,
                    to_base64(&chunk.uid)
                ))
            })?;
            let mut plain = cm.decrypt(data, None).map_err(|_| {
                Error::integrity(format!("revision {}: chunk failed verification", self.uid))
            })?;
            out.append(&mut plain);
        }
        Ok(out)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn deleted(&self) -> bool {
        self.deleted
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub(crate) fn meta_ciphertext(&self) -> Option<&[u8]> {
        self.meta.as_deref()
    }

    /// Reassemble a revision from wire parts, without verification.
    pub(crate) fn from_parts(
        uid: String,
        meta: Option<Vec<u8>>,
        chunks: Vec<Chunk>,
        deleted: bool,
    ) -> Self {
        Self { uid, meta, chunks, deleted }
    }
}

fn compute_uid(
    cm: &CryptoManager,
    deleted: bool,
    chunks: &[Chunk],
    meta: Option<&[u8]>,
    additional_data: &[&[u8]],
) -> Result<String, Error> {
    let mut mac = cm.crypto_mac()?;
    feed(&mut mac, deleted, chunks, meta)?;
    for data in additional_data {
        mac.update(data);
    }
    Ok(to_base64(&mac.finalize()))
}

/// The canonical feed prefix shared by uid computation and verification.
fn feed(
    mac: &mut MacBuilder,
    deleted: bool,
    chunks: &[Chunk],
    meta: Option<&[u8]>,
) -> Result<(), Error> {
    mac.update(&[u8::from(deleted)]);
    for chunk in chunks {
        mac.update(chunk.uid());
    }
    if let Some(meta) = meta {
        if meta.len() < TAG_BYTES {
            return Err(Error::encoding("meta ciphertext shorter than its tag"));
        }
        mac.update(&meta[meta.len() - TAG_BYTES..]);
    }
    Ok(())
}
