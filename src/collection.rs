//! Collections and items: long-lived identity, a wrapped per-object key,
//! and the current revision.
//!
//! Every collection (and item) owns a fresh 32-byte symmetric key stored
//! wrapped under its parent's cipher key: the account's main manager for
//! collections, the collection's manager for items. The local manager
//! derived from the unwrapped key is ephemeral; nothing caches it across
//! calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::aead::KEY_BYTES;
use crate::encoding::{random_bytes, random_uid};
use crate::error::Error;
use crate::revision::Revision;
use crate::symmetric::CryptoManager;

// ---------------------------------------------------------------------------
// Access levels
// ---------------------------------------------------------------------------

/// Access level as granted by the server.
///
/// Enforcement is server-side only: every holder of the collection key is
/// cryptographically equal, and demotion without key rotation leaves a
/// demoted member able to read anything the server still hands out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLevel {
    #[serde(rename = "adm")]
    Admin,
    #[serde(rename = "rw")]
    ReadWrite,
    #[serde(rename = "ro")]
    ReadOnly,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Admin => "adm",
            AccessLevel::ReadWrite => "rw",
            AccessLevel::ReadOnly => "ro",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Typed meta
// ---------------------------------------------------------------------------

/// Collection metadata: the user-visible envelope. Serialized as JSON in
/// this field order; the serialized form is what gets encrypted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMeta {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Item metadata. Items extend the bare `{type}` envelope with an optional
/// name and modification time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<u64>,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

pub struct Collection {
    uid: String,
    version: u8,
    access_level: AccessLevel,
    ctag: Option<String>,
    stoken: Option<String>,
    encryption_key: Vec<u8>,
    content: Revision,
}

impl Collection {
    /// Create a collection: fresh uid, fresh wrapped key, initial revision.
    ///
    /// `parent` is the account's main crypto manager.
    pub fn create(
        parent: &CryptoManager,
        meta: &CollectionMeta,
        content: &[u8],
    ) -> Result<Self, Error> {
        let uid = random_uid()?;
        let collection_key = Zeroizing::new(random_bytes::<KEY_BYTES>()?);
        let encryption_key = parent.encrypt(&collection_key[..], None)?;

        let cm = CryptoManager::collection(&collection_key, parent.version())?;
        let meta_bytes = serialize_meta(meta)?;
        let revision = Revision::create(&cm, &[uid.as_bytes()], Some(&meta_bytes), content, false)?;

        tracing::debug!(uid = %uid, "created collection");
        Ok(Self {
            uid,
            version: parent.version(),
            access_level: AccessLevel::Admin,
            ctag: None,
            stoken: None,
            encryption_key,
            content: revision,
        })
    }

    /// Unwrap the per-collection key. Fails with an integrity error when
    /// `parent` is not the manager the key was wrapped under.
    pub(crate) fn decrypt_encryption_key(
        &self,
        parent: &CryptoManager,
    ) -> Result<Zeroizing<[u8; KEY_BYTES]>, Error> {
        unwrap_key(parent, &self.encryption_key, &self.uid)
    }

    /// Derive the collection's crypto manager. Ephemeral; derived on demand.
    pub fn crypto_manager(&self, parent: &CryptoManager) -> Result<CryptoManager, Error> {
        let key = self.decrypt_encryption_key(parent)?;
        CryptoManager::collection(&key, self.version)
    }

    /// Check the current revision against this collection's identity.
    /// A mismatch rejects the whole object as tampered.
    pub fn verify(&self, parent: &CryptoManager) -> Result<(), Error> {
        let cm = self.crypto_manager(parent)?;
        self.content.verify(&cm, &[self.uid.as_bytes()])
    }

    pub fn decrypt_meta(&self, parent: &CryptoManager) -> Result<CollectionMeta, Error> {
        let cm = self.crypto_manager(parent)?;
        let plain = self.content.decrypt_meta(&cm)?.ok_or_else(|| {
            Error::encoding(format!("collection {} has no meta", self.uid))
        })?;
        deserialize_meta(&plain, &self.uid)
    }

    pub fn decrypt_content(&self, parent: &CryptoManager) -> Result<Vec<u8>, Error> {
        let cm = self.crypto_manager(parent)?;
        self.content.decrypt_content(&cm)
    }

    /// Replace the current revision with a fresh one. `None` keeps the
    /// existing meta or content. Prior revisions are never mutated.
    pub fn update(
        &mut self,
        parent: &CryptoManager,
        meta: Option<&CollectionMeta>,
        content: Option<&[u8]>,
    ) -> Result<(), Error> {
        let cm = self.crypto_manager(parent)?;
        let meta_bytes = match meta {
            Some(meta) => Some(serialize_meta(meta)?),
            None => self.content.decrypt_meta(&cm)?,
        };
        let content_plain = match content {
            Some(content) => content.to_vec(),
            None => self.content.decrypt_content(&cm)?,
        };
        self.content = Revision::create(
            &cm,
            &[self.uid.as_bytes()],
            meta_bytes.as_deref(),
            &content_plain,
            false,
        )?;
        tracing::debug!(uid = %self.uid, "updated collection");
        Ok(())
    }

    /// Replace only the meta, keeping the current content.
    pub fn set_meta(&mut self, parent: &CryptoManager, meta: &CollectionMeta) -> Result<(), Error> {
        self.update(parent, Some(meta), None)
    }

    /// Tombstone the collection. The previous meta is preserved (re-
    /// encrypted under a fresh nonce) so listings can still render it.
    pub fn remove(&mut self, parent: &CryptoManager) -> Result<(), Error> {
        let cm = self.crypto_manager(parent)?;
        let previous_meta = self.content.decrypt_meta(&cm)?;
        self.content = Revision::tombstone(&cm, &[self.uid.as_bytes()], previous_meta.as_deref())?;
        tracing::debug!(uid = %self.uid, "removed collection");
        Ok(())
    }

    /// Create an item inside this collection.
    pub fn create_item(
        &self,
        parent: &CryptoManager,
        meta: &ItemMeta,
        content: &[u8],
    ) -> Result<Item, Error> {
        let cm = self.crypto_manager(parent)?;
        Item::create(&cm, meta, content)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    pub fn ctag(&self) -> Option<&str> {
        self.ctag.as_deref()
    }

    pub fn stoken(&self) -> Option<&str> {
        self.stoken.as_deref()
    }

    pub fn revision(&self) -> &Revision {
        &self.content
    }

    pub fn deleted(&self) -> bool {
        self.content.deleted()
    }

    pub(crate) fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub(crate) fn from_parts(
        uid: String,
        version: u8,
        access_level: AccessLevel,
        ctag: Option<String>,
        stoken: Option<String>,
        encryption_key: Vec<u8>,
        content: Revision,
    ) -> Self {
        Self { uid, version, access_level, ctag, stoken, encryption_key, content }
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// Same shape as [`Collection`], tied to a parent collection. All item
/// operations take the *collection's* crypto manager as the parent.
pub struct Item {
    uid: String,
    version: u8,
    encryption_key: Vec<u8>,
    content: Revision,
}

impl Item {
    /// Create an item under `collection_cm`, the owning collection's
    /// crypto manager.
    pub fn create(
        collection_cm: &CryptoManager,
        meta: &ItemMeta,
        content: &[u8],
    ) -> Result<Self, Error> {
        let uid = random_uid()?;
        let item_key = Zeroizing::new(random_bytes::<KEY_BYTES>()?);
        let encryption_key = collection_cm.encrypt(&item_key[..], None)?;

        let cm = CryptoManager::item(&item_key, collection_cm.version())?;
        let meta_bytes =
            serde_json::to_vec(meta).map_err(|_| Error::encoding("item meta is not serializable"))?;
        let revision = Revision::create(&cm, &[uid.as_bytes()], Some(&meta_bytes), content, false)?;

        tracing::debug!(uid = %uid, "created item");
        Ok(Self { uid, version: collection_cm.version(), encryption_key, content: revision })
    }

    pub fn crypto_manager(&self, collection_cm: &CryptoManager) -> Result<CryptoManager, Error> {
        let key = unwrap_key(collection_cm, &self.encryption_key, &self.uid)?;
        CryptoManager::item(&key, self.version)
    }

    pub fn verify(&self, collection_cm: &CryptoManager) -> Result<(), Error> {
        let cm = self.crypto_manager(collection_cm)?;
        self.content.verify(&cm, &[self.uid.as_bytes()])
    }

    pub fn decrypt_meta(&self, collection_cm: &CryptoManager) -> Result<ItemMeta, Error> {
        let cm = self.crypto_manager(collection_cm)?;
        let plain = self
            .content
            .decrypt_meta(&cm)?
            .ok_or_else(|| Error::encoding(format!("item {} has no meta", self.uid)))?;
        serde_json::from_slice(&plain)
            .map_err(|_| Error::encoding(format!("item {}: meta is not valid JSON", self.uid)))
    }

    pub fn decrypt_content(&self, collection_cm: &CryptoManager) -> Result<Vec<u8>, Error> {
        let cm = self.crypto_manager(collection_cm)?;
        self.content.decrypt_content(&cm)
    }

    pub fn update(
        &mut self,
        collection_cm: &CryptoManager,
        meta: Option<&ItemMeta>,
        content: Option<&[u8]>,
    ) -> Result<(), Error> {
        let cm = self.crypto_manager(collection_cm)?;
        let meta_bytes = match meta {
            Some(meta) => Some(
                serde_json::to_vec(meta)
                    .map_err(|_| Error::encoding("item meta is not serializable"))?,
            ),
            None => self.content.decrypt_meta(&cm)?,
        };
        let content_plain = match content {
            Some(content) => content.to_vec(),
            None => self.content.decrypt_content(&cm)?,
        };
        self.content = Revision::create(
            &cm,
            &[self.uid.as_bytes()],
            meta_bytes.as_deref(),
            &content_plain,
            false,
        )?;
        Ok(())
    }

    pub fn remove(&mut self, collection_cm: &CryptoManager) -> Result<(), Error> {
        let cm = self.crypto_manager(collection_cm)?;
        let previous_meta = self.content.decrypt_meta(&cm)?;
        self.content = Revision::tombstone(&cm, &[self.uid.as_bytes()], previous_meta.as_deref())?;
        Ok(())
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn revision(&self) -> &Revision {
        &self.content
    }

    pub fn deleted(&self) -> bool {
        self.content.deleted()
    }

    pub(crate) fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub(crate) fn from_parts(
        uid: String,
        version: u8,
        encryption_key: Vec<u8>,
        content: Revision,
    ) -> Self {
        Self { uid, version, encryption_key, content }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unwrap_key(
    parent: &CryptoManager,
    wrapped: &[u8],
    uid: &str,
) -> Result<Zeroizing<[u8; KEY_BYTES]>, Error> {
    let mut plain = parent
        .decrypt(wrapped, None)
        .map_err(|_| Error::integrity(format!("object {}: wrapped key failed verification", uid)))?;
    if plain.len() != KEY_BYTES {
        plain.zeroize();
        return Err(Error::encoding(format!("object {}: wrapped key has wrong length", uid)));
    }
    let mut key = Zeroizing::new([0u8; KEY_BYTES]);
    key.copy_from_slice(&plain);
    plain.zeroize();
    Ok(key)
}

fn serialize_meta(meta: &CollectionMeta) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(meta).map_err(|_| Error::encoding("collection meta is not serializable"))
}

fn deserialize_meta(plain: &[u8], uid: &str) -> Result<CollectionMeta, Error> {
    serde_json::from_slice(plain)
        .map_err(|_| Error::encoding(format!("collection {}: meta is not valid JSON", uid)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetric::CURRENT_VERSION;

    fn main_manager() -> CryptoManager {
        CryptoManager::main(&[21u8; KEY_BYTES], CURRENT_VERSION).unwrap()
    }

    fn meta() -> CollectionMeta {
        CollectionMeta {
            collection_type: "COLTYPE".into(),
            name: "Calendar".into(),
            description: Some("Mine".into()),
            color: Some("#ffffff".into()),
        }
    }

    #[test]
    fn collection_uid_is_alphanumeric() {
        let main = main_manager();
        let col = Collection::create(&main, &meta(), &[]).unwrap();
        assert_eq!(col.uid().len(), 32);
        assert!(col.uid().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn collection_roundtrip() {
        let main = main_manager();
        let col = Collection::create(&main, &meta(), &[1, 2, 3, 5]).unwrap();
        col.verify(&main).unwrap();
        assert_eq!(col.decrypt_meta(&main).unwrap(), meta());
        assert_eq!(col.decrypt_content(&main).unwrap(), vec![1, 2, 3, 5]);
        assert_eq!(col.access_level(), AccessLevel::Admin);
    }

    #[test]
    fn wrong_parent_cannot_unwrap() {
        let main = main_manager();
        let other = CryptoManager::main(&[22u8; KEY_BYTES], CURRENT_VERSION).unwrap();
        let col = Collection::create(&main, &meta(), &[]).unwrap();
        assert!(matches!(col.verify(&other), Err(Error::Integrity(_))));
        assert!(col.decrypt_meta(&other).is_err());
    }

    #[test]
    fn set_meta_replaces_revision() {
        let main = main_manager();
        let mut col = Collection::create(&main, &meta(), &[1, 2, 3, 5]).unwrap();
        let old_uid = col.revision().uid().to_string();

        let mut updated = meta();
        updated.name = "Calendar2".into();
        updated.color = Some("#000000".into());
        col.set_meta(&main, &updated).unwrap();

        col.verify(&main).unwrap();
        assert_eq!(col.decrypt_meta(&main).unwrap(), updated);
        assert_eq!(col.decrypt_content(&main).unwrap(), vec![1, 2, 3, 5]);
        assert_ne!(col.revision().uid(), old_uid);
    }

    #[test]
    fn remove_preserves_meta() {
        let main = main_manager();
        let mut col = Collection::create(&main, &meta(), &[1, 2, 3]).unwrap();
        col.remove(&main).unwrap();

        assert!(col.deleted());
        col.verify(&main).unwrap();
        assert_eq!(col.decrypt_meta(&main).unwrap(), meta());
        assert_eq!(col.decrypt_content(&main).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn item_roundtrip() {
        let main = main_manager();
        let col = Collection::create(&main, &meta(), &[]).unwrap();
        let item_meta = ItemMeta {
            item_type: Some("note".into()),
            name: Some("todo.txt".into()),
            mtime: Some(1_700_000_000),
        };
        let item = col.create_item(&main, &item_meta, b"buy milk").unwrap();

        let col_cm = col.crypto_manager(&main).unwrap();
        item.verify(&col_cm).unwrap();
        assert_eq!(item.decrypt_meta(&col_cm).unwrap(), item_meta);
        assert_eq!(item.decrypt_content(&col_cm).unwrap(), b"buy milk");
    }

    #[test]
    fn item_key_is_bound_to_its_collection() {
        let main = main_manager();
        let col_a = Collection::create(&main, &meta(), &[]).unwrap();
        let col_b = Collection::create(&main, &meta(), &[]).unwrap();
        let item = col_a.create_item(&main, &ItemMeta::default(), b"content").unwrap();

        let cm_b = col_b.crypto_manager(&main).unwrap();
        assert!(item.verify(&cm_b).is_err());
    }

    #[test]
    fn item_update_and_remove() {
        let main = main_manager();
        let col = Collection::create(&main, &meta(), &[]).unwrap();
        let col_cm = col.crypto_manager(&main).unwrap();
        let mut item = Item::create(&col_cm, &ItemMeta::default(), b"v1").unwrap();

        item.update(&col_cm, None, Some(b"v2".as_slice())).unwrap();
        item.verify(&col_cm).unwrap();
        assert_eq!(item.decrypt_content(&col_cm).unwrap(), b"v2");

        item.remove(&col_cm).unwrap();
        assert!(item.deleted());
        item.verify(&col_cm).unwrap();
    }

    #[test]
    fn access_level_wire_strings() {
        assert_eq!(AccessLevel::Admin.as_str(), "adm");
        assert_eq!(AccessLevel::ReadWrite.as_str(), "rw");
        assert_eq!(AccessLevel::ReadOnly.as_str(), "ro");
        assert_eq!(serde_json::to_string(&AccessLevel::ReadWrite).unwrap(), "\"rw\"");
    }
}
