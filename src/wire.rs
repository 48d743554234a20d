//! Transport-facing shapes.
//!
//! The transport moves opaque blobs; these structs only name the fields and
//! their encoding. Every binary field is URL-safe base64 without padding;
//! collection and item uids use the narrowed alphanumeric alphabet. The
//! `to_wire` / `from_wire` pairs pass ownership between wire bytes and the
//! in-memory objects; `from_wire` validates shape and version but performs
//! no cryptography, so callers still run `verify` before trusting an
//! object.

use serde::{Deserialize, Serialize};

use crate::asymmetric::{PUBLIC_KEY_BYTES, SIGNATURE_BYTES};
use crate::collection::{AccessLevel, Collection, Item};
use crate::encoding::{from_base64, to_base64};
use crate::error::Error;
use crate::invitation::Invitation;
use crate::revision::{Chunk, Revision};
use crate::symmetric::{CURRENT_VERSION, MAC_BYTES};

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// Revision as the transport sees it. `chunks_data` inlines chunk bodies on
/// write; reads may return `chunks_urls` for bodies served out-of-band.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionWire {
    pub uid: String,
    pub meta: Option<String>,
    pub chunks: Vec<String>,
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_data: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_urls: Option<Vec<String>>,
}

/// Collection envelope. `access_level`, `ctag` and `stoken` are only
/// present on reads; the server issues them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionWire {
    pub uid: String,
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    pub encryption_key: String,
    pub content: RevisionWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stoken: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemWire {
    pub uid: String,
    pub version: u8,
    pub encryption_key: String,
    pub content: RevisionWire,
}

/// Invitation envelope. Field names are part of the protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationWire {
    pub collection_uid: String,
    pub access_level: AccessLevel,
    pub wrapped: String,
    pub sender_pub: String,
    pub signature: String,
}

// ---------------------------------------------------------------------------
// Revision conversions
// ---------------------------------------------------------------------------

pub fn revision_to_wire(revision: &Revision) -> RevisionWire {
    let chunks = revision.chunks().iter().map(|c| to_base64(c.uid())).collect();
    // Inline bodies only when every chunk carries one; a partial list would
    // misalign the parallel arrays.
    let chunks_data: Option<Vec<String>> = revision
        .chunks()
        .iter()
        .map(|c| c.data().map(to_base64))
        .collect();

    RevisionWire {
        uid: revision.uid().to_string(),
        meta: revision.meta_ciphertext().map(to_base64),
        chunks,
        deleted: revision.deleted(),
        chunks_data: chunks_data.filter(|data| !data.is_empty()),
        chunks_urls: None,
    }
}

pub fn revision_from_wire(wire: &RevisionWire) -> Result<Revision, Error> {
    if let Some(data) = &wire.chunks_data {
        if data.len() != wire.chunks.len() {
            return Err(Error::encoding(format!(
                "revision {}: {} chunk references but {} chunk bodies",
                wire.uid,
                wire.chunks.len(),
                data.len()
            )));
        }
    }

    let meta = wire.meta.as_deref().map(from_base64).transpose()?;
    let mut chunks = Vec::with_capacity(wire.chunks.len());
    for (index, reference) in wire.chunks.iter().enumerate() {
        let decoded = from_base64(reference)?;
        let uid: [u8; MAC_BYTES] = decoded.try_into().map_err(|_| {
            Error::encoding(format!("revision {}: chunk reference has wrong length", wire.uid))
        })?;
        let data = match &wire.chunks_data {
            Some(data) => Some(from_base64(&data[index])?),
            None => None,
        };
        chunks.push(Chunk::new(uid, data));
    }

    Ok(Revision::from_parts(wire.uid.clone(), meta, chunks, wire.deleted))
}

// ---------------------------------------------------------------------------
// Collection / item conversions
// ---------------------------------------------------------------------------

pub fn collection_to_wire(collection: &Collection) -> CollectionWire {
    CollectionWire {
        uid: collection.uid().to_string(),
        version: collection.version(),
        access_level: Some(collection.access_level()),
        encryption_key: to_base64(collection.encryption_key()),
        content: revision_to_wire(collection.revision()),
        ctag: collection.ctag().map(str::to_string),
        stoken: collection.stoken().map(str::to_string),
    }
}

pub fn collection_from_wire(wire: &CollectionWire) -> Result<Collection, Error> {
    if wire.version > CURRENT_VERSION {
        return Err(Error::unsupported_version(wire.version));
    }
    Ok(Collection::from_parts(
        wire.uid.clone(),
        wire.version,
        wire.access_level.unwrap_or(AccessLevel::ReadOnly),
        wire.ctag.clone(),
        wire.stoken.clone(),
        from_base64(&wire.encryption_key)?,
        revision_from_wire(&wire.content)?,
    ))
}

pub fn item_to_wire(item: &Item) -> ItemWire {
    ItemWire {
        uid: item.uid().to_string(),
        version: item.version(),
        encryption_key: to_base64(item.encryption_key()),
        content: revision_to_wire(item.revision()),
    }
}

pub fn item_from_wire(wire: &ItemWire) -> Result<Item, Error> {
    if wire.version > CURRENT_VERSION {
        return Err(Error::unsupported_version(wire.version));
    }
    Ok(Item::from_parts(
        wire.uid.clone(),
        wire.version,
        from_base64(&wire.encryption_key)?,
        revision_from_wire(&wire.content)?,
    ))
}

// ---------------------------------------------------------------------------
// Invitation conversions
// ---------------------------------------------------------------------------

pub fn invitation_to_wire(invitation: &Invitation) -> InvitationWire {
    InvitationWire {
        collection_uid: invitation.collection_uid.clone(),
        access_level: invitation.access_level,
        wrapped: to_base64(&invitation.wrapped),
        sender_pub: to_base64(&invitation.sender_pub),
        signature: to_base64(&invitation.signature),
    }
}

pub fn invitation_from_wire(wire: &InvitationWire) -> Result<Invitation, Error> {
    let sender_pub: [u8; PUBLIC_KEY_BYTES] = from_base64(&wire.sender_pub)?
        .try_into()
        .map_err(|_| Error::encoding("invitation sender key has wrong length"))?;
    let signature: [u8; SIGNATURE_BYTES] = from_base64(&wire.signature)?
        .try_into()
        .map_err(|_| Error::encoding("invitation signature has wrong length"))?;

    Ok(Invitation {
        collection_uid: wire.collection_uid.clone(),
        access_level: wire.access_level,
        wrapped: from_base64(&wire.wrapped)?,
        sender_pub,
        signature,
    })
}
