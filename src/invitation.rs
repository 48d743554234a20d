//! Sharing: wrap a collection key to a recipient identity, verify who sent
//! it, and render the fingerprint users read aloud to authenticate each
//! other out-of-band.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use zeroize::Zeroizing;

use crate::asymmetric::{
    AsymmetricCryptoManager, PUBLIC_KEY_BYTES, SIGNATURE_BYTES,
};
use crate::collection::{AccessLevel, Collection};
use crate::error::Error;
use crate::symmetric::CryptoManager;

type Blake2b256 = Blake2b<U32>;

pub const FINGERPRINT_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// Invitation
// ---------------------------------------------------------------------------

/// A signed invitation from inviter to invitee.
///
/// `wrapped` is the collection key sealed to the invitee's identity key;
/// `signature` binds (collection uid, access level, wrapped key) to the
/// inviter's signing identity.
#[derive(Clone, Debug)]
pub struct Invitation {
    pub collection_uid: String,
    pub access_level: AccessLevel,
    pub wrapped: Vec<u8>,
    pub sender_pub: [u8; PUBLIC_KEY_BYTES],
    pub signature: [u8; SIGNATURE_BYTES],
}

/// Invite a recipient to `collection` at `access_level`.
///
/// The recipient's public key must come from an out-of-band channel or a
/// server directory; [`pretty_fingerprint`] is how users confirm it.
pub fn invite(
    collection: &Collection,
    parent: &CryptoManager,
    sender: &AsymmetricCryptoManager,
    recipient_pub: &[u8; PUBLIC_KEY_BYTES],
    access_level: AccessLevel,
) -> Result<Invitation, Error> {
    let collection_key = collection.decrypt_encryption_key(parent)?;
    let wrapped = sender.encrypt_sign(&collection_key[..], recipient_pub)?;

    let digest = invitation_digest(collection.uid(), access_level, &wrapped);
    let signature = sender.sign_detached(&digest);

    tracing::debug!(collection = %collection.uid(), access = %access_level, "created invitation");
    Ok(Invitation {
        collection_uid: collection.uid().to_string(),
        access_level,
        wrapped,
        sender_pub: sender.public_key(),
        signature,
    })
}

/// Accept an invitation: verify the signature chain, unwrap the collection
/// key, and re-wrap it under the recipient's own main manager.
///
/// Returns the new wrapped `encryptionKey` the recipient stores on its copy
/// of the collection.
pub fn accept(
    invitation: &Invitation,
    recipient: &AsymmetricCryptoManager,
    main: &CryptoManager,
) -> Result<Vec<u8>, Error> {
    let digest = invitation_digest(
        &invitation.collection_uid,
        invitation.access_level,
        &invitation.wrapped,
    );
    AsymmetricCryptoManager::verify_detached(&digest, &invitation.signature, &invitation.sender_pub)
        .map_err(|_| {
            Error::integrity(format!(
                "invitation for {}: signature chain failed verification",
                invitation.collection_uid
            ))
        })?;

    let collection_key = Zeroizing::new(
        recipient.decrypt_verify(&invitation.wrapped, &invitation.sender_pub)?,
    );
    tracing::debug!(collection = %invitation.collection_uid, "accepted invitation");
    main.encrypt(&collection_key[..], None)
}

fn invitation_digest(uid: &str, access_level: AccessLevel, wrapped: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(uid.as_bytes());
    hasher.update(access_level.as_str().as_bytes());
    hasher.update(wrapped);
    hasher.finalize().into()
}

// ---------------------------------------------------------------------------
// Verification fingerprint
// ---------------------------------------------------------------------------

/// Render a public key as the string users read aloud to confirm identity:
/// BLAKE2b-256 of the key, read as 16 big-endian 16-bit words, each a
/// zero-padded 5-digit decimal, four groups per line joined by `delimiter`.
///
/// Collision resistance comes from the full hash; the decimal rendering
/// does not reduce it.
pub fn pretty_fingerprint(public_key: &[u8], delimiter: &str) -> String {
    let digest: [u8; FINGERPRINT_BYTES] = Blake2b256::digest(public_key).into();

    let groups: Vec<String> = digest
        .chunks(2)
        .map(|pair| format!("{:05}", u16::from_be_bytes([pair[0], pair[1]])))
        .collect();
    groups
        .chunks(4)
        .map(|line| line.join(delimiter))
        .collect::<Vec<_>>()
        .join("\n")
}
