//! Asymmetric crypto: Ed25519 identity keys, detached signatures, and
//! authenticated public-key encryption through Ed25519 -> X25519 conversion.
//!
//! One long-term signing identity serves both signatures and key agreement:
//! the secret side converts via SHA-512(seed) with standard clamping, the
//! public side via Edwards decompression to Montgomery form. The box itself
//! is authenticated ECDH + XSalsa20-Poly1305, so a wrapped message is bound
//! to the sender's signing identity.

use crypto_box::aead::{Aead, Nonce};
use crypto_box::{PublicKey as BoxPublicKey, SalsaBox, SecretKey as BoxSecretKey};
use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use crate::aead::TAG_BYTES;
use crate::encoding::random_bytes;
use crate::error::Error;

pub const PUBLIC_KEY_BYTES: usize = 32;
pub const SECRET_KEY_BYTES: usize = 64;
pub const SEED_BYTES: usize = 32;
pub const SIGNATURE_BYTES: usize = 64;
pub const BOX_NONCE_BYTES: usize = 24;

/// Holder of one Ed25519 keypair.
pub struct AsymmetricCryptoManager {
    signing: SigningKey,
}

impl AsymmetricCryptoManager {
    /// Deterministic keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SEED_BYTES]) -> Self {
        Self { signing: SigningKey::from_bytes(seed) }
    }

    /// Fresh random keypair.
    pub fn generate() -> Self {
        Self { signing: SigningKey::generate(&mut OsRng) }
    }

    /// Reconstitute from a stored 64-byte secret key. Bytes [32..64) are
    /// the embedded public key and must match the secret half.
    pub fn from_secret_key(secret: &[u8; SECRET_KEY_BYTES]) -> Result<Self, Error> {
        let signing = SigningKey::from_keypair_bytes(secret)
            .map_err(|_| Error::encoding("secret key does not embed its public key"))?;
        Ok(Self { signing })
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_BYTES] {
        self.signing.verifying_key().to_bytes()
    }

    /// Secret key in the seed || public-key layout.
    pub fn secret_key(&self) -> Zeroizing<[u8; SECRET_KEY_BYTES]> {
        Zeroizing::new(self.signing.to_keypair_bytes())
    }

    pub fn sign_detached(&self, message: &[u8]) -> [u8; SIGNATURE_BYTES] {
        self.signing.sign(message).to_bytes()
    }

    /// Verify a detached signature against `public_key`.
    pub fn verify_detached(
        message: &[u8],
        signature: &[u8; SIGNATURE_BYTES],
        public_key: &[u8; PUBLIC_KEY_BYTES],
    ) -> Result<(), Error> {
        let key = VerifyingKey::from_bytes(public_key)
            .map_err(|_| Error::encoding("malformed public key"))?;
        let signature = Signature::from_bytes(signature);
        key.verify(message, &signature)
            .map_err(|_| Error::integrity("signature verification failed"))
    }

    /// Authenticated public-key encryption to a recipient's signing key.
    /// Output: nonce[24] || box ciphertext.
    pub fn encrypt_sign(
        &self,
        message: &[u8],
        recipient_pub: &[u8; PUBLIC_KEY_BYTES],
    ) -> Result<Vec<u8>, Error> {
        let sender = self.box_secret_key();
        let recipient = box_public_key(recipient_pub)?;
        let nonce: [u8; BOX_NONCE_BYTES] = random_bytes()?;
        let body = SalsaBox::new(&recipient, &sender)
            .encrypt(Nonce::<SalsaBox>::from_slice(&nonce), message)
            .map_err(|_| Error::encoding("box seal failed"))?;

        let mut out = Vec::with_capacity(BOX_NONCE_BYTES + body.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Inverse of [`encrypt_sign`](Self::encrypt_sign); authenticates the
    /// named sender. Uniform failure on any tag or key mismatch.
    pub fn decrypt_verify(
        &self,
        nonce_ciphertext: &[u8],
        sender_pub: &[u8; PUBLIC_KEY_BYTES],
    ) -> Result<Vec<u8>, Error> {
        if nonce_ciphertext.len() < BOX_NONCE_BYTES + TAG_BYTES {
            return Err(Error::integrity("box ciphertext too short"));
        }
        let (nonce, body) = nonce_ciphertext.split_at(BOX_NONCE_BYTES);
        let recipient = self.box_secret_key();
        let sender = box_public_key(sender_pub)?;
        SalsaBox::new(&sender, &recipient)
            .decrypt(Nonce::<SalsaBox>::from_slice(nonce), body)
            .map_err(|_| Error::integrity("box verification failed"))
    }

    /// SHA-512 of the seed, clamped: the standard Ed25519 -> X25519 secret
    /// conversion.
    fn box_secret_key(&self) -> BoxSecretKey {
        let hash = Sha512::digest(self.signing.to_bytes());
        let mut scalar = Zeroizing::new([0u8; 32]);
        scalar.copy_from_slice(&hash[..32]);
        scalar[0] &= 248;
        scalar[31] &= 127;
        scalar[31] |= 64;
        BoxSecretKey::from(*scalar)
    }
}

/// Edwards -> Montgomery conversion of a signing public key.
fn box_public_key(ed_pub: &[u8; PUBLIC_KEY_BYTES]) -> Result<BoxPublicKey, Error> {
    let point = CompressedEdwardsY(*ed_pub)
        .decompress()
        .ok_or_else(|| Error::encoding("public key is not a curve point"))?;
    Ok(BoxPublicKey::from(point.to_montgomery().to_bytes()))
}
