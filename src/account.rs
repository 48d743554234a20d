//! Account root: the password-derived key hierarchy and the stored signing
//! identity.
//!
//! Key material flow: password + per-user salt -> Argon2id -> 32-byte
//! master key (never leaves the device) -> main crypto manager (context
//! `"Main    "`). The main manager's cipher key wraps the long-term
//! identity secret for server-side storage; its asymmetric seed yields the
//! deterministic login keypair used for challenge-response authentication,
//! so the server never sees the password or the master key.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::asymmetric::{AsymmetricCryptoManager, SECRET_KEY_BYTES, SIGNATURE_BYTES};
use crate::encoding::{from_base64, random_bytes, to_base64};
use crate::error::Error;
use crate::kdf::{self, KEY_BYTES, SALT_BYTES};
use crate::symmetric::{CryptoManager, CURRENT_VERSION};

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

/// Signup material published to the server. Produced entirely offline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    pub username: String,
    pub email: String,
    pub salt: String,
    pub login_pubkey: String,
    pub pubkey: String,
    pub encrypted_content: String,
}

/// Re-keying payload for a password change. The transport must ship it
/// atomically: a partial apply locks the user out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    pub salt: String,
    pub login_pubkey: String,
    pub encrypted_content: String,
}

/// Opaque export/import blob for a logged-in account. Round-trips
/// byte-identically for a given protocol version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    pub version: u8,
    pub key: String,
    pub user: UserData,
    pub server_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub username: String,
    pub salt: String,
    pub login_pubkey: String,
    pub pubkey: String,
    pub encrypted_content: String,
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A logged-in account: exclusive owner of the master key.
///
/// The master key buffer is zeroized when the account is dropped (or
/// explicitly via [`logout`](Self::logout)).
pub struct Account {
    username: String,
    email: Option<String>,
    version: u8,
    salt: [u8; SALT_BYTES],
    master_key: Zeroizing<[u8; KEY_BYTES]>,
    identity: AsymmetricCryptoManager,
    encrypted_content: Vec<u8>,
    server_url: Option<String>,
}

impl Account {
    /// Prepare signup key material offline: salt, master key, identity
    /// keypair, and the payload the transport publishes.
    pub fn signup(username: &str, email: &str, password: &str) -> Result<(Self, SignupPayload), Error> {
        let salt: [u8; SALT_BYTES] = random_bytes()?;
        let master_key = kdf::derive_master_key(password, &salt)?;
        let identity = AsymmetricCryptoManager::generate();

        let main = CryptoManager::main(&master_key, CURRENT_VERSION)?;
        let encrypted_content = main.encrypt(&identity.secret_key()[..], None)?;

        let account = Self {
            username: username.to_string(),
            email: Some(email.to_string()),
            version: CURRENT_VERSION,
            salt,
            master_key,
            identity,
            encrypted_content,
            server_url: None,
        };
        let payload = SignupPayload {
            username: account.username.clone(),
            email: email.to_string(),
            salt: to_base64(&account.salt),
            login_pubkey: to_base64(&account.login_crypto_manager()?.public_key()),
            pubkey: to_base64(&account.identity.public_key()),
            encrypted_content: to_base64(&account.encrypted_content),
        };
        tracing::debug!(username, "prepared signup material");
        Ok((account, payload))
    }

    /// Unlock an account from the salt fetched by username and the stored
    /// `encryptedContent` blob returned after challenge-response login.
    pub fn login(
        username: &str,
        password: &str,
        salt: &[u8; SALT_BYTES],
        encrypted_content: &[u8],
    ) -> Result<Self, Error> {
        let master_key = kdf::derive_master_key(password, salt)?;
        let main = CryptoManager::main(&master_key, CURRENT_VERSION)?;

        let identity = decrypt_identity(&main, encrypted_content)?;
        tracing::debug!(username, "account unlocked");
        Ok(Self {
            username: username.to_string(),
            email: None,
            version: CURRENT_VERSION,
            salt: *salt,
            master_key,
            identity,
            encrypted_content: encrypted_content.to_vec(),
            server_url: None,
        })
    }

    /// Sign a server login challenge with the deterministic login keypair.
    pub fn sign_challenge(&self, challenge: &[u8]) -> Result<[u8; SIGNATURE_BYTES], Error> {
        Ok(self.login_crypto_manager()?.sign_detached(challenge))
    }

    /// The account-root symmetric manager.
    pub fn main_crypto_manager(&self) -> Result<CryptoManager, Error> {
        CryptoManager::main(&self.master_key, self.version)
    }

    /// The login keypair, derived from the main manager's asymmetric seed.
    pub fn login_crypto_manager(&self) -> Result<AsymmetricCryptoManager, Error> {
        let main = self.main_crypto_manager()?;
        Ok(AsymmetricCryptoManager::from_seed(main.asym_key_seed()))
    }

    /// The long-term identity keypair.
    pub fn identity(&self) -> &AsymmetricCryptoManager {
        &self.identity
    }

    /// Re-key the account under a new password: fresh salt, fresh master
    /// key, identity re-encrypted under the new main cipher key.
    pub fn change_password(&mut self, new_password: &str) -> Result<ChangePasswordPayload, Error> {
        let salt: [u8; SALT_BYTES] = random_bytes()?;
        let master_key = kdf::derive_master_key(new_password, &salt)?;
        let main = CryptoManager::main(&master_key, self.version)?;
        let encrypted_content = main.encrypt(&self.identity.secret_key()[..], None)?;

        self.salt = salt;
        self.master_key = master_key;
        self.encrypted_content = encrypted_content;

        tracing::debug!(username = %self.username, "account re-keyed");
        Ok(ChangePasswordPayload {
            salt: to_base64(&self.salt),
            login_pubkey: to_base64(&self.login_crypto_manager()?.public_key()),
            encrypted_content: to_base64(&self.encrypted_content),
        })
    }

    /// Export the opaque persistence blob.
    pub fn save(&self) -> Result<AccountData, Error> {
        Ok(AccountData {
            version: self.version,
            key: to_base64(&self.master_key[..]),
            user: UserData {
                username: self.username.clone(),
                salt: to_base64(&self.salt),
                login_pubkey: to_base64(&self.login_crypto_manager()?.public_key()),
                pubkey: to_base64(&self.identity.public_key()),
                encrypted_content: to_base64(&self.encrypted_content),
            },
            server_url: self.server_url.clone(),
        })
    }

    /// Import a blob produced by [`save`](Self::save).
    pub fn restore(data: &AccountData) -> Result<Self, Error> {
        if data.version > CURRENT_VERSION {
            return Err(Error::unsupported_version(data.version));
        }
        let master_key = decode_fixed::<KEY_BYTES>(&data.key, "account master key")?;
        let salt = *decode_fixed::<SALT_BYTES>(&data.user.salt, "account salt")?;
        let encrypted_content = from_base64(&data.user.encrypted_content)?;

        let main = CryptoManager::main(&master_key, data.version)?;
        let identity = decrypt_identity(&main, &encrypted_content)?;

        Ok(Self {
            username: data.user.username.clone(),
            email: None,
            version: data.version,
            salt,
            master_key,
            identity,
            encrypted_content,
            server_url: data.server_url.clone(),
        })
    }

    /// Drop the account, zeroizing the master key buffer.
    pub fn logout(self) {
        tracing::debug!(username = %self.username, "logged out");
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn salt(&self) -> &[u8; SALT_BYTES] {
        &self.salt
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref()
    }

    pub fn set_server_url(&mut self, url: Option<String>) {
        self.server_url = url;
    }
}

fn decrypt_identity(
    main: &CryptoManager,
    encrypted_content: &[u8],
) -> Result<AsymmetricCryptoManager, Error> {
    let plain = Zeroizing::new(main.decrypt(encrypted_content, None).map_err(|_| {
        Error::integrity("stored identity key failed verification (wrong password?)")
    })?);
    if plain.len() != SECRET_KEY_BYTES {
        return Err(Error::encoding("stored identity key has wrong length"));
    }
    let mut secret = Zeroizing::new([0u8; SECRET_KEY_BYTES]);
    secret.copy_from_slice(&plain);
    AsymmetricCryptoManager::from_secret_key(&secret)
}

fn decode_fixed<const N: usize>(
    encoded: &str,
    what: &str,
) -> Result<Zeroizing<[u8; N]>, Error> {
    let decoded = Zeroizing::new(from_base64(encoded)?);
    if decoded.len() != N {
        return Err(Error::encoding(format!("{}: wrong length", what)));
    }
    let mut out = Zeroizing::new([0u8; N]);
    out.copy_from_slice(&decoded);
    Ok(out)
}
