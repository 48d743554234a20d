//! # Vellum Core
//!
//! Client-side cryptographic core for end-to-end encrypted data
//! synchronization. Users organize data into collections of encrypted
//! items; all plaintext is encrypted on-device before transport, and the
//! server only ever stores and routes opaque ciphertext.
//!
//! ## Quick Start
//!
//! ```rust
//! use vellum_core::{Collection, CollectionMeta, CryptoManager, CURRENT_VERSION};
//!
//! # fn main() -> Result<(), vellum_core::Error> {
//! // The 32-byte master key normally comes from `derive_master_key`
//! // (password + salt); a fixed key keeps the example fast.
//! let master_key = [7u8; 32];
//! let main = CryptoManager::main(&master_key, CURRENT_VERSION)?;
//!
//! let meta = CollectionMeta {
//!     collection_type: "notes".into(),
//!     name: "My Notes".into(),
//!     description: None,
//!     color: None,
//! };
//! let collection = Collection::create(&main, &meta, b"first entry")?;
//!
//! collection.verify(&main)?;
//! assert_eq!(collection.decrypt_content(&main)?, b"first entry");
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Properties
//!
//! - **On-device encryption**: metadata and content are sealed with
//!   XChaCha20-Poly1305 before anything reaches the transport
//! - **MAC-chained revisions**: a revision's identifier *is* the keyed
//!   BLAKE2b MAC of its content, binding it to its place in history
//! - **Domain-separated keys**: every object scope derives its own cipher,
//!   MAC and signature-seed keys from an 8-byte context label
//! - **Authenticated sharing**: collection keys are sealed to recipient
//!   signing identities via Ed25519 -> X25519 conversion
//!
//! ## What's NOT Provided
//!
//! - Transport, pagination, sync tokens, caching
//! - Server-side authorization (access levels are server-enforced)
//! - Multi-chunk splitting of large content

#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/vellum-core/0.1.0")]

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

mod account;
mod aead;
mod asymmetric;
mod collection;
mod encoding;
mod error;
mod invitation;
mod kdf;
mod revision;
mod symmetric;

/// Transport-facing shapes and conversions.
pub mod wire;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

pub use account::{Account, AccountData, ChangePasswordPayload, SignupPayload, UserData};
pub use asymmetric::AsymmetricCryptoManager;
pub use collection::{AccessLevel, Collection, CollectionMeta, Item, ItemMeta};
pub use encoding::{from_base64, to_base64};
pub use error::Error;
pub use invitation::{accept, invite, pretty_fingerprint, Invitation};
pub use kdf::{derive_master_key, Context, KEY_BYTES, SALT_BYTES};
pub use revision::{Chunk, Revision};
pub use symmetric::{CryptoManager, MacBuilder, CURRENT_VERSION, MAC_BYTES};
