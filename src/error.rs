//! Error types for the crypto core.
//!
//! The core recovers from nothing. Every failure is surfaced to the caller
//! with enough context to identify the affected object (uid, kind) but never
//! its plaintext contents. Transport failures (HTTP, network) belong to the
//! surrounding collaborator and do not exist at this layer.

use std::fmt;

use crate::symmetric::CURRENT_VERSION;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// AEAD verification failed, a revision MAC did not match, or a
    /// signature did not verify. Fatal for the affected object; never
    /// retried.
    Integrity(String),
    /// Malformed base64, non-UTF-8 meta, or a JSON failure on decrypted
    /// meta. Fatal for the affected object.
    Encoding(String),
    /// The object's protocol version exceeds what this build supports.
    /// Decryption of unknown-version objects is refused outright.
    Version { found: u8, supported: u8 },
}

impl Error {
    pub(crate) fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub(crate) fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub(crate) fn unsupported_version(found: u8) -> Self {
        Self::Version {
            found,
            supported: CURRENT_VERSION,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integrity(msg) => write!(f, "integrity check failed: {}", msg),
            Self::Encoding(msg) => write!(f, "encoding error: {}", msg),
            Self::Version { found, supported } => {
                write!(f, "unsupported version {} (supported up to {})", found, supported)
            }
        }
    }
}

impl std::error::Error for Error {}
