//! Error types for wallet payload operations
//!
//! `PayloadError` is what every public operation returns. The cipher layer
//! reports the narrower `CryptoError` (see `crate::crypto`), which folds
//! into `Decryption` or `Encryption` depending on the direction.

use thiserror::Error;

use crate::crypto::CryptoError;

#[derive(Error, Debug)]
pub enum PayloadError {
    /// Outer envelope or inner wrapper is malformed or missing fields
    #[error("Malformed wallet payload: {0}")]
    Format(String),

    #[error("Unsupported wallet wrapper version: {0}")]
    UnsupportedVersion(u32),

    /// Wrong password, corrupt ciphertext, exhausted legacy search or
    /// second password mismatch. The caller may prompt again.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Key encryption not consistent with the double encryption flag")]
    InconsistentEncryption,

    #[error("No such address: {0}")]
    NoSuchAddress(String),

    #[error("Address already imported: {0}")]
    DuplicateAddress(String),

    #[error("Watch-only address has no private key: {0}")]
    WatchOnly(String),

    #[error("HD wallet error: {0}")]
    HdWallet(String),

    /// An encrypt was requested on an envelope that was never decrypted
    #[error("No decrypted wallet available")]
    MissingWallet,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CryptoError> for PayloadError {
    fn from(err: CryptoError) -> Self {
        PayloadError::Decryption(err.to_string())
    }
}

impl PayloadError {
    /// Wrap a cipher failure raised while encrypting
    pub fn encryption(err: CryptoError) -> Self {
        PayloadError::Encryption(err.to_string())
    }

    /// True for failures a user can fix by entering another password
    pub fn is_password_error(&self) -> bool {
        matches!(self, PayloadError::Decryption(_))
    }
}
