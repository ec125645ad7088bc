//! Symmetric crypto and digests used by wallet payloads
//!
//! - AES-256 in CBC or OFB mode, keyed by PBKDF2-HMAC-SHA1
//! - Legacy padding schemes
//! - SHA-256 checksums

mod cipher;
mod padding;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub use cipher::{
    decrypt, decrypt_with_params, encrypt, encrypt_with_params, encrypt_with_rng, CipherMode,
};
pub use padding::Padding;

/// AES block size in bytes, also the IV/salt length
pub const BLOCK_SIZE: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid base64 ciphertext: {0}")]
    Encoding(String),

    #[error("ciphertext too short: {0} bytes")]
    TooShort(usize),

    #[error("data not block size aligned")]
    NotBlockAligned,

    #[error("pad block corrupted")]
    PadBlockCorrupted,

    #[error("PBKDF2 iteration count must be positive")]
    ZeroIterations,
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
