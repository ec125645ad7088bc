//! Classify stored key material as plaintext or second-password ciphertext

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::crypto::BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    Unencrypted,
    Encrypted,
    Unrecognized,
}

/// Ciphertext is `base64(iv || blocks)`: at least two blocks, block aligned.
fn looks_like_ciphertext(data: &str) -> bool {
    match STANDARD.decode(data) {
        Ok(bytes) => bytes.len() >= 2 * BLOCK_SIZE && bytes.len() % BLOCK_SIZE == 0,
        Err(_) => false,
    }
}

/// Extended private keys and imported keys are Base58 when unencrypted.
pub fn classify_private_key(key: &str) -> KeyEncoding {
    if !key.is_empty() && bitcoin::base58::decode(key).is_ok() {
        KeyEncoding::Unencrypted
    } else if looks_like_ciphertext(key) {
        KeyEncoding::Encrypted
    } else {
        KeyEncoding::Unrecognized
    }
}

/// HD seeds are stored as hex entropy when unencrypted.
pub fn classify_seed(seed: &str) -> KeyEncoding {
    if !seed.is_empty() && hex::decode(seed).is_ok() {
        KeyEncoding::Unencrypted
    } else if looks_like_ciphertext(seed) {
        KeyEncoding::Encrypted
    } else {
        KeyEncoding::Unrecognized
    }
}

pub fn is_key_encrypted(key: &str) -> bool {
    classify_private_key(key) == KeyEncoding::Encrypted
}

pub fn is_key_unencrypted(key: &str) -> bool {
    classify_private_key(key) == KeyEncoding::Unencrypted
}

/// Plaintext of either stored kind: a Base58 key or a hex seed
pub fn is_plain_key_material(data: &str) -> bool {
    classify_private_key(data) == KeyEncoding::Unencrypted
        || classify_seed(data) == KeyEncoding::Unencrypted
}
