//! Second-password ("double") encryption of private key material
//!
//! Every private key written into a double-encrypted wallet is encrypted
//! with `shared_key + second_password` at the wallet's PBKDF2 iteration
//! count. A `KeyCipher` only exists once the second password has been
//! checked against the stored hash, so holding one is proof of validation.

use sha2::{Digest, Sha256};

use crate::crypto;
use crate::error::PayloadError;
use crate::key_format::is_plain_key_material;
use crate::Result;

/// SHA-256 of `shared_key + second_password`, re-hashed until `iterations`
/// rounds have been applied. Returned as lowercase hex.
pub fn hash_second_password(shared_key: &str, second_password: &str, iterations: u32) -> String {
    let mut digest = Sha256::digest(format!("{}{}", shared_key, second_password).as_bytes());
    for _ in 1..iterations {
        digest = Sha256::digest(digest);
    }
    hex::encode(digest)
}

/// A validated second password bound to one wallet's shared key and
/// iteration count.
#[derive(Clone)]
pub struct KeyCipher {
    shared_key: String,
    second_password: String,
    iterations: u32,
}

impl std::fmt::Debug for KeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCipher")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl KeyCipher {
    pub(crate) fn new(shared_key: &str, second_password: &str, iterations: u32) -> Self {
        Self {
            shared_key: shared_key.to_string(),
            second_password: second_password.to_string(),
            iterations,
        }
    }

    /// Check the password against a stored `dpasswordhash`
    pub fn matches(&self, stored_hash: &str) -> bool {
        self.hash() == stored_hash
    }

    pub fn hash(&self) -> String {
        hash_second_password(&self.shared_key, &self.second_password, self.iterations)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn password(&self) -> String {
        format!("{}{}", self.shared_key, self.second_password)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        crypto::encrypt(plaintext, &self.password(), self.iterations)
            .map_err(PayloadError::encryption)
    }

    /// Open a sealed key or seed.
    ///
    /// ISO10126 removal accepts most wrong-key blocks, so the plaintext must
    /// also look like key material.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let plain = crypto::decrypt(ciphertext, &self.password(), self.iterations)?;
        if !is_plain_key_material(&plain) {
            return Err(PayloadError::Decryption(
                "Sealed key did not open with this second password".to_string(),
            ));
        }
        Ok(plain)
    }

    /// Same password, different iteration count
    pub(crate) fn with_iterations(&self, iterations: u32) -> Self {
        Self {
            iterations,
            ..self.clone()
        }
    }
}

/// Encrypt `key` when a cipher is active, otherwise pass it through.
pub fn seal(cipher: Option<&KeyCipher>, key: &str) -> Result<String> {
    match cipher {
        Some(cipher) => cipher.encrypt(key),
        None => Ok(key.to_string()),
    }
}

/// Decrypt `key` when a cipher is active, otherwise pass it through.
pub fn unseal(cipher: Option<&KeyCipher>, key: &str) -> Result<String> {
    match cipher {
        Some(cipher) => cipher.decrypt(key),
        None => Ok(key.to_string()),
    }
}
