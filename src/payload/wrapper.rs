//! The versioned wrapper around an encrypted wallet document
//!
//! ```json
//! {"version": 4, "pbkdf2_iterations": 5000, "payload": "<base64 ciphertext>"}
//! ```

use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::PayloadError;
use crate::payload::account::AccountSchema;
use crate::payload::options::DEFAULT_PBKDF2_ITERATIONS;
use crate::payload::wallet::Wallet;
use crate::Result;

pub const V1: u32 = 1;
pub const V2: u32 = 2;
pub const V3: u32 = 3;
pub const V4: u32 = 4;

/// Newest version this crate writes
pub const SUPPORTED_VERSION: u32 = V4;

fn default_version() -> u32 {
    V2
}

fn default_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletWrapper {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_iterations")]
    pub pbkdf2_iterations: u32,
    pub payload: String,
}

impl WalletWrapper {
    pub fn wrap(encrypted_payload: String, version: u32, pbkdf2_iterations: u32) -> Self {
        Self {
            version,
            pbkdf2_iterations,
            payload: encrypted_payload,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PayloadError::Format(format!("invalid wallet wrapper: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate_version(&self) -> Result<()> {
        codec_for(self.version).map(|_| ())
    }

    /// SHA-256 hex of the serialized wrapper, the form that gets persisted
    pub fn checksum(&self) -> Result<String> {
        Ok(crypto::sha256_hex(self.to_json()?.as_bytes()))
    }

    /// Decrypt and decode the wallet document with this wrapper's parameters
    pub fn decrypt_payload(&self, password: &str) -> Result<Wallet> {
        let codec = codec_for(self.version)?;
        let plaintext = crypto::decrypt(&self.payload, password, self.pbkdf2_iterations)?;

        log::debug!(
            "Decrypted V{} payload with {} iterations",
            self.version,
            self.pbkdf2_iterations
        );
        codec.decode(&plaintext).map_err(|e| match e {
            PayloadError::Json(e) => PayloadError::Decryption(format!("invalid payload: {}", e)),
            other => other,
        })
    }
}

/// Serialization rules for one wrapper version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadCodec {
    version: u32,
    schema: AccountSchema,
}

const CODECS: [PayloadCodec; 4] = [
    PayloadCodec {
        version: V1,
        schema: AccountSchema::V3,
    },
    PayloadCodec {
        version: V2,
        schema: AccountSchema::V3,
    },
    PayloadCodec {
        version: V3,
        schema: AccountSchema::V3,
    },
    PayloadCodec {
        version: V4,
        schema: AccountSchema::V4,
    },
];

pub fn codec_for(version: u32) -> Result<PayloadCodec> {
    CODECS
        .iter()
        .find(|codec| codec.version == version)
        .copied()
        .ok_or(PayloadError::UnsupportedVersion(version))
}

impl PayloadCodec {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn schema(&self) -> AccountSchema {
        self.schema
    }

    fn check_schema(&self, wallet: &Wallet) -> Result<()> {
        let mismatch = wallet
            .wallet_bodies()
            .iter()
            .flat_map(|body| body.accounts.iter())
            .any(|account| account.schema() != self.schema);
        if mismatch {
            return Err(PayloadError::Format(format!(
                "version {} payload expects {:?} accounts",
                self.version, self.schema
            )));
        }
        Ok(())
    }

    pub fn decode(&self, json: &str) -> Result<Wallet> {
        let wallet: Wallet = serde_json::from_str(json)?;
        self.check_schema(&wallet)?;
        wallet.with_wrapper_version(self.version).restore_hd_wallets()
    }

    pub fn encode(&self, wallet: &Wallet) -> Result<String> {
        self.check_schema(wallet)?;
        Ok(serde_json::to_string(wallet)?)
    }
}
