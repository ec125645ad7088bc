//! Imported (non-HD) addresses

use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Address, Network, PrivateKey};
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;
use crate::Result;

/// `tag` value marking an archived address
pub const ARCHIVED_TAG: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedAddress {
    #[serde(rename = "addr")]
    pub address: String,

    /// Base58 raw private key, second-password ciphertext, or absent for watch-only
    #[serde(rename = "priv", default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_device_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_device_version: Option<String>,
}

/// P2PKH mainnet address for `key`, honoring its compression flag
pub(crate) fn p2pkh_address(key: &PrivateKey) -> String {
    let secp = Secp256k1::new();
    let pubkey = key.public_key(&secp);
    Address::p2pkh(pubkey.pubkey_hash(), Network::Bitcoin).to_string()
}

impl ImportedAddress {
    /// Build an address entry holding the raw (unencrypted) private key
    pub fn from_private_key(key: &PrivateKey, device_name: &str, device_version: &str) -> Self {
        Self {
            address: p2pkh_address(key),
            private_key: Some(bitcoin::base58::encode(&key.inner.secret_bytes())),
            label: None,
            tag: None,
            created_time: Some(chrono::Utc::now().timestamp_millis()),
            created_device_name: Some(device_name.to_string()),
            created_device_version: Some(device_version.to_string()),
        }
    }

    pub fn watch_only(address: &str) -> Self {
        Self {
            address: address.to_string(),
            private_key: None,
            label: None,
            tag: None,
            created_time: Some(chrono::Utc::now().timestamp_millis()),
            created_device_name: None,
            created_device_version: None,
        }
    }

    pub fn is_watch_only(&self) -> bool {
        self.private_key.is_none()
    }

    pub fn is_archived(&self) -> bool {
        self.tag == Some(ARCHIVED_TAG)
    }

    pub fn with_archived(self, archived: bool) -> Self {
        Self {
            tag: if archived { Some(ARCHIVED_TAG) } else { None },
            ..self
        }
    }

    pub fn with_label(self, label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..self
        }
    }

    pub fn with_private_key(self, private_key: String) -> Self {
        Self {
            private_key: Some(private_key),
            ..self
        }
    }

    /// Rebuild the signing key from a plaintext Base58 private key.
    ///
    /// The stored form carries no compression flag, so the one whose
    /// address matches this entry wins.
    pub(crate) fn signing_key(&self, plaintext_key: &str) -> Result<PrivateKey> {
        let bytes = bitcoin::base58::decode(plaintext_key)
            .map_err(|e| PayloadError::Decryption(format!("invalid private key: {}", e)))?;
        let mut key = PrivateKey::from_slice(&bytes, Network::Bitcoin)
            .map_err(|e| PayloadError::Decryption(format!("invalid private key: {}", e)))?;

        if p2pkh_address(&key) != self.address {
            key.compressed = false;
            if p2pkh_address(&key) != self.address {
                return Err(PayloadError::NoSuchAddress(self.address.clone()));
            }
        }
        Ok(key)
    }
}
