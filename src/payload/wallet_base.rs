//! The outer envelope as stored by the backend
//!
//! `payload` holds either a serialized `WalletWrapper` (version 2 and up) or
//! a bare V1 ciphertext. The decrypted `Wallet` lives only in memory and is
//! never serialized into the envelope.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::PayloadError;
use crate::payload::legacy;
use crate::payload::wallet::Wallet;
use crate::payload::wrapper::{codec_for, WalletWrapper, V1, V2};
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    guid: Option<String>,

    #[serde(rename = "sharedKey", default, skip_serializing_if = "Option::is_none")]
    shared_key: Option<String>,

    payload: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload_checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    war_checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    storage_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    sync_pubkeys: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    extra_seed: Option<String>,

    #[serde(skip)]
    wallet: Option<Wallet>,
}

impl WalletBase {
    /// Parse the envelope only; the payload stays untouched
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PayloadError::Format(format!("invalid wallet envelope: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn payload_checksum(&self) -> Option<&str> {
        self.payload_checksum.as_deref()
    }

    pub fn sync_pubkeys(&self) -> bool {
        self.sync_pubkeys.unwrap_or(false)
    }

    pub fn wallet(&self) -> Option<&Wallet> {
        self.wallet.as_ref()
    }

    /// The payload parsed as JSON, `None` for a bare V1 ciphertext
    fn wrapper_value(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.payload).ok()
    }

    /// 1 for a bare ciphertext, otherwise the wrapper's version (2 if unset)
    pub fn payload_version(&self) -> u32 {
        match self.wrapper_value() {
            None => V1,
            Some(wrapper) => wrapper
                .get("version")
                .and_then(serde_json::Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(V2),
        }
    }

    /// Decrypt the payload into a `Wallet` held by the returned envelope.
    ///
    /// Only a payload that is not JSON goes through the V1 search; any JSON
    /// payload must be a wrapper, whatever version it names.
    pub fn with_decrypted_payload(&self, password: &str) -> Result<Self> {
        let version = self.payload_version();
        let wallet = match self.wrapper_value() {
            None => legacy::decrypt_v1_wallet(&self.payload, password)?,
            Some(_) => WalletWrapper::from_json(&self.payload)?.decrypt_payload(password)?,
        };

        log::info!(
            "Decrypted wallet {} (payload V{}, {} iterations)",
            wallet.guid(),
            version,
            wallet.options().pbkdf2_iterations()
        );
        Ok(self.with_wallet(wallet))
    }

    pub fn with_wallet(&self, wallet: Wallet) -> Self {
        Self {
            wallet: Some(wallet),
            ..self.clone()
        }
    }

    /// Encrypt the held wallet, returning `(checksum, wrapper)`
    pub fn encrypt_and_wrap_payload(&self, password: &str) -> Result<(String, WalletWrapper)> {
        self.encrypt_and_wrap_payload_with_rng(password, &mut OsRng)
    }

    /// As `encrypt_and_wrap_payload`, drawing the IV and padding from `rng`
    pub fn encrypt_and_wrap_payload_with_rng<R: RngCore + CryptoRng + ?Sized>(
        &self,
        password: &str,
        rng: &mut R,
    ) -> Result<(String, WalletWrapper)> {
        let wallet = self.wallet.as_ref().ok_or(PayloadError::MissingWallet)?;
        wallet.check_encryption_consistency()?;

        // V1 has no wrapper of its own
        let version = wallet.wrapper_version().max(V2);
        let json = codec_for(version)?.encode(wallet)?;
        let iterations = wallet.options().pbkdf2_iterations();

        let encrypted = crypto::encrypt_with_rng(&json, password, iterations, rng)
            .map_err(PayloadError::encryption)?;
        let wrapper = WalletWrapper::wrap(encrypted, version, iterations);
        let checksum = wrapper.checksum()?;

        log::debug!(
            "Wrapped wallet {} as V{} with {} iterations",
            wallet.guid(),
            version,
            iterations
        );
        Ok((checksum, wrapper))
    }

    /// The envelope to persist after `encrypt_and_wrap_payload`
    pub fn with_wrapped_payload(&self, checksum: String, wrapper: &WalletWrapper) -> Result<Self> {
        Ok(Self {
            payload: wrapper.to_json()?,
            payload_checksum: Some(checksum),
            ..self.clone()
        })
    }
}
