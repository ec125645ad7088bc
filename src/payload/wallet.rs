//! The decrypted wallet document and its transitions
//!
//! Every mutation returns a new `Wallet`. Mutations that write private key
//! material validate the second password first and seal new keys with the
//! same shared key and iteration count as the rest of the wallet, so the
//! encryption-consistency check holds after each of them.

use std::collections::BTreeMap;

use bitcoin::PrivateKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{PayloadConfig, DEFAULT_MNEMONIC_WORDS};
use crate::crypto::CryptoError;
use crate::double_encryption::{seal, unseal, KeyCipher};
use crate::error::PayloadError;
use crate::key_format::{classify_private_key, classify_seed, KeyEncoding};
use crate::payload::account::{Account, AccountSchema};
use crate::payload::imported_address::{p2pkh_address, ImportedAddress};
use crate::payload::options::Options;
use crate::payload::wallet_body::WalletBody;
use crate::payload::wrapper::{codec_for, V2, V3, V4};
use crate::Result;

fn default_wrapper_version() -> u32 {
    V2
}

/// The decrypted wallet document.
///
/// `Wallet::from_json` records the wrapper version the document was read
/// with. A document deserialized directly is treated as version 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    guid: String,

    #[serde(rename = "sharedKey")]
    shared_key: String,

    #[serde(default)]
    double_encryption: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    dpasswordhash: Option<String>,

    #[serde(default, alias = "wallet_options")]
    options: Options,

    #[serde(
        rename = "hd_wallets",
        alias = "wallet_bodies",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    wallet_bodies: Vec<WalletBody>,

    #[serde(rename = "keys", default)]
    imported_addresses: Vec<ImportedAddress>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tx_notes: BTreeMap<String, String>,

    /// Wrapper version this document was read as, or will be written as
    #[serde(skip, default = "default_wrapper_version")]
    wrapper_version: u32,
}

impl Wallet {
    /// A brand new V4 wallet with one HD body
    pub fn create(config: &PayloadConfig) -> Result<Self> {
        let body = WalletBody::create(
            &config.default_account_label,
            AccountSchema::V4,
            config.mnemonic_words,
        )?;
        let wallet = Self::from_wallet_body(body, config);
        log::info!("Created wallet {}", wallet.guid);
        Ok(wallet)
    }

    /// Wrap an existing body (e.g. a recovered one) in a new wallet identity
    pub fn from_wallet_body(body: WalletBody, config: &PayloadConfig) -> Self {
        let has_v3 = body
            .accounts
            .iter()
            .any(|a| a.schema() == AccountSchema::V3);
        Self {
            guid: Uuid::new_v4().to_string(),
            shared_key: Uuid::new_v4().to_string(),
            double_encryption: false,
            dpasswordhash: None,
            options: Options::new_wallet(config.pbkdf2_iterations),
            wallet_bodies: vec![body],
            imported_addresses: Vec::new(),
            tx_notes: BTreeMap::new(),
            wrapper_version: if has_v3 { V3 } else { V4 },
        }
    }

    /// Parse a decrypted document with the codec of `version`
    pub fn from_json(json: &str, version: u32) -> Result<Self> {
        codec_for(version)?.decode(json)
    }

    pub fn to_json(&self) -> Result<String> {
        codec_for(self.wrapper_version)?.encode(self)
    }

    /// Set by the codec after a successful decode
    pub(crate) fn with_wrapper_version(self, wrapper_version: u32) -> Self {
        Self {
            wrapper_version,
            ..self
        }
    }

    pub(crate) fn restore_hd_wallets(self) -> Result<Self> {
        let wallet_bodies = self
            .wallet_bodies
            .into_iter()
            .map(WalletBody::restore_hd)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            wallet_bodies,
            ..self
        })
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn shared_key(&self) -> &str {
        &self.shared_key
    }

    pub fn is_double_encrypted(&self) -> bool {
        self.double_encryption
    }

    pub fn dpasswordhash(&self) -> Option<&str> {
        self.dpasswordhash.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn wallet_bodies(&self) -> &[WalletBody] {
        &self.wallet_bodies
    }

    pub fn imported_addresses(&self) -> &[ImportedAddress] {
        &self.imported_addresses
    }

    pub fn tx_notes(&self) -> &BTreeMap<String, String> {
        &self.tx_notes
    }

    pub fn wrapper_version(&self) -> u32 {
        self.wrapper_version
    }

    pub fn is_upgraded_to_v3(&self) -> bool {
        !self.wallet_bodies.is_empty()
    }

    /// The canonical HD body; only one is supported
    pub fn wallet_body(&self) -> Option<&WalletBody> {
        self.wallet_bodies.first()
    }

    fn account_schema(&self) -> AccountSchema {
        if self.wrapper_version >= V4 {
            AccountSchema::V4
        } else {
            AccountSchema::V3
        }
    }

    // --- second password ---

    /// Check `second_password` against this wallet.
    ///
    /// Returns the cipher to seal keys with when the wallet is double
    /// encrypted, `None` otherwise.
    pub fn validate_second_password(
        &self,
        second_password: Option<&str>,
    ) -> Result<Option<KeyCipher>> {
        match (self.double_encryption, second_password) {
            (true, Some(password)) => {
                let cipher =
                    KeyCipher::new(&self.shared_key, password, self.options.pbkdf2_iterations());
                match self.dpasswordhash.as_deref() {
                    Some(stored) if cipher.matches(stored) => Ok(Some(cipher)),
                    _ => Err(PayloadError::Decryption(
                        "Validate access failed: wrong second password".to_string(),
                    )),
                }
            }
            (true, None) => Err(PayloadError::Decryption(
                "Second password required".to_string(),
            )),
            (false, Some(_)) => Err(PayloadError::Decryption(
                "Wallet is not double encrypted".to_string(),
            )),
            (false, None) => Ok(None),
        }
    }

    /// True when every stored private key matches the double-encryption flag
    pub fn is_encryption_consistent(&self) -> bool {
        let expected = if self.double_encryption {
            KeyEncoding::Encrypted
        } else {
            KeyEncoding::Unencrypted
        };

        let seeds_ok = self
            .wallet_bodies
            .iter()
            .all(|body| classify_seed(&body.seed_hex) == expected);

        let accounts_ok = self
            .wallet_bodies
            .iter()
            .flat_map(|body| body.accounts.iter())
            .flat_map(|account| account.xprivs())
            .all(|xpriv| classify_private_key(xpriv) == expected);

        let imported_ok = self
            .imported_addresses
            .iter()
            .filter_map(|a| a.private_key.as_deref())
            .all(|key| classify_private_key(key) == expected);

        seeds_ok && accounts_ok && imported_ok
    }

    pub fn check_encryption_consistency(&self) -> Result<()> {
        if self.is_encryption_consistent() {
            Ok(())
        } else {
            log::warn!("Wallet {} has inconsistent key encryption", self.guid);
            Err(PayloadError::InconsistentEncryption)
        }
    }

    /// Apply `f` to every private key: seeds, account xprivs and imported keys
    fn map_private_keys<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        let wallet_bodies = self
            .wallet_bodies
            .iter()
            .map(|body| body.map_private_keys(&mut f))
            .collect::<Result<Vec<_>>>()?;
        let imported_addresses = self
            .imported_addresses
            .iter()
            .map(|address| match address.private_key.as_deref() {
                Some(key) => Ok(address.clone().with_private_key(f(key)?)),
                None => Ok(address.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            wallet_bodies,
            imported_addresses,
            ..self.clone()
        })
    }

    pub fn enable_double_encryption(&self, second_password: &str) -> Result<Self> {
        if self.double_encryption {
            return Err(PayloadError::Encryption(
                "Wallet is already double encrypted".to_string(),
            ));
        }
        if second_password.is_empty() {
            return Err(PayloadError::Encryption(
                "Second password must not be empty".to_string(),
            ));
        }
        self.check_encryption_consistency()?;

        let cipher = KeyCipher::new(
            &self.shared_key,
            second_password,
            self.options.pbkdf2_iterations(),
        );
        let wallet = self.map_private_keys(|key| cipher.encrypt(key))?;
        log::info!("Enabled double encryption on wallet {}", self.guid);
        Ok(Self {
            double_encryption: true,
            dpasswordhash: Some(cipher.hash()),
            ..wallet
        })
    }

    pub fn disable_double_encryption(&self, second_password: &str) -> Result<Self> {
        let cipher = self
            .validate_second_password(Some(second_password))?
            .ok_or_else(|| PayloadError::Decryption("Wallet is not double encrypted".into()))?;
        let wallet = self.map_private_keys(|key| cipher.decrypt(key))?;
        log::info!("Disabled double encryption on wallet {}", self.guid);
        Self {
            double_encryption: false,
            dpasswordhash: None,
            ..wallet
        }
        .restore_hd_wallets()
    }

    pub fn change_second_password(&self, old: &str, new: &str) -> Result<Self> {
        self.disable_double_encryption(old)?
            .enable_double_encryption(new)
    }

    /// Change the PBKDF2 work factor, re-deriving every sealed key with it
    pub fn update_pbkdf2_iterations(
        &self,
        iterations: u32,
        second_password: Option<&str>,
    ) -> Result<Self> {
        if iterations == 0 {
            return Err(PayloadError::encryption(CryptoError::ZeroIterations));
        }
        let cipher = self.validate_second_password(second_password)?;
        let options = self.options.clone().with_pbkdf2_iterations(iterations);

        let wallet = match cipher {
            Some(old) => {
                let new = old.with_iterations(iterations);
                let wallet = self.map_private_keys(|key| new.encrypt(&old.decrypt(key)?))?;
                Self {
                    dpasswordhash: Some(new.hash()),
                    ..wallet
                }
            }
            None => self.clone(),
        };
        log::debug!(
            "Wallet {} PBKDF2 iterations {} -> {}",
            self.guid,
            self.options.pbkdf2_iterations(),
            iterations
        );
        Ok(Self { options, ..wallet })
    }

    // --- upgrades ---

    /// Add the first HD body. No-op when the wallet already has one.
    pub fn upgrade_v2_payload_to_v3(
        &self,
        second_password: Option<&str>,
        default_account_name: &str,
    ) -> Result<Self> {
        if self.is_upgraded_to_v3() {
            return Ok(self.clone());
        }
        let cipher = self.validate_second_password(second_password)?;

        let body =
            WalletBody::create(default_account_name, AccountSchema::V3, DEFAULT_MNEMONIC_WORDS)?;
        let body = match cipher.as_ref() {
            Some(cipher) => body.map_private_keys(&mut |key: &str| cipher.encrypt(key))?,
            None => body,
        };

        log::info!("Upgraded wallet {} to V3", self.guid);
        Ok(Self {
            wallet_bodies: vec![body],
            wrapper_version: self.wrapper_version.max(V3),
            ..self.clone()
        })
    }

    /// Give every account a segwit derivation next to its legacy keys
    pub fn upgrade_v3_payload_to_v4(&self, second_password: Option<&str>) -> Result<Self> {
        if !self.is_upgraded_to_v3() {
            return Err(PayloadError::HdWallet(
                "No HD wallet to upgrade, upgrade to V3 first".to_string(),
            ));
        }
        let locked = self.wallet_bodies.iter().any(|b| !b.is_hd_decrypted());
        if self.double_encryption && second_password.is_none() && locked {
            return Err(PayloadError::HdWallet(
                "Wallet private key unavailable. First decrypt with second password.".to_string(),
            ));
        }
        let cipher = self.validate_second_password(second_password)?;

        let wallet_bodies = self
            .wallet_bodies
            .iter()
            .map(|body| {
                body.decrypt_hd_wallet(cipher.as_ref())?
                    .upgrade_accounts_to_v4(cipher.as_ref())
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!("Upgraded wallet {} to V4", self.guid);
        Ok(Self {
            wallet_bodies,
            wrapper_version: V4,
            ..self.clone()
        })
    }

    /// Make master keys available for every body
    pub fn decrypt_hd_wallet(&self, second_password: Option<&str>) -> Result<Self> {
        let cipher = self.validate_second_password(second_password)?;
        let wallet_bodies = self
            .wallet_bodies
            .iter()
            .map(|body| body.decrypt_hd_wallet(cipher.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            wallet_bodies,
            ..self.clone()
        })
    }

    // --- accounts ---

    fn with_default_body(&self, body: WalletBody) -> Self {
        let mut wallet_bodies = self.wallet_bodies.clone();
        match wallet_bodies.first_mut() {
            Some(first) => *first = body,
            None => wallet_bodies.push(body),
        }
        Self {
            wallet_bodies,
            ..self.clone()
        }
    }

    fn default_body(&self) -> Result<&WalletBody> {
        self.wallet_body()
            .ok_or_else(|| PayloadError::HdWallet("Wallet has no HD wallet".to_string()))
    }

    /// Derive the next account of the default body
    pub fn add_account(&self, label: &str, second_password: Option<&str>) -> Result<Self> {
        let cipher = self.validate_second_password(second_password)?;
        let body = self
            .default_body()?
            .decrypt_hd_wallet(cipher.as_ref())?
            .with_new_account(label, self.account_schema(), cipher.as_ref())?;
        log::debug!(
            "Wallet {} now has {} accounts",
            self.guid,
            body.accounts.len()
        );
        Ok(self.with_default_body(body))
    }

    pub fn replace_account(&self, old: &Account, new: Account) -> Result<Self> {
        let body = self.default_body()?.replace_account(old, new);
        Ok(self.with_default_body(body))
    }

    pub fn update_account_label(&self, account: &Account, label: &str) -> Result<Self> {
        let body = self.default_body()?.update_account_label(account, label);
        Ok(self.with_default_body(body))
    }

    pub fn update_account_archived(&self, account: &Account, archived: bool) -> Result<Self> {
        let body = self.default_body()?.update_account_archived(account, archived);
        Ok(self.with_default_body(body))
    }

    pub fn update_default_index(&self, index: usize) -> Result<Self> {
        let body = self.default_body()?.update_default_index(index);
        Ok(self.with_default_body(body))
    }

    pub fn update_mnemonic_verified(&self, verified: bool) -> Result<Self> {
        let body = self.default_body()?.update_mnemonic_verified(verified);
        Ok(self.with_default_body(body))
    }

    pub fn with_updated_bodies_and_version(
        &self,
        wallet_bodies: Vec<WalletBody>,
        wrapper_version: u32,
    ) -> Self {
        Self {
            wallet_bodies,
            wrapper_version,
            ..self.clone()
        }
    }

    // --- imported addresses ---

    /// Seal a plaintext key, or accept one already sealed with this wallet's cipher
    fn sealed_import(
        &self,
        address: ImportedAddress,
        cipher: Option<&KeyCipher>,
    ) -> Result<ImportedAddress> {
        let key = match address.private_key.as_deref() {
            None => return Ok(address),
            Some(key) => key,
        };
        match (classify_private_key(key), cipher) {
            (KeyEncoding::Unencrypted, _) => {
                let sealed = seal(cipher, key)?;
                Ok(address.with_private_key(sealed))
            }
            (KeyEncoding::Encrypted, Some(cipher)) => match cipher.decrypt(key) {
                Ok(_) => Ok(address),
                Err(e) => {
                    log::warn!("Refusing sealed key for {}: {}", address.address, e);
                    Err(PayloadError::InconsistentEncryption)
                }
            },
            _ => Err(PayloadError::InconsistentEncryption),
        }
    }

    /// Entry for `key` with its private key sealed as this wallet requires
    pub fn imported_address_from_key(
        &self,
        key: &PrivateKey,
        second_password: Option<&str>,
        device_name: &str,
        device_version: &str,
    ) -> Result<ImportedAddress> {
        let cipher = self.validate_second_password(second_password)?;
        let address = ImportedAddress::from_private_key(key, device_name, device_version);
        self.sealed_import(address, cipher.as_ref())
    }

    pub fn add_imported_address(
        &self,
        address: ImportedAddress,
        second_password: Option<&str>,
    ) -> Result<Self> {
        if self.contains_imported_address(&address.address) {
            return Err(PayloadError::DuplicateAddress(address.address));
        }
        let cipher = self.validate_second_password(second_password)?;
        let address = self.sealed_import(address, cipher.as_ref())?;

        let mut imported_addresses = self.imported_addresses.clone();
        imported_addresses.push(address);
        Ok(Self {
            imported_addresses,
            ..self.clone()
        })
    }

    pub fn replace_or_add_imported_address(
        &self,
        address: ImportedAddress,
        second_password: Option<&str>,
    ) -> Result<Self> {
        let cipher = self.validate_second_password(second_password)?;
        let address = self.sealed_import(address, cipher.as_ref())?;

        let mut imported_addresses = self.imported_addresses.clone();
        match imported_addresses
            .iter_mut()
            .find(|a| a.address == address.address)
        {
            Some(existing) => *existing = address,
            None => imported_addresses.push(address),
        }
        Ok(Self {
            imported_addresses,
            ..self.clone()
        })
    }

    /// Attach the private key to an existing (typically watch-only) address
    pub fn update_key_for_imported_address(
        &self,
        key: &PrivateKey,
        second_password: Option<&str>,
    ) -> Result<Self> {
        let mut flipped = *key;
        flipped.compressed = !key.compressed;
        let candidates = [p2pkh_address(key), p2pkh_address(&flipped)];

        let existing = self
            .imported_addresses
            .iter()
            .find(|a| candidates.contains(&a.address))
            .ok_or_else(|| PayloadError::NoSuchAddress(candidates[0].clone()))?;

        let cipher = self.validate_second_password(second_password)?;
        let raw = bitcoin::base58::encode(&key.inner.secret_bytes());
        let updated = existing.clone().with_private_key(seal(cipher.as_ref(), &raw)?);
        Ok(self.with_imported_address(updated))
    }

    /// Replace the entry with the same address
    fn with_imported_address(&self, address: ImportedAddress) -> Self {
        let imported_addresses = self
            .imported_addresses
            .iter()
            .map(|a| {
                if a.address == address.address {
                    address.clone()
                } else {
                    a.clone()
                }
            })
            .collect();
        Self {
            imported_addresses,
            ..self.clone()
        }
    }

    /// Plaintext signing key for an imported address
    pub fn imported_address_signing_key(
        &self,
        address: &str,
        second_password: Option<&str>,
    ) -> Result<PrivateKey> {
        let entry = self
            .imported_addresses
            .iter()
            .find(|a| a.address == address)
            .ok_or_else(|| PayloadError::NoSuchAddress(address.to_string()))?;
        let stored = entry
            .private_key
            .as_deref()
            .ok_or_else(|| PayloadError::WatchOnly(address.to_string()))?;

        let cipher = self.validate_second_password(second_password)?;
        let raw = unseal(cipher.as_ref(), stored)?;
        entry.signing_key(&raw)
    }

    /// Addresses of all non-archived imported entries
    pub fn imported_address_strings(&self) -> Vec<String> {
        self.imported_addresses
            .iter()
            .filter(|a| !a.is_archived())
            .map(|a| a.address.clone())
            .collect()
    }

    pub fn contains_imported_address(&self, address: &str) -> bool {
        self.imported_addresses.iter().any(|a| a.address == address)
    }

    /// Label of an imported address, or the address itself when it has none
    pub fn label_from_imported_address<'a>(&'a self, address: &'a str) -> &'a str {
        self.imported_addresses
            .iter()
            .find(|a| a.address == address)
            .and_then(|a| a.label.as_deref())
            .filter(|label| !label.is_empty())
            .unwrap_or(address)
    }

    pub fn update_imported_address_archived(&self, address: &str, archived: bool) -> Result<Self> {
        let entry = self
            .imported_addresses
            .iter()
            .find(|a| a.address == address)
            .ok_or_else(|| PayloadError::NoSuchAddress(address.to_string()))?;
        Ok(self.with_imported_address(entry.clone().with_archived(archived)))
    }

    pub fn update_imported_address_label(&self, address: &str, label: &str) -> Result<Self> {
        let entry = self
            .imported_addresses
            .iter()
            .find(|a| a.address == address)
            .ok_or_else(|| PayloadError::NoSuchAddress(address.to_string()))?;
        Ok(self.with_imported_address(entry.clone().with_label(label)))
    }

    // --- notes ---

    /// Set the note for a transaction; an empty note removes it
    pub fn update_tx_notes(&self, tx_hash: &str, note: &str) -> Self {
        let mut tx_notes = self.tx_notes.clone();
        if note.is_empty() {
            tx_notes.remove(tx_hash);
        } else {
            tx_notes.insert(tx_hash.to_string(), note.to_string());
        }
        Self {
            tx_notes,
            ..self.clone()
        }
    }

    pub(crate) fn set_default_pbkdf2_iterations(self, iterations: u32) -> Self {
        if self.options.pbkdf2_iterations.is_some() {
            return self;
        }
        Self {
            options: self.options.clone().with_pbkdf2_iterations(iterations),
            ..self
        }
    }
}
