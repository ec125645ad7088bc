//! One HD wallet inside the payload: seed, passphrase and accounts

use bitcoin::bip32::Xpriv;
use serde::{Deserialize, Serialize};

use crate::double_encryption::{unseal, KeyCipher};
use crate::error::PayloadError;
use crate::hd::{HdWallet, Purpose};
use crate::key_format::{classify_seed, KeyEncoding};
use crate::payload::account::{
    Account, AccountSchema, AccountV3, AccountV4, Derivation, DerivationType,
};
use crate::Result;

const HD_LOCKED: &str = "Wallet private key unavailable. First decrypt with second password.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBody {
    /// BIP39 entropy as hex, or its second-password ciphertext
    pub seed_hex: String,
    #[serde(default)]
    pub passphrase: String,
    #[serde(default)]
    pub mnemonic_verified: bool,
    #[serde(default)]
    pub default_account_idx: usize,
    #[serde(default)]
    pub accounts: Vec<Account>,

    /// Derivation state, available once the seed is plaintext in memory
    #[serde(skip)]
    hd: Option<HdWallet>,
}

/// Account `index` in the requested shape
fn derive_account(
    hd: &HdWallet,
    index: u32,
    label: &str,
    schema: AccountSchema,
    cipher: Option<&KeyCipher>,
) -> Result<Account> {
    let legacy = hd.account(Purpose::Legacy, index)?;
    match schema {
        AccountSchema::V3 => Ok(Account::V3(AccountV3::from_hd(label, &legacy, cipher)?)),
        AccountSchema::V4 => {
            let segwit = hd.account(Purpose::Segwit, index)?;
            Ok(Account::V4(AccountV4 {
                label: label.to_string(),
                archived: false,
                default_derivation: DerivationType::Bech32,
                derivations: vec![
                    Derivation::from_hd(DerivationType::Legacy, &legacy, cipher)?,
                    Derivation::from_hd(DerivationType::Bech32, &segwit, cipher)?,
                ],
            }))
        }
    }
}

impl WalletBody {
    /// New body with a freshly generated seed and one account
    pub fn create(label: &str, schema: AccountSchema, words: usize) -> Result<Self> {
        let hd = HdWallet::generate(words, "")?;
        Self::from_hd(hd, label, schema, 1)
    }

    /// Rebuild a body from a mnemonic with `account_count` accounts
    pub fn recover_from_mnemonic(
        mnemonic: &str,
        passphrase: &str,
        label: &str,
        account_count: u32,
    ) -> Result<Self> {
        let hd = HdWallet::from_mnemonic(mnemonic, passphrase)?;
        let body = Self::from_hd(hd, label, AccountSchema::V4, account_count.max(1))?;
        Ok(WalletBody {
            mnemonic_verified: true,
            ..body
        })
    }

    fn from_hd(hd: HdWallet, label: &str, schema: AccountSchema, count: u32) -> Result<Self> {
        let accounts = (0..count)
            .map(|index| {
                let account_label = if index == 0 {
                    label.to_string()
                } else {
                    format!("{} {}", label, index + 1)
                };
                derive_account(&hd, index, &account_label, schema, None)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            seed_hex: hd.seed_hex(),
            passphrase: hd.passphrase().to_string(),
            mnemonic_verified: false,
            default_account_idx: 0,
            accounts,
            hd: Some(hd),
        })
    }

    /// Attach the HD wallet when the stored seed is plaintext.
    ///
    /// A seed that is not valid BIP39 entropy leaves the body watch-only:
    /// accounts stay readable and key access reports `HdWallet`.
    pub(crate) fn restore_hd(self) -> Result<Self> {
        if self.hd.is_some() || classify_seed(&self.seed_hex) != KeyEncoding::Unencrypted {
            return Ok(self);
        }
        match HdWallet::from_seed_hex(&self.seed_hex, &self.passphrase) {
            Ok(hd) => Ok(Self { hd: Some(hd), ..self }),
            Err(e) => {
                log::warn!("HD seed unusable, opening body watch-only: {}", e);
                Ok(self)
            }
        }
    }

    pub fn is_hd_decrypted(&self) -> bool {
        self.hd.is_some()
    }

    /// Make the master key available, decrypting the seed if needed
    pub fn decrypt_hd_wallet(&self, cipher: Option<&KeyCipher>) -> Result<Self> {
        if self.hd.is_some() {
            return Ok(self.clone());
        }
        if cipher.is_none() && classify_seed(&self.seed_hex) == KeyEncoding::Encrypted {
            return Err(PayloadError::HdWallet(HD_LOCKED.to_string()));
        }
        let seed = unseal(cipher, &self.seed_hex)?;
        let hd = HdWallet::from_seed_hex(&seed, &self.passphrase)?;
        Ok(Self {
            hd: Some(hd),
            ..self.clone()
        })
    }

    fn hd(&self) -> Result<&HdWallet> {
        self.hd
            .as_ref()
            .ok_or_else(|| PayloadError::HdWallet(HD_LOCKED.to_string()))
    }

    /// Append the next account, its keys sealed with `cipher`
    pub fn with_new_account(
        &self,
        label: &str,
        schema: AccountSchema,
        cipher: Option<&KeyCipher>,
    ) -> Result<Self> {
        let index = self.accounts.len() as u32;
        let account = derive_account(self.hd()?, index, label, schema, cipher)?;

        let mut accounts = self.accounts.clone();
        accounts.push(account);
        Ok(Self {
            accounts,
            ..self.clone()
        })
    }

    /// Give every V3 account a segwit derivation; existing keys are kept as is
    pub fn upgrade_accounts_to_v4(&self, cipher: Option<&KeyCipher>) -> Result<Self> {
        let hd = self.hd()?;
        let accounts = self
            .accounts
            .iter()
            .enumerate()
            .map(|(index, account)| match account {
                Account::V4(_) => Ok(account.clone()),
                Account::V3(v3) => {
                    let segwit = hd.account(Purpose::Segwit, index as u32)?;
                    let derivation = Derivation::from_hd(DerivationType::Bech32, &segwit, cipher)?;
                    Ok(Account::V4(v3.clone().into_v4(derivation)))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            accounts,
            ..self.clone()
        })
    }

    /// Swap the account whose default xpub matches `old`
    pub fn replace_account(&self, old: &Account, new: Account) -> Self {
        let accounts = self
            .accounts
            .iter()
            .map(|a| {
                if a.xpub() == old.xpub() {
                    new.clone()
                } else {
                    a.clone()
                }
            })
            .collect();
        Self {
            accounts,
            ..self.clone()
        }
    }

    pub fn update_account_label(&self, account: &Account, label: &str) -> Self {
        self.replace_account(account, account.clone().with_label(label))
    }

    pub fn update_account_archived(&self, account: &Account, archived: bool) -> Self {
        self.replace_account(account, account.clone().with_archived(archived))
    }

    pub fn update_default_index(&self, index: usize) -> Self {
        Self {
            default_account_idx: index,
            ..self.clone()
        }
    }

    pub fn update_mnemonic_verified(&self, verified: bool) -> Self {
        Self {
            mnemonic_verified: verified,
            ..self.clone()
        }
    }

    pub fn update_seed_hex(&self, seed_hex: String) -> Self {
        Self {
            seed_hex,
            ..self.clone()
        }
    }

    /// Rewrite the seed and every account private key
    pub(crate) fn map_private_keys<F>(&self, f: &mut F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        let seed_hex = f(&self.seed_hex)?;
        let accounts = self
            .accounts
            .iter()
            .map(|a| a.map_private_keys(f))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            seed_hex,
            accounts,
            ..self.clone()
        })
    }

    pub fn master_key(&self) -> Result<&Xpriv> {
        Ok(self.hd()?.master_key())
    }

    pub fn hd_seed(&self) -> Result<&[u8]> {
        Ok(self.hd()?.hd_seed())
    }

    pub fn mnemonic(&self) -> Result<Vec<String>> {
        Ok(self.hd()?.mnemonic())
    }

    /// Public keys of all non-archived accounts, every derivation included
    pub fn active_xpubs(&self) -> Vec<String> {
        self.accounts
            .iter()
            .filter(|a| !a.is_archived())
            .flat_map(|a| a.xpubs().into_iter().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    pub fn label_from_xpub(&self, xpub: &str) -> Option<&str> {
        self.accounts
            .iter()
            .find(|a| a.contains_xpub(xpub))
            .map(Account::label)
    }

    pub fn last_created_account(&self) -> Option<&Account> {
        self.accounts.last()
    }
}
