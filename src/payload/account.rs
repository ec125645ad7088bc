//! HD accounts in their two persisted shapes
//!
//! Version 3 payloads store one legacy (BIP44) key pair per account. Version 4
//! payloads store a list of derivations per account, one per address type.

use serde::{Deserialize, Serialize};

use crate::double_encryption::{seal, KeyCipher};
use crate::hd::{HdAccount, Purpose};
use crate::Result;

/// Which account shape a payload version carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSchema {
    V3,
    V4,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressLabel {
    pub index: u32,
    pub label: String,
}

/// Chain xpubs cached so addresses can be derived without the private key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCache {
    #[serde(rename = "receiveAccount")]
    pub receive_account: String,
    #[serde(rename = "changeAccount")]
    pub change_account: String,
}

impl AddressCache {
    fn from_hd(account: &HdAccount) -> Self {
        Self {
            receive_account: account.receive_xpub.clone(),
            change_account: account.change_xpub.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationType {
    Legacy,
    Bech32,
}

impl DerivationType {
    pub fn purpose(self) -> Purpose {
        match self {
            DerivationType::Legacy => Purpose::Legacy,
            DerivationType::Bech32 => Purpose::Segwit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountV3 {
    pub label: String,
    #[serde(default)]
    pub archived: bool,
    pub xpriv: String,
    pub xpub: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address_labels: Vec<AddressLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<AddressCache>,
}

impl AccountV3 {
    /// Account from derived keys, the xpriv sealed when a cipher is active
    pub fn from_hd(label: &str, account: &HdAccount, cipher: Option<&KeyCipher>) -> Result<Self> {
        Ok(Self {
            label: label.to_string(),
            archived: false,
            xpriv: seal(cipher, &account.xpriv)?,
            xpub: account.xpub.clone(),
            address_labels: Vec::new(),
            cache: Some(AddressCache::from_hd(account)),
        })
    }

    /// Keep these keys as the legacy derivation and add `segwit` beside it
    pub fn into_v4(self, segwit: Derivation) -> AccountV4 {
        let legacy = Derivation {
            derivation_type: DerivationType::Legacy,
            purpose: Purpose::Legacy.number(),
            xpriv: self.xpriv,
            xpub: self.xpub,
            address_labels: self.address_labels,
            cache: self.cache,
        };
        AccountV4 {
            label: self.label,
            archived: self.archived,
            default_derivation: DerivationType::Bech32,
            derivations: vec![legacy, segwit],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivation {
    #[serde(rename = "type")]
    pub derivation_type: DerivationType,
    pub purpose: u32,
    pub xpriv: String,
    pub xpub: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address_labels: Vec<AddressLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<AddressCache>,
}

impl Derivation {
    pub fn from_hd(
        derivation_type: DerivationType,
        account: &HdAccount,
        cipher: Option<&KeyCipher>,
    ) -> Result<Self> {
        Ok(Self {
            derivation_type,
            purpose: derivation_type.purpose().number(),
            xpriv: seal(cipher, &account.xpriv)?,
            xpub: account.xpub.clone(),
            address_labels: Vec::new(),
            cache: Some(AddressCache::from_hd(account)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountV4 {
    pub label: String,
    #[serde(default)]
    pub archived: bool,
    pub default_derivation: DerivationType,
    pub derivations: Vec<Derivation>,
}

impl AccountV4 {
    pub fn derivation(&self, derivation_type: DerivationType) -> Option<&Derivation> {
        self.derivations
            .iter()
            .find(|d| d.derivation_type == derivation_type)
    }

    fn default_entry(&self) -> Option<&Derivation> {
        self.derivation(self.default_derivation)
            .or_else(|| self.derivations.first())
    }
}

/// An HD account of either shape.
///
/// Untagged on the wire: an object with `derivations` is a V4 account,
/// anything else with `xpriv`/`xpub` is a V3 account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Account {
    V4(AccountV4),
    V3(AccountV3),
}

impl Account {
    pub fn schema(&self) -> AccountSchema {
        match self {
            Account::V3(_) => AccountSchema::V3,
            Account::V4(_) => AccountSchema::V4,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Account::V3(a) => &a.label,
            Account::V4(a) => &a.label,
        }
    }

    pub fn is_archived(&self) -> bool {
        match self {
            Account::V3(a) => a.archived,
            Account::V4(a) => a.archived,
        }
    }

    /// Private key of the default derivation
    pub fn xpriv(&self) -> &str {
        match self {
            Account::V3(a) => &a.xpriv,
            Account::V4(a) => a.default_entry().map_or("", |d| d.xpriv.as_str()),
        }
    }

    /// Public key of the default derivation
    pub fn xpub(&self) -> &str {
        match self {
            Account::V3(a) => &a.xpub,
            Account::V4(a) => a.default_entry().map_or("", |d| d.xpub.as_str()),
        }
    }

    /// Every private key the account holds
    pub fn xprivs(&self) -> Vec<&str> {
        match self {
            Account::V3(a) => vec![a.xpriv.as_str()],
            Account::V4(a) => a.derivations.iter().map(|d| d.xpriv.as_str()).collect(),
        }
    }

    pub fn xpubs(&self) -> Vec<&str> {
        match self {
            Account::V3(a) => vec![a.xpub.as_str()],
            Account::V4(a) => a.derivations.iter().map(|d| d.xpub.as_str()).collect(),
        }
    }

    pub fn contains_xpub(&self, xpub: &str) -> bool {
        self.xpubs().contains(&xpub)
    }

    /// A V3 account only has the legacy derivation
    pub fn xpub_for(&self, derivation_type: DerivationType) -> Option<&str> {
        match self {
            Account::V3(a) => {
                (derivation_type == DerivationType::Legacy).then_some(a.xpub.as_str())
            }
            Account::V4(a) => a.derivation(derivation_type).map(|d| d.xpub.as_str()),
        }
    }

    pub fn with_label(self, label: &str) -> Self {
        match self {
            Account::V3(a) => Account::V3(AccountV3 {
                label: label.to_string(),
                ..a
            }),
            Account::V4(a) => Account::V4(AccountV4 {
                label: label.to_string(),
                ..a
            }),
        }
    }

    pub fn with_archived(self, archived: bool) -> Self {
        match self {
            Account::V3(a) => Account::V3(AccountV3 { archived, ..a }),
            Account::V4(a) => Account::V4(AccountV4 { archived, ..a }),
        }
    }

    /// Rewrite every private key, e.g. to add or remove the second password
    pub fn map_private_keys<F>(&self, f: &mut F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        Ok(match self {
            Account::V3(a) => Account::V3(AccountV3 {
                xpriv: f(&a.xpriv)?,
                ..a.clone()
            }),
            Account::V4(a) => {
                let derivations = a
                    .derivations
                    .iter()
                    .map(|d| {
                        Ok(Derivation {
                            xpriv: f(&d.xpriv)?,
                            ..d.clone()
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Account::V4(AccountV4 {
                    derivations,
                    ..a.clone()
                })
            }
        })
    }
}
