//! BIP39/BIP32 key derivation for HD wallet bodies
//!
//! The wallet stores the BIP39 *entropy* as `seed_hex`; the BIP32 seed is
//! recomputed from the mnemonic and passphrase. Accounts live at
//! `m/purpose'/0'/index'` with purpose 44 (legacy) or 84 (segwit), and
//! keys are serialized for mainnet.

use bip39::Mnemonic;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv, Xpub};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::Network;
use rand::RngCore;
use std::str::FromStr;

use crate::error::PayloadError;
use crate::Result;

const NETWORK: Network = Network::Bitcoin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Legacy,
    Segwit,
}

impl Purpose {
    pub fn number(self) -> u32 {
        match self {
            Purpose::Legacy => 44,
            Purpose::Segwit => 84,
        }
    }
}

/// Keys for one account of one purpose
#[derive(Debug, Clone)]
pub struct HdAccount {
    pub index: u32,
    pub xpriv: String,
    pub xpub: String,
    /// xpub of the external (receive) chain, `/0`
    pub receive_xpub: String,
    /// xpub of the internal (change) chain, `/1`
    pub change_xpub: String,
}

#[derive(Clone)]
pub struct HdWallet {
    mnemonic: Mnemonic,
    passphrase: String,
    seed: [u8; 64],
    master: Xpriv,
}

impl std::fmt::Debug for HdWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdWallet").finish_non_exhaustive()
    }
}

impl HdWallet {
    /// Generate a fresh wallet with a 12 or 24 word mnemonic
    pub fn generate(word_count: usize, passphrase: &str) -> Result<Self> {
        let entropy_len = match word_count {
            12 => 16,
            24 => 32,
            other => {
                return Err(PayloadError::HdWallet(format!(
                    "unsupported mnemonic length: {}",
                    other
                )))
            }
        };
        let mut entropy = vec![0u8; entropy_len];
        rand::thread_rng().fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| PayloadError::HdWallet(e.to_string()))?;
        Self::from_parts(mnemonic, passphrase)
    }

    /// Restore from the stored entropy hex
    pub fn from_seed_hex(seed_hex: &str, passphrase: &str) -> Result<Self> {
        let entropy = hex::decode(seed_hex)
            .map_err(|e| PayloadError::HdWallet(format!("invalid seed hex: {}", e)))?;
        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| PayloadError::HdWallet(e.to_string()))?;
        Self::from_parts(mnemonic, passphrase)
    }

    pub fn from_mnemonic(words: &str, passphrase: &str) -> Result<Self> {
        let mnemonic =
            Mnemonic::parse(words).map_err(|e| PayloadError::HdWallet(e.to_string()))?;
        Self::from_parts(mnemonic, passphrase)
    }

    fn from_parts(mnemonic: Mnemonic, passphrase: &str) -> Result<Self> {
        let seed = mnemonic.to_seed(passphrase);
        let master = Xpriv::new_master(NETWORK, &seed)
            .map_err(|e| PayloadError::HdWallet(e.to_string()))?;

        Ok(Self {
            mnemonic,
            passphrase: passphrase.to_string(),
            seed,
            master,
        })
    }

    /// BIP39 entropy as hex, the form persisted in `seed_hex`
    pub fn seed_hex(&self) -> String {
        hex::encode(self.mnemonic.to_entropy())
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// 64-byte BIP32 seed
    pub fn hd_seed(&self) -> &[u8] {
        &self.seed
    }

    pub fn mnemonic(&self) -> Vec<String> {
        self.mnemonic
            .to_string()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn master_key(&self) -> &Xpriv {
        &self.master
    }

    /// Derive account `index` for `purpose`
    pub fn account(&self, purpose: Purpose, index: u32) -> Result<HdAccount> {
        let secp = Secp256k1::new();

        let path = DerivationPath::from_str(&format!("m/{}'/0'/{}'", purpose.number(), index))
            .map_err(|e| PayloadError::HdWallet(e.to_string()))?;
        let account_key = self
            .master
            .derive_priv(&secp, &path)
            .map_err(|e| PayloadError::HdWallet(e.to_string()))?;
        let xpub = Xpub::from_priv(&secp, &account_key);

        let chain_xpub = |chain: u32| -> Result<String> {
            let child = ChildNumber::from_normal_idx(chain)
                .map_err(|e| PayloadError::HdWallet(e.to_string()))?;
            let key = xpub
                .derive_pub(&secp, &[child])
                .map_err(|e| PayloadError::HdWallet(e.to_string()))?;
            Ok(key.to_string())
        };

        Ok(HdAccount {
            index,
            xpriv: account_key.to_string(),
            xpub: xpub.to_string(),
            receive_xpub: chain_xpub(0)?,
            change_xpub: chain_xpub(1)?,
        })
    }
}
