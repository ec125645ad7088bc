//! Payload configuration from environment variables
//!
//! Controls the defaults applied to newly created wallets. Existing wallets
//! always keep the parameters persisted inside them.

use std::env;

use crate::payload::DEFAULT_PBKDF2_ITERATIONS;

pub const DEFAULT_ACCOUNT_LABEL: &str = "Private Key Wallet";
pub const DEFAULT_MNEMONIC_WORDS: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadConfig {
    /// PBKDF2 iterations written into new wallets' options
    pub pbkdf2_iterations: u32,
    /// Label of the first HD account of a new wallet
    pub default_account_label: String,
    /// Mnemonic length for generated seeds (12 or 24)
    pub mnemonic_words: usize,
}

impl PayloadConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `WALLET_PBKDF2_ITERATIONS`: positive integer (default 5000)
    /// - `WALLET_DEFAULT_ACCOUNT_LABEL`: first account label
    /// - `WALLET_MNEMONIC_WORDS`: "12" (default) or "24"
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let pbkdf2_iterations = match env::var("WALLET_PBKDF2_ITERATIONS") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    log::warn!(
                        "Invalid WALLET_PBKDF2_ITERATIONS '{}', using {}",
                        raw,
                        defaults.pbkdf2_iterations
                    );
                    defaults.pbkdf2_iterations
                }
            },
            Err(_) => defaults.pbkdf2_iterations,
        };

        let default_account_label = env::var("WALLET_DEFAULT_ACCOUNT_LABEL")
            .ok()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(defaults.default_account_label);

        let mnemonic_words = match env::var("WALLET_MNEMONIC_WORDS").as_deref() {
            Ok("24") => 24,
            Ok("12") | Err(_) => DEFAULT_MNEMONIC_WORDS,
            Ok(other) => {
                log::warn!(
                    "Unsupported WALLET_MNEMONIC_WORDS '{}', using {}",
                    other,
                    DEFAULT_MNEMONIC_WORDS
                );
                DEFAULT_MNEMONIC_WORDS
            }
        };

        log::debug!(
            "Payload config: {} PBKDF2 iterations, {} word mnemonics",
            pbkdf2_iterations,
            mnemonic_words
        );

        Self {
            pbkdf2_iterations,
            default_account_label,
            mnemonic_words,
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            default_account_label: DEFAULT_ACCOUNT_LABEL.to_string(),
            mnemonic_words: DEFAULT_MNEMONIC_WORDS,
        }
    }
}
