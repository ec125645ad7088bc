//! Wallet options carried inside the decrypted document

use serde::{Deserialize, Serialize};

/// Iteration count assumed when a wallet or wrapper does not carry one
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 5000;

pub const DEFAULT_FEE_PER_KB: u64 = 10_000;
pub const DEFAULT_LOGOUT_TIME_MS: u64 = 600_000;

/// Wallet options, persisted under `options` (older wallets use `wallet_options`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbkdf2_iterations: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_per_kb: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html5_notifications: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logout_time: Option<u64>,
}

impl Options {
    /// Options written into a freshly created wallet
    pub fn new_wallet(pbkdf2_iterations: u32) -> Self {
        Self {
            pbkdf2_iterations: Some(pbkdf2_iterations),
            fee_per_kb: Some(DEFAULT_FEE_PER_KB),
            html5_notifications: Some(false),
            logout_time: Some(DEFAULT_LOGOUT_TIME_MS),
        }
    }

    /// Effective iteration count for payload and second-password encryption
    pub fn pbkdf2_iterations(&self) -> u32 {
        self.pbkdf2_iterations.unwrap_or(DEFAULT_PBKDF2_ITERATIONS)
    }

    pub fn with_pbkdf2_iterations(self, iterations: u32) -> Self {
        Self {
            pbkdf2_iterations: Some(iterations),
            ..self
        }
    }
}
