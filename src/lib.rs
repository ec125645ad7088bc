//! Wallet Payload: encrypted HD wallet documents
//!
//! This crate reads and writes the password-protected payload of an HD
//! bitcoin wallet: the outer envelope, the versioned wrapper (V1 to V4),
//! the decrypted wallet document and the optional second password layered
//! over every private key.
//!
//! # Architecture
//!
//! - **crypto**: AES-256 (CBC/OFB) with PBKDF2 keys, legacy paddings, SHA-256
//! - **payload**: `WalletBase` envelope, `WalletWrapper` codecs, `Wallet` document
//! - **double_encryption**: second-password hashing and key sealing
//! - **hd**: BIP39/BIP32 derivation for wallet bodies
//!
//! # Example
//!
//! ```ignore
//! use wallet_payload::WalletBase;
//!
//! let base = WalletBase::from_json(&stored_json)?.with_decrypted_payload("password")?;
//! let wallet = base.wallet().unwrap().update_pbkdf2_iterations(7500, None)?;
//!
//! let base = base.with_wallet(wallet);
//! let (checksum, wrapper) = base.encrypt_and_wrap_payload("password")?;
//! let stored_json = base.with_wrapped_payload(checksum, &wrapper)?.to_json()?;
//! ```

pub mod config;
pub mod crypto;
pub mod double_encryption;
pub mod error;
pub mod hd;
pub mod key_format;
pub mod payload;

// Re-exports for convenience
pub use config::PayloadConfig;
pub use crypto::{CipherMode, CryptoError, Padding};
pub use double_encryption::{hash_second_password, KeyCipher};
pub use error::PayloadError;
pub use hd::{HdAccount, HdWallet, Purpose};
pub use key_format::{classify_private_key, classify_seed, KeyEncoding};
pub use payload::{
    Account, AccountSchema, ImportedAddress, Options, Wallet, WalletBase, WalletBody,
    WalletWrapper,
};

// Common result type
pub type Result<T> = std::result::Result<T, PayloadError>;
