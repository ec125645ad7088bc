//! Wallet payload: the envelope, the versioned wrapper and the decrypted document

mod account;
mod imported_address;
mod legacy;
mod options;
mod wallet;
mod wallet_base;
mod wallet_body;
mod wrapper;

pub use account::{
    Account, AccountSchema, AccountV3, AccountV4, AddressCache, AddressLabel, Derivation,
    DerivationType,
};
pub use imported_address::{ImportedAddress, ARCHIVED_TAG};
pub use legacy::{
    candidates, decrypt_legacy, decrypt_v1_wallet, LegacyCandidate, LegacyDecryption,
    LEGACY_CANDIDATE_COUNT,
};
pub use options::{Options, DEFAULT_FEE_PER_KB, DEFAULT_LOGOUT_TIME_MS, DEFAULT_PBKDF2_ITERATIONS};
pub use wallet::Wallet;
pub use wallet_base::WalletBase;
pub use wallet_body::WalletBody;
pub use wrapper::{codec_for, PayloadCodec, WalletWrapper, SUPPORTED_VERSION, V1, V2, V3, V4};
