//! Shared fixtures for wallet payload integration tests
//!
//! Every payload is produced with the crate's own crypto so no binary
//! resources are needed:
//! - a V3 envelope for guid `a09910d9-...` under "MyTestWallet" (5000 iterations)
//! - a V1 envelope for guid `9ebb4d4f-...` under "mypassword"
//! - a V2 document without HD wallets, for upgrade tests
//! - a double-encrypted V4 wallet with second password "hello"
#![allow(dead_code)]

use bitcoin::{Network, PrivateKey};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use wallet_payload::crypto::{self, CipherMode, Padding};
use wallet_payload::{AccountSchema, ImportedAddress, PayloadConfig, Wallet, WalletBody};

pub const V3_GUID: &str = "a09910d9-1906-4ea1-a956-2508c3fe0661";
pub const V3_PASSWORD: &str = "MyTestWallet";
pub const V1_GUID: &str = "9ebb4d4f-f36e-40d6-9a3e-5a3cca5f83d6";
pub const V1_PASSWORD: &str = "mypassword";
pub const SHARED_KEY: &str = "d14f3d2c-f883-40da-87e2-c8448521ee64";
pub const SECOND_PASSWORD: &str = "hello";
pub const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

pub fn imported_key(byte: u8) -> PrivateKey {
    PrivateKey::from_slice(&[byte; 32], Network::Bitcoin).expect("valid secret key")
}

fn imported_address(byte: u8) -> anyhow::Result<Value> {
    let address = ImportedAddress::from_private_key(&imported_key(byte), "rust", "0.1.0")
        .with_label("Imported");
    Ok(serde_json::to_value(address)?)
}

/// Envelope with the seven keys the backend stores
pub fn envelope(payload: &str) -> String {
    json!({
        "extra_seed": "b1f8a4e2c9d7",
        "payload_checksum": crypto::sha256_hex(payload.as_bytes()),
        "war_checksum": "d3e3b31c57f823ed",
        "language": "en",
        "storage_token": "2a4b6c8d",
        "sync_pubkeys": false,
        "payload": payload,
    })
    .to_string()
}

fn wrapper_json(version: u32, iterations: u32, ciphertext: String) -> String {
    json!({
        "version": version,
        "pbkdf2_iterations": iterations,
        "payload": ciphertext,
    })
    .to_string()
}

/// Decrypted V3 document with a fresh HD body and one imported address
pub fn v3_document() -> anyhow::Result<String> {
    let body = WalletBody::create("My Bitcoin Wallet", AccountSchema::V3, 12)?;
    let key = imported_address(0x21)?;
    Ok(json!({
        "guid": V3_GUID,
        "sharedKey": SHARED_KEY,
        "double_encryption": false,
        "options": {
            "pbkdf2_iterations": 5000,
            "fee_per_kb": 10000,
            "html5_notifications": false,
            "logout_time": 600000
        },
        "hd_wallets": [body],
        "keys": [key],
        "tx_notes": {}
    })
    .to_string())
}

pub fn v3_envelope() -> anyhow::Result<String> {
    let ciphertext = crypto::encrypt(&v3_document()?, V3_PASSWORD, 5000)?;
    Ok(envelope(&wrapper_json(3, 5000, ciphertext)))
}

pub fn v1_document() -> anyhow::Result<String> {
    let key = imported_address(0x31)?;
    Ok(json!({
        "guid": V1_GUID,
        "sharedKey": SHARED_KEY,
        "keys": [key]
    })
    .to_string())
}

/// V1 payload written with 10 iterations, OFB and ISO7816-4 padding
pub fn v1_payload() -> anyhow::Result<String> {
    let mut rng = StdRng::seed_from_u64(1);
    Ok(crypto::encrypt_with_params(
        &v1_document()?,
        V1_PASSWORD,
        10,
        CipherMode::Ofb,
        Padding::Iso7816,
        &mut rng,
    )?)
}

pub fn v1_envelope() -> anyhow::Result<String> {
    Ok(envelope(&v1_payload()?))
}

pub fn v2_document() -> anyhow::Result<String> {
    let key = imported_address(0x41)?;
    Ok(json!({
        "guid": "5f1f2a3b-6c7d-4e8f-9a0b-1c2d3e4f5a6b",
        "sharedKey": SHARED_KEY,
        "options": { "pbkdf2_iterations": 5000 },
        "keys": [key]
    })
    .to_string())
}

pub fn v2_envelope() -> anyhow::Result<String> {
    let ciphertext = crypto::encrypt(&v2_document()?, V3_PASSWORD, 5000)?;
    Ok(envelope(&wrapper_json(2, 5000, ciphertext)))
}

pub fn v2_wallet() -> anyhow::Result<Wallet> {
    Ok(Wallet::from_json(&v2_document()?, 2)?)
}

pub fn v3_wallet() -> anyhow::Result<Wallet> {
    Ok(Wallet::from_json(&v3_document()?, 3)?)
}

/// New V4 wallet restored from the "abandon ... about" mnemonic
pub fn abandon_wallet() -> anyhow::Result<Wallet> {
    let body = WalletBody::recover_from_mnemonic(ABANDON, "", "Main", 1)?;
    Ok(Wallet::from_wallet_body(body, &PayloadConfig::default()))
}

pub fn double_encrypted_v4_wallet() -> anyhow::Result<Wallet> {
    let wallet = abandon_wallet()?.add_imported_address(
        ImportedAddress::from_private_key(&imported_key(0x51), "rust", "0.1.0"),
        None,
    )?;
    Ok(wallet.enable_double_encryption(SECOND_PASSWORD)?)
}

/// Round trip through JSON, which drops the in-memory HD state
pub fn reload(wallet: &Wallet) -> anyhow::Result<Wallet> {
    Ok(Wallet::from_json(&wallet.to_json()?, wallet.wrapper_version())?)
}
