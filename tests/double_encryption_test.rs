//! Second-password validation and the encryption-consistency invariant

mod common;

use common::*;
use wallet_payload::key_format::is_key_encrypted;
use wallet_payload::{hash_second_password, ImportedAddress, PayloadError, Wallet};

fn assert_consistent(wallet: &Wallet, step: &str) {
    assert!(wallet.is_encryption_consistent(), "inconsistent after {}", step);
}

// ============================================================================
// Second password validation
// ============================================================================

#[test]
fn test_validate_second_password() -> anyhow::Result<()> {
    init_logger();

    let wallet = double_encrypted_v4_wallet()?;
    assert!(wallet.is_double_encrypted());
    assert_eq!(
        wallet.dpasswordhash(),
        Some(
            hash_second_password(
                wallet.shared_key(),
                SECOND_PASSWORD,
                wallet.options().pbkdf2_iterations()
            )
            .as_str()
        )
    );

    assert!(wallet.validate_second_password(Some(SECOND_PASSWORD))?.is_some());
    assert!(matches!(
        wallet.validate_second_password(Some("bogus")),
        Err(PayloadError::Decryption(_))
    ));
    assert!(matches!(
        wallet.validate_second_password(None),
        Err(PayloadError::Decryption(_))
    ));

    let plain = abandon_wallet()?;
    assert!(plain.validate_second_password(None)?.is_none());
    assert!(matches!(
        plain.validate_second_password(Some(SECOND_PASSWORD)),
        Err(PayloadError::Decryption(_))
    ));
    Ok(())
}

// ============================================================================
// Consistency after every mutation
// ============================================================================

#[test]
fn test_mutations_keep_double_encrypted_wallet_consistent() -> anyhow::Result<()> {
    init_logger();
    let pw = Some(SECOND_PASSWORD);

    let wallet = double_encrypted_v4_wallet()?;
    assert_consistent(&wallet, "enable");

    let wallet = wallet.add_account("Savings", pw)?;
    assert_consistent(&wallet, "add_account");
    assert_eq!(wallet.wallet_body().map(|b| b.accounts.len()), Some(2));

    let entry = ImportedAddress::from_private_key(&imported_key(0x61), "rust", "0.1.0");
    let wallet = wallet.add_imported_address(entry, pw)?;
    assert_consistent(&wallet, "add_imported_address");

    let entry = wallet.imported_address_from_key(&imported_key(0x62), pw, "rust", "0.1.0")?;
    assert!(is_key_encrypted(entry.private_key.as_deref().unwrap_or_default()));
    let wallet = wallet.replace_or_add_imported_address(entry, pw)?;
    assert_consistent(&wallet, "replace_or_add_imported_address");

    let watch_only = ImportedAddress::from_private_key(&imported_key(0x63), "rust", "0.1.0");
    let address = watch_only.address.clone();
    let wallet = wallet.add_imported_address(
        ImportedAddress {
            private_key: None,
            ..watch_only
        },
        pw,
    )?;
    assert_consistent(&wallet, "add watch-only");
    let wallet = wallet.update_key_for_imported_address(&imported_key(0x63), pw)?;
    assert_consistent(&wallet, "update_key_for_imported_address");
    assert_eq!(
        wallet.imported_address_signing_key(&address, pw)?.inner,
        imported_key(0x63).inner
    );

    let wallet = wallet.update_pbkdf2_iterations(7500, pw)?;
    assert_consistent(&wallet, "update_pbkdf2_iterations");
    assert_eq!(wallet.options().pbkdf2_iterations(), 7500);
    assert!(wallet.validate_second_password(pw)?.is_some());

    let wallet = wallet.change_second_password(SECOND_PASSWORD, "world")?;
    assert_consistent(&wallet, "change_second_password");
    assert!(wallet.validate_second_password(pw).is_err());

    let wallet = wallet.disable_double_encryption("world")?;
    assert_consistent(&wallet, "disable_double_encryption");
    assert!(!wallet.is_double_encrypted());
    assert_eq!(wallet.dpasswordhash(), None);
    Ok(())
}

#[test]
fn test_mutations_keep_plain_wallet_consistent() -> anyhow::Result<()> {
    init_logger();

    let wallet = abandon_wallet()?;
    assert_consistent(&wallet, "create");

    let wallet = wallet.add_account("Savings", None)?;
    assert_consistent(&wallet, "add_account");

    let entry = wallet.imported_address_from_key(&imported_key(0x71), None, "rust", "0.1.0")?;
    let wallet = wallet.add_imported_address(entry, None)?;
    assert_consistent(&wallet, "add_imported_address");

    let wallet = wallet.update_pbkdf2_iterations(7500, None)?;
    assert_consistent(&wallet, "update_pbkdf2_iterations");
    assert_eq!(wallet.dpasswordhash(), None);
    Ok(())
}

#[test]
fn test_iteration_change_rekeys_every_sealed_key() -> anyhow::Result<()> {
    let wallet = double_encrypted_v4_wallet()?.update_pbkdf2_iterations(2000, Some(SECOND_PASSWORD))?;

    // Fresh decode: the seed must open with the new count
    let reloaded = reload(&wallet)?;
    let body = reloaded.wallet_body().expect("hd wallet");
    assert!(!body.is_hd_decrypted());

    let decrypted = reloaded.decrypt_hd_wallet(Some(SECOND_PASSWORD))?;
    let original = abandon_wallet()?;
    assert_eq!(
        decrypted.wallet_body().expect("hd wallet").master_key()?,
        original.wallet_body().expect("hd wallet").master_key()?
    );
    Ok(())
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_mutation_without_second_password_fails() -> anyhow::Result<()> {
    let wallet = double_encrypted_v4_wallet()?;
    assert!(matches!(
        wallet.add_account("Savings", None),
        Err(PayloadError::Decryption(_))
    ));
    assert!(matches!(
        wallet.update_pbkdf2_iterations(7500, None),
        Err(PayloadError::Decryption(_))
    ));
    assert!(matches!(
        wallet.enable_double_encryption("again"),
        Err(PayloadError::Encryption(_))
    ));
    Ok(())
}

#[test]
fn test_master_key_locked_until_decrypted() -> anyhow::Result<()> {
    let wallet = reload(&double_encrypted_v4_wallet()?)?;
    let body = wallet.wallet_body().expect("hd wallet");
    assert!(matches!(body.master_key(), Err(PayloadError::HdWallet(_))));
    assert!(matches!(body.mnemonic(), Err(PayloadError::HdWallet(_))));
    assert!(matches!(body.hd_seed(), Err(PayloadError::HdWallet(_))));
    assert!(matches!(
        body.decrypt_hd_wallet(None),
        Err(PayloadError::HdWallet(_))
    ));

    let wallet = wallet.decrypt_hd_wallet(Some(SECOND_PASSWORD))?;
    let words = wallet.wallet_body().expect("hd wallet").mnemonic()?;
    assert_eq!(words.join(" "), ABANDON);
    Ok(())
}

#[test]
fn test_inconsistent_key_material_is_detected() -> anyhow::Result<()> {
    let document = v3_document()?.replace(
        "\"double_encryption\":false",
        "\"double_encryption\":true",
    );
    let wallet = Wallet::from_json(&document, 3)?;
    assert!(!wallet.is_encryption_consistent());
    assert!(matches!(
        wallet.check_encryption_consistency(),
        Err(PayloadError::InconsistentEncryption)
    ));
    Ok(())
}

#[test]
fn test_sealed_import_into_plain_wallet_is_refused() -> anyhow::Result<()> {
    let sealed = double_encrypted_v4_wallet()?
        .imported_address_from_key(&imported_key(0x72), Some(SECOND_PASSWORD), "rust", "0.1.0")?;
    assert!(matches!(
        abandon_wallet()?.add_imported_address(sealed, None),
        Err(PayloadError::InconsistentEncryption)
    ));
    Ok(())
}

/// A key sealed by another wallet under the password "other-password"
fn foreign_sealed_entry(byte: u8) -> anyhow::Result<ImportedAddress> {
    let other = abandon_wallet()?.enable_double_encryption("other-password")?;
    Ok(other.imported_address_from_key(
        &imported_key(byte),
        Some("other-password"),
        "rust",
        "0.1.0",
    )?)
}

#[test]
fn test_key_sealed_with_other_parameters_is_refused() -> anyhow::Result<()> {
    init_logger();
    let pw = Some(SECOND_PASSWORD);
    let wallet = double_encrypted_v4_wallet()?;

    let foreign = foreign_sealed_entry(0x75)?;
    assert!(is_key_encrypted(foreign.private_key.as_deref().unwrap_or_default()));
    assert!(matches!(
        wallet.add_imported_address(foreign.clone(), pw),
        Err(PayloadError::InconsistentEncryption)
    ));
    assert!(matches!(
        wallet.replace_or_add_imported_address(foreign, pw),
        Err(PayloadError::InconsistentEncryption)
    ));

    // Same wallet and password, but sealed before the iteration count changed
    let stale = wallet.imported_address_from_key(&imported_key(0x76), pw, "rust", "0.1.0")?;
    let rekeyed = wallet.update_pbkdf2_iterations(2000, pw)?;
    assert!(matches!(
        rekeyed.add_imported_address(stale.clone(), pw),
        Err(PayloadError::InconsistentEncryption)
    ));
    assert!(wallet.add_imported_address(stale, pw)?.is_encryption_consistent());
    Ok(())
}

#[test]
fn test_unopenable_key_blocks_rekeying() -> anyhow::Result<()> {
    init_logger();
    let pw = Some(SECOND_PASSWORD);
    let wallet = double_encrypted_v4_wallet()?;

    // Smuggled in through the document rather than the import checks
    let mut document: serde_json::Value = serde_json::from_str(&wallet.to_json()?)?;
    let foreign = serde_json::to_value(foreign_sealed_entry(0x77)?)?;
    document["keys"]
        .as_array_mut()
        .expect("keys array")
        .push(foreign);
    let tainted = Wallet::from_json(&document.to_string(), wallet.wrapper_version())?;
    assert!(tainted.is_encryption_consistent());

    assert!(matches!(
        tainted.disable_double_encryption(SECOND_PASSWORD),
        Err(PayloadError::Decryption(_))
    ));
    assert!(matches!(
        tainted.update_pbkdf2_iterations(7500, pw),
        Err(PayloadError::Decryption(_))
    ));
    assert!(matches!(
        tainted.change_second_password(SECOND_PASSWORD, "world"),
        Err(PayloadError::Decryption(_))
    ));
    Ok(())
}

#[test]
fn test_disable_on_locked_wallet_restores_master_key() -> anyhow::Result<()> {
    let wallet = reload(&double_encrypted_v4_wallet()?)?;
    assert!(!wallet.wallet_body().expect("hd wallet").is_hd_decrypted());

    let plain = wallet.disable_double_encryption(SECOND_PASSWORD)?;
    let body = plain.wallet_body().expect("hd wallet");
    assert!(body.is_hd_decrypted());
    assert_eq!(body.mnemonic()?.join(" "), ABANDON);
    assert_eq!(
        body.master_key()?,
        abandon_wallet()?.wallet_body().expect("hd wallet").master_key()?
    );
    Ok(())
}

#[test]
fn test_imported_address_lookups_fail_cleanly() -> anyhow::Result<()> {
    let wallet = double_encrypted_v4_wallet()?;
    assert!(matches!(
        wallet.update_key_for_imported_address(&imported_key(0x73), Some(SECOND_PASSWORD)),
        Err(PayloadError::NoSuchAddress(_))
    ));
    assert!(matches!(
        wallet.imported_address_signing_key("1BoatSLRHtKNngkdXEeobR76b53LETtpyT", Some(SECOND_PASSWORD)),
        Err(PayloadError::NoSuchAddress(_))
    ));

    let wallet = wallet.add_imported_address(
        ImportedAddress::watch_only("1BoatSLRHtKNngkdXEeobR76b53LETtpyT"),
        Some(SECOND_PASSWORD),
    )?;
    assert!(matches!(
        wallet.imported_address_signing_key("1BoatSLRHtKNngkdXEeobR76b53LETtpyT", Some(SECOND_PASSWORD)),
        Err(PayloadError::WatchOnly(_))
    ));
    Ok(())
}
