//! Version 1 payloads: a bare ciphertext with unrecorded cipher parameters.
//!
//! Early wallets were written with different iteration counts, block modes
//! and paddings, and none of it was stored. Decryption walks a fixed grid of
//! candidates and accepts the first whose plaintext parses as a JSON object.

use crate::crypto::{self, CipherMode, Padding};
use crate::error::PayloadError;
use crate::payload::wallet::Wallet;
use crate::payload::wrapper::V1;
use crate::Result;

const ITERATIONS: [u32; 2] = [1, 10];
const MODES: [CipherMode; 2] = [CipherMode::Cbc, CipherMode::Ofb];
const PADDINGS: [Padding; 4] = [
    Padding::Iso10126,
    Padding::Iso7816,
    Padding::ZeroByte,
    Padding::NoPadding,
];

pub const LEGACY_CANDIDATE_COUNT: usize = ITERATIONS.len() * MODES.len() * PADDINGS.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyCandidate {
    pub iterations: u32,
    pub mode: CipherMode,
    pub padding: Padding,
}

/// Candidates in search order: iterations, then mode, then padding
pub fn candidates() -> impl Iterator<Item = LegacyCandidate> {
    ITERATIONS.into_iter().flat_map(|iterations| {
        MODES.into_iter().flat_map(move |mode| {
            PADDINGS.into_iter().map(move |padding| LegacyCandidate {
                iterations,
                mode,
                padding,
            })
        })
    })
}

#[derive(Debug, Clone)]
pub struct LegacyDecryption {
    pub plaintext: String,
    pub candidate: LegacyCandidate,
    /// Candidates tried, the winning one included
    pub attempts: usize,
}

fn is_json_object(text: &str) -> bool {
    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(text).is_ok()
}

/// Find the plaintext of a V1 payload
pub fn decrypt_legacy(payload: &str, password: &str) -> Result<LegacyDecryption> {
    let mut attempts = 0;
    for candidate in candidates() {
        attempts += 1;
        match crypto::decrypt_with_params(
            payload,
            password,
            candidate.iterations,
            candidate.mode,
            candidate.padding,
        ) {
            Ok(plaintext) if is_json_object(&plaintext) => {
                log::debug!("V1 payload decrypted on attempt {}: {:?}", attempts, candidate);
                return Ok(LegacyDecryption {
                    plaintext,
                    candidate,
                    attempts,
                });
            }
            Ok(_) => log::debug!("{:?} produced no JSON object", candidate),
            Err(e) => log::debug!("{:?} failed: {}", candidate, e),
        }
    }

    log::warn!("V1 payload did not decrypt after {} attempts", attempts);
    Err(PayloadError::Decryption("Failed to decrypt".to_string()))
}

/// Decrypt and decode a V1 wallet.
///
/// The winning iteration count becomes the wallet's count unless the
/// document already names one.
pub fn decrypt_v1_wallet(payload: &str, password: &str) -> Result<Wallet> {
    let found = decrypt_legacy(payload, password)?;
    let wallet = Wallet::from_json(&found.plaintext, V1).map_err(|e| match e {
        PayloadError::Json(e) => PayloadError::Decryption(format!("invalid V1 payload: {}", e)),
        other => other,
    })?;
    Ok(wallet.set_default_pbkdf2_iterations(found.candidate.iterations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DOC: &str = r#"{"guid":"g","sharedKey":"s","keys":[]}"#;

    #[test]
    fn test_grid_order() {
        let all: Vec<_> = candidates().collect();
        assert_eq!(all.len(), 16);
        assert_eq!(LEGACY_CANDIDATE_COUNT, 16);
        assert_eq!(
            all[0],
            LegacyCandidate {
                iterations: 1,
                mode: CipherMode::Cbc,
                padding: Padding::Iso10126
            }
        );
        assert_eq!(all[5].mode, CipherMode::Ofb);
        assert_eq!(all[5].padding, Padding::Iso7816);
        assert_eq!(all[15].iterations, 10);
        assert_eq!(all[15].padding, Padding::NoPadding);
    }

    #[test]
    fn test_first_candidate_wins() {
        let mut rng = StdRng::seed_from_u64(7);
        let payload = crypto::encrypt_with_params(
            DOC,
            "pw",
            1,
            CipherMode::Cbc,
            Padding::Iso10126,
            &mut rng,
        )
        .unwrap();
        let found = decrypt_legacy(&payload, "pw").unwrap();
        assert_eq!(found.attempts, 1);
        assert_eq!(found.plaintext, DOC);
    }

    #[test]
    fn test_v1_wallet_records_iterations() {
        let mut rng = StdRng::seed_from_u64(8);
        let payload =
            crypto::encrypt_with_params(DOC, "pw", 1, CipherMode::Cbc, Padding::Iso10126, &mut rng)
                .unwrap();
        let wallet = decrypt_v1_wallet(&payload, "pw").unwrap();
        assert_eq!(wallet.guid(), "g");
        assert_eq!(wallet.wrapper_version(), 1);
        assert_eq!(wallet.options().pbkdf2_iterations, Some(1));
    }

    #[test]
    fn test_not_base64_exhausts_grid() {
        assert!(matches!(
            decrypt_legacy("%%%", "pw"),
            Err(PayloadError::Decryption(msg)) if msg == "Failed to decrypt"
        ));
    }
}
