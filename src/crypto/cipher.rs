//! AES-256 with PBKDF2-derived keys, in the layout every wallet version uses:
//! `base64(iv || ciphertext)` where the 16-byte IV doubles as the PBKDF2 salt.

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{
    block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher,
};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha1::Sha1;

use super::{CryptoError, Padding, BLOCK_SIZE};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256Ofb = ofb::Ofb<Aes256>;

const KEY_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    Cbc,
    Ofb,
}

/// PBKDF2-HMAC-SHA1 over the UTF-8 password, salted with the IV.
fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Result<[u8; KEY_SIZE], CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::ZeroIterations);
    }
    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut key);
    Ok(key)
}

/// Encrypt with the structured-wrapper defaults (CBC, ISO10126) and OS randomness.
pub fn encrypt(plaintext: &str, password: &str, iterations: u32) -> Result<String, CryptoError> {
    encrypt_with_rng(plaintext, password, iterations, &mut OsRng)
}

/// Encrypt with the wrapper defaults, drawing the IV and pad bytes from `rng`.
pub fn encrypt_with_rng<R: RngCore + CryptoRng + ?Sized>(
    plaintext: &str,
    password: &str,
    iterations: u32,
    rng: &mut R,
) -> Result<String, CryptoError> {
    encrypt_with_params(
        plaintext,
        password,
        iterations,
        CipherMode::Cbc,
        Padding::Iso10126,
        rng,
    )
}

pub fn encrypt_with_params<R: RngCore + CryptoRng + ?Sized>(
    plaintext: &str,
    password: &str,
    iterations: u32,
    mode: CipherMode,
    padding: Padding,
    rng: &mut R,
) -> Result<String, CryptoError> {
    let mut iv = [0u8; BLOCK_SIZE];
    rng.fill_bytes(&mut iv);
    let key = derive_key(password, &iv, iterations)?;

    let mut buf = plaintext.as_bytes().to_vec();
    padding.pad(&mut buf, rng);

    match mode {
        CipherMode::Cbc => {
            if buf.len() % BLOCK_SIZE != 0 {
                return Err(CryptoError::NotBlockAligned);
            }
            let len = buf.len();
            Aes256CbcEnc::new(&key.into(), &iv.into())
                .encrypt_padded_mut::<NoPadding>(&mut buf, len)
                .map_err(|_| CryptoError::NotBlockAligned)?;
        }
        CipherMode::Ofb => {
            Aes256Ofb::new(&key.into(), &iv.into()).apply_keystream(&mut buf);
        }
    }

    let mut out = Vec::with_capacity(BLOCK_SIZE + buf.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&buf);
    Ok(STANDARD.encode(out))
}

/// Decrypt with the structured-wrapper defaults (CBC, ISO10126).
pub fn decrypt(ciphertext: &str, password: &str, iterations: u32) -> Result<String, CryptoError> {
    decrypt_with_params(
        ciphertext,
        password,
        iterations,
        CipherMode::Cbc,
        Padding::Iso10126,
    )
}

/// Decrypt `base64(iv || ciphertext)` with an explicit mode and padding.
///
/// The plaintext is decoded as lossy UTF-8; callers decide validity by
/// parsing it.
pub fn decrypt_with_params(
    ciphertext: &str,
    password: &str,
    iterations: u32,
    mode: CipherMode,
    padding: Padding,
) -> Result<String, CryptoError> {
    let data = STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    if data.len() < BLOCK_SIZE {
        return Err(CryptoError::TooShort(data.len()));
    }

    let (iv, body) = data.split_at(BLOCK_SIZE);
    let iv: [u8; BLOCK_SIZE] = iv.try_into().map_err(|_| CryptoError::TooShort(data.len()))?;
    if padding != Padding::NoPadding && (body.is_empty() || body.len() % BLOCK_SIZE != 0) {
        return Err(CryptoError::NotBlockAligned);
    }

    let key = derive_key(password, &iv, iterations)?;
    let mut buf = body.to_vec();

    match mode {
        CipherMode::Cbc => {
            if buf.len() % BLOCK_SIZE != 0 {
                return Err(CryptoError::NotBlockAligned);
            }
            Aes256CbcDec::new(&key.into(), &iv.into())
                .decrypt_padded_mut::<NoPadding>(&mut buf)
                .map_err(|_| CryptoError::NotBlockAligned)?;
        }
        CipherMode::Ofb => {
            Aes256Ofb::new(&key.into(), &iv.into()).apply_keystream(&mut buf);
        }
    }

    let plain = padding.unpad(&buf)?;
    Ok(String::from_utf8_lossy(plain).into_owned())
}
