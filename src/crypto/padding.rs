//! Block padding schemes accepted by legacy wallet payloads
//!
//! Removal follows the historic wallet semantics rather than strict
//! validation: ISO10126 only rejects a count larger than a block, and
//! zero-byte padding never fails. Changing either would change which
//! legacy payloads decrypt.

use rand::RngCore;

use super::{CryptoError, BLOCK_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Padding {
    /// Random fill, last byte holds the pad length
    Iso10126,
    /// 0x80 marker followed by zeros (ISO 7816-4)
    Iso7816,
    ZeroByte,
    NoPadding,
}

impl Padding {
    /// Append padding so `data` becomes block aligned.
    ///
    /// Padded schemes always add between 1 and `BLOCK_SIZE` bytes.
    pub(crate) fn pad<R: RngCore + ?Sized>(self, data: &mut Vec<u8>, rng: &mut R) {
        let count = BLOCK_SIZE - data.len() % BLOCK_SIZE;
        match self {
            Padding::Iso10126 => {
                let mut fill = vec![0u8; count - 1];
                rng.fill_bytes(&mut fill);
                data.extend_from_slice(&fill);
                data.push(count as u8);
            }
            Padding::Iso7816 => {
                data.push(0x80);
                data.resize(data.len() + count - 1, 0);
            }
            Padding::ZeroByte => data.resize(data.len() + count, 0),
            Padding::NoPadding => {}
        }
    }

    /// Strip padding from decrypted, block-aligned data.
    pub(crate) fn unpad(self, data: &[u8]) -> Result<&[u8], CryptoError> {
        if self == Padding::NoPadding {
            return Ok(data);
        }
        if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::NotBlockAligned);
        }

        let start = data.len() - BLOCK_SIZE;
        let block = &data[start..];

        let kept = match self {
            Padding::Iso10126 => {
                let count = block[BLOCK_SIZE - 1] as usize;
                if count > BLOCK_SIZE {
                    return Err(CryptoError::PadBlockCorrupted);
                }
                BLOCK_SIZE - count
            }
            Padding::Iso7816 => {
                let mut idx = BLOCK_SIZE - 1;
                while idx > 0 && block[idx] == 0 {
                    idx -= 1;
                }
                if block[idx] != 0x80 {
                    return Err(CryptoError::PadBlockCorrupted);
                }
                idx
            }
            Padding::ZeroByte => {
                let mut count = BLOCK_SIZE;
                while count > 0 && block[count - 1] == 0 {
                    count -= 1;
                }
                count
            }
            Padding::NoPadding => BLOCK_SIZE,
        };

        Ok(&data[..start + kept])
    }
}
