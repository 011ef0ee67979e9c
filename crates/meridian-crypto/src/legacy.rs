//! Legacy mnemonic arithmetic
//!
//! Older wallets encoded a 32-byte key as 22 words from a 4096-word list, with a
//! CRC-8 byte folded into the entropy. The polynomial, the skipped final byte and
//! the big-endian radix conversion must stay exactly as they are or previously
//! issued phrases stop decoding.

use num_bigint::BigUint;

use crate::CryptoError;

/// Words in a legacy phrase
pub const LEGACY_WORD_COUNT: usize = 22;
/// Size of the legacy word list
pub const LEGACY_WORD_LIST_LEN: u32 = 4096;
/// Entropy bytes recovered from a legacy phrase
pub const LEGACY_ENTROPY_LEN: usize = 32;

const CRC8_POLY: u8 = 0xb2;

/// CRC-8 over every byte of `data` except the last.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xff;
    for &byte in &data[..data.len().saturating_sub(1)] {
        crc ^= byte;
        for _ in 0..8 {
            crc = (crc >> 1) ^ if crc & 1 == 0 { 0 } else { CRC8_POLY };
        }
    }
    crc ^ 0xff
}

/// Reinterpret `digits` (most significant first, base `from`) as `to_len` digits in
/// base `to`. High digits that do not fit are dropped.
pub fn convert_radix(digits: &[u32], from: u32, to: u32, to_len: usize) -> Vec<u32> {
    let mut num = BigUint::from(0u32);
    for &digit in digits {
        num = num * from + digit;
    }

    let base = BigUint::from(to);
    let mut out = vec![0u32; to_len];
    for slot in out.iter_mut().rev() {
        let rem = &num % &base;
        *slot = rem.iter_u32_digits().next().unwrap_or(0);
        num /= &base;
    }
    out
}

/// Recover the key entropy from legacy word indices.
pub fn legacy_entropy(word_indices: &[u32]) -> Result<Vec<u8>, CryptoError> {
    if word_indices.len() != LEGACY_WORD_COUNT {
        return Err(CryptoError::InvalidLegacyMnemonic(format!(
            "there should be {LEGACY_WORD_COUNT} words, not {}",
            word_indices.len()
        )));
    }
    if let Some(bad) = word_indices.iter().find(|&&i| i >= LEGACY_WORD_LIST_LEN) {
        return Err(CryptoError::InvalidLegacyMnemonic(format!(
            "word index {bad} out of range"
        )));
    }

    let data = convert_radix(word_indices, LEGACY_WORD_LIST_LEN, 256, LEGACY_ENTROPY_LEN + 1);
    let crc = data[LEGACY_ENTROPY_LEN] as u8;
    let entropy: Vec<u8> = data[..LEGACY_ENTROPY_LEN]
        .iter()
        .map(|&b| (b as u8) ^ crc)
        .collect();

    if crc8(&entropy) != crc {
        return Err(CryptoError::LegacyChecksum);
    }
    Ok(entropy)
}

/// Word indices encoding `entropy`, the inverse of [`legacy_entropy`].
pub fn legacy_word_indices(entropy: &[u8; LEGACY_ENTROPY_LEN]) -> Vec<u32> {
    let crc = crc8(entropy);
    let mut data: Vec<u32> = entropy.iter().map(|&b| u32::from(b ^ crc)).collect();
    data.push(u32::from(crc));
    convert_radix(&data, 256, LEGACY_WORD_LIST_LEN, LEGACY_WORD_COUNT)
}
