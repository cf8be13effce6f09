//! Minimal Solidity ABI encoding for the two view calls we make.

use alloy_primitives::{keccak256, Address, U256};

use crate::error::{Result, RiskError};

const WORD: usize = 32;

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for a function taking one dynamic `string`.
pub fn encode_string_call(signature: &str, arg: &str) -> Vec<u8> {
    let bytes = arg.as_bytes();
    let padded_len = bytes.len().div_ceil(WORD) * WORD;
    let mut data = Vec::with_capacity(4 + 2 * WORD + padded_len);
    data.extend_from_slice(&selector(signature));
    data.extend_from_slice(&U256::from(WORD).to_be_bytes::<32>());
    data.extend_from_slice(&U256::from(bytes.len()).to_be_bytes::<32>());
    data.extend_from_slice(bytes);
    data.resize(4 + 2 * WORD + padded_len, 0);
    data
}

/// Calldata for a function taking one fixed-size `bytesN` (N <= 32),
/// left-aligned in its word.
pub fn encode_fixed_bytes_call(signature: &str, arg: &[u8]) -> Result<Vec<u8>> {
    if arg.len() > WORD {
        return Err(RiskError::Oracle(format!("bytes argument too long: {}", arg.len())));
    }
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&selector(signature));
    data.extend_from_slice(arg);
    data.resize(4 + WORD, 0);
    Ok(data)
}

/// Decode a `0x`-prefixed hex string.
pub fn decode_hex(raw: &str) -> Result<Vec<u8>> {
    let trimmed = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(trimmed).map_err(|e| RiskError::Oracle(format!("malformed hex {:?}: {}", raw, e)))
}

fn word(data: &[u8], index: usize) -> Result<&[u8]> {
    let start = index * WORD;
    data.get(start..start + WORD).ok_or_else(|| {
        RiskError::Oracle(format!(
            "return data too short: {} bytes, wanted word {}",
            data.len(),
            index
        ))
    })
}

pub fn decode_address(data: &[u8], index: usize) -> Result<Address> {
    let w = word(data, index)?;
    Ok(Address::from_slice(&w[12..]))
}

pub fn decode_uint256(data: &[u8], index: usize) -> Result<U256> {
    Ok(U256::from_be_slice(word(data, index)?))
}

pub fn decode_uint64(data: &[u8], index: usize) -> Result<u64> {
    let w = word(data, index)?;
    if w[..24].iter().any(|b| *b != 0) {
        return Err(RiskError::Oracle("uint64 value out of range".to_string()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&w[24..]);
    Ok(u64::from_be_bytes(buf))
}

/// `int8` is sign-extended across the whole word.
pub fn decode_int8(data: &[u8], index: usize) -> Result<i8> {
    let w = word(data, index)?;
    let value = w[31] as i8;
    let fill = if value < 0 { 0xff } else { 0x00 };
    if w[..31].iter().any(|b| *b != fill) {
        return Err(RiskError::Oracle("int8 value out of range".to_string()));
    }
    Ok(value)
}

/// Lossy conversion of a raw feed value for display-grade arithmetic.
pub fn u256_to_f64(value: U256) -> f64 {
    match u128::try_from(value) {
        Ok(v) => v as f64,
        Err(_) => value.to_string().parse().unwrap_or(f64::INFINITY),
    }
}
