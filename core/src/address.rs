/// Address-format validation for tz1/tz2/tz3/KT1 addresses.
///
/// An address is base58check(prefix[3] + hash[20] + checksum[4]) where the
/// checksum is the first 4 bytes of double SHA-256 over prefix + hash.
use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const HASH_LEN: usize = 20;
const DECODED_LEN: usize = 3 + HASH_LEN + 4;

#[derive(Debug, Error, PartialEq)]
pub enum AddressError {
    #[error("Address cannot be empty")]
    Empty,

    #[error("Invalid address prefix")]
    InvalidPrefix,

    #[error("Invalid base58 character")]
    InvalidBase58,

    #[error("Invalid address length")]
    InvalidLength,

    #[error("Invalid address checksum")]
    InvalidChecksum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// Ed25519 implicit account.
    Tz1,
    /// Secp256k1 implicit account.
    Tz2,
    /// P-256 implicit account.
    Tz3,
    /// Originated contract.
    Kt1,
}

impl AddressKind {
    const ALL: [AddressKind; 4] = [Self::Tz1, Self::Tz2, Self::Tz3, Self::Kt1];

    fn prefix_bytes(self) -> [u8; 3] {
        match self {
            Self::Tz1 => [6, 161, 159],
            Self::Tz2 => [6, 161, 161],
            Self::Tz3 => [6, 161, 164],
            Self::Kt1 => [2, 90, 121],
        }
    }

    fn prefix_str(self) -> &'static str {
        match self {
            Self::Tz1 => "tz1",
            Self::Tz2 => "tz2",
            Self::Tz3 => "tz3",
            Self::Kt1 => "KT1",
        }
    }

    /// Implicit accounts are controlled by a key; originated ones by a script.
    pub fn is_implicit(self) -> bool {
        !matches!(self, Self::Kt1)
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix_str())
    }
}

/// Syntactic address check used by the send form before any estimation.
pub trait AddressValidator: Send + Sync {
    fn is_valid(&self, address: &str) -> bool;
}

/// Default validator: prefix, length and base58check checksum.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base58CheckValidator;

impl AddressValidator for Base58CheckValidator {
    fn is_valid(&self, address: &str) -> bool {
        is_address_valid(address)
    }
}

pub fn is_address_valid(address: &str) -> bool {
    parse_address(address).is_ok()
}

/// Validate an address and return its kind.
pub fn parse_address(address: &str) -> Result<AddressKind, AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }

    let decoded = decode_base58(address)?;
    if decoded.len() != DECODED_LEN {
        return Err(AddressError::InvalidLength);
    }

    let (body, checksum) = decoded.split_at(DECODED_LEN - 4);
    if checksum != compute_checksum(body) {
        return Err(AddressError::InvalidChecksum);
    }

    AddressKind::ALL
        .into_iter()
        .find(|k| body[..3] == k.prefix_bytes())
        .ok_or(AddressError::InvalidPrefix)
}

/// Encode a 20-byte key or contract hash as an address of the given kind.
pub fn encode_address(kind: AddressKind, hash: &[u8; HASH_LEN]) -> String {
    encode_base58check(&kind.prefix_bytes(), hash)
}

/// Base58check over `prefix + payload`, as used for every chain hash.
pub(crate) fn encode_base58check(prefix: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(prefix.len() + payload.len() + 4);
    data.extend_from_slice(prefix);
    data.extend_from_slice(payload);
    let checksum = compute_checksum(&data);
    data.extend_from_slice(&checksum);
    encode_base58(&data)
}

/// Shorten an address for display: `tz1a9w1...Fx2q`.
pub fn short_address(address: &str) -> String {
    let len = address.chars().count();
    if len <= 11 {
        return address.to_string();
    }
    let head: String = address.chars().take(7).collect();
    let tail: String = address.chars().skip(len - 4).collect();
    format!("{head}...{tail}")
}

/// First 4 bytes of double SHA-256.
fn compute_checksum(data: &[u8]) -> [u8; 4] {
    let hash1 = Sha256::digest(data);
    let hash2 = Sha256::digest(hash1);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&hash2[..4]);
    checksum
}

fn encode_base58(data: &[u8]) -> String {
    // Little-endian base-58 digits.
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in data {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let leading_zeros = data.iter().take_while(|&&b| b == 0).count();
    let mut result = String::with_capacity(leading_zeros + digits.len());
    for _ in 0..leading_zeros {
        result.push('1');
    }
    for &d in digits.iter().rev() {
        result.push(BASE58_ALPHABET[d as usize] as char);
    }
    result
}

fn decode_base58(s: &str) -> Result<Vec<u8>, AddressError> {
    // Little-endian base-256 bytes.
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len());
    for ch in s.bytes() {
        let value = BASE58_ALPHABET
            .iter()
            .position(|&c| c == ch)
            .ok_or(AddressError::InvalidBase58)? as u32;
        let mut carry = value;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let leading_ones = s.bytes().take_while(|&c| c == b'1').count();
    let mut result = vec![0u8; leading_ones];
    result.extend(bytes.iter().rev());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(seed: u8) -> [u8; HASH_LEN] {
        let mut h = [0u8; HASH_LEN];
        for (i, b) in h.iter_mut().enumerate() {
            *b = seed.wrapping_mul(31).wrapping_add(i as u8);
        }
        h
    }

    #[test]
    fn encoded_addresses_carry_their_prefix() {
        for kind in AddressKind::ALL {
            let addr = encode_address(kind, &hash(7));
            assert!(addr.starts_with(kind.prefix_str()), "{addr} should start with {kind}");
            assert_eq!(addr.len(), 36);
        }
    }

    #[test]
    fn encoded_addresses_validate() {
        for kind in AddressKind::ALL {
            let addr = encode_address(kind, &hash(42));
            assert_eq!(parse_address(&addr), Ok(kind));
            assert!(Base58CheckValidator.is_valid(&addr));
        }
    }

    #[test]
    fn base58_preserves_leading_zeros() {
        let data = [0u8, 0, 1, 2, 3];
        let encoded = encode_base58(&data);
        assert!(encoded.starts_with("11"));
        assert_eq!(decode_base58(&encoded).unwrap(), data);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(parse_address(""), Err(AddressError::Empty));
    }

    #[test]
    fn rejects_non_base58_characters() {
        // '0', 'O', 'I' and 'l' are not in the alphabet
        assert_eq!(parse_address("tz10OIl"), Err(AddressError::InvalidBase58));
        assert_eq!(parse_address("tz1 abc"), Err(AddressError::InvalidBase58));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(parse_address("tz1abc"), Err(AddressError::InvalidLength));
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let addr = encode_address(AddressKind::Tz1, &hash(3));
        let mut chars: Vec<char> = addr.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'a' { 'b' } else { 'a' };
        let corrupted: String = chars.into_iter().collect();
        assert!(!is_address_valid(&corrupted));
    }

    #[test]
    fn rejects_unknown_prefix() {
        let mut data = vec![1u8, 2, 3];
        data.extend_from_slice(&hash(9));
        let checksum = compute_checksum(&data);
        data.extend_from_slice(&checksum);
        let addr = encode_base58(&data);
        assert_eq!(parse_address(&addr), Err(AddressError::InvalidPrefix));
    }

    #[test]
    fn kt1_is_not_implicit() {
        assert!(AddressKind::Tz1.is_implicit());
        assert!(!AddressKind::Kt1.is_implicit());
    }

    #[test]
    fn short_address_keeps_head_and_tail() {
        let addr = encode_address(AddressKind::Tz1, &hash(1));
        let short = short_address(&addr);
        assert!(short.starts_with(&addr[..7]));
        assert!(short.ends_with(&addr[addr.len() - 4..]));
        assert!(short.contains("..."));
        assert_eq!(short_address("tz1short"), "tz1short");
    }
}
