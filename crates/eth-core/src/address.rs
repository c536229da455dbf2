use alloy_primitives::Address;

use crate::error::EthError;
use crate::hash::keccak256;

/// Derives an Ethereum address from an uncompressed secp256k1 public key
/// (65 bytes, starting with 0x04).
///
/// The derivation takes the Keccak-256 hash of the 64-byte public key (without
/// the 0x04 prefix) and uses the last 20 bytes as the address.
pub fn pubkey_to_address(uncompressed_pubkey: &[u8; 65]) -> Result<Address, EthError> {
    if uncompressed_pubkey[0] != 0x04 {
        return Err(EthError::InvalidAddress(
            "uncompressed key must start with 0x04".into(),
        ));
    }

    let hash = keccak256(&uncompressed_pubkey[1..]);
    Ok(Address::from_slice(&hash[12..]))
}

/// Parses a 0x-prefixed hex address.
///
/// All-lowercase and all-uppercase input is accepted as is. Mixed-case input
/// must carry a valid EIP-55 checksum.
pub fn parse_address(address: &str) -> Result<Address, EthError> {
    let hex_part = strip_hex_prefix(address)?;

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;
    let parsed = Address::from_slice(&bytes);

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());
    if !is_all_lower && !is_all_upper && to_checksum(&parsed)[2..] != *hex_part {
        return Err(EthError::InvalidAddress(format!(
            "bad EIP-55 checksum: {address}"
        )));
    }

    Ok(parsed)
}

/// Validates an Ethereum address string.
///
/// Returns `Ok(false)` for a well-formed address whose mixed-case checksum is
/// wrong, and an error when the string is not an address at all.
pub fn validate_address(address: &str) -> Result<bool, EthError> {
    match parse_address(address) {
        Ok(_) => Ok(true),
        Err(EthError::InvalidAddress(msg)) if msg.starts_with("bad EIP-55") => Ok(false),
        Err(e) => Err(e),
    }
}

/// Renders an address with EIP-55 mixed-case checksum encoding.
pub fn to_checksum(address: &Address) -> String {
    let hex_part = hex::encode(address.as_slice());

    // EIP-55: hash the lowercase hex address (without 0x).
    let hash = keccak256(hex_part.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in hex_part.chars().enumerate() {
        if c.is_ascii_digit() {
            checksummed.push(c);
            continue;
        }
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    checksummed
}

/// Canonical lowercase rendering, `0x` followed by 40 hex digits.
pub fn to_lower_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// Left-pads an address into a 32-byte topic / ABI word.
pub fn address_to_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

fn strip_hex_prefix(address: &str) -> Result<&str, EthError> {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))
}
