use alloy_primitives::B256;
use sha3::{Digest, Keccak256};

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    let digest = Keccak256::digest(data.as_ref());
    B256::from_slice(&digest)
}

/// Keccak-256 of a UTF-8 string, as used for selectors and event topics.
pub fn id(text: &str) -> B256 {
    keccak256(text.as_bytes())
}
