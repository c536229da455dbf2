//! Encoding layer for the Ethereum client.
//!
//! This crate provides:
//! - Quantity parsing/formatting and ether unit conversion
//! - Address parsing with EIP-55 checksums
//! - Solidity ABI types, signature parsing, encoding and decoding
//! - Event topic construction, log decoding and log filter matching
//! - Legacy (EIP-155) and EIP-1559 transaction serialization

pub mod abi;
pub mod address;
pub mod error;
pub mod hash;
pub mod log;
pub mod serde_helpers;
pub mod transaction;
pub mod units;

pub use alloy_primitives::{Address, Bytes, B256, I256, U256};
pub use error::EthError;
