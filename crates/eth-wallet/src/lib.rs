//! Local accounts for the Ethereum client.
//!
//! This crate provides:
//! - BIP-39 mnemonic generation and seed derivation
//! - BIP-32/44 key derivation along `m/44'/60'/account'/0/index`
//! - A `Wallet` that signs digests, EIP-191 messages and transactions
//! - Signature recovery

pub mod error;
pub mod hd_derivation;
pub mod mnemonic;
pub mod wallet;

pub use error::WalletError;
pub use wallet::{hash_message, recover_address, recover_message_signer, Wallet};
