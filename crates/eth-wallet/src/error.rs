use eth_core::EthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Signature recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("Transaction from {expected} cannot be signed by {actual}")]
    SenderMismatch { expected: String, actual: String },

    #[error(transparent)]
    Encoding(#[from] EthError),
}
