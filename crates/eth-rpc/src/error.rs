use alloy_primitives::B256;
use eth_core::EthError;
use eth_wallet::WalletError;
use thiserror::Error;

use crate::types::TransactionReceipt;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The node answered with a JSON-RPC error object. Never retried here.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Connection-level failure; the caller may retry with backoff.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Name not found: {0}")]
    NameNotFound(String),

    #[error("Transaction {hash} reverted in block {block:?}")]
    TransactionReverted {
        hash: B256,
        block: Option<u64>,
        receipt: Box<TransactionReceipt>,
    },

    #[error("Timed out waiting for transaction {0}")]
    TransactionTimeout(B256),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Contract is not connected to a signer")]
    MissingSigner,

    #[error("Invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Encoding(#[from] EthError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl ClientError {
    /// Whether the failure happened below the JSON-RPC layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
