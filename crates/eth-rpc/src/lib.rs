//! JSON-RPC client layer for the Ethereum client.
//!
//! This crate provides:
//! - Request/response correlation and batching over a pluggable transport
//!   (HTTP, or any persistent socket through [`DuplexTransport`])
//! - A [`Provider`] for chain queries and ENS resolution
//! - A [`Signer`] that fills in, signs and submits transactions
//! - [`Contract`] bindings with typed calls, simulations and event filters
//! - Polling log subscriptions with fire-once and removable listeners

pub mod config;
pub mod contract;
pub mod duplex;
pub mod ens;
pub mod error;
pub mod http;
pub mod pending;
pub mod provider;
pub mod signer;
pub mod subscription;
pub mod transport;
pub mod types;

pub use config::{NetworkPreset, Overrides, ProviderConfig, WaitOptions};
pub use contract::{Contract, ContractEvent, EventListener};
pub use duplex::DuplexTransport;
pub use error::ClientError;
pub use http::HttpTransport;
pub use pending::PendingTransaction;
pub use provider::Provider;
pub use signer::Signer;
pub use subscription::{ListenerId, ListenerResult, PollOutcome, PollingSubscription};
pub use transport::{RpcClient, Transport};
pub use types::{Block, FeeData, TransactionReceipt};
