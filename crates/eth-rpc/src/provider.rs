//! Read-only chain queries over JSON-RPC.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use eth_core::address::parse_address;
use eth_core::log::{BlockTag, Filter, Log};
use eth_core::transaction::TransactionRequest;
use eth_core::units::{parse_quantity, parse_u64};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::ens;
use crate::error::ClientError;
use crate::http::HttpTransport;
use crate::transport::{RpcClient, Transport};
use crate::types::{Block, FeeData, TransactionReceipt};

/// Priority fee used when the node has no `eth_maxPriorityFeePerGas`.
pub const FALLBACK_PRIORITY_FEE: u128 = 1_000_000_000;

/// One endpoint, one chain. Cloning is cheap and clones share the request id
/// counter.
#[derive(Clone)]
pub struct Provider {
    client: RpcClient,
    config: Arc<ProviderConfig>,
}

impl Provider {
    /// Connects over HTTP to `config.rpc_url`.
    pub fn new(config: ProviderConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = HttpTransport::new(config.rpc_url.clone(), config.request_timeout)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Uses a caller-supplied transport (socket, test double, ...).
    pub fn with_transport(config: ProviderConfig, transport: impl Transport + 'static) -> Self {
        Self {
            client: RpcClient::new(transport),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<U256, ClientError> {
        let hex: String = self.client.request(method, params).await?;
        Ok(parse_quantity(&hex)?)
    }

    async fn quantity_u64(&self, method: &str, params: Value) -> Result<u64, ClientError> {
        let hex: String = self.client.request(method, params).await?;
        Ok(parse_u64(&hex)?)
    }

    async fn quantity_u128(&self, method: &str, params: Value) -> Result<u128, ClientError> {
        let value = self.quantity(method, params).await?;
        u128::try_from(value)
            .map_err(|_| ClientError::InvalidResponse(format!("{method}: {value} exceeds u128")))
    }

    /// Balance in wei.
    pub async fn get_balance(&self, address: Address, block: BlockTag) -> Result<U256, ClientError> {
        self.quantity("eth_getBalance", json!([address, block])).await
    }

    pub async fn get_transaction_count(&self, address: Address, block: BlockTag) -> Result<u64, ClientError> {
        self.quantity_u64("eth_getTransactionCount", json!([address, block]))
            .await
    }

    pub async fn get_block_number(&self) -> Result<u64, ClientError> {
        self.quantity_u64("eth_blockNumber", json!([])).await
    }

    /// The chain id reported by the node.
    pub async fn get_chain_id(&self) -> Result<u64, ClientError> {
        self.quantity_u64("eth_chainId", json!([])).await
    }

    /// `None` when the node does not know the block yet.
    pub async fn get_block(&self, block: BlockTag) -> Result<Option<Block>, ClientError> {
        self.client
            .request("eth_getBlockByNumber", json!([block, false]))
            .await
    }

    /// Deployed bytecode; empty for externally owned accounts.
    pub async fn get_code(&self, address: Address, block: BlockTag) -> Result<Bytes, ClientError> {
        self.client.request("eth_getCode", json!([address, block])).await
    }

    pub async fn get_gas_price(&self) -> Result<u128, ClientError> {
        self.quantity_u128("eth_gasPrice", json!([])).await
    }

    /// The node's priority fee suggestion, or [`FALLBACK_PRIORITY_FEE`] when
    /// the node rejects the method.
    pub async fn get_max_priority_fee(&self) -> Result<u128, ClientError> {
        match self.quantity_u128("eth_maxPriorityFeePerGas", json!([])).await {
            Err(ClientError::Rpc { code, message, .. }) => {
                debug!(code, %message, "eth_maxPriorityFeePerGas unavailable, using fallback");
                Ok(FALLBACK_PRIORITY_FEE)
            }
            other => other,
        }
    }

    /// Suggested fees for the next transaction.
    ///
    /// When the latest block carries a base fee, `max_fee_per_gas` is
    /// `base_fee * 2 + priority_fee`. Otherwise only the legacy gas price is
    /// returned.
    pub async fn get_fee_data(&self) -> Result<FeeData, ClientError> {
        let base_fee = self
            .get_block(BlockTag::Latest)
            .await?
            .and_then(|block| block.base_fee_per_gas);

        match base_fee {
            Some(base_fee) => {
                let priority = self.get_max_priority_fee().await?;
                Ok(FeeData {
                    gas_price: None,
                    base_fee: Some(base_fee),
                    max_fee_per_gas: Some(base_fee.saturating_mul(2).saturating_add(priority)),
                    max_priority_fee_per_gas: Some(priority),
                })
            }
            None => Ok(FeeData {
                gas_price: Some(self.get_gas_price().await?),
                ..FeeData::default()
            }),
        }
    }

    /// Executes `tx` against the state at `block` without creating a
    /// transaction. Returns the raw return data.
    pub async fn call(&self, tx: &TransactionRequest, block: BlockTag) -> Result<Bytes, ClientError> {
        self.client.request("eth_call", json!([tx, block])).await
    }

    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ClientError> {
        self.quantity_u64("eth_estimateGas", json!([tx])).await
    }

    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ClientError> {
        self.client.request("eth_getLogs", json!([filter])).await
    }

    /// Submits a signed transaction and returns its hash.
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, ClientError> {
        self.client
            .request("eth_sendRawTransaction", json!([raw]))
            .await
    }

    /// `None` while the transaction is pending or unknown.
    pub async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>, ClientError> {
        self.client
            .request("eth_getTransactionReceipt", json!([hash]))
            .await
    }

    /// Resolves an ENS name to the address its resolver records.
    pub async fn resolve_name(&self, name: &str) -> Result<Address, ClientError> {
        ens::resolve_name(self, name).await
    }

    /// Accepts either a hex address or an ENS name.
    pub async fn resolve(&self, name_or_address: &str) -> Result<Address, ClientError> {
        if name_or_address.starts_with("0x") {
            Ok(parse_address(name_or_address)?)
        } else {
            self.resolve_name(name_or_address).await
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .finish()
    }
}
