//! Client configuration: endpoint settings, network presets, per-call
//! overrides and receipt-wait options.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use eth_core::log::BlockTag;
use eth_core::transaction::TransactionRequest;
use serde::{Deserialize, Deserializer};

use crate::error::ClientError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One RPC endpoint and the chain it serves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Interval for event polling and receipt polling.
    #[serde(
        default = "default_poll_interval",
        rename = "poll_interval_ms",
        deserialize_with = "millis"
    )]
    pub poll_interval: Duration,
    #[serde(
        default = "default_request_timeout",
        rename = "request_timeout_ms",
        deserialize_with = "millis"
    )]
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(rpc_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Parses a JSON object such as
    /// `{"rpc_url": "...", "chain_id": 1, "poll_interval_ms": 2000}`.
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ClientError::Config("rpc_url is empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ClientError::Config("poll_interval must be positive".into()));
        }
        Ok(())
    }
}

impl From<&NetworkPreset> for ProviderConfig {
    fn from(preset: &NetworkPreset) -> Self {
        Self::new(preset.rpc_url, preset.chain_id)
    }
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// A well-known network. Presets are plain values; pick one and build a
/// [`ProviderConfig`] from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPreset {
    pub chain_id: u64,
    pub name: &'static str,
    pub symbol: &'static str,
    pub rpc_url: &'static str,
    pub is_testnet: bool,
}

/// Ethereum Mainnet (chain ID 1).
pub const ETHEREUM: NetworkPreset = NetworkPreset {
    chain_id: 1,
    name: "Ethereum",
    symbol: "ETH",
    rpc_url: "https://eth.llamarpc.com",
    is_testnet: false,
};

/// Sepolia testnet (chain ID 11155111).
pub const SEPOLIA: NetworkPreset = NetworkPreset {
    chain_id: 11_155_111,
    name: "Sepolia",
    symbol: "ETH",
    rpc_url: "https://rpc.sepolia.org",
    is_testnet: true,
};

/// Holesky testnet (chain ID 17000).
pub const HOLESKY: NetworkPreset = NetworkPreset {
    chain_id: 17_000,
    name: "Holesky",
    symbol: "ETH",
    rpc_url: "https://ethereum-holesky-rpc.publicnode.com",
    is_testnet: true,
};

/// Polygon PoS (chain ID 137).
pub const POLYGON: NetworkPreset = NetworkPreset {
    chain_id: 137,
    name: "Polygon",
    symbol: "MATIC",
    rpc_url: "https://polygon-rpc.com",
    is_testnet: false,
};

/// Arbitrum One (chain ID 42161).
pub const ARBITRUM: NetworkPreset = NetworkPreset {
    chain_id: 42_161,
    name: "Arbitrum One",
    symbol: "ETH",
    rpc_url: "https://arb1.arbitrum.io/rpc",
    is_testnet: false,
};

/// OP Mainnet (chain ID 10).
pub const OPTIMISM: NetworkPreset = NetworkPreset {
    chain_id: 10,
    name: "Optimism",
    symbol: "ETH",
    rpc_url: "https://mainnet.optimism.io",
    is_testnet: false,
};

/// Base (chain ID 8453).
pub const BASE: NetworkPreset = NetworkPreset {
    chain_id: 8453,
    name: "Base",
    symbol: "ETH",
    rpc_url: "https://mainnet.base.org",
    is_testnet: false,
};

/// Local development node (anvil / hardhat defaults).
pub const LOCALHOST: NetworkPreset = NetworkPreset {
    chain_id: 31_337,
    name: "Localhost",
    symbol: "ETH",
    rpc_url: "http://127.0.0.1:8545",
    is_testnet: true,
};

const ALL_PRESETS: &[&NetworkPreset] = &[
    &ETHEREUM, &SEPOLIA, &HOLESKY, &POLYGON, &ARBITRUM, &OPTIMISM, &BASE, &LOCALHOST,
];

/// Returns the preset for `chain_id`, or `None` if there is none.
pub fn get_preset(chain_id: u64) -> Option<&'static NetworkPreset> {
    ALL_PRESETS.iter().find(|p| p.chain_id == chain_id).copied()
}

/// Per-call options for contract calls and transactions.
///
/// Unset fields are filled in as follows:
/// - `value`: zero
/// - `block`: `latest` (reads and simulations only)
/// - `nonce`: `eth_getTransactionCount(from, "pending")`
/// - `gas_limit`: `eth_estimateGas`
/// - fees: from `Provider::get_fee_data`, EIP-1559 fields when the chain
///   reports a base fee, otherwise the legacy gas price. Setting `gas_price`
///   forces a legacy transaction; setting either EIP-1559 field forces type 2.
/// - `from`: the signer's address for writes; omitted for reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub from: Option<Address>,
    pub value: Option<U256>,
    pub nonce: Option<u64>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub block: Option<BlockTag>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn max_fee_per_gas(mut self, fee: u128) -> Self {
        self.max_fee_per_gas = Some(fee);
        self
    }

    pub fn max_priority_fee_per_gas(mut self, fee: u128) -> Self {
        self.max_priority_fee_per_gas = Some(fee);
        self
    }

    pub fn block(mut self, block: impl Into<BlockTag>) -> Self {
        self.block = Some(block.into());
        self
    }

    pub fn block_or_latest(&self) -> BlockTag {
        self.block.unwrap_or_default()
    }

    /// A request to `to` carrying `data`, with every set override copied in.
    pub fn to_request(&self, to: Address, data: Bytes) -> TransactionRequest {
        TransactionRequest {
            from: self.from,
            to: Some(to),
            value: self.value.unwrap_or_default(),
            data,
            nonce: self.nonce,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            chain_id: None,
        }
    }
}

/// How long and how often `PendingTransaction::wait` polls for a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Blocks that must include the transaction, counting its own block.
    /// `0` returns as soon as a receipt exists.
    pub confirmations: u64,
    pub poll_interval: Duration,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            confirmations: 1,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl WaitOptions {
    pub fn confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_json_with_defaults() {
        let config = ProviderConfig::from_json(r#"{"rpc_url": "http://localhost:8545", "chain_id": 31337}"#).unwrap();
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.poll_interval, Duration::from_secs(4));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn config_durations_are_milliseconds() {
        let config = ProviderConfig::from_json(
            r#"{"rpc_url": "http://x", "chain_id": 1, "poll_interval_ms": 250, "request_timeout_ms": 5000}"#,
        )
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            ProviderConfig::from_json(r#"{"rpc_url": " ", "chain_id": 1}"#),
            Err(ClientError::Config(_))
        ));
        assert!(ProviderConfig::from_json(r#"{"rpc_url": "http://x", "chain_id": 1, "poll_interval_ms": 0}"#).is_err());
        assert!(ProviderConfig::from_json(r#"{"chain_id": 1}"#).is_err());
    }

    #[test]
    fn presets() {
        let sepolia = get_preset(11_155_111).unwrap();
        assert_eq!(sepolia.name, "Sepolia");
        assert!(sepolia.is_testnet);
        assert!(!ETHEREUM.is_testnet);
        assert!(get_preset(999_999).is_none());

        let config = ProviderConfig::from(&ETHEREUM);
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.rpc_url, ETHEREUM.rpc_url);
    }

    #[test]
    fn preset_chain_ids_are_unique() {
        for (i, a) in ALL_PRESETS.iter().enumerate() {
            for b in &ALL_PRESETS[i + 1..] {
                assert_ne!(a.chain_id, b.chain_id, "{} and {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn overrides_default_block_is_latest() {
        assert_eq!(Overrides::new().block_or_latest(), BlockTag::Latest);
        assert_eq!(Overrides::new().block(7u64).block_or_latest(), BlockTag::Number(7));
    }

    #[test]
    fn overrides_fill_request() {
        let to = Address::repeat_byte(0x11);
        let tx = Overrides::new()
            .nonce(4)
            .gas_limit(50_000)
            .to_request(to, Bytes::from(vec![1, 2]));
        assert_eq!(tx.to, Some(to));
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.nonce, Some(4));
        assert_eq!(tx.gas_limit, Some(50_000));
        assert!(tx.from.is_none());
        assert!(tx.chain_id.is_none());
        assert!(!tx.is_eip1559());
    }
}
