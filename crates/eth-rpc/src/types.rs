use alloy_primitives::{Address, Bytes, B256};
use eth_core::log::Log;
use eth_core::serde_helpers;
use serde::{Deserialize, Serialize};

/// Block header fields returned by `eth_getBlockByNumber` (hashes only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// `None` for the pending block.
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub number: Option<u64>,
    #[serde(default)]
    pub hash: Option<B256>,
    pub parent_hash: B256,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub miner: Option<Address>,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub gas_limit: Option<u64>,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub gas_used: Option<u64>,
    /// Present from the London fork on.
    #[serde(default, with = "serde_helpers::u128_opt")]
    pub base_fee_per_gas: Option<u128>,
    #[serde(default)]
    pub extra_data: Bytes,
    #[serde(default)]
    pub transactions: Vec<B256>,
}

/// Suggested fees for a new transaction.
///
/// On EIP-1559 networks `base_fee`, `max_fee_per_gas` and
/// `max_priority_fee_per_gas` are set. On legacy networks only `gas_price`
/// is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<u128>,
    pub base_fee: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl FeeData {
    pub fn is_eip1559(&self) -> bool {
        self.max_fee_per_gas.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub transaction_index: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub gas_used: Option<u64>,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub cumulative_gas_used: Option<u64>,
    #[serde(default, with = "serde_helpers::u128_opt")]
    pub effective_gas_price: Option<u128>,
    /// `1` success, `0` failure. Absent on pre-Byzantium receipts.
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub status: Option<u64>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// A receipt without a status field is treated as successful.
    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn receipt_parses_quantities() {
        let receipt: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "status": "0x1",
            "contractAddress": null,
            "logs": []
        }))
        .unwrap();
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.gas_used, Some(21_000));
        assert_eq!(receipt.effective_gas_price, Some(1_000_000_000));
        assert!(receipt.succeeded());
        assert!(receipt.contract_address.is_none());
    }

    #[test]
    fn failed_status_is_not_success() {
        let receipt: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "22".repeat(32)),
            "status": "0x0"
        }))
        .unwrap();
        assert!(!receipt.succeeded());
    }

    #[test]
    fn block_with_base_fee() {
        let block: Block = serde_json::from_value(json!({
            "number": "0x1b4",
            "hash": format!("0x{}", "aa".repeat(32)),
            "parentHash": format!("0x{}", "bb".repeat(32)),
            "timestamp": "0x55ba467c",
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x0",
            "baseFeePerGas": "0x7",
            "transactions": []
        }))
        .unwrap();
        assert_eq!(block.number, Some(436));
        assert_eq!(block.base_fee_per_gas, Some(7));
        assert_eq!(block.gas_limit, Some(30_000_000));
    }

    #[test]
    fn legacy_block_has_no_base_fee() {
        let block: Block = serde_json::from_value(json!({
            "number": "0x1",
            "parentHash": format!("0x{}", "00".repeat(32)),
        }))
        .unwrap();
        assert!(block.base_fee_per_gas.is_none());
        assert!(block.extra_data.is_empty());
    }
}
