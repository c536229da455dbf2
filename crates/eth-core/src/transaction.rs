use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::{Encodable, RlpEncodable};
use serde::Serialize;

use crate::error::EthError;
use crate::hash::keccak256;
use crate::serde_helpers;

/// A transaction to be signed, estimated or simulated.
///
/// Fields left as `None` are filled in by the signer before signing.
/// Setting either EIP-1559 fee field selects a type-2 transaction, otherwise
/// a legacy EIP-155 transaction is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// `None` deploys a contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(with = "serde_helpers::u256")]
    pub value: U256,
    #[serde(skip_serializing_if = "no_data")]
    pub data: Bytes,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::u64_opt"
    )]
    pub nonce: Option<u64>,
    #[serde(
        rename = "gas",
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::u64_opt"
    )]
    pub gas_limit: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::u128_opt"
    )]
    pub gas_price: Option<u128>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::u128_opt"
    )]
    pub max_fee_per_gas: Option<u128>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::u128_opt"
    )]
    pub max_priority_fee_per_gas: Option<u128>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::u64_opt"
    )]
    pub chain_id: Option<u64>,
}

impl TransactionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
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

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn is_eip1559(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }
}

/// A recoverable secp256k1 signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: U256,
    pub s: U256,
    /// Parity of the `y` coordinate of the nonce point.
    pub y_parity: bool,
}

impl Signature {
    /// 65 bytes `r || s || v` with `v` in {27, 28}.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        out[32..64].copy_from_slice(&self.s.to_be_bytes::<32>());
        out[64] = 27 + u8::from(self.y_parity);
        out
    }

    /// Parses `r || s || v`; `v` may be 0/1 or 27/28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EthError> {
        if bytes.len() != 65 {
            return Err(EthError::EncodingError(format!(
                "signature must be 65 bytes, got {}",
                bytes.len()
            )));
        }
        let y_parity = match bytes[64] {
            0 | 27 => false,
            1 | 28 => true,
            v => return Err(EthError::EncodingError(format!("invalid recovery byte {v}"))),
        };
        Ok(Self {
            r: U256::from_be_slice(&bytes[..32]),
            s: U256::from_be_slice(&bytes[32..64]),
            y_parity,
        })
    }
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: B256,
}

/// Bytes whose Keccak-256 is signed: `0x02 || rlp(fields)` for EIP-1559,
/// `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])` for legacy.
pub fn signing_payload(tx: &TransactionRequest) -> Result<Vec<u8>, EthError> {
    let mut out = Vec::new();
    if tx.is_eip1559() {
        out.push(EIP1559_TX_TYPE);
        Eip1559Unsigned::from_request(tx)?.encode(&mut out);
    } else {
        let chain_id = required(tx.chain_id, "chainId")?;
        LegacyTx::from_request(tx, chain_id, U256::ZERO, U256::ZERO)?.encode(&mut out);
    }
    Ok(out)
}

pub fn signing_hash(tx: &TransactionRequest) -> Result<B256, EthError> {
    Ok(keccak256(signing_payload(tx)?))
}

/// Serializes `tx` with `signature` attached and computes its hash.
pub fn encode_signed(tx: &TransactionRequest, signature: &Signature) -> Result<SignedTransaction, EthError> {
    let mut raw = Vec::new();
    if tx.is_eip1559() {
        raw.push(EIP1559_TX_TYPE);
        Eip1559Unsigned::from_request(tx)?
            .with_signature(signature)
            .encode(&mut raw);
    } else {
        let chain_id = required(tx.chain_id, "chainId")?;
        let v = chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + u64::from(signature.y_parity)))
            .ok_or_else(|| EthError::TransactionBuildError(format!("chainId {chain_id} too large")))?;
        LegacyTx::from_request(tx, v, signature.r, signature.s)?.encode(&mut raw);
    }

    let hash = keccak256(&raw);
    Ok(SignedTransaction {
        raw: Bytes::from(raw),
        hash,
    })
}

const EIP1559_TX_TYPE: u8 = 0x02;

fn no_data(data: &Bytes) -> bool {
    data.is_empty()
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, EthError> {
    value.ok_or_else(|| EthError::TransactionBuildError(format!("missing {field}")))
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

/// Legacy transaction. For the EIP-155 signing form `v` carries the chain id
/// and `r`, `s` are zero (encoded as empty strings).
#[derive(RlpEncodable)]
struct LegacyTx {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    v: u64,
    r: RlpU256,
    s: RlpU256,
}

impl LegacyTx {
    fn from_request(tx: &TransactionRequest, v: u64, r: U256, s: U256) -> Result<Self, EthError> {
        Ok(Self {
            nonce: required(tx.nonce, "nonce")?,
            gas_price: required(tx.gas_price, "gasPrice")?,
            gas_limit: required(tx.gas_limit, "gasLimit")?,
            to: RlpAddress(tx.to),
            value: RlpU256(tx.value),
            data: RlpBytes(tx.data.clone()),
            v,
            r: RlpU256(r),
            s: RlpU256(s),
        })
    }
}

/// Unsigned EIP-1559 fields, access list always empty.
#[derive(RlpEncodable)]
struct Eip1559Unsigned {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    access_list: EmptyList,
}

/// Signed EIP-1559 fields.
#[derive(RlpEncodable)]
struct Eip1559Signed {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    access_list: EmptyList,
    y_parity: u8,
    r: RlpU256,
    s: RlpU256,
}

impl Eip1559Unsigned {
    fn from_request(tx: &TransactionRequest) -> Result<Self, EthError> {
        let max_fee_per_gas = required(tx.max_fee_per_gas, "maxFeePerGas")?;
        let max_priority_fee_per_gas = required(tx.max_priority_fee_per_gas, "maxPriorityFeePerGas")?;
        if max_priority_fee_per_gas > max_fee_per_gas {
            return Err(EthError::TransactionBuildError(format!(
                "maxPriorityFeePerGas {max_priority_fee_per_gas} exceeds maxFeePerGas {max_fee_per_gas}"
            )));
        }
        Ok(Self {
            chain_id: required(tx.chain_id, "chainId")?,
            nonce: required(tx.nonce, "nonce")?,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas_limit: required(tx.gas_limit, "gasLimit")?,
            to: RlpAddress(tx.to),
            value: RlpU256(tx.value),
            data: RlpBytes(tx.data.clone()),
            access_list: EmptyList,
        })
    }

    fn with_signature(self, signature: &Signature) -> Eip1559Signed {
        Eip1559Signed {
            chain_id: self.chain_id,
            nonce: self.nonce,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            max_fee_per_gas: self.max_fee_per_gas,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            data: self.data,
            access_list: self.access_list,
            y_parity: u8::from(signature.y_parity),
            r: RlpU256(signature.r),
            s: RlpU256(signature.s),
        }
    }
}

/// Recipient address; contract creation encodes as the empty string.
struct RlpAddress(Option<Address>);

impl Encodable for RlpAddress {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        match &self.0 {
            Some(address) => address.as_slice().encode(out),
            None => (&[] as &[u8]).encode(out),
        }
    }

    fn length(&self) -> usize {
        match &self.0 {
            Some(address) => address.as_slice().length(),
            None => 1,
        }
    }
}

/// 256-bit integer as minimal big-endian bytes (leading zeros stripped).
struct RlpU256(U256);

impl RlpU256 {
    fn trimmed(&self) -> Vec<u8> {
        let bytes = self.0.to_be_bytes::<32>();
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(32);
        bytes[start..].to_vec()
    }
}

impl Encodable for RlpU256 {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.trimmed().as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.trimmed().as_slice().length()
    }
}

/// Byte string (as opposed to a list of integers).
struct RlpBytes(Bytes);

impl Encodable for RlpBytes {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_ref().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_ref().length()
    }
}

/// The empty list `0xc0`.
struct EmptyList;

impl Encodable for EmptyList {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        alloy_rlp::Header {
            list: true,
            payload_length: 0,
        }
        .encode(out);
    }

    fn length(&self) -> usize {
        1
    }
}
