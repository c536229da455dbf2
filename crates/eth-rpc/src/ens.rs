//! ENS forward resolution: registry `resolver(node)`, then the resolver's
//! `addr(node)`.

use alloy_primitives::{address, Address, Bytes, B256};
use eth_core::abi::{decode_function_result, encode_function_call, AbiFunction, AbiParameter, AbiType, StateMutability};
use eth_core::hash::keccak256;
use eth_core::log::BlockTag;
use eth_core::transaction::TransactionRequest;
use tracing::debug;

use crate::error::ClientError;
use crate::provider::Provider;

/// The ENS registry, deployed at the same address on mainnet and testnets.
pub const ENS_REGISTRY: Address = address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

/// EIP-137 namehash. Labels are lowercased; full UTS-46 normalization is
/// left to the caller.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.to_lowercase());
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(node.as_slice());
        preimage[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(preimage);
    }
    node
}

fn node_to_address(name: &str) -> AbiFunction {
    AbiFunction {
        name: name.to_string(),
        inputs: vec![AbiParameter::new("node", AbiType::FixedBytes(32))],
        outputs: vec![AbiParameter::new("", AbiType::Address)],
        state_mutability: StateMutability::View,
    }
}

pub(crate) async fn resolve_name(provider: &Provider, name: &str) -> Result<Address, ClientError> {
    let node = namehash(name);

    let resolver = lookup(provider, ENS_REGISTRY, "resolver", node).await?;
    if resolver.is_zero() {
        return Err(ClientError::NameNotFound(name.to_string()));
    }
    let resolved = lookup(provider, resolver, "addr", node).await?;
    if resolved.is_zero() {
        return Err(ClientError::NameNotFound(name.to_string()));
    }

    debug!(name, %resolver, %resolved, "resolved ENS name");
    Ok(resolved)
}

/// Calls `function(bytes32) returns (address)` on `target`. A target without
/// code answers with empty data, which reads as the zero address.
async fn lookup(provider: &Provider, target: Address, function: &str, node: B256) -> Result<Address, ClientError> {
    let function = node_to_address(function);
    let data = encode_function_call(&function, &[node.into()])?;
    let tx = TransactionRequest::new().to(target).data(Bytes::from(data));

    let returned = provider.call(&tx, BlockTag::Latest).await?;
    if returned.is_empty() {
        return Ok(Address::ZERO);
    }
    let values = decode_function_result(&function, &returned)?;
    values
        .first()
        .and_then(|v| v.as_address())
        .ok_or_else(|| ClientError::InvalidResponse(format!("{} returned no address", function.name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namehash_vectors() {
        assert_eq!(namehash(""), B256::ZERO);
        assert_eq!(
            hex::encode(namehash("eth")),
            "93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
        assert_eq!(
            hex::encode(namehash("foo.eth")),
            "de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
        );
    }

    #[test]
    fn namehash_ignores_case() {
        assert_eq!(namehash("Vitalik.ETH"), namehash("vitalik.eth"));
    }

    #[test]
    fn selectors() {
        assert_eq!(hex::encode(node_to_address("resolver").selector()), "0178b8bf");
        assert_eq!(hex::encode(node_to_address("addr").selector()), "3b3b57de");
    }
}
