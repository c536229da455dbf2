//! Request correlation over a persistent connection.

use std::sync::Arc;
use std::time::Duration;

use eth_core::log::BlockTag;
use eth_core::{Address, U256};
use eth_rpc::{DuplexTransport, Provider, ProviderConfig, RpcClient};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Reads `expected` request frames, then answers them in reverse order with
/// `{"result": <method>}`.
fn spawn_reversing_node(
    mut requests: mpsc::UnboundedReceiver<String>,
    responses: mpsc::UnboundedSender<String>,
    expected: usize,
) -> tokio::task::JoinHandle<Vec<u64>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while seen.len() < expected {
            let frame = requests.recv().await.unwrap();
            seen.push(serde_json::from_str::<Value>(&frame).unwrap());
        }
        for request in seen.iter().rev() {
            responses
                .send(json!({"jsonrpc": "2.0", "id": request["id"], "result": request["method"]}).to_string())
                .unwrap();
        }
        seen.iter().map(|r| r["id"].as_u64().unwrap()).collect()
    })
}

fn connect() -> (DuplexTransport, mpsc::UnboundedReceiver<String>, mpsc::UnboundedSender<String>) {
    let (to_node, node_inbox) = mpsc::unbounded_channel();
    let (node_outbox, from_node) = mpsc::unbounded_channel();
    (
        DuplexTransport::new(to_node, from_node, Duration::from_secs(10)),
        node_inbox,
        node_outbox,
    )
}

#[tokio::test]
async fn concurrent_calls_are_routed_by_id() {
    let (transport, node_inbox, node_outbox) = connect();
    let node = spawn_reversing_node(node_inbox, node_outbox, 2);
    let client = RpcClient::new(transport);

    let (first, second) = tokio::join!(
        client.call("first_method", json!([])),
        client.call("second_method", json!([]))
    );
    assert_eq!(first.unwrap(), json!("first_method"));
    assert_eq!(second.unwrap(), json!("second_method"));

    let mut ids = node.await.unwrap();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn many_in_flight_requests() {
    let (transport, node_inbox, node_outbox) = connect();
    let node = spawn_reversing_node(node_inbox, node_outbox, 16);
    let client = RpcClient::new(transport);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move { client.call(&format!("m{i}"), json!([])).await })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), json!(format!("m{i}")));
    }
    node.await.unwrap();
}

#[tokio::test]
async fn provider_over_duplex_connection() {
    let (transport, mut node_inbox, node_outbox) = connect();
    tokio::spawn(async move {
        while let Some(frame) = node_inbox.recv().await {
            let request: Value = serde_json::from_str(&frame).unwrap();
            let result = match request["method"].as_str() {
                Some("eth_blockNumber") => json!("0x2a"),
                _ => json!(null),
            };
            let _ = node_outbox.send(json!({"id": request["id"], "result": result}).to_string());
        }
    });

    let provider = Provider::with_transport(ProviderConfig::new("ws://node", 1), transport);
    assert_eq!(provider.get_block_number().await.unwrap(), 42);
}

#[tokio::test]
async fn providers_sharing_a_connection_get_their_own_answers() {
    let (transport, mut node_inbox, node_outbox) = connect();
    tokio::spawn(async move {
        // Both requests are in flight before either is answered, newest first.
        let mut requests = Vec::new();
        while requests.len() < 2 {
            let frame = node_inbox.recv().await.unwrap();
            requests.push(serde_json::from_str::<Value>(&frame).unwrap());
        }
        for request in requests.iter().rev() {
            let result = match request["method"].as_str() {
                Some("eth_getBalance") => json!("0x3e8"),
                Some("eth_blockNumber") => json!("0x2a"),
                _ => json!(null),
            };
            node_outbox
                .send(json!({"id": request["id"], "result": result}).to_string())
                .unwrap();
        }
    });

    let shared = Arc::new(transport);
    let a = Provider::with_transport(ProviderConfig::new("ws://node", 1), shared.clone());
    let b = Provider::with_transport(ProviderConfig::new("ws://node", 1), shared.clone());

    let (balance, block_number) = tokio::join!(
        a.get_balance(Address::ZERO, BlockTag::Latest),
        b.get_block_number()
    );
    assert_eq!(balance.unwrap(), U256::from(1000));
    assert_eq!(block_number.unwrap(), 42);
    assert_eq!(shared.in_flight(), 0);
}
