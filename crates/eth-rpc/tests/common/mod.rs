//! Scripted in-process node for RPC-level tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eth_core::{Address, B256, U256};
use eth_rpc::{ClientError, Provider, ProviderConfig, Transport};
use serde_json::{json, Value};

type Responder = Arc<dyn Fn(&Value) -> Result<Value, (i64, String)> + Send + Sync>;

#[derive(Clone)]
enum Reply {
    Result(Value),
    Error(i64, String),
    Disconnected,
    With(Responder),
}

/// Answers each method from its own queue. The last queued reply for a
/// method is repeated once the queue is down to it.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: &str, reply: Reply) {
        self.scripts
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn reply(&self, method: &str, result: Value) -> &Self {
        self.push(method, Reply::Result(result));
        self
    }

    pub fn reply_error(&self, method: &str, code: i64, message: &str) -> &Self {
        self.push(method, Reply::Error(code, message.to_string()));
        self
    }

    pub fn disconnect(&self, method: &str) -> &Self {
        self.push(method, Reply::Disconnected);
        self
    }

    pub fn reply_with<F>(&self, method: &str, responder: F) -> &Self
    where
        F: Fn(&Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
    {
        self.push(method, Reply::With(Arc::new(responder)));
        self
    }

    /// Params of every request for `method`, in order.
    pub fn params(&self, method: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.params(method).len()
    }

    fn answer(&self, request: &Value) -> Result<Value, ClientError> {
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let params = request["params"].clone();
        self.requests.lock().unwrap().push((method.clone(), params.clone()));

        let reply = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&method) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        let outcome = match reply {
            Some(Reply::Result(v)) => Ok(v),
            Some(Reply::Error(code, message)) => Err((code, message)),
            Some(Reply::With(f)) => f(&params),
            Some(Reply::Disconnected) => return Err(ClientError::Transport("connection reset".into())),
            None => Err((-32601, format!("the method {method} does not exist"))),
        };

        Ok(match outcome {
            Ok(result) => json!({"jsonrpc": "2.0", "id": request["id"], "result": result}),
            Err((code, message)) => {
                json!({"jsonrpc": "2.0", "id": request["id"], "error": {"code": code, "message": message}})
            }
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, message: Value) -> Result<Value, ClientError> {
        match &message {
            Value::Array(requests) => requests
                .iter()
                .map(|r| self.answer(r))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            request => self.answer(request),
        }
    }
}

pub const CHAIN_ID: u64 = 31_337;

pub fn provider(mock: &Arc<MockTransport>) -> Provider {
    let config = ProviderConfig::new("mock://node", CHAIN_ID).with_poll_interval(Duration::from_secs(1));
    Provider::with_transport(config, mock.clone())
}

pub fn quantity(n: u64) -> Value {
    json!(format!("{n:#x}"))
}

pub fn word(value: U256) -> String {
    format!("0x{}", hex::encode(value.to_be_bytes::<32>()))
}

pub fn address_word(address: Address) -> String {
    format!("0x{}", hex::encode(B256::left_padding_from(address.as_slice())))
}

pub fn log_json(address: Address, topics: &[B256], data: &str, block: u64, index: u64) -> Value {
    json!({
        "address": address,
        "topics": topics,
        "data": data,
        "blockNumber": quantity(block),
        "blockHash": B256::repeat_byte(block as u8),
        "transactionHash": B256::repeat_byte(0xee),
        "transactionIndex": "0x0",
        "logIndex": quantity(index),
        "removed": false
    })
}

pub fn receipt_json(hash: B256, block: u64, status: u64) -> Value {
    json!({
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": B256::repeat_byte(0x0b),
        "blockNumber": quantity(block),
        "gasUsed": "0x5208",
        "cumulativeGasUsed": "0x5208",
        "effectiveGasPrice": "0x3b9aca00",
        "status": quantity(status),
        "logs": []
    })
}
