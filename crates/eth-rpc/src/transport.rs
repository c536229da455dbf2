//! JSON-RPC request/response correlation over a pluggable [`Transport`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ClientError;

/// Moves one JSON-RPC message to the node and returns its answer.
///
/// `message` is either a single request object or a batch array. For a
/// request object the answer is the matching response object; for a batch
/// it is an array holding one response per request, in any order.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: Value) -> Result<Value, ClientError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, message: Value) -> Result<Value, ClientError> {
        (**self).send(message).await
    }
}

/// Assigns request ids and unwraps `result`/`error` responses.
///
/// Ids increase monotonically per client, starting at 1. The client holds no
/// other mutable state, so one instance can serve any number of concurrent
/// callers.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Calls `method` and returns the raw `result` value.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_id();
        debug!(method, id, "rpc request");

        let response = self
            .transport
            .send(request_object(id, method, params))
            .await
            .inspect_err(|e| warn!(method, id, error = %e, "rpc transport failure"))?;

        match response_id(&response) {
            Some(got) if got == id => {}
            got => {
                return Err(ClientError::InvalidResponse(format!(
                    "expected response id {id}, got {got:?}"
                )))
            }
        }
        into_result(response)
    }

    /// Calls `method` and deserializes the result.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ClientError> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| ClientError::InvalidResponse(format!("{method}: {e}")))
    }

    /// Sends several calls as one batch message.
    ///
    /// Responses are matched back to their calls by id, whatever order the
    /// node returns them in. Each call succeeds or fails on its own.
    pub async fn batch(&self, calls: &[(&str, Value)]) -> Result<Vec<Result<Value, ClientError>>, ClientError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<u64> = calls.iter().map(|_| self.next_id()).collect();
        let message = Value::Array(
            calls
                .iter()
                .zip(&ids)
                .map(|((method, params), id)| request_object(*id, method, params.clone()))
                .collect(),
        );
        debug!(size = calls.len(), first_id = ids[0], "rpc batch");

        let response = self
            .transport
            .send(message)
            .await
            .inspect_err(|e| warn!(size = calls.len(), error = %e, "rpc batch transport failure"))?;

        let Value::Array(responses) = response else {
            return Err(ClientError::InvalidResponse("batch response is not an array".into()));
        };

        let mut by_id: HashMap<u64, Value> = responses
            .into_iter()
            .filter_map(|r| response_id(&r).map(|id| (id, r)))
            .collect();

        Ok(ids
            .iter()
            .map(|id| {
                by_id
                    .remove(id)
                    .ok_or_else(|| ClientError::InvalidResponse(format!("no response for id {id}")))
                    .and_then(into_result)
            })
            .collect())
    }
}

fn request_object(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Numeric id of a response object. String ids holding digits are accepted.
pub(crate) fn response_id(response: &Value) -> Option<u64> {
    match response.get("id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn into_result(mut response: Value) -> Result<Value, ClientError> {
    if let Some(error) = response.get_mut("error").filter(|e| !e.is_null()) {
        return Err(ClientError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            data: error.get_mut("data").map(Value::take),
        });
    }
    match response.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(ClientError::InvalidResponse(
            "response has neither result nor error".into(),
        )),
    }
}
