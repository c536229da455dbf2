//! Transport for persistent, message-oriented connections (WebSocket style)
//! where any number of requests are in flight and responses come back in
//! whatever order the node produces them.
//!
//! Callers' request ids are swapped for ids unique to the connection before
//! a frame goes out, so several clients may share one transport.
//!
//! The socket itself stays outside this crate: the caller pumps outgoing
//! frames from one channel to the socket and incoming frames from the socket
//! into another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::transport::{response_id, Transport};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

pub struct DuplexTransport {
    outbound: mpsc::UnboundedSender<String>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    next_wire_id: AtomicU64,
    request_timeout: Duration,
    reader: JoinHandle<()>,
}

impl DuplexTransport {
    /// Spawns the reader task that routes incoming frames to their callers.
    /// Must be called from within a tokio runtime.
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<String>,
        request_timeout: Duration,
    ) -> Self {
        let pending: Pending = Arc::default();
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(inbound, pending.clone(), closed.clone()));
        Self {
            outbound,
            pending,
            closed,
            next_wire_id: AtomicU64::new(1),
            request_timeout,
            reader,
        }
    }

    /// Number of requests still waiting for a response.
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    fn forget(&self, ids: &[u64]) {
        let mut pending = lock(&self.pending);
        for id in ids {
            pending.remove(id);
        }
    }
}

impl Drop for DuplexTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl Transport for DuplexTransport {
    async fn send(&self, mut message: Value) -> Result<Value, ClientError> {
        let is_batch = message.is_array();
        let caller_ids: Vec<u64> = match &message {
            Value::Array(requests) => requests.iter().map(response_id).collect::<Option<_>>(),
            request => response_id(request).map(|id| vec![id]),
        }
        .ok_or_else(|| ClientError::Transport("request without a numeric id".into()))?;

        let ids: Vec<u64> = caller_ids
            .iter()
            .map(|_| self.next_wire_id.fetch_add(1, Ordering::Relaxed))
            .collect();
        match &mut message {
            Value::Array(requests) => requests.iter_mut().zip(&ids).for_each(|(r, id)| set_id(r, *id)),
            request => set_id(request, ids[0]),
        }

        let receivers: Vec<oneshot::Receiver<Value>> = {
            let mut pending = lock(&self.pending);
            ids.iter()
                .map(|id| {
                    let (tx, rx) = oneshot::channel();
                    pending.insert(*id, tx);
                    rx
                })
                .collect()
        };

        if self.closed.load(Ordering::SeqCst) || self.outbound.send(message.to_string()).is_err() {
            self.forget(&ids);
            return Err(ClientError::Transport("connection closed".into()));
        }

        let collect = async {
            let mut responses = Vec::with_capacity(receivers.len());
            for rx in receivers {
                responses.push(
                    rx.await
                        .map_err(|_| ClientError::Transport("connection closed".into()))?,
                );
            }
            Ok::<_, ClientError>(responses)
        };

        let mut responses = match tokio::time::timeout(self.request_timeout, collect).await {
            Ok(result) => result?,
            Err(_) => {
                self.forget(&ids);
                warn!(?ids, "duplex request timed out");
                return Err(ClientError::Transport(format!(
                    "request timed out after {:?}",
                    self.request_timeout
                )));
            }
        };

        for (response, id) in responses.iter_mut().zip(&caller_ids) {
            set_id(response, *id);
        }

        if is_batch {
            Ok(Value::Array(responses))
        } else {
            responses
                .pop()
                .ok_or_else(|| ClientError::InvalidResponse("empty response".into()))
        }
    }
}

async fn read_loop(mut inbound: mpsc::UnboundedReceiver<String>, pending: Pending, closed: Arc<AtomicBool>) {
    while let Some(frame) = inbound.recv().await {
        match serde_json::from_str::<Value>(&frame) {
            Ok(Value::Array(responses)) => responses.into_iter().for_each(|r| dispatch(&pending, r)),
            Ok(response) => dispatch(&pending, response),
            Err(e) => warn!(error = %e, "dropping malformed frame"),
        }
    }
    debug!("duplex connection closed");
    closed.store(true, Ordering::SeqCst);
    // Dropping the senders wakes every waiting caller with an error.
    lock(&pending).clear();
}

fn dispatch(pending: &Pending, response: Value) {
    let Some(id) = response_id(&response) else {
        debug!("dropping frame without id");
        return;
    };
    match lock(pending).remove(&id) {
        Some(tx) => {
            let _ = tx.send(response);
        }
        None => debug!(id, "no caller waiting for response"),
    }
}

fn set_id(message: &mut Value, id: u64) {
    if let Some(object) = message.as_object_mut() {
        object.insert("id".into(), json!(id));
    }
}

fn lock(pending: &Pending) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<Value>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
