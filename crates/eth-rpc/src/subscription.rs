//! Log polling with an ordered listener registry.
//!
//! Each cycle asks the node for the logs in `(last_seen, head]`, delivers
//! them in `(block_number, log_index)` order to every listener registered
//! when the cycle started, then advances `last_seen` to the head. A failed
//! `eth_getLogs` or `eth_blockNumber` leaves the cursor where it was, so the
//! same range is retried on the next cycle.

use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use eth_core::log::{BlockTag, Filter, Log};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::provider::Provider;

/// What a listener returns. An `Err` is logged for that log and listener
/// only; delivery to other listeners continues.
pub type ListenerResult = Result<(), Box<dyn Error + Send + Sync>>;

type Listener = Arc<dyn Fn(&Log) -> ListenerResult + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

#[derive(Clone)]
struct Entry {
    id: ListenerId,
    once: bool,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Result of one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Inclusive block range that was queried, if any.
    pub range: Option<(u64, u64)>,
    pub logs: usize,
    /// Successful listener invocations.
    pub delivered: usize,
    pub failures: usize,
}

pub struct PollingSubscription {
    provider: Provider,
    filter: Filter,
    poll_interval: Duration,
    registry: Mutex<Registry>,
    /// First block not yet delivered; `None` until the first cycle. Held
    /// for the whole cycle, which also serializes concurrent polls.
    next_block: tokio::sync::Mutex<Option<u64>>,
}

impl PollingSubscription {
    /// Watches `filter` from the next block the node produces. The filter's
    /// own block range is replaced on every cycle.
    pub fn new(provider: Provider, filter: Filter) -> Self {
        let poll_interval = provider.config().poll_interval;
        Self {
            provider,
            filter,
            poll_interval,
            registry: Mutex::default(),
            next_block: tokio::sync::Mutex::new(None),
        }
    }

    /// Starts delivery at `block` instead of at the current head.
    pub fn starting_at(mut self, block: u64) -> Self {
        self.next_block = tokio::sync::Mutex::new(Some(block));
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Registers a listener for every matching log.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Log) -> ListenerResult + Send + Sync + 'static,
    {
        self.register(Arc::new(listener), false)
    }

    /// Registers a listener that is removed after its first delivery.
    pub fn once<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Log) -> ListenerResult + Send + Sync + 'static,
    {
        self.register(Arc::new(listener), true)
    }

    fn register(&self, listener: Listener, once: bool) -> ListenerId {
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry.entries.push(Entry { id, once, listener });
        debug!(%id, once, "listener registered");
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut registry = self.registry();
        let before = registry.entries.len();
        registry.entries.retain(|e| e.id != id);
        registry.entries.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.registry().entries.len()
    }

    pub fn remove_all_listeners(&self) {
        self.registry().entries.clear();
    }

    /// Last block whose logs were delivered, once the first cycle has run.
    pub async fn last_seen_block(&self) -> Option<u64> {
        let next_block = *self.next_block.lock().await;
        next_block.and_then(|next| next.checked_sub(1))
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.registry().entries.iter().any(|e| e.id == id)
    }

    /// Runs one cycle. On error nothing was delivered and the cursor is
    /// unchanged.
    pub async fn poll_once(&self) -> Result<PollOutcome, ClientError> {
        let mut next_block = self.next_block.lock().await;
        let head = self.provider.get_block_number().await?;

        let from = match *next_block {
            None => {
                debug!(head, "subscription starts after current head");
                *next_block = Some(head + 1);
                return Ok(PollOutcome::default());
            }
            Some(next) if next > head => return Ok(PollOutcome::default()),
            Some(next) => next,
        };

        let range_filter = self
            .filter
            .with_range(BlockTag::Number(from), BlockTag::Number(head));
        let mut logs: Vec<Log> = self
            .provider
            .get_logs(&range_filter)
            .await?
            .into_iter()
            .filter(|log| !log.removed && self.filter.matches(log))
            .collect();
        logs.sort_by_key(Log::position);

        let snapshot: Vec<Entry> = self.registry().entries.clone();
        let mut outcome = PollOutcome {
            range: Some((from, head)),
            logs: logs.len(),
            ..PollOutcome::default()
        };

        for log in &logs {
            for entry in &snapshot {
                // Skips listeners removed earlier in this cycle, including
                // fire-once listeners that already fired.
                if !self.is_registered(entry.id) {
                    continue;
                }
                if entry.once {
                    self.off(entry.id);
                }
                match (entry.listener)(log) {
                    Ok(()) => outcome.delivered += 1,
                    Err(e) => {
                        outcome.failures += 1;
                        warn!(
                            listener = %entry.id,
                            block = ?log.block_number,
                            log_index = ?log.log_index,
                            error = %e,
                            "listener failed"
                        );
                    }
                }
            }
        }

        *next_block = Some(head + 1);
        debug!(from, to = head, logs = outcome.logs, delivered = outcome.delivered, "poll cycle complete");
        Ok(outcome)
    }

    /// Polls every `poll_interval` until `shutdown` is cancelled. Failed
    /// cycles are logged and retried on the next tick.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval_ms = self.poll_interval.as_millis() as u64, "log subscription starting");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if let Err(e) = self.poll_once().await {
                warn!(error = %e, "poll cycle failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => break,
            }
        }
        info!("log subscription stopped");
    }
}

impl fmt::Debug for PollingSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingSubscription")
            .field("filter", &self.filter)
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}
