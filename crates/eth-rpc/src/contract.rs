//! Typed bindings for a deployed contract: reads, writes, simulations,
//! event filters and event listeners.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::{Address, Bytes};
use eth_core::abi::{
    decode_function_result, decode_log, encode_event_topics, encode_function_call, AbiEvent, AbiFunction,
    AbiValue, ContractAbi, DecodedEvent, TopicArg,
};
use eth_core::log::{BlockTag, Filter, Log, TopicFilter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Overrides;
use crate::error::ClientError;
use crate::pending::PendingTransaction;
use crate::provider::Provider;
use crate::signer::Signer;
use crate::subscription::{ListenerId, ListenerResult, PollOutcome, PollingSubscription};

/// A decoded event together with the log it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractEvent {
    pub event: DecodedEvent,
    pub log: Log,
}

/// Identifies a listener registered through [`Contract::on`],
/// [`Contract::on_filter`] or their `once` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventListener {
    slot: usize,
    id: ListenerId,
}

/// One polling subscription per distinct filter. Slots are never removed,
/// so an [`EventListener`] keeps pointing at its subscription.
type Subscriptions = Arc<Mutex<Vec<(Filter, Arc<PollingSubscription>)>>>;

/// An address and ABI bound to a provider, and optionally a signer.
///
/// Bindings are cheap to clone. Clones share the listener registry.
#[derive(Clone)]
pub struct Contract {
    address: Address,
    abi: Arc<ContractAbi>,
    provider: Provider,
    signer: Option<Signer>,
    subscriptions: Subscriptions,
}

impl Contract {
    /// A read-only binding.
    pub fn new(address: Address, abi: ContractAbi, provider: Provider) -> Self {
        Self {
            address,
            abi: Arc::new(abi),
            provider,
            signer: None,
            subscriptions: Arc::default(),
        }
    }

    /// A writable binding at the same address. Writes go through `signer`,
    /// reads through the signer's provider. Listeners are not carried over.
    pub fn connect(&self, signer: Signer) -> Self {
        Self {
            address: self.address,
            abi: self.abi.clone(),
            provider: signer.provider().clone(),
            signer: Some(signer),
            subscriptions: Arc::default(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    fn function(&self, key: &str, arg_count: usize) -> Result<&AbiFunction, ClientError> {
        self.abi
            .function_for_args(key, arg_count)
            .ok_or_else(|| ClientError::UnknownFunction(key.to_string()))
    }

    fn event(&self, key: &str) -> Result<&AbiEvent, ClientError> {
        self.abi
            .event(key)
            .ok_or_else(|| ClientError::UnknownEvent(key.to_string()))
    }

    /// Calldata for `function(args)`. `function` is a name, a full
    /// signature or a `0x` selector.
    pub fn encode_function_data(&self, function: &str, args: &[AbiValue]) -> Result<Bytes, ClientError> {
        let function = self.function(function, args.len())?;
        Ok(encode_function_call(function, args)?.into())
    }

    pub fn decode_function_result(&self, function: &str, data: &[u8]) -> Result<Vec<AbiValue>, ClientError> {
        let function = self
            .abi
            .function(function)
            .ok_or_else(|| ClientError::UnknownFunction(function.to_string()))?;
        Ok(decode_function_result(function, data)?)
    }

    /// Reads `function(args)` with `eth_call` and decodes its outputs.
    ///
    /// Honours `from`, `value`, gas fields and `block` from `overrides`.
    pub async fn call(&self, function: &str, args: &[AbiValue], overrides: Overrides) -> Result<Vec<AbiValue>, ClientError> {
        let abi_function = self.function(function, args.len())?;
        let data = encode_function_call(abi_function, args)?;
        let tx = overrides.to_request(self.address, data.into());

        debug!(contract = %self.address, function = %abi_function.signature(), "contract call");
        let returned = self.provider.call(&tx, overrides.block_or_latest()).await?;
        Ok(decode_function_result(abi_function, &returned)?)
    }

    /// Runs a state-changing function through `eth_call` and returns what
    /// it would return, without sending a transaction. A revert surfaces as
    /// the node's `Rpc` error.
    ///
    /// `from` defaults to the connected signer's address.
    pub async fn simulate(&self, function: &str, args: &[AbiValue], overrides: Overrides) -> Result<Vec<AbiValue>, ClientError> {
        let mut overrides = overrides;
        if overrides.from.is_none() {
            overrides.from = self.signer.as_ref().map(Signer::address);
        }
        self.call(function, args, overrides).await
    }

    /// Sends `function(args)` as a transaction from the connected signer.
    pub async fn send(&self, function: &str, args: &[AbiValue], overrides: Overrides) -> Result<PendingTransaction, ClientError> {
        let signer = self.signer.as_ref().ok_or(ClientError::MissingSigner)?;
        let abi_function = self.function(function, args.len())?;
        let data = encode_function_call(abi_function, args)?;

        info!(contract = %self.address, function = %abi_function.signature(), "contract send");
        signer
            .send_transaction(overrides.to_request(self.address, data.into()))
            .await
    }

    /// A filter for `event` logs of this contract.
    ///
    /// `args` are positional over the event's inputs; each is a value, `Any`
    /// or a list of alternatives. Only indexed inputs may be constrained.
    pub fn filter(&self, event: &str, args: &[TopicArg]) -> Result<Filter, ClientError> {
        let event = self.event(event)?;
        Ok(Filter::new()
            .address(self.address)
            .topics(encode_event_topics(event, args)?))
    }

    /// Fetches the logs matching `filter` in `[from, to]` and decodes each
    /// against this contract's events. Logs of unknown events are skipped.
    pub async fn query_filter(
        &self,
        filter: &Filter,
        from: impl Into<BlockTag>,
        to: impl Into<BlockTag>,
    ) -> Result<Vec<ContractEvent>, ClientError> {
        let logs = self
            .provider
            .get_logs(&filter.with_range(from.into(), to.into()))
            .await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            let Some(event) = log.topics.first().and_then(|t| self.abi.event_by_topic(t)) else {
                debug!(block = ?log.block_number, "skipping log of unknown event");
                continue;
            };
            match decode_log(event, &log) {
                Ok(decoded) => events.push(ContractEvent { event: decoded, log }),
                Err(e) => warn!(
                    event = %event.name,
                    block = ?log.block_number,
                    index = ?log.log_index,
                    error = %e,
                    "skipping undecodable log"
                ),
            }
        }
        Ok(events)
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<(Filter, Arc<PollingSubscription>)>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn subscription_for(&self, filter: Filter) -> (usize, Arc<PollingSubscription>) {
        let mut subscriptions = self.subscriptions();
        if let Some(slot) = subscriptions.iter().position(|(f, _)| *f == filter) {
            return (slot, subscriptions[slot].1.clone());
        }
        let subscription = Arc::new(PollingSubscription::new(self.provider.clone(), filter.clone()));
        subscriptions.push((filter, subscription.clone()));
        (subscriptions.len() - 1, subscription)
    }

    fn listen<F>(&self, filter: Filter, once: bool, listener: F) -> EventListener
    where
        F: Fn(&DecodedEvent, &Log) -> ListenerResult + Send + Sync + 'static,
    {
        let filter = if filter.address.is_some() {
            filter
        } else {
            filter.address(self.address)
        };
        let (slot, subscription) = self.subscription_for(filter);

        let abi = self.abi.clone();
        let decode_then_call = move |log: &Log| -> ListenerResult {
            let Some(event) = log.topics.first().and_then(|t| abi.event_by_topic(t)) else {
                debug!(block = ?log.block_number, "skipping log of unknown event");
                return Ok(());
            };
            let decoded = decode_log(event, log)?;
            listener(&decoded, log)
        };
        let id = if once {
            subscription.once(decode_then_call)
        } else {
            subscription.on(decode_then_call)
        };
        EventListener { slot, id }
    }

    fn event_filter(&self, event: &str) -> Result<Filter, ClientError> {
        let topic0 = self.event(event)?.topic0();
        Ok(Filter::new().address(self.address).event_signature(topic0))
    }

    /// Calls `listener` for every new `event` log, starting with blocks
    /// mined after the first poll.
    pub fn on<F>(&self, event: &str, listener: F) -> Result<EventListener, ClientError>
    where
        F: Fn(&DecodedEvent, &Log) -> ListenerResult + Send + Sync + 'static,
    {
        Ok(self.listen(self.event_filter(event)?, false, listener))
    }

    /// Like [`on`](Self::on), removed after the first delivery.
    pub fn once<F>(&self, event: &str, listener: F) -> Result<EventListener, ClientError>
    where
        F: Fn(&DecodedEvent, &Log) -> ListenerResult + Send + Sync + 'static,
    {
        Ok(self.listen(self.event_filter(event)?, true, listener))
    }

    /// Calls `listener` for every new log matching `filter`, usually one
    /// built with [`filter`](Self::filter). A filter without an address is
    /// scoped to this contract. Logs of events missing from the ABI are
    /// skipped.
    pub fn on_filter<F>(&self, filter: Filter, listener: F) -> EventListener
    where
        F: Fn(&DecodedEvent, &Log) -> ListenerResult + Send + Sync + 'static,
    {
        self.listen(filter, false, listener)
    }

    pub fn once_filter<F>(&self, filter: Filter, listener: F) -> EventListener
    where
        F: Fn(&DecodedEvent, &Log) -> ListenerResult + Send + Sync + 'static,
    {
        self.listen(filter, true, listener)
    }

    pub fn off(&self, listener: EventListener) -> bool {
        self.subscriptions()
            .get(listener.slot)
            .is_some_and(|(_, s)| s.off(listener.id))
    }

    /// Subscriptions whose filter selects `event` as its first topic, or
    /// all of them when `None`.
    fn selected(&self, event: Option<&str>) -> Result<Vec<Arc<PollingSubscription>>, ClientError> {
        let topic0 = event.map(|key| self.event(key).map(AbiEvent::topic0)).transpose()?;
        Ok(self
            .subscriptions()
            .iter()
            .filter(|(filter, _)| match topic0 {
                Some(topic0) => filter.topics.first() == Some(&TopicFilter::Exact(topic0)),
                None => true,
            })
            .map(|(_, s)| s.clone())
            .collect())
    }

    /// Listeners for `event`, or for all events when `None`.
    pub fn listener_count(&self, event: Option<&str>) -> Result<usize, ClientError> {
        Ok(self.selected(event)?.iter().map(|s| s.listener_count()).sum())
    }

    /// Drops the listeners for `event`, or every listener when `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) -> Result<(), ClientError> {
        self.selected(event)?
            .iter()
            .for_each(|s| s.remove_all_listeners());
        Ok(())
    }

    /// Runs one polling cycle for every event that has a subscription.
    /// Events are polled independently; a failing event does not stop the
    /// others.
    pub async fn poll_events(&self) -> Vec<Result<PollOutcome, ClientError>> {
        let snapshot: Vec<Arc<PollingSubscription>> = self.subscriptions().iter().map(|(_, s)| s.clone()).collect();
        let mut outcomes = Vec::with_capacity(snapshot.len());
        for subscription in snapshot {
            outcomes.push(subscription.poll_once().await);
        }
        outcomes
    }

    /// Polls all event subscriptions every `poll_interval` until `shutdown`
    /// is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let interval = self.provider.config().poll_interval;
        info!(contract = %self.address, "contract event loop starting");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            for outcome in self.poll_events().await {
                if let Err(e) = outcome {
                    warn!(contract = %self.address, error = %e, "event poll failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = shutdown.cancelled() => break,
            }
        }
        info!(contract = %self.address, "contract event loop stopped");
    }
}

impl std::fmt::Debug for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contract")
            .field("address", &self.address)
            .field("functions", &self.abi.functions.len())
            .field("events", &self.abi.events.len())
            .field("signer", &self.signer.as_ref().map(Signer::address))
            .finish()
    }
}
