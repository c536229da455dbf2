use alloy_primitives::B256;
use tracing::{debug, warn};

use crate::config::WaitOptions;
use crate::error::ClientError;
use crate::provider::Provider;
use crate::types::TransactionReceipt;

/// A submitted transaction that may not be mined yet.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    hash: B256,
    provider: Provider,
}

impl PendingTransaction {
    pub fn new(hash: B256, provider: Provider) -> Self {
        Self { hash, provider }
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    /// Polls for the receipt until the transaction has `confirmations`
    /// blocks on top of it (its own block counts as the first).
    ///
    /// Fails with `TransactionReverted` when the receipt reports failure and
    /// with `TransactionTimeout` when `options.timeout` elapses first. Timing
    /// out leaves the transaction itself untouched. Transport errors while
    /// polling are retried on the next tick; node errors are returned.
    pub async fn wait(&self, options: WaitOptions) -> Result<TransactionReceipt, ClientError> {
        match options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.poll_until_mined(options))
                .await
                .map_err(|_| {
                    warn!(hash = %self.hash, ?limit, "gave up waiting for receipt");
                    ClientError::TransactionTimeout(self.hash)
                })?,
            None => self.poll_until_mined(options).await,
        }
    }

    async fn poll_until_mined(&self, options: WaitOptions) -> Result<TransactionReceipt, ClientError> {
        let mut ticker = tokio::time::interval(options.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.check(options.confirmations).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) if e.is_transport() => warn!(hash = %self.hash, error = %e, "receipt poll failed"),
                Err(e) => return Err(e),
            }
        }
    }

    async fn check(&self, confirmations: u64) -> Result<Option<TransactionReceipt>, ClientError> {
        let Some(receipt) = self.provider.get_transaction_receipt(self.hash).await? else {
            debug!(hash = %self.hash, "no receipt yet");
            return Ok(None);
        };

        if !receipt.succeeded() {
            return Err(ClientError::TransactionReverted {
                hash: self.hash,
                block: receipt.block_number,
                receipt: Box::new(receipt),
            });
        }

        if confirmations > 1 {
            if let Some(mined_in) = receipt.block_number {
                let head = self.provider.get_block_number().await?;
                let depth = head.saturating_sub(mined_in) + 1;
                if depth < confirmations {
                    debug!(hash = %self.hash, depth, confirmations, "waiting for confirmations");
                    return Ok(None);
                }
            }
        }
        Ok(Some(receipt))
    }
}
