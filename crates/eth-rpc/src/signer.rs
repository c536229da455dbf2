use alloy_primitives::Address;
use eth_core::log::BlockTag;
use eth_core::transaction::{Signature, SignedTransaction, TransactionRequest};
use eth_wallet::Wallet;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::pending::PendingTransaction;
use crate::provider::Provider;

/// A wallet bound to a provider: fills in, signs and submits transactions.
#[derive(Debug, Clone)]
pub struct Signer {
    wallet: Wallet,
    provider: Provider,
}

impl Signer {
    pub fn new(wallet: Wallet, provider: Provider) -> Self {
        Self { wallet, provider }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn chain_id(&self) -> u64 {
        self.provider.config().chain_id
    }

    /// Signs `tx` without touching the network. A missing chain id is taken
    /// from the provider configuration; every other field must be set.
    pub fn sign_transaction(&self, tx: &TransactionRequest) -> Result<SignedTransaction, ClientError> {
        let mut tx = tx.clone();
        tx.chain_id.get_or_insert(self.chain_id());
        Ok(self.wallet.sign_transaction(&tx)?)
    }

    /// EIP-191 personal message signature.
    pub fn sign_message(&self, message: impl AsRef<[u8]>) -> Result<Signature, ClientError> {
        Ok(self.wallet.sign_message(message)?)
    }

    /// Fills every unset field of `tx` from the node.
    ///
    /// - `from`, `chain_id`: this signer
    /// - `nonce`: pending transaction count
    /// - fees: `Provider::get_fee_data`. A lone EIP-1559 field gets its
    ///   counterpart from the same fee data.
    /// - `gas_limit`: `eth_estimateGas` on the request as filled so far
    pub async fn populate(&self, tx: TransactionRequest) -> Result<TransactionRequest, ClientError> {
        let mut tx = tx;
        tx.from.get_or_insert(self.address());
        tx.chain_id.get_or_insert(self.chain_id());

        if tx.nonce.is_none() {
            tx.nonce = Some(
                self.provider
                    .get_transaction_count(self.address(), BlockTag::Pending)
                    .await?,
            );
        }

        let has_legacy_fee = tx.gas_price.is_some();
        let has_all_1559_fees = tx.max_fee_per_gas.is_some() && tx.max_priority_fee_per_gas.is_some();
        if !has_legacy_fee && !has_all_1559_fees {
            let fees = self.provider.get_fee_data().await?;
            if tx.is_eip1559() || fees.is_eip1559() {
                // Legacy-only fee data still prices a forced type-2 request.
                let fallback = fees.gas_price.unwrap_or_default();
                tx.max_fee_per_gas
                    .get_or_insert(fees.max_fee_per_gas.unwrap_or(fallback));
                tx.max_priority_fee_per_gas
                    .get_or_insert(fees.max_priority_fee_per_gas.unwrap_or(fallback));
            } else {
                tx.gas_price = fees.gas_price;
            }
        }

        if tx.gas_limit.is_none() {
            tx.gas_limit = Some(self.provider.estimate_gas(&tx).await?);
        }

        debug!(
            nonce = ?tx.nonce,
            gas_limit = ?tx.gas_limit,
            eip1559 = tx.is_eip1559(),
            "populated transaction"
        );
        Ok(tx)
    }

    /// Populates, signs and submits `tx`.
    pub async fn send_transaction(&self, tx: TransactionRequest) -> Result<PendingTransaction, ClientError> {
        let tx = self.populate(tx).await?;
        let signed = self.wallet.sign_transaction(&tx)?;
        let hash = self.provider.send_raw_transaction(&signed.raw).await?;
        if hash != signed.hash {
            return Err(ClientError::InvalidResponse(format!(
                "node returned hash {hash}, expected {}",
                signed.hash
            )));
        }

        info!(
            %hash,
            from = %self.address(),
            to = ?tx.to,
            nonce = ?tx.nonce,
            "transaction submitted"
        );
        Ok(PendingTransaction::new(hash, self.provider.clone()))
    }
}
