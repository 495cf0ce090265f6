//! Chain RPC connections used to confirm transactions.
//!
//! # Responsibilities
//! - Connect to a JSON-RPC endpoint per chain
//! - Poll for transaction receipts until the required depth is reached
//! - Tolerate transient RPC errors while polling, up to a consecutive budget

use alloy::primitives::TxHash;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use futures_util::future::{BoxFuture, FutureExt};
use std::time::Duration;
use tokio::time::interval;

use crate::chain::types::{ChainError, ChainResult, TxConfirmation};
use crate::config::ConfirmationConfig;

/// A live connection to one chain.
///
/// The wait is unbounded; callers impose their own deadline.
pub trait ChainProvider: Send + Sync {
    /// Chain this connection talks to.
    fn chain_id(&self) -> u64;

    /// Resolve once `tx_hash` is confirmed.
    fn wait_for_transaction(&self, tx_hash: TxHash) -> BoxFuture<'_, ChainResult<TxConfirmation>>;
}

/// JSON-RPC provider backed by alloy.
#[derive(Clone)]
pub struct AlloyChainProvider {
    provider: DynProvider,
    chain_id: u64,
    rpc_url: String,
    poll_interval: Duration,
    confirmations: u32,
    max_rpc_failures: u32,
}

impl AlloyChainProvider {
    /// Build a provider for `rpc_url`. Does not contact the endpoint.
    pub fn connect(
        chain_id: u64,
        rpc_url: &str,
        confirmation: &ConfirmationConfig,
    ) -> ChainResult<Self> {
        let url: url::Url = rpc_url.parse().map_err(|e: url::ParseError| ChainError::InvalidUrl {
            url: rpc_url.to_string(),
            reason: e.to_string(),
        })?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            provider,
            chain_id,
            rpc_url: rpc_url.to_string(),
            poll_interval: confirmation.poll_interval(),
            confirmations: confirmation.confirmations.max(1),
            max_rpc_failures: confirmation.max_rpc_failures.max(1),
        })
    }

    /// Get the underlying provider.
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Count a failed RPC query. Errors once the consecutive budget is spent.
    fn rpc_failed(&self, failures: &mut u32, error: impl std::fmt::Display) -> ChainResult<()> {
        *failures += 1;
        if *failures >= self.max_rpc_failures {
            tracing::error!(
                chain_id = self.chain_id,
                failures = *failures,
                error = %error,
                "Giving up on RPC endpoint"
            );
            return Err(ChainError::Rpc(error.to_string()));
        }
        tracing::warn!(chain_id = self.chain_id, failures = *failures, error = %error, "RPC query failed");
        Ok(())
    }

    async fn poll_confirmation(&self, tx_hash: TxHash) -> ChainResult<TxConfirmation> {
        let mut ticker = interval(self.poll_interval);
        let mut failures = 0;

        loop {
            ticker.tick().await;

            let receipt = match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => receipt,
                Ok(None) => {
                    failures = 0;
                    tracing::debug!(tx_hash = %tx_hash, chain_id = self.chain_id, "Transaction pending");
                    continue;
                }
                Err(e) => {
                    self.rpc_failed(&mut failures, e)?;
                    continue;
                }
            };
            failures = 0;

            if !receipt.status() {
                return Err(ChainError::Reverted(tx_hash));
            }

            let Some(mined_in) = receipt.block_number else {
                continue;
            };

            let head = match self.provider.get_block_number().await {
                Ok(head) => head,
                Err(e) => {
                    self.rpc_failed(&mut failures, e)?;
                    continue;
                }
            };

            let depth = head.saturating_sub(mined_in) + 1;
            if depth >= u64::from(self.confirmations) {
                return Ok(TxConfirmation {
                    tx_hash,
                    block_number: mined_in,
                });
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations = depth,
                required = self.confirmations,
                "Waiting for confirmations"
            );
        }
    }
}

impl ChainProvider for AlloyChainProvider {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn wait_for_transaction(&self, tx_hash: TxHash) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        self.poll_confirmation(tx_hash).boxed()
    }
}

impl std::fmt::Debug for AlloyChainProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyChainProvider")
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc_url)
            .field("confirmations", &self.confirmations)
            .finish()
    }
}
