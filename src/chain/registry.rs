//! Per-chain provider registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::chain::provider::{AlloyChainProvider, ChainProvider};
use crate::chain::types::ChainResult;
use crate::config::{ChainProviders, ConfirmationConfig};
use crate::error::{NodeResult, ServerNodeError};

/// Chain id → live RPC connection. Read-only once built.
#[derive(Clone, Default)]
pub struct ChainProviderRegistry {
    providers: HashMap<u64, Arc<dyn ChainProvider>>,
}

impl ChainProviderRegistry {
    /// Create one alloy provider per configured chain.
    ///
    /// Reachability is not checked here; an unreachable endpoint surfaces
    /// on first use.
    pub fn connect(urls: &ChainProviders, confirmation: &ConfirmationConfig) -> ChainResult<Self> {
        let mut providers: HashMap<u64, Arc<dyn ChainProvider>> = HashMap::with_capacity(urls.len());
        for (&chain_id, url) in urls {
            let provider = AlloyChainProvider::connect(chain_id, url, confirmation)?;
            providers.insert(chain_id, Arc::new(provider));
            tracing::debug!(chain_id, rpc_url = %url, "Chain provider registered");
        }
        Ok(Self { providers })
    }

    /// Build a registry from existing connections.
    pub fn from_providers<I>(providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ChainProvider>>,
    {
        Self {
            providers: providers
                .into_iter()
                .map(|provider| (provider.chain_id(), provider))
                .collect(),
        }
    }

    /// Look up the connection for `chain_id`.
    pub fn resolve(&self, chain_id: u64) -> NodeResult<Arc<dyn ChainProvider>> {
        self.providers
            .get(&chain_id)
            .cloned()
            .ok_or(ServerNodeError::ProviderNotFound { chain_id })
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.providers.contains_key(&chain_id)
    }

    /// Configured chain ids, ascending.
    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.providers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ChainProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainProviderRegistry")
            .field("chain_ids", &self.chain_ids())
            .finish()
    }
}
