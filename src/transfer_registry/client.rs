//! Transfer registry access.
//!
//! # Responsibilities
//! - Read the registered transfer definitions
//! - Add and remove definitions as the registry owner
//! - Surface owner-gating reverts as `RegistryError::NotOwner`
//!
//! # Security
//! - The owner key is loaded ONLY from `NODE_CLIENT_REGISTRY_KEY`
//! - Keys are never logged

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval, timeout};

use crate::transfer_registry::contract::{ITransferRegistry, RegisteredTransfer};

/// Environment variable holding the registry owner's private key.
pub const REGISTRY_KEY_ENV_VAR: &str = "NODE_CLIENT_REGISTRY_KEY";

/// Revert reason of `onlyOwner` functions.
pub const OWNABLE_REVERT: &str = "Ownable: caller is not the owner";

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Signer error: {0}")]
    Signer(String),

    /// A write was attempted without a signer.
    #[error("No signer configured for registry writes")]
    MissingSigner,

    /// The signer is not the registry owner.
    #[error("Caller is not the registry owner")]
    NotOwner,

    #[error("Registry transaction {0} reverted")]
    Reverted(TxHash),

    #[error("No receipt for registry transaction {0} before the deadline")]
    Timeout(TxHash),

    #[error("RPC error: {0}")]
    Rpc(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Map a contract call failure onto a registry error.
pub fn classify_revert(message: &str) -> RegistryError {
    if message.contains(OWNABLE_REVERT) {
        RegistryError::NotOwner
    } else {
        RegistryError::Rpc(message.to_string())
    }
}

/// Load the owner signer from [`REGISTRY_KEY_ENV_VAR`].
pub fn signer_from_env() -> RegistryResult<PrivateKeySigner> {
    let key = std::env::var(REGISTRY_KEY_ENV_VAR).map_err(|_| {
        RegistryError::Signer(format!("Environment variable {} not set", REGISTRY_KEY_ENV_VAR))
    })?;
    parse_signer(&key)
}

fn parse_signer(key: &str) -> RegistryResult<PrivateKeySigner> {
    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse()
        .map_err(|e| RegistryError::Signer(format!("Invalid private key format: {}", e)))
}

/// Client for one deployed TransferRegistry contract.
#[derive(Clone)]
pub struct TransferRegistryClient {
    registry: ITransferRegistry::ITransferRegistryInstance<DynProvider>,
    signer_address: Option<Address>,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl TransferRegistryClient {
    /// Build a client. Does not contact the endpoint.
    ///
    /// Without a signer only [`TransferRegistryClient::transfer_definitions`] is usable.
    pub fn connect(rpc_url: &str, address: Address, signer: Option<PrivateKeySigner>) -> RegistryResult<Self> {
        let url: url::Url = rpc_url.parse().map_err(|e: url::ParseError| RegistryError::InvalidUrl {
            url: rpc_url.to_string(),
            reason: e.to_string(),
        })?;

        let signer_address = signer.as_ref().map(|signer| signer.address());
        let provider = match signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(url)
                .erased(),
            None => ProviderBuilder::new().connect_http(url).erased(),
        };

        Ok(Self::with_provider(address, provider, signer_address))
    }

    /// Use an existing provider. Writes are sent from `signer_address`,
    /// which the provider must be able to sign for.
    pub fn with_provider(address: Address, provider: DynProvider, signer_address: Option<Address>) -> Self {
        Self {
            registry: ITransferRegistry::new(address, provider),
            signer_address,
            poll_interval: RECEIPT_POLL_INTERVAL,
            receipt_timeout: RECEIPT_TIMEOUT,
        }
    }

    /// Override how write receipts are awaited.
    pub fn with_receipt_polling(mut self, poll_interval: Duration, receipt_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.receipt_timeout = receipt_timeout;
        self
    }

    pub fn address(&self) -> Address {
        *self.registry.address()
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer_address
    }

    pub async fn transfer_definitions(&self) -> RegistryResult<Vec<RegisteredTransfer>> {
        self.registry
            .getTransferDefinitions()
            .call()
            .await
            .map_err(|e| classify_revert(&e.to_string()))
    }

    /// Register a new transfer definition. Owner only.
    pub async fn add_transfer_definition(&self, definition: RegisteredTransfer) -> RegistryResult<TxHash> {
        let from = self.require_signer()?;
        let name = definition.name.clone();
        let pending = self
            .registry
            .addTransferDefinition(definition)
            .from(from)
            .send()
            .await
            .map_err(|e| classify_revert(&e.to_string()))?;

        let tx_hash = self.await_receipt(*pending.tx_hash()).await?;
        tracing::info!(name = %name, tx_hash = %tx_hash, "Transfer definition added");
        Ok(tx_hash)
    }

    /// Remove a transfer definition by name. Owner only.
    pub async fn remove_transfer_definition(&self, name: &str) -> RegistryResult<TxHash> {
        let from = self.require_signer()?;
        let pending = self
            .registry
            .removeTransferDefinition(name.to_string())
            .from(from)
            .send()
            .await
            .map_err(|e| classify_revert(&e.to_string()))?;

        let tx_hash = self.await_receipt(*pending.tx_hash()).await?;
        tracing::info!(name = %name, tx_hash = %tx_hash, "Transfer definition removed");
        Ok(tx_hash)
    }

    fn require_signer(&self) -> RegistryResult<Address> {
        self.signer_address.ok_or(RegistryError::MissingSigner)
    }

    async fn await_receipt(&self, tx_hash: TxHash) -> RegistryResult<TxHash> {
        let provider = self.registry.provider();
        let poll = async {
            let mut ticker = interval(self.poll_interval);
            loop {
                ticker.tick().await;
                match provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Registry transaction pending"),
                    Err(e) => return Err(RegistryError::Rpc(e.to_string())),
                }
            }
        };

        let receipt = timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| RegistryError::Timeout(tx_hash))??;
        if !receipt.status() {
            return Err(RegistryError::Reverted(tx_hash));
        }
        Ok(tx_hash)
    }
}

impl std::fmt::Debug for TransferRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRegistryClient")
            .field("address", self.registry.address())
            .field("signer_address", &self.signer_address)
            .finish()
    }
}
