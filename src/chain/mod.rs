//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! ChainProviders (chain id → RPC URL, from config)
//!     → registry.rs (one connection per chain, built once)
//!     → provider.rs (receipt polling until confirmed)
//!     → NodeClient::deposit (awaits confirmation before notifying the node)
//! ```
//!
//! # Constraints
//! - Construction never contacts the chain
//! - Confirmation waits are bounded by the caller, not here

pub mod provider;
pub mod registry;
pub mod types;

pub use provider::{AlloyChainProvider, ChainProvider};
pub use registry::ChainProviderRegistry;
pub use types::{ChainError, ChainResult, TxConfirmation};
