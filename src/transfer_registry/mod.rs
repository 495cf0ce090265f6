//! On-chain transfer definition registry.
//!
//! The node resolves `conditionType` names against this registry; this
//! module lets operators inspect and maintain it directly.

pub mod client;
pub mod contract;

pub use client::{
    classify_revert, signer_from_env, RegistryError, RegistryResult, TransferRegistryClient,
    OWNABLE_REVERT, REGISTRY_KEY_ENV_VAR,
};
pub use contract::RegisteredTransfer;
