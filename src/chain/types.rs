//! Chain-specific types and error definitions.

use alloy::primitives::TxHash;
use thiserror::Error;

/// Errors that can occur while talking to a chain RPC endpoint.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The configured endpoint could not be parsed.
    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Transaction was mined but reverted.
    #[error("Transaction {0} reverted")]
    Reverted(TxHash),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// A transaction observed as confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxConfirmation {
    pub tx_hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: u64,
}
