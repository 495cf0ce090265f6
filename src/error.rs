//! Error taxonomy shared by every node client operation.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::chain::ChainError;

/// Remote operations, used to label failures, logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetConfig,
    GetStateChannel,
    GetStateChannelByParticipants,
    Setup,
    SendDepositTx,
    ConfirmDeposit,
    Deposit,
    ConditionalTransfer,
    ResolveTransfer,
    Subscribe,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetConfig => "get_config",
            Operation::GetStateChannel => "get_state_channel",
            Operation::GetStateChannelByParticipants => "get_state_channel_by_participants",
            Operation::Setup => "setup",
            Operation::SendDepositTx => "send_deposit_tx",
            Operation::ConfirmDeposit => "confirm_deposit",
            Operation::Deposit => "deposit",
            Operation::ConditionalTransfer => "conditional_transfer",
            Operation::ResolveTransfer => "resolve_transfer",
            Operation::Subscribe => "subscribe",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the node client.
#[derive(Debug, Error)]
pub enum ServerNodeError {
    /// No RPC connection is registered for the chain.
    #[error("Provider not available for chain {chain_id}")]
    ProviderNotFound { chain_id: u64 },

    /// A request or an awaited confirmation exceeded its bound.
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: Operation, after: Duration },

    /// Any other HTTP, decoding or chain failure.
    #[error("{operation} failed: {cause}")]
    Transport {
        operation: Operation,
        #[source]
        cause: TransportFailure,
    },

    /// The client could not be constructed from the supplied settings.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ServerNodeError {
    pub(crate) fn transport(operation: Operation, cause: impl Into<TransportFailure>) -> Self {
        Self::Transport {
            operation,
            cause: cause.into(),
        }
    }

    /// The operation that failed, when the error came from one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Timeout { operation, .. } | Self::Transport { operation, .. } => Some(*operation),
            Self::ProviderNotFound { .. } => Some(Operation::Deposit),
            Self::InvalidConfig(_) => None,
        }
    }

    /// HTTP status returned by the node, if the failure was a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport {
                cause: TransportFailure::Status { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }
}

/// Underlying cause of a [`ServerNodeError::Transport`].
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("node responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
}

/// Result type for node client operations.
pub type NodeResult<T> = Result<T, ServerNodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerNodeError::ProviderNotFound { chain_id: 1337 };
        assert_eq!(err.to_string(), "Provider not available for chain 1337");

        let err = ServerNodeError::Timeout {
            operation: Operation::ConfirmDeposit,
            after: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "confirm_deposit timed out after 5s");

        let err = ServerNodeError::transport(
            Operation::Setup,
            TransportFailure::Status { status: 500, body: "boom".into() },
        );
        assert_eq!(err.to_string(), "setup failed: node responded with status 500: boom");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.operation(), Some(Operation::Setup));
    }

    #[test]
    fn test_source_chain() {
        let err = ServerNodeError::transport(Operation::Deposit, ChainError::Rpc("down".into()));
        let source = std::error::Error::source(&err).expect("transport errors carry a source");
        assert_eq!(source.to_string(), "chain error: RPC error: down");
    }
}
