//! Server node façade.
//!
//! # Data Flow
//! ```text
//! Application
//!     → client.rs (typed operation, NodeResult)
//!     → node HTTP API (reqwest, per-request timeout)
//!     → types.rs (camelCase wire bodies)
//!
//! deposit:
//!     send-deposit-tx → chain provider confirmation → deposit
//! ```

pub mod client;
pub mod types;

pub use client::NodeClient;
pub use types::{
    Balance, ConditionalTransferParams, ConditionalTransferResponse, DepositParams, DepositResponse,
    FullChannelState, GetConfigResponse, NetworkContext, ResolveTransferParams, ResolveTransferResponse,
    SendDepositTxParams, SendDepositTxResponse, SetupParams, SetupResponse,
};
