//! Engine event subsystem.
//!
//! # Data Flow
//! ```text
//! Remote node
//!     → POST {callback base}/conditional-transfer-{created,resolved}
//!     → webhook.rs (decode into typed payload)
//!     → dispatcher.rs (filter, once/persistent, per-listener task)
//!     → application callbacks
//! ```
//!
//! Remote subscription (telling the node where to POST) is done by
//! `NodeClient::on` / `NodeClient::once`.

pub mod dispatcher;
pub mod types;
pub mod webhook;

pub use dispatcher::{EventDispatcher, EventFilter, ListenerId, ListenerMode};
pub use types::{
    ConditionalTransferCreated, ConditionalTransferEvent, ConditionalTransferResolved, EngineEvent,
    EngineEventName, EngineEventPayload, TransferState,
};
