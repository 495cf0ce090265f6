//! Client façade for a remote payment-channel server node.
//!
//! ```text
//!     Application
//!         │  setup / deposit / conditional_transfer / resolve_transfer
//!         ▼
//!     NodeClient ──HTTP──▶ server node
//!         │                    │
//!         │ confirm deposit    │ POST webhook
//!         ▼                    ▼
//!     ChainProviderRegistry   webhook receiver ──▶ EventDispatcher ──▶ listeners
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod events;
pub mod node;
pub mod observability;
pub mod transfer_registry;

pub use chain::{ChainProvider, ChainProviderRegistry};
pub use config::ClientConfig;
pub use error::{NodeResult, Operation, ServerNodeError, TransportFailure};
pub use events::{EngineEventName, EventDispatcher};
pub use node::NodeClient;
