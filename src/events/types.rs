//! Engine event names and payloads delivered by the node's webhooks.

use alloy::primitives::{Address, B256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

use crate::node::types::Balance;

/// Event names the node can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEventName {
    ConditionalTransferCreated,
    ConditionalTransferResolved,
}

impl EngineEventName {
    pub const ALL: [EngineEventName; 2] = [
        EngineEventName::ConditionalTransferCreated,
        EngineEventName::ConditionalTransferResolved,
    ];

    /// Name used as the key of the remote subscribe request.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineEventName::ConditionalTransferCreated => "CONDITIONAL_TRANSFER_CREATED",
            EngineEventName::ConditionalTransferResolved => "CONDITIONAL_TRANSFER_RESOLVED",
        }
    }

    /// Path segment the node POSTs this event to, relative to the callback base.
    pub fn callback_path(&self) -> &'static str {
        match self {
            EngineEventName::ConditionalTransferCreated => "conditional-transfer-created",
            EngineEventName::ConditionalTransferResolved => "conditional-transfer-resolved",
        }
    }
}

impl fmt::Display for EngineEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single conditional transfer as reported by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferState {
    pub transfer_id: B256,
    pub channel_address: Address,
    pub initiator: Address,
    pub responder: Address,
    pub asset_id: Address,
    pub balance: Balance,
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default)]
    pub transfer_definition: Address,
    #[serde(default)]
    pub transfer_timeout: String,
    #[serde(default)]
    pub initiator_identifier: String,
    #[serde(default)]
    pub responder_identifier: String,
    #[serde(default)]
    pub transfer_state: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_resolver: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// Body of both conditional transfer webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalTransferEvent {
    pub alice_identifier: String,
    pub bob_identifier: String,
    pub channel_address: Address,
    pub transfer: TransferState,
    pub channel_balance: Balance,
    pub condition_type: String,
}

/// Payload of `CONDITIONAL_TRANSFER_CREATED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionalTransferCreated(pub ConditionalTransferEvent);

/// Payload of `CONDITIONAL_TRANSFER_RESOLVED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionalTransferResolved(pub ConditionalTransferEvent);

impl Deref for ConditionalTransferCreated {
    type Target = ConditionalTransferEvent;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for ConditionalTransferResolved {
    type Target = ConditionalTransferEvent;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// An event with its payload, one variant per event name.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ConditionalTransferCreated(ConditionalTransferCreated),
    ConditionalTransferResolved(ConditionalTransferResolved),
}

impl EngineEvent {
    pub fn name(&self) -> EngineEventName {
        match self {
            EngineEvent::ConditionalTransferCreated(_) => EngineEventName::ConditionalTransferCreated,
            EngineEvent::ConditionalTransferResolved(_) => EngineEventName::ConditionalTransferResolved,
        }
    }

    /// Decode a raw webhook body for `name`.
    pub fn from_json(name: EngineEventName, body: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match name {
            EngineEventName::ConditionalTransferCreated => {
                EngineEvent::ConditionalTransferCreated(serde_json::from_value(body)?)
            }
            EngineEventName::ConditionalTransferResolved => {
                EngineEvent::ConditionalTransferResolved(serde_json::from_value(body)?)
            }
        })
    }
}

/// Ties a payload type to its event name so listeners can be registered by type.
pub trait EngineEventPayload: Clone + Send + Sync + DeserializeOwned + 'static {
    const EVENT: EngineEventName;

    fn from_event(event: &EngineEvent) -> Option<&Self>;

    fn into_event(self) -> EngineEvent;
}

impl EngineEventPayload for ConditionalTransferCreated {
    const EVENT: EngineEventName = EngineEventName::ConditionalTransferCreated;

    fn from_event(event: &EngineEvent) -> Option<&Self> {
        match event {
            EngineEvent::ConditionalTransferCreated(payload) => Some(payload),
            _ => None,
        }
    }

    fn into_event(self) -> EngineEvent {
        EngineEvent::ConditionalTransferCreated(self)
    }
}

impl EngineEventPayload for ConditionalTransferResolved {
    const EVENT: EngineEventName = EngineEventName::ConditionalTransferResolved;

    fn from_event(event: &EngineEvent) -> Option<&Self> {
        match event {
            EngineEvent::ConditionalTransferResolved(payload) => Some(payload),
            _ => None,
        }
    }

    fn into_event(self) -> EngineEvent {
        EngineEvent::ConditionalTransferResolved(self)
    }
}
