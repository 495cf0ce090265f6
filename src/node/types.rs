//! Request and response bodies of the server node HTTP API.
//!
//! Field names follow the node's camelCase JSON. Amounts are decimal strings.

use alloy::primitives::{Address, TxHash, B256};
use serde::{Deserialize, Serialize};

/// Identity of the node this client drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetConfigResponse {
    pub public_identifier: String,
    pub signer_address: Address,
}

/// Balance split between two parties, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: Vec<String>,
    pub to: Vec<Address>,
}

/// Chain context a channel lives in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkContext {
    pub chain_id: u64,
    pub channel_factory_address: Address,
    pub transfer_registry_address: Address,
    pub provider_url: String,
}

/// Full state of a channel as stored by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullChannelState {
    pub channel_address: Address,
    pub alice: Address,
    pub bob: Address,
    #[serde(default)]
    pub alice_identifier: String,
    #[serde(default)]
    pub bob_identifier: String,
    #[serde(default)]
    pub network_context: NetworkContext,
    #[serde(default)]
    pub asset_ids: Vec<Address>,
    #[serde(default)]
    pub balances: Vec<Balance>,
    #[serde(default)]
    pub processed_deposits_a: Vec<String>,
    #[serde(default)]
    pub processed_deposits_b: Vec<String>,
    #[serde(default)]
    pub defund_nonces: Vec<String>,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default)]
    pub timeout: String,
    #[serde(default)]
    pub merkle_root: B256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_update: Option<serde_json::Value>,
    #[serde(default)]
    pub in_dispute: bool,
}

impl FullChannelState {
    /// Balance held for `asset_id`, if the channel tracks it.
    pub fn balance_of(&self, asset_id: Address) -> Option<&Balance> {
        let index = self.asset_ids.iter().position(|asset| *asset == asset_id)?;
        self.balances.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupParams {
    pub counterparty_identifier: String,
    pub chain_id: u64,
    /// Dispute timeout in seconds, as a decimal string.
    pub timeout: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResponse {
    pub channel_address: Address,
}

/// Parameters for submitting an on-chain deposit through the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDepositTxParams {
    pub channel_address: Address,
    pub amount: String,
    pub asset_id: Address,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDepositTxResponse {
    pub tx_hash: TxHash,
}

/// Body of `POST /deposit`, sent once the deposit transaction is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositParams {
    pub channel_address: Address,
    pub asset_id: Address,
}

impl From<&SendDepositTxParams> for DepositParams {
    fn from(params: &SendDepositTxParams) -> Self {
        Self {
            channel_address: params.channel_address,
            asset_id: params.asset_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub channel_address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalTransferParams {
    pub channel_address: Address,
    pub amount: String,
    pub asset_id: Address,
    /// Registered transfer definition name, e.g. "HashlockTransfer".
    pub condition_type: String,
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_asset_id: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalTransferResponse {
    pub channel_address: Address,
    pub transfer_id: B256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_id: Option<B256>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTransferParams {
    pub channel_address: Address,
    pub transfer_id: B256,
    pub condition_type: String,
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTransferResponse {
    pub channel_address: Address,
    pub transfer_id: B256,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_state_tolerates_missing_optional_fields() {
        let state: FullChannelState = serde_json::from_value(json!({
            "channelAddress": "0x1111111111111111111111111111111111111111",
            "alice": "0x2222222222222222222222222222222222222222",
            "bob": "0x3333333333333333333333333333333333333333",
            "assetIds": ["0x0000000000000000000000000000000000000000"],
            "balances": [{ "amount": ["5", "7"], "to": [
                "0x2222222222222222222222222222222222222222",
                "0x3333333333333333333333333333333333333333"
            ]}],
            "networkContext": { "chainId": 1337 },
            "processedDepositsA": ["5"],
            "nonce": 3,
            "someFutureField": true
        }))
        .unwrap();

        assert_eq!(state.network_context.chain_id, 1337);
        assert_eq!(state.processed_deposits_a, vec!["5"]);
        assert_eq!(state.nonce, 3);
        assert!(!state.in_dispute);
        assert_eq!(state.balance_of(Address::ZERO).unwrap().amount, vec!["5", "7"]);
        assert!(state.balance_of(state.alice).is_none());
    }

    #[test]
    fn test_optional_transfer_fields_omitted() {
        let params = ConditionalTransferParams {
            channel_address: Address::ZERO,
            amount: "1".into(),
            asset_id: Address::ZERO,
            condition_type: "HashlockTransfer".into(),
            details: json!({ "lockHash": "0x01" }),
            recipient: None,
            recipient_chain_id: None,
            recipient_asset_id: None,
            meta: None,
        };
        let value = serde_json::to_value(&params).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("conditionType"));
        assert!(!object.contains_key("recipient"));
        assert!(!object.contains_key("meta"));
    }

    #[test]
    fn test_deposit_params_from_send_params() {
        let send = SendDepositTxParams {
            channel_address: Address::repeat_byte(0x11),
            amount: "100".into(),
            asset_id: Address::ZERO,
            chain_id: 1337,
        };
        let body = serde_json::to_value(DepositParams::from(&send)).unwrap();
        assert_eq!(
            body,
            json!({
                "channelAddress": "0x1111111111111111111111111111111111111111",
                "assetId": "0x0000000000000000000000000000000000000000"
            })
        );
    }
}
