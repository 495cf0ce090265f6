//! HTTP client for a remote server node.
//!
//! # Responsibilities
//! - Handshake with the node before handing out a usable client
//! - Perform each remote operation as a typed request returning `NodeResult`
//! - Order deposits: submit, confirm on-chain, then notify the node
//! - Register webhook subscriptions and wire them into the dispatcher

use alloy::primitives::Address;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;
use url::Url;

use crate::chain::ChainProviderRegistry;
use crate::config::ClientConfig;
use crate::error::{NodeResult, Operation, ServerNodeError, TransportFailure};
use crate::events::{EngineEventName, EngineEventPayload, EventDispatcher, EventFilter, ListenerId, ListenerMode};
use crate::node::types::{
    ConditionalTransferParams, ConditionalTransferResponse, DepositParams, DepositResponse,
    FullChannelState, GetConfigResponse, ResolveTransferParams, ResolveTransferResponse,
    SendDepositTxParams, SendDepositTxResponse, SetupParams, SetupResponse,
};
use crate::observability::metrics;

/// Client for a server node's HTTP API.
///
/// Only obtainable through [`NodeClient::connect`] or
/// [`NodeClient::connect_with_registry`], both of which complete the
/// `GET /config` handshake first, so the identity fields are always set.
pub struct NodeClient {
    http: reqwest::Client,
    node_url: Url,
    callback_url_base: Url,
    request_timeout: Duration,
    confirmation_timeout: Duration,
    providers: ChainProviderRegistry,
    dispatcher: EventDispatcher,
    /// Event names already registered with the node by this client.
    subscriptions: Mutex<HashSet<EngineEventName>>,
    public_identifier: String,
    signer_address: Address,
}

impl NodeClient {
    /// Build the chain registry from `config.chains` and connect.
    pub async fn connect(config: &ClientConfig, dispatcher: EventDispatcher) -> NodeResult<Self> {
        let providers = ChainProviderRegistry::connect(&config.chain_providers(), &config.confirmation)
            .map_err(|e| ServerNodeError::InvalidConfig(e.to_string()))?;
        Self::connect_with_registry(config, providers, dispatcher).await
    }

    /// Connect using an already-built chain registry.
    pub async fn connect_with_registry(
        config: &ClientConfig,
        providers: ChainProviderRegistry,
        dispatcher: EventDispatcher,
    ) -> NodeResult<Self> {
        let mut client = Self::new(config, providers, dispatcher)?;

        let identity = client.get_config().await?;
        client.public_identifier = identity.public_identifier;
        client.signer_address = identity.signer_address;

        tracing::info!(
            node_url = %client.node_url,
            public_identifier = %client.public_identifier,
            signer_address = %client.signer_address,
            chains = ?client.providers.chain_ids(),
            "Connected to server node"
        );
        Ok(client)
    }

    fn new(
        config: &ClientConfig,
        providers: ChainProviderRegistry,
        dispatcher: EventDispatcher,
    ) -> NodeResult<Self> {
        let node_url = parse_base_url("node.url", &config.node.url)?;
        let callback_url_base = parse_base_url("node.callback_url_base", &config.node.callback_url_base)?;
        let request_timeout = config.node.request_timeout();

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ServerNodeError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            node_url,
            callback_url_base,
            request_timeout,
            confirmation_timeout: config.confirmation.timeout(),
            providers,
            dispatcher,
            subscriptions: Mutex::new(HashSet::new()),
            public_identifier: String::new(),
            signer_address: Address::ZERO,
        })
    }

    /// Public identifier reported by the node during the handshake.
    pub fn public_identifier(&self) -> &str {
        &self.public_identifier
    }

    /// Signer address reported by the node during the handshake.
    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn providers(&self) -> &ChainProviderRegistry {
        &self.providers
    }

    /// URL the node will POST `event` deliveries to.
    pub fn callback_url(&self, event: EngineEventName) -> String {
        format!(
            "{}/{}",
            self.callback_url_base.as_str().trim_end_matches('/'),
            event.callback_path()
        )
    }

    pub async fn get_config(&self) -> NodeResult<GetConfigResponse> {
        self.get(Operation::GetConfig, &["config"]).await
    }

    /// Fetch a channel by address. `None` when the node has no such channel.
    pub async fn get_state_channel(&self, channel_address: Address) -> NodeResult<Option<FullChannelState>> {
        let channel_address = channel_address.to_string();
        self.get_optional(Operation::GetStateChannel, &["channel", &channel_address])
            .await
    }

    /// Fetch the channel between two participants on a chain.
    pub async fn get_state_channel_by_participants(
        &self,
        alice: &str,
        bob: &str,
        chain_id: u64,
    ) -> NodeResult<Option<FullChannelState>> {
        let chain_id = chain_id.to_string();
        self.get_optional(
            Operation::GetStateChannelByParticipants,
            &["channel", alice, bob, &chain_id],
        )
        .await
    }

    pub async fn setup(&self, params: &SetupParams) -> NodeResult<SetupResponse> {
        self.post(Operation::Setup, &["setup"], params).await
    }

    /// Deposit into a channel, bounded by the configured confirmation timeout.
    pub async fn deposit(&self, params: &SendDepositTxParams, chain_id: u64) -> NodeResult<DepositResponse> {
        self.deposit_with_timeout(params, chain_id, self.confirmation_timeout)
            .await
    }

    /// Deposit into a channel.
    ///
    /// Steps run strictly in order: resolve the chain provider, submit the
    /// deposit transaction through the node, wait for it to confirm, then
    /// tell the node the funds have landed. Nothing touches the network if
    /// `chain_id` has no provider, and `/deposit` is never called unless the
    /// transaction confirmed within `confirmation_timeout`.
    pub async fn deposit_with_timeout(
        &self,
        params: &SendDepositTxParams,
        chain_id: u64,
        confirmation_timeout: Duration,
    ) -> NodeResult<DepositResponse> {
        let provider = self.providers.resolve(chain_id)?;

        let submitted: SendDepositTxResponse = self
            .post(Operation::SendDepositTx, &["send-deposit-tx"], params)
            .await?;
        let tx_hash = submitted.tx_hash;

        tracing::info!(tx_hash = %tx_hash, chain_id, "Waiting for tx to be mined");
        let started = Instant::now();
        let confirmation = match timeout(confirmation_timeout, provider.wait_for_transaction(tx_hash)).await {
            Ok(Ok(confirmation)) => confirmation,
            Ok(Err(e)) => {
                metrics::record_confirmation_wait(chain_id, false, started);
                return Err(ServerNodeError::transport(Operation::ConfirmDeposit, e));
            }
            Err(_) => {
                metrics::record_confirmation_wait(chain_id, false, started);
                tracing::warn!(tx_hash = %tx_hash, chain_id, timeout = ?confirmation_timeout, "Deposit tx not confirmed in time");
                return Err(ServerNodeError::Timeout {
                    operation: Operation::ConfirmDeposit,
                    after: confirmation_timeout,
                });
            }
        };
        metrics::record_confirmation_wait(chain_id, true, started);
        tracing::info!(tx_hash = %tx_hash, block_number = confirmation.block_number, "Tx has been mined");

        self.post(Operation::Deposit, &["deposit"], &DepositParams::from(params))
            .await
    }

    pub async fn conditional_transfer(
        &self,
        params: &ConditionalTransferParams,
    ) -> NodeResult<ConditionalTransferResponse> {
        self.post(Operation::ConditionalTransfer, &["linked-transfer", "create"], params)
            .await
    }

    pub async fn resolve_transfer(&self, params: &ResolveTransferParams) -> NodeResult<ResolveTransferResponse> {
        self.post(Operation::ResolveTransfer, &["linked-transfer", "resolve"], params)
            .await
    }

    /// Listen for every event carrying payload `P`.
    ///
    /// The first listener for an event name registers the webhook with the
    /// node; later ones only attach locally. If the node rejects the
    /// registration, or the returned future is dropped before the node
    /// answers, the listener is detached again.
    pub async fn on<P, F, Fut>(&self, callback: F, filter: Option<EventFilter<P>>) -> NodeResult<ListenerId>
    where
        P: EngineEventPayload,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(ListenerMode::Persistent, callback, filter).await
    }

    /// Like [`NodeClient::on`], but the listener is dropped after its first delivery.
    pub async fn once<P, F, Fut>(&self, callback: F, filter: Option<EventFilter<P>>) -> NodeResult<ListenerId>
    where
        P: EngineEventPayload,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(ListenerMode::Once, callback, filter).await
    }

    async fn subscribe<P, F, Fut>(
        &self,
        mode: ListenerMode,
        callback: F,
        filter: Option<EventFilter<P>>,
    ) -> NodeResult<ListenerId>
    where
        P: EngineEventPayload,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // Held across the remote call so concurrent first subscriptions
        // issue a single request.
        let mut subscribed = self.subscriptions.lock().await;
        let listener = PendingListener {
            dispatcher: &self.dispatcher,
            event: P::EVENT,
            id: self.dispatcher.attach(mode, callback, filter),
            armed: true,
        };

        if subscribed.contains(&P::EVENT) {
            tracing::debug!(event = %P::EVENT, listener = %listener.id, "Event already subscribed, listener attached locally");
            return Ok(listener.keep());
        }

        let url = self.callback_url(P::EVENT);
        let body = HashMap::from([(P::EVENT.as_str(), url.as_str())]);
        let request = self.http.post(self.endpoint(&["event", "subscribe"])).json(&body);

        // Dropping `listener` before `keep` (error or cancellation) detaches it.
        match self.execute(Operation::Subscribe, request).await {
            Ok(_) => {
                subscribed.insert(P::EVENT);
                tracing::info!(event = %P::EVENT, url = %url, "Engine event subscription created");
                Ok(listener.keep())
            }
            Err(e) => {
                tracing::warn!(event = %P::EVENT, error = %e, "Engine event subscription failed, listener removed");
                Err(e)
            }
        }
    }

    /// Node URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.node_url.clone();
        // Base URLs are checked to have a path at construction
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<R: DeserializeOwned>(&self, operation: Operation, segments: &[&str]) -> NodeResult<R> {
        let (_, body) = self.execute(operation, self.http.get(self.endpoint(segments))).await?;
        decode(operation, &body)
    }

    async fn post<B, R>(&self, operation: Operation, segments: &[&str], payload: &B) -> NodeResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.http.post(self.endpoint(segments)).json(payload);
        let (_, body) = self.execute(operation, request).await?;
        decode(operation, &body)
    }

    /// GET a resource the node may not have. 404 and empty bodies are `None`.
    async fn get_optional<R: DeserializeOwned>(
        &self,
        operation: Operation,
        segments: &[&str],
    ) -> NodeResult<Option<R>> {
        let url = self.endpoint(segments);
        match self.execute(operation, self.http.get(url.clone())).await {
            Ok((_, body)) => decode_optional(operation, &body),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND.as_u16()) => {
                tracing::debug!(operation = %operation, path = url.path(), "Resource not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Send a request and return the status and body of a 2xx response.
    async fn execute(&self, operation: Operation, request: RequestBuilder) -> NodeResult<(StatusCode, String)> {
        let started = Instant::now();
        let result = self.send(operation, request).await;
        metrics::record_request(operation, result.is_ok(), started);

        if let Err(e) = &result {
            tracing::warn!(operation = %operation, error = %e, "Server node request failed");
        }
        result
    }

    async fn send(&self, operation: Operation, request: RequestBuilder) -> NodeResult<(StatusCode, String)> {
        let response = request
            .send()
            .await
            .map_err(|e| self.request_error(operation, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(operation, e))?;

        if !status.is_success() {
            return Err(ServerNodeError::transport(
                operation,
                TransportFailure::Status {
                    status: status.as_u16(),
                    body,
                },
            ));
        }
        Ok((status, body))
    }

    fn request_error(&self, operation: Operation, error: reqwest::Error) -> ServerNodeError {
        if error.is_timeout() {
            ServerNodeError::Timeout {
                operation,
                after: self.request_timeout,
            }
        } else {
            ServerNodeError::transport(operation, error)
        }
    }
}

impl std::fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClient")
            .field("node_url", &self.node_url.as_str())
            .field("callback_url_base", &self.callback_url_base.as_str())
            .field("public_identifier", &self.public_identifier)
            .field("signer_address", &self.signer_address)
            .field("providers", &self.providers)
            .finish()
    }
}

fn parse_base_url(field: &str, value: &str) -> NodeResult<Url> {
    let url = Url::parse(value).map_err(|e| ServerNodeError::InvalidConfig(format!("{} '{}': {}", field, value, e)))?;
    if url.cannot_be_a_base() {
        return Err(ServerNodeError::InvalidConfig(format!("{} '{}': not a base URL", field, value)));
    }
    Ok(url)
}

/// A listener attached for a subscription that has not completed yet.
struct PendingListener<'a> {
    dispatcher: &'a EventDispatcher,
    event: EngineEventName,
    id: ListenerId,
    armed: bool,
}

impl PendingListener<'_> {
    fn keep(mut self) -> ListenerId {
        self.armed = false;
        self.id
    }
}

impl Drop for PendingListener<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.dispatcher.detach(self.event, self.id);
            tracing::debug!(event = %self.event, listener = %self.id, "Subscription abandoned, listener detached");
        }
    }
}

fn decode<R: DeserializeOwned>(operation: Operation, body: &str) -> NodeResult<R> {
    serde_json::from_str(body).map_err(|e| ServerNodeError::transport(operation, e))
}

/// Empty body, `null` and `{}` all mean "absent".
fn decode_optional<R: DeserializeOwned>(operation: Operation, body: &str) -> NodeResult<Option<R>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = decode(operation, body)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(ref map) if map.is_empty() => Ok(None),
        value => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ServerNodeError::transport(operation, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_optional_absence() {
        for body in ["", "  ", "null", "{}"] {
            let decoded: Option<FullChannelState> = decode_optional(Operation::GetStateChannel, body).unwrap();
            assert!(decoded.is_none(), "body {:?} should decode as absent", body);
        }
    }

    #[test]
    fn test_decode_optional_malformed() {
        let err = decode_optional::<FullChannelState>(Operation::GetStateChannel, "{\"nonce\": 1}").unwrap_err();
        assert!(matches!(
            err,
            ServerNodeError::Transport {
                operation: Operation::GetStateChannel,
                cause: TransportFailure::Decode(_),
            }
        ));
    }

    #[test]
    fn test_parse_base_url_requires_hierarchical_url() {
        assert!(parse_base_url("node.url", "http://127.0.0.1:8000/api/").is_ok());

        let err = parse_base_url("node.url", "mailto:node@example.com").unwrap_err();
        assert!(matches!(err, ServerNodeError::InvalidConfig(ref msg) if msg.contains("not a base URL")));
    }

    #[test]
    fn test_decode_failure_names_operation() {
        let err = decode::<GetConfigResponse>(Operation::GetConfig, "<html>").unwrap_err();
        assert!(err.to_string().starts_with("get_config failed: malformed response"));
    }
}
