//! Shared utilities for integration testing.
#![allow(dead_code)]

use alloy::consensus::{Eip658Value, Receipt, ReceiptEnvelope, ReceiptWithBloom};
use alloy::primitives::{keccak256, Address, Bloom, Bytes, TxHash, B256};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol_types::{SolCall, SolInterface};
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use channel_node_client::chain::{ChainProvider, ChainResult, TxConfirmation};
use channel_node_client::config::{ChainConfig, ClientConfig};
use channel_node_client::transfer_registry::contract::ITransferRegistry::{
    getTransferDefinitionsCall, ITransferRegistryCalls,
};
use channel_node_client::transfer_registry::{RegisteredTransfer, OWNABLE_REVERT};

pub const PUBLIC_IDENTIFIER: &str = "vector8AXWmo3dFpK1drnjeWPyi9KTy9Fy3SkCydWx8waQrxhnW4KPmR";
pub const SIGNER_ADDRESS: &str = "0x2222222222222222222222222222222222222222";
pub const CHANNEL_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
pub const TX_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000abc";

/// A request seen by the mock node.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
    pub at: Instant,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Default)]
struct MockState {
    responses: Mutex<HashMap<String, (u16, String, Duration)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A programmable stand-in for the server node.
///
/// Responses are keyed by `"METHOD /path"`; unknown routes answer 404.
#[derive(Clone)]
pub struct MockNode {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockNode {
    /// Start a node that already answers the `/config` handshake.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let node = Self { addr, state };
        node.respond(
            "GET /config",
            200,
            serde_json::json!({
                "publicIdentifier": PUBLIC_IDENTIFIER,
                "signerAddress": SIGNER_ADDRESS,
            }),
        );
        node
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn respond(&self, route: &str, status: u16, body: serde_json::Value) {
        self.respond_raw(route, status, body.to_string());
    }

    pub fn respond_raw(&self, route: &str, status: u16, body: impl Into<String>) {
        self.respond_after(route, status, body.into(), Duration::ZERO);
    }

    /// Like [`MockNode::respond`], but the answer is held back for `delay`.
    pub fn respond_after(&self, route: &str, status: u16, body: impl Into<String>, delay: Duration) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(route.to_string(), (status, body.into(), delay));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Requests to `path`, in arrival order.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }
}

async fn handle(State(state): State<Arc<MockState>>, method: Method, uri: Uri, body: String) -> (StatusCode, String) {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        body,
        at: Instant::now(),
    });

    let key = format!("{} {}", method, path);
    let response = {
        let responses = state.responses.lock().unwrap();
        responses.get(&key).cloned()
    };
    let Some((status, body, delay)) = response else {
        return (StatusCode::NOT_FOUND, String::new());
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    (StatusCode::from_u16(status).unwrap(), body)
}

/// Chain provider that confirms every transaction after a fixed delay.
#[derive(Clone)]
pub struct MockChainProvider {
    chain_id: u64,
    delay: Duration,
    confirmed_at: Arc<Mutex<Option<Instant>>>,
}

impl MockChainProvider {
    pub fn new(chain_id: u64, delay: Duration) -> Self {
        Self {
            chain_id,
            delay,
            confirmed_at: Arc::new(Mutex::new(None)),
        }
    }

    pub fn confirmed_at(&self) -> Option<Instant> {
        *self.confirmed_at.lock().unwrap()
    }
}

impl ChainProvider for MockChainProvider {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn wait_for_transaction(&self, tx_hash: TxHash) -> BoxFuture<'_, ChainResult<TxConfirmation>> {
        async move {
            tokio::time::sleep(self.delay).await;
            *self.confirmed_at.lock().unwrap() = Some(Instant::now());
            Ok(TxConfirmation {
                tx_hash,
                block_number: 42,
            })
        }
        .boxed()
    }
}

/// Client configuration pointing at `node_url`.
pub fn client_config(node_url: &str, callback_url_base: &str) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.node.url = node_url.to_string();
    config.node.callback_url_base = callback_url_base.to_string();
    config.node.request_timeout_secs = 5;
    config.chains = vec![ChainConfig {
        chain_id: 1337,
        rpc_url: "http://127.0.0.1:8545".to_string(),
    }];
    config
}

/// A conditional transfer webhook body as the node sends it.
pub fn transfer_event_body(condition_type: &str) -> serde_json::Value {
    serde_json::json!({
        "aliceIdentifier": PUBLIC_IDENTIFIER,
        "bobIdentifier": "vector5ArRsL26avPNyfvJd2qMAppsEVeJv11n31ex542T9gCd5B1cP3",
        "channelAddress": CHANNEL_ADDRESS,
        "conditionType": condition_type,
        "channelBalance": {
            "amount": ["10", "0"],
            "to": [SIGNER_ADDRESS, "0x3333333333333333333333333333333333333333"]
        },
        "transfer": {
            "transferId": TX_HASH,
            "channelAddress": CHANNEL_ADDRESS,
            "initiator": SIGNER_ADDRESS,
            "responder": "0x3333333333333333333333333333333333333333",
            "assetId": "0x0000000000000000000000000000000000000000",
            "balance": {
                "amount": ["1", "0"],
                "to": [SIGNER_ADDRESS, "0x3333333333333333333333333333333333333333"]
            }
        }
    })
}

struct ChainState {
    owner: Address,
    definitions: Mutex<Vec<RegisteredTransfer>>,
    receipts: Mutex<HashMap<TxHash, TransactionReceipt>>,
    sent: Mutex<u64>,
}

/// JSON-RPC endpoint hosting one in-memory TransferRegistry.
///
/// `eth_sendTransaction` from anyone but the owner fails with the Ownable
/// revert; accepted writes are mined immediately.
#[derive(Clone)]
pub struct FakeRegistryChain {
    pub addr: SocketAddr,
    state: Arc<ChainState>,
}

impl FakeRegistryChain {
    pub async fn start(owner: Address) -> Self {
        let state = Arc::new(ChainState {
            owner,
            definitions: Mutex::new(Vec::new()),
            receipts: Mutex::new(HashMap::new()),
            sent: Mutex::new(0),
        });
        let app = Router::new().route("/", post(rpc)).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn definitions(&self) -> Vec<RegisteredTransfer> {
        self.state.definitions.lock().unwrap().clone()
    }

    /// Writes accepted and mined so far.
    pub fn transactions_mined(&self) -> u64 {
        *self.state.sent.lock().unwrap()
    }
}

impl ChainState {
    fn send_transaction(&self, tx: &serde_json::Value) -> Result<serde_json::Value, String> {
        let from: Address = tx["from"]
            .as_str()
            .and_then(|from| from.parse().ok())
            .ok_or("missing from")?;
        let input: Bytes = tx
            .get("input")
            .or_else(|| tx.get("data"))
            .and_then(|input| input.as_str())
            .and_then(|input| input.parse().ok())
            .ok_or("missing input")?;
        let call = ITransferRegistryCalls::abi_decode(&input).map_err(|e| e.to_string())?;

        if from != self.owner {
            return Err(format!("execution reverted: {}", OWNABLE_REVERT));
        }

        {
            let mut definitions = self.definitions.lock().unwrap();
            match call {
                ITransferRegistryCalls::addTransferDefinition(add) => definitions.push(add.definition),
                ITransferRegistryCalls::removeTransferDefinition(remove) => {
                    definitions.retain(|d| d.name != remove.name)
                }
                ITransferRegistryCalls::getTransferDefinitions(_) => {}
            }
        }

        let block = {
            let mut sent = self.sent.lock().unwrap();
            *sent += 1;
            *sent
        };
        let tx_hash = keccak256(block.to_be_bytes());
        let to = tx["to"].as_str().and_then(|to| to.parse().ok());
        self.receipts
            .lock()
            .unwrap()
            .insert(tx_hash, mined_receipt(tx_hash, from, to, block));
        Ok(serde_json::json!(tx_hash))
    }

    fn call(&self) -> serde_json::Value {
        let definitions = self.definitions.lock().unwrap().clone();
        let encoded = getTransferDefinitionsCall::abi_encode_returns(&definitions);
        serde_json::json!(Bytes::from(encoded))
    }

    fn receipt(&self, params: &serde_json::Value) -> serde_json::Value {
        let receipt = params[0]
            .as_str()
            .and_then(|hash| hash.parse::<B256>().ok())
            .and_then(|hash| self.receipts.lock().unwrap().get(&hash).cloned());
        serde_json::to_value(receipt).unwrap()
    }
}

fn mined_receipt(tx_hash: TxHash, from: Address, to: Option<Address>, block: u64) -> TransactionReceipt {
    TransactionReceipt {
        inner: ReceiptEnvelope::Eip1559(ReceiptWithBloom {
            receipt: Receipt {
                status: Eip658Value::Eip658(true),
                cumulative_gas_used: 21_000,
                logs: vec![],
            },
            logs_bloom: Bloom::ZERO,
        }),
        transaction_hash: tx_hash,
        transaction_index: Some(0),
        block_hash: Some(keccak256(block.to_le_bytes())),
        block_number: Some(block),
        gas_used: 21_000,
        effective_gas_price: 1,
        blob_gas_used: None,
        blob_gas_price: None,
        from,
        to,
        contract_address: None,
    }
}

async fn rpc(State(chain): State<Arc<ChainState>>, Json(request): Json<serde_json::Value>) -> Json<serde_json::Value> {
    let id = request["id"].clone();
    let params = &request["params"];
    let result = match request["method"].as_str().unwrap_or_default() {
        "eth_sendTransaction" => chain.send_transaction(&params[0]),
        "eth_getTransactionReceipt" => Ok(chain.receipt(params)),
        "eth_call" => Ok(chain.call()),
        "eth_chainId" => Ok(serde_json::json!("0x539")),
        "eth_blockNumber" => Ok(serde_json::json!(format!("{:#x}", *chain.sent.lock().unwrap()))),
        other => Err(format!("method {} not supported", other)),
    };

    Json(match result {
        Ok(result) => serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(message) => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": 3, "message": message }
        }),
    })
}
