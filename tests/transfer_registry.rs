//! TransferRegistryClient against an in-memory registry chain.

mod common;

use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder};
use channel_node_client::transfer_registry::{RegisteredTransfer, RegistryError, TransferRegistryClient};
use common::FakeRegistryChain;
use std::time::Duration;

const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const STRANGER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
const REGISTRY: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

fn hashlock_definition() -> RegisteredTransfer {
    RegisteredTransfer {
        name: "HashlockTransfer".into(),
        definition: "0x8f0483125FCb9aaAEFA9209D8E9d7b9C8B9Fb90F".parse().unwrap(),
        stateEncoding: "tuple(bytes32 lockHash, uint256 expiry)".into(),
        resolverEncoding: "tuple(bytes32 preImage)".into(),
        encodedCancel: Bytes::from(vec![0u8; 32]),
    }
}

/// A client writing as `from` through an unsigned provider.
fn client_for(chain: &FakeRegistryChain, from: &str) -> TransferRegistryClient {
    let provider = ProviderBuilder::new()
        .disable_recommended_fillers()
        .connect_http(chain.url().parse().unwrap())
        .erased();
    TransferRegistryClient::with_provider(REGISTRY.parse().unwrap(), provider, Some(from.parse().unwrap()))
        .with_receipt_polling(Duration::from_millis(10), Duration::from_secs(5))
}

#[tokio::test]
async fn test_add_list_remove_definition() {
    let chain = FakeRegistryChain::start(OWNER.parse().unwrap()).await;
    let client = client_for(&chain, OWNER);

    assert!(client.transfer_definitions().await.unwrap().is_empty());

    let added = client.add_transfer_definition(hashlock_definition()).await.unwrap();
    let listed = client.transfer_definitions().await.unwrap();
    assert_eq!(listed, vec![hashlock_definition()]);

    let removed = client.remove_transfer_definition("HashlockTransfer").await.unwrap();
    assert_ne!(added, removed);
    assert!(client.transfer_definitions().await.unwrap().is_empty());
    assert_eq!(chain.transactions_mined(), 2);
}

#[tokio::test]
async fn test_read_only_client_lists_definitions() {
    let chain = FakeRegistryChain::start(OWNER.parse().unwrap()).await;
    client_for(&chain, OWNER)
        .add_transfer_definition(hashlock_definition())
        .await
        .unwrap();

    let reader = TransferRegistryClient::connect(&chain.url(), REGISTRY.parse().unwrap(), None).unwrap();
    let names: Vec<String> = reader
        .transfer_definitions()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["HashlockTransfer".to_string()]);
}

#[tokio::test]
async fn test_non_owner_write_is_not_owner() {
    let chain = FakeRegistryChain::start(OWNER.parse().unwrap()).await;
    let client = client_for(&chain, STRANGER);

    let err = client.add_transfer_definition(hashlock_definition()).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotOwner), "got {:?}", err);

    let err = client.remove_transfer_definition("HashlockTransfer").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotOwner), "got {:?}", err);

    assert!(chain.definitions().is_empty());
    assert_eq!(chain.transactions_mined(), 0);
    assert_eq!(client.signer_address(), Some(STRANGER.parse::<Address>().unwrap()));
}
