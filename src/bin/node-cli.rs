use alloy::primitives::{Address, Bytes};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use channel_node_client::config::{load_config, ClientConfig};
use channel_node_client::node::{SendDepositTxParams, SetupParams};
use channel_node_client::transfer_registry::{
    signer_from_env, RegisteredTransfer, RegistryError, TransferRegistryClient,
};
use channel_node_client::{EventDispatcher, NodeClient, ServerNodeError};

#[derive(Parser)]
#[command(name = "node-cli")]
#[command(about = "Operator CLI for a payment-channel server node", long_about = None)]
struct Cli {
    /// Client configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `node.url` from the configuration.
    #[arg(short = 'u', long)]
    node_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the node's identity
    Config,
    /// Look up a channel by address
    Channel { channel_address: Address },
    /// Look up the channel between two participants on a chain
    ChannelByParticipants {
        alice: String,
        bob: String,
        chain_id: u64,
    },
    /// Open a channel with a counterparty
    Setup {
        counterparty: String,
        chain_id: u64,
        /// Dispute timeout in seconds
        #[arg(long, default_value = "86400")]
        timeout: String,
    },
    /// Deposit into a channel and wait for confirmation
    Deposit {
        channel_address: Address,
        amount: String,
        chain_id: u64,
        #[arg(long, default_value_t = Address::ZERO)]
        asset_id: Address,
    },
    /// List transfer definitions registered on chain
    TransferDefinitions {
        #[command(flatten)]
        registry: RegistryArgs,
    },
    /// Register a transfer definition (key from NODE_CLIENT_REGISTRY_KEY)
    AddTransferDefinition {
        #[command(flatten)]
        registry: RegistryArgs,
        name: String,
        /// Definition contract address
        definition: Address,
        #[arg(long)]
        state_encoding: String,
        #[arg(long)]
        resolver_encoding: String,
        #[arg(long, default_value = "0x")]
        encoded_cancel: Bytes,
    },
    /// Remove a transfer definition by name (key from NODE_CLIENT_REGISTRY_KEY)
    RemoveTransferDefinition {
        #[command(flatten)]
        registry: RegistryArgs,
        name: String,
    },
}

#[derive(Args)]
struct RegistryArgs {
    #[arg(long)]
    rpc_url: String,
    /// TransferRegistry contract address
    #[arg(long)]
    registry: Address,
}

impl RegistryArgs {
    fn reader(&self) -> Result<TransferRegistryClient, RegistryError> {
        TransferRegistryClient::connect(&self.rpc_url, self.registry, None)
    }

    fn owner(&self) -> Result<TransferRegistryClient, RegistryError> {
        TransferRegistryClient::connect(&self.rpc_url, self.registry, Some(signer_from_env()?))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = cli.node_url {
        config.node.url = url;
    }

    match cli.command {
        Commands::Config => print_json(&node_client(&config).await?.get_config().await?),
        Commands::Channel { channel_address } => {
            print_optional(node_client(&config).await?.get_state_channel(channel_address).await?)
        }
        Commands::ChannelByParticipants { alice, bob, chain_id } => print_optional(
            node_client(&config)
                .await?
                .get_state_channel_by_participants(&alice, &bob, chain_id)
                .await?,
        ),
        Commands::Setup {
            counterparty,
            chain_id,
            timeout,
        } => {
            let params = SetupParams {
                counterparty_identifier: counterparty,
                chain_id,
                timeout,
            };
            print_json(&node_client(&config).await?.setup(&params).await?)
        }
        Commands::Deposit {
            channel_address,
            amount,
            chain_id,
            asset_id,
        } => {
            let params = SendDepositTxParams {
                channel_address,
                amount,
                asset_id,
                chain_id,
            };
            print_json(&node_client(&config).await?.deposit(&params, chain_id).await?)
        }
        Commands::TransferDefinitions { registry } => {
            let definitions: Vec<_> = registry
                .reader()?
                .transfer_definitions()
                .await?
                .iter()
                .map(definition_json)
                .collect();
            print_json(&definitions)
        }
        Commands::AddTransferDefinition {
            registry,
            name,
            definition,
            state_encoding,
            resolver_encoding,
            encoded_cancel,
        } => {
            let definition = RegisteredTransfer {
                name,
                definition,
                stateEncoding: state_encoding,
                resolverEncoding: resolver_encoding,
                encodedCancel: encoded_cancel,
            };
            let tx_hash = registry.owner()?.add_transfer_definition(definition).await?;
            print_json(&serde_json::json!({ "txHash": tx_hash }))
        }
        Commands::RemoveTransferDefinition { registry, name } => {
            let tx_hash = registry.owner()?.remove_transfer_definition(&name).await?;
            print_json(&serde_json::json!({ "txHash": tx_hash }))
        }
    }
}

async fn node_client(config: &ClientConfig) -> Result<NodeClient, ServerNodeError> {
    NodeClient::connect(config, EventDispatcher::new()).await
}

fn definition_json(definition: &RegisteredTransfer) -> serde_json::Value {
    serde_json::json!({
        "name": definition.name,
        "definition": definition.definition,
        "stateEncoding": definition.stateEncoding,
        "resolverEncoding": definition.resolverEncoding,
        "encodedCancel": definition.encodedCancel,
    })
}

fn print_optional<T: Serialize>(value: Option<T>) -> Result<(), Box<dyn std::error::Error>> {
    match value {
        Some(value) => print_json(&value),
        None => {
            eprintln!("Not found");
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
