//! Channel node client daemon.
//!
//! ```text
//!     config (TOML)
//!         │
//!         ├─▶ webhook receiver (axum) ─▶ EventDispatcher ─▶ logging listeners
//!         │
//!         └─▶ NodeClient::connect ─▶ subscribe to every engine event
//! ```
//!
//! Runs until Ctrl+C.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::watch;
use url::Url;

use channel_node_client::config::{load_config, ClientConfig};
use channel_node_client::events::{webhook, ConditionalTransferCreated, ConditionalTransferResolved};
use channel_node_client::observability::{init_metrics, init_tracing};
use channel_node_client::{EventDispatcher, NodeClient};

#[derive(Parser)]
#[command(name = "channel-node-client")]
#[command(about = "Connects to a server node and logs its engine events", long_about = None)]
struct Args {
    /// Client configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    init_tracing(&config.observability)?;
    tracing::info!("channel-node-client v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        node_url = %config.node.url,
        callback_url_base = %config.node.callback_url_base,
        chains = config.chains.len(),
        confirmation_timeout_secs = config.confirmation.timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The receiver must be up before the node is told where to deliver.
    let dispatcher = EventDispatcher::new();
    let callback_base = Url::parse(&config.node.callback_url_base)?;
    let app = webhook::mount(
        webhook::router_with_limit(dispatcher.clone(), config.webhook.max_body_bytes),
        &callback_base,
    );
    let listener = TcpListener::bind(&config.webhook.bind_address).await?;

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(webhook::serve(listener, app, async move {
        let _ = shutdown_rx.changed().await;
    }));

    let client = NodeClient::connect(&config, dispatcher).await?;

    client
        .on(
            |event: ConditionalTransferCreated| async move {
                tracing::info!(
                    channel_address = %event.channel_address,
                    transfer_id = %event.transfer.transfer_id,
                    condition_type = %event.condition_type,
                    "Conditional transfer created"
                );
            },
            None,
        )
        .await?;
    client
        .on(
            |event: ConditionalTransferResolved| async move {
                tracing::info!(
                    channel_address = %event.channel_address,
                    transfer_id = %event.transfer.transfer_id,
                    condition_type = %event.condition_type,
                    "Conditional transfer resolved"
                );
            },
            None,
        )
        .await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    server.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
