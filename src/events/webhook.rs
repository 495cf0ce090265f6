//! HTTP receiver for node webhooks.
//!
//! # Responsibilities
//! - Expose one POST route per engine event
//! - Decode the payload and hand it to the dispatcher
//! - Mount under the path of the configured callback base URL
//!
//! The node only needs a 2xx to consider a delivery done; listener
//! execution happens after the response is sent.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use url::Url;

use crate::events::dispatcher::EventDispatcher;
use crate::events::types::{
    ConditionalTransferCreated, ConditionalTransferResolved, EngineEventName, EngineEventPayload,
};

/// Default body limit when none is configured.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Response returned to the node for each delivery.
#[derive(Debug, Serialize)]
pub struct DeliveryReceipt {
    pub event: EngineEventName,
    pub delivered: usize,
}

/// Build the webhook routes, relative to the callback base.
pub fn router(dispatcher: EventDispatcher) -> Router {
    router_with_limit(dispatcher, DEFAULT_MAX_BODY_BYTES)
}

/// Build the webhook routes with an explicit body size limit.
pub fn router_with_limit(dispatcher: EventDispatcher, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            &route_for(EngineEventName::ConditionalTransferCreated),
            post(deliver::<ConditionalTransferCreated>),
        )
        .route(
            &route_for(EngineEventName::ConditionalTransferResolved),
            post(deliver::<ConditionalTransferResolved>),
        )
        .with_state(dispatcher)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Nest `routes` under the path component of `callback_url_base`.
///
/// A base of `http://host:8080/hooks` yields `/hooks/conditional-transfer-created`.
pub fn mount(routes: Router, callback_url_base: &Url) -> Router {
    let prefix = callback_url_base.path().trim_end_matches('/');
    if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(prefix, routes)
    }
}

/// Serve the webhook app until `shutdown` resolves.
pub async fn serve<S>(listener: TcpListener, app: Router, shutdown: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Webhook receiver listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Webhook receiver stopped");
    Ok(())
}

fn route_for(event: EngineEventName) -> String {
    format!("/{}", event.callback_path())
}

async fn deliver<P: EngineEventPayload>(
    State(dispatcher): State<EventDispatcher>,
    Json(payload): Json<P>,
) -> Json<DeliveryReceipt> {
    let delivered = dispatcher.dispatch(payload.into_event());
    Json(DeliveryReceipt {
        event: P::EVENT,
        delivered,
    })
}
