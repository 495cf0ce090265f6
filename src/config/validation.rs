//! Configuration validation.
//!
//! Serde handles syntax; this pass checks URLs, timeouts and chain entries and
//! returns every problem found rather than stopping at the first.

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is not a valid http(s) URL: '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("chain {0} is configured more than once")]
    DuplicateChain(u64),

    #[error("RPC URL for chain {chain_id} is invalid: '{url}'")]
    InvalidRpcUrl { chain_id: u64, url: String },

    #[error("{field} is not a valid socket address: '{value}'")]
    InvalidBindAddress { field: &'static str, value: String },
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_http_url(&config.node.url) {
        errors.push(ValidationError::InvalidUrl {
            field: "node.url",
            value: config.node.url.clone(),
        });
    }
    if !is_http_url(&config.node.callback_url_base) {
        errors.push(ValidationError::InvalidUrl {
            field: "node.callback_url_base",
            value: config.node.callback_url_base.clone(),
        });
    }
    if config.node.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("node.request_timeout_secs"));
    }

    let mut seen = HashSet::new();
    for chain in &config.chains {
        if !seen.insert(chain.chain_id) {
            errors.push(ValidationError::DuplicateChain(chain.chain_id));
        }
        if !is_http_url(&chain.rpc_url) {
            errors.push(ValidationError::InvalidRpcUrl {
                chain_id: chain.chain_id,
                url: chain.rpc_url.clone(),
            });
        }
    }

    if config.confirmation.timeout_secs == 0 {
        errors.push(ValidationError::Zero("confirmation.timeout_secs"));
    }
    if config.confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::Zero("confirmation.poll_interval_ms"));
    }
    if config.confirmation.confirmations == 0 {
        errors.push(ValidationError::Zero("confirmation.confirmations"));
    }
    if config.confirmation.max_rpc_failures == 0 {
        errors.push(ValidationError::Zero("confirmation.max_rpc_failures"));
    }

    if config.webhook.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field: "webhook.bind_address",
            value: config.webhook.bind_address.clone(),
        });
    }
    if config.webhook.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("webhook.max_body_bytes"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidBindAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}
