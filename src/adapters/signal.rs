//! Signal adapter
//!
//! Hands messages to a signal-cli JSON-RPC 2.0 endpoint over HTTP. Only the
//! send contract is implemented here; account registration, receiving, and
//! group management belong to the external signal tooling.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AdapterError;
use crate::models::{provider, user_provider};

use super::settings::{ProviderSettings, SignalSettings};
use super::trait_::{ProviderAdapter, SendOutcome};

/// JSON-RPC error code signal-cli uses for proof-of-work rate limiting.
const RATE_LIMIT_ERROR_CODE: i64 = -5;

/// Wall-clock budget for one send round-trip.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<JsonValue>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<JsonValue>,
}

/// Adapter speaking the signal-cli JSON-RPC send protocol
#[derive(Debug)]
pub struct SignalAdapter {
    client: Client,
    request_seq: AtomicU64,
}

impl SignalAdapter {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            request_seq: AtomicU64::new(1),
        }
    }

    fn next_request_id(&self) -> String {
        self.request_seq.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

impl Default for SignalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the JSON-RPC send envelope for one message.
fn build_send_request(
    request_id: &str,
    settings: &SignalSettings,
    recipients: &[String],
    body: &str,
) -> JsonValue {
    json!({
        "jsonrpc": "2.0",
        "method": "send",
        "id": request_id,
        "params": {
            "account": settings.from_number,
            "recipient": recipients,
            "message": body,
        },
    })
}

/// Maps a JSON-RPC error body to the adapter error taxonomy. Code −5
/// carries the proof-of-work challenge tokens in
/// `data.response.results[].token`.
fn classify_rpc_error(error: RpcError) -> AdapterError {
    if error.code == RATE_LIMIT_ERROR_CODE {
        let challenge_tokens = error
            .data
            .as_ref()
            .and_then(|data| data.get("response"))
            .and_then(|response| response.get("results"))
            .and_then(|results| results.as_array())
            .map(|results| {
                results
                    .iter()
                    .filter_map(|r| r.get("token"))
                    .filter_map(|t| t.as_str())
                    .map(|t| t.to_string())
                    .collect()
            })
            .unwrap_or_default();

        return AdapterError::RateLimited {
            challenge_tokens,
            message: error.message,
        };
    }

    AdapterError::Transient(format!(
        "signal rpc error {}: {}",
        error.code, error.message
    ))
}

#[async_trait]
impl ProviderAdapter for SignalAdapter {
    async fn send(
        &self,
        provider: &provider::Model,
        _binding: Option<&user_provider::Model>,
        recipients: &[String],
        body: &str,
    ) -> Result<SendOutcome, AdapterError> {
        let settings = match ProviderSettings::decode(provider)? {
            ProviderSettings::Signal(settings) => settings,
            _ => {
                return Err(AdapterError::Permanent(format!(
                    "provider '{}' is not a signal provider",
                    provider.name
                )));
            }
        };

        let request_id = self.next_request_id();
        let request = build_send_request(&request_id, &settings, recipients, body);

        debug!(
            provider = %provider.name,
            request_id = %request_id,
            recipients = recipients.len(),
            "Dispatching signal send"
        );

        let response = self
            .client
            .post(&settings.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdapterError::Transient(format!("signal rpc transport error: {e}")))?;

        let http_status = response.status();
        if !http_status.is_success() {
            return Err(AdapterError::Transient(format!(
                "signal rpc endpoint returned HTTP {http_status}"
            )));
        }

        let rpc: RpcResponse = response.json().await.map_err(|e| {
            AdapterError::Transient(format!("malformed signal rpc response: {e}"))
        })?;

        if let Some(error) = rpc.error {
            let classified = classify_rpc_error(error);
            if let AdapterError::RateLimited {
                challenge_tokens, ..
            } = &classified
            {
                warn!(
                    provider = %provider.name,
                    tokens = challenge_tokens.len(),
                    "Signal rate limited the send"
                );
            }
            return Err(classified);
        }

        let result = rpc.result.unwrap_or(JsonValue::Null);

        Ok(SendOutcome {
            request_data: request["params"].clone(),
            response_data: result,
        })
    }
}
