//! Webhook notifier
//!
//! Fans a transaction status change out to every active binding of the user
//! that has webhook delivery configured. Each POST is fire-and-forget on
//! its own task with a bounded timeout; there are no retries and the
//! outcome is only logged.

use chrono::Utc;
use metrics::counter;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::adapters::settings::WebhookSettings;
use crate::models::TransactionStatus;
use crate::repositories::UserProviderRepository;

/// User-Agent header on every webhook POST.
const WEBHOOK_USER_AGENT: &str = "chat-gateway-Webhook";

/// Wall-clock budget for one webhook POST.
const POST_TIMEOUT: Duration = Duration::from_secs(10);

/// Wire payload of a status notification.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub message_id: i64,
    pub user_id: i64,
    pub status: String,
    /// Unix seconds at emission time
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Builds the notification payload for one terminal transition.
pub fn build_payload(
    transaction_id: i64,
    user_id: i64,
    status: TransactionStatus,
    error: Option<String>,
) -> WebhookPayload {
    WebhookPayload {
        message_id: transaction_id,
        user_id,
        status: status.as_str().to_string(),
        timestamp: Utc::now().timestamp(),
        error: error.filter(|e| !e.is_empty()),
    }
}

/// Fire-and-forget webhook fan-out
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    user_providers: UserProviderRepository,
}

impl WebhookNotifier {
    pub fn new(user_providers: UserProviderRepository) -> Self {
        let client = Client::builder()
            .timeout(POST_TIMEOUT)
            .user_agent(WEBHOOK_USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            user_providers,
        }
    }

    /// Emits one notification per webhook-enabled active binding of the
    /// user. Delivery happens on detached tasks; this method only fails on
    /// a binding lookup error.
    pub async fn notify(
        &self,
        user_id: i64,
        transaction_id: i64,
        status: TransactionStatus,
        error: Option<String>,
    ) {
        let bindings = match self.user_providers.find_active_by_user(user_id).await {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!(
                    user_id,
                    transaction_id,
                    error = %e,
                    "Failed to load bindings for webhook fan-out"
                );
                return;
            }
        };

        let payload = build_payload(transaction_id, user_id, status, error);

        for binding in bindings {
            let Some(settings) = WebhookSettings::from_config(binding.config.as_ref()) else {
                continue;
            };
            if !settings.is_deliverable() {
                continue;
            }

            let client = self.client.clone();
            let payload = payload.clone();
            let url = settings.webhook_url;
            tokio::spawn(async move {
                post_notification(client, url, payload).await;
            });
        }
    }
}

async fn post_notification(client: Client, url: String, payload: WebhookPayload) {
    let transaction_id = payload.message_id;
    let target = redacted_target(&url);
    match client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await
    {
        Ok(response) => {
            counter!("webhook_notifications_sent_total").increment(1);
            info!(
                transaction_id,
                target = %target,
                status_code = response.status().as_u16(),
                "Webhook notification sent"
            );
        }
        Err(e) => {
            counter!("webhook_notifications_failed_total").increment(1);
            debug!(transaction_id, target = %target, error = %e, "Webhook notification failed");
        }
    }
}

/// Webhook URLs may carry tokens in path or query; logs only see
/// scheme and host.
fn redacted_target(webhook_url: &str) -> String {
    Url::parse(webhook_url)
        .ok()
        .map(|parsed| {
            let scheme = parsed.scheme();
            let host = parsed.host_str().unwrap_or("unknown");
            format!("{}://{}", scheme, host)
        })
        .unwrap_or_else(|| "[invalid-url]".to_string())
}
