//! Dispatcher
//!
//! Synchronous entry point of the dispatch core: validates a submission,
//! enforces the daily quota, selects the initial provider, persists the
//! pending transaction, and offers it to the worker pool. Also serves the
//! read-side status and listing operations.

use anyhow::{Context, anyhow};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::{Value as JsonValue, json};
use tracing::{info, warn};

use crate::error::SubmitError;
use crate::models::{ProviderKind, TransactionStatus, message_transaction};
use crate::repositories::{
    MessageTransactionHistoryRepository, MessageTransactionRepository, NewTransaction,
    ProviderRepository, UserProviderRepository, UserRepository,
};

use super::queue::DispatchQueue;
use super::selection;

/// A request to deliver one message.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub user_id: i64,
    /// Optional provider kind tag steering the initial selection
    pub kind_hint: Option<String>,
    pub body: String,
    pub recipients: Vec<String>,
}

/// Acknowledgement returned by a successful submission.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub id: i64,
    pub status: TransactionStatus,
    pub note: String,
}

/// Read-side projection of a transaction for the status operation.
#[derive(Debug, Clone)]
pub struct TransactionStatusView {
    pub id: i64,
    pub status: String,
    pub body: String,
    pub recipients: JsonValue,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// Synchronous submission and status use case
#[derive(Clone)]
pub struct Dispatcher {
    users: UserRepository,
    providers: ProviderRepository,
    user_providers: UserProviderRepository,
    transactions: MessageTransactionRepository,
    history: MessageTransactionHistoryRepository,
    queue: DispatchQueue,
}

impl Dispatcher {
    pub fn new(
        users: UserRepository,
        providers: ProviderRepository,
        user_providers: UserProviderRepository,
        transactions: MessageTransactionRepository,
        history: MessageTransactionHistoryRepository,
        queue: DispatchQueue,
    ) -> Self {
        Self {
            users,
            providers,
            user_providers,
            transactions,
            history,
            queue,
        }
    }

    /// Accepts a message for dispatch and returns the pending transaction
    /// id. Everything after the enqueue is asynchronous and observable only
    /// through `status`, webhooks, and logs.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitReceipt, SubmitError> {
        if request.body.trim().is_empty() {
            return Err(SubmitError::Validation("message body is empty".to_string()));
        }
        if request.recipients.is_empty() {
            return Err(SubmitError::Validation(
                "at least one recipient is required".to_string(),
            ));
        }

        let user = self
            .users
            .find_by_id(request.user_id)
            .await
            .context("failed to load user")?
            .ok_or_else(|| anyhow!("user {} not found", request.user_id))?;

        let sent_today = self
            .transactions
            .count_user_messages_for_today(user.id)
            .await
            .context("failed to count today's messages")? as i64;

        if sent_today >= user.daily_message_limit as i64 {
            warn!(
                user_id = user.id,
                sent_today,
                limit = user.daily_message_limit,
                "User exceeded daily message rate limit"
            );
            return Err(SubmitError::RateLimited {
                limit: user.daily_message_limit as i64,
                sent_today,
            });
        }

        let bindings = self
            .user_providers
            .find_by_user_ordered(user.id)
            .await
            .context("failed to load user provider bindings")?;

        if bindings.is_empty() {
            return Err(SubmitError::NoProviders { user_id: user.id });
        }

        let provider_ids: Vec<i64> = bindings.iter().map(|b| b.provider_id).collect();
        let providers = self
            .providers
            .find_by_ids(&provider_ids)
            .await
            .context("failed to load providers for selection")?;

        let kind_hint = match request.kind_hint.as_deref() {
            Some(tag) => {
                let parsed = ProviderKind::from_tag(tag);
                if parsed.is_none() {
                    warn!(
                        user_id = user.id,
                        kind = tag,
                        "Unknown provider kind hint, ignoring"
                    );
                }
                parsed
            }
            None => None,
        };

        let selected = selection::select_provider(&bindings, &providers, kind_hint)
            .ok_or_else(|| anyhow!("no active provider binding for user {}", user.id))?;

        if selected.hint_fallback {
            warn!(
                user_id = user.id,
                kind = request.kind_hint.as_deref().unwrap_or_default(),
                provider_id = selected.binding.provider_id,
                "No provider matched the requested kind, using highest priority provider"
            );
        }

        let created = self
            .transactions
            .create(NewTransaction {
                user_id: user.id,
                provider_id: selected.binding.provider_id,
                recipients: json!(request.recipients),
                body: request.body,
                retry_count: 0,
            })
            .await?;

        // Non-blocking; a dropped enqueue is recovered by the scanner's
        // pending sweep.
        self.queue.enqueue(created.clone());

        info!(
            user_id = user.id,
            provider_id = created.provider_id,
            transaction_id = created.id,
            "Message queued for processing"
        );

        Ok(SubmitReceipt {
            id: created.id,
            status: TransactionStatus::Pending,
            note: "Message queued for processing".to_string(),
        })
    }

    /// Reads the current state of a transaction. Falls back to the most
    /// recent history row when the active row is gone.
    pub async fn status(&self, id: i64) -> anyhow::Result<Option<TransactionStatusView>> {
        if let Some(row) = self.transactions.find_by_id(id).await? {
            return Ok(Some(TransactionStatusView {
                id: row.id,
                status: row.status,
                body: row.body,
                recipients: row.recipients,
                error_message: row.error_message,
                retry_count: row.retry_count,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }));
        }

        let archived = self.history.find_latest_by_original_id(id).await?;
        Ok(archived.map(|row| TransactionStatusView {
            id: row.original_id,
            status: row.status,
            body: row.body,
            recipients: row.recipients,
            error_message: row.error_message,
            retry_count: row.retry_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Lists a user's transactions, newest first.
    pub async fn list_user_transactions(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<message_transaction::Model>> {
        self.transactions.find_by_user(user_id).await
    }
}
