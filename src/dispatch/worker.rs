//! Worker pool
//!
//! A fixed set of long-lived tasks draining the dispatch queue. Each worker
//! resolves the provider, hands the message to the adapter, writes the
//! outcome (active-row update plus history insert in one database
//! transaction), and fires the webhook fan-out.

use chrono::{Duration, Utc};
use metrics::counter;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapters::AdapterRegistry;
use crate::error::AdapterError;
use crate::models::{TransactionStatus, message_transaction};
use crate::repositories::{
    MessageTransactionRepository, ProviderRepository, TransactionUpdate, UserProviderRepository,
};

use super::queue::DispatchQueue;
use super::webhook::WebhookNotifier;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of concurrent worker tasks
    pub worker_count: usize,
    /// Delay before a failed transaction becomes eligible for retry
    pub retry_backoff: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 100,
            retry_backoff: Duration::minutes(3),
        }
    }
}

/// Pool of workers processing queued message transactions
#[derive(Clone)]
pub struct WorkerPool {
    queue: DispatchQueue,
    providers: ProviderRepository,
    user_providers: UserProviderRepository,
    transactions: MessageTransactionRepository,
    registry: Arc<AdapterRegistry>,
    notifier: WebhookNotifier,
    config: WorkerPoolConfig,
}

impl WorkerPool {
    pub fn new(
        queue: DispatchQueue,
        providers: ProviderRepository,
        user_providers: UserProviderRepository,
        transactions: MessageTransactionRepository,
        registry: Arc<AdapterRegistry>,
        notifier: WebhookNotifier,
        config: WorkerPoolConfig,
    ) -> Self {
        Self {
            queue,
            providers,
            user_providers,
            transactions,
            registry,
            notifier,
            config,
        }
    }

    /// Spawns the worker tasks. Workers exit when the shutdown token fires
    /// or the queue is closed and drained; each finishes its in-flight
    /// transaction first.
    pub fn spawn(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        info!(
            worker_count = self.config.worker_count,
            "Starting message dispatch workers"
        );

        (0..self.config.worker_count)
            .map(|worker_id| {
                let pool = self.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    pool.run_worker(worker_id, shutdown).await;
                })
            })
            .collect()
    }

    async fn run_worker(&self, worker_id: usize, shutdown: CancellationToken) {
        debug!(worker_id, "Worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.queue.recv() => match received {
                    Some(transaction) => self.process(transaction).await,
                    None => break,
                },
            }
        }

        debug!(worker_id, "Worker stopped");
    }

    /// Processes one claimed transaction through its provider adapter and
    /// persists the terminal outcome.
    pub async fn process(&self, transaction: message_transaction::Model) {
        debug!(
            transaction_id = transaction.id,
            user_id = transaction.user_id,
            provider_id = transaction.provider_id,
            "Processing message transaction"
        );

        let provider = match self.providers.find_by_id(transaction.provider_id).await {
            Ok(Some(provider)) => provider,
            Ok(None) => {
                self.fail(
                    &transaction,
                    format!("provider {} not found", transaction.provider_id),
                )
                .await;
                return;
            }
            Err(e) => {
                error!(
                    transaction_id = transaction.id,
                    error = %e,
                    "Failed to load provider, leaving transaction for recovery"
                );
                return;
            }
        };

        if !provider.active {
            warn!(
                transaction_id = transaction.id,
                provider_id = provider.id,
                "Provider is inactive"
            );
            self.fail(&transaction, "provider is inactive".to_string())
                .await;
            return;
        }

        let recipients: Vec<String> =
            match serde_json::from_value(transaction.recipients.clone()) {
                Ok(recipients) => recipients,
                Err(e) => {
                    self.fail(&transaction, format!("malformed recipient list: {e}"))
                        .await;
                    return;
                }
            };

        let adapter = match self.registry.get_by_tag(&provider.kind) {
            Ok(adapter) => adapter,
            Err(e) => {
                self.fail(&transaction, e.to_string()).await;
                return;
            }
        };

        let bindings = match self
            .user_providers
            .find_by_user_ordered(transaction.user_id)
            .await
        {
            Ok(bindings) => bindings,
            Err(e) => {
                error!(
                    transaction_id = transaction.id,
                    error = %e,
                    "Failed to load bindings, leaving transaction for recovery"
                );
                return;
            }
        };

        // A user may have unbound the provider since the transaction was
        // created; adapters see that as an absent binding.
        let binding = bindings
            .into_iter()
            .find(|b| b.provider_id == transaction.provider_id);

        match adapter
            .send(
                &provider,
                binding.as_ref(),
                &recipients,
                &transaction.body,
            )
            .await
        {
            Ok(outcome) => {
                counter!("dispatch_sends_succeeded_total").increment(1);

                let update = TransactionUpdate {
                    status: Some(TransactionStatus::Success),
                    request_data: Some(Some(outcome.request_data)),
                    response_data: Some(Some(outcome.response_data)),
                    error_message: Some(None),
                    processing: Some(false),
                    ..Default::default()
                };

                if let Err(e) = self
                    .transactions
                    .apply_outcome_and_archive(transaction.id, update)
                    .await
                {
                    error!(
                        transaction_id = transaction.id,
                        error = %e,
                        "Failed to persist successful outcome"
                    );
                    return;
                }

                info!(
                    transaction_id = transaction.id,
                    user_id = transaction.user_id,
                    provider_id = transaction.provider_id,
                    "Message sent successfully"
                );

                self.notifier
                    .notify(
                        transaction.user_id,
                        transaction.id,
                        TransactionStatus::Success,
                        None,
                    )
                    .await;
            }
            Err(e) => {
                counter!("dispatch_sends_failed_total").increment(1);

                if let AdapterError::RateLimited {
                    challenge_tokens, ..
                } = &e
                {
                    warn!(
                        transaction_id = transaction.id,
                        provider_id = transaction.provider_id,
                        challenge_tokens = ?challenge_tokens,
                        "Provider rate limited the send"
                    );
                }

                self.fail(&transaction, e.to_string()).await;
            }
        }
    }

    /// Marks a transaction failed with a retry window, archives it, and
    /// notifies subscribers. The `failed` webhook is a per-attempt signal;
    /// a retry chain may still follow.
    async fn fail(&self, transaction: &message_transaction::Model, message: String) {
        let next_retry_at = (Utc::now() + self.config.retry_backoff).fixed_offset();

        let update = TransactionUpdate {
            status: Some(TransactionStatus::Failed),
            error_message: Some(Some(message.clone())),
            next_retry_at: Some(Some(next_retry_at)),
            processing: Some(false),
            ..Default::default()
        };

        if let Err(e) = self
            .transactions
            .apply_outcome_and_archive(transaction.id, update)
            .await
        {
            error!(
                transaction_id = transaction.id,
                error = %e,
                "Failed to persist failed outcome"
            );
            return;
        }

        error!(
            transaction_id = transaction.id,
            user_id = transaction.user_id,
            provider_id = transaction.provider_id,
            error = %message,
            next_retry_at = %next_retry_at,
            "Message send failed"
        );

        self.notifier
            .notify(
                transaction.user_id,
                transaction.id,
                TransactionStatus::Failed,
                Some(message),
            )
            .await;
    }
}
