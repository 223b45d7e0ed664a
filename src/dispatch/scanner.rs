//! Recovery scanner
//!
//! Periodic safety net over the transaction store. Each tick runs two
//! passes: Pass A claims pending rows that never reached a worker (startup
//! catch-up after a crash and dropped enqueues), Pass B treats successful
//! rows with no delivery signal for five minutes as undelivered and hands
//! the message to an alternative provider. A third sweep releases
//! reservations stranded by dropped enqueues.

use chrono::Duration;
use metrics::{counter, histogram};
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::models::TransactionStatus;
use crate::repositories::{
    MessageTransactionRepository, NewTransaction, TransactionUpdate, UserProviderRepository,
};

use super::queue::DispatchQueue;
use super::selection;

/// Error message recorded on a row whose delivery was presumed failed.
const FALLBACK_ERROR_MESSAGE: &str =
    "Message not delivered within 5 minutes, fallback to alternative provider triggered";

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Seconds between ticks
    pub interval_seconds: u64,
    /// Maximum number of pending rows claimed per tick
    pub claim_batch: u64,
    /// Age after which a successful row counts as undelivered
    pub stale_success_window: Duration,
    /// Age after which a pending reservation counts as stranded
    pub stranded_window: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            claim_batch: 1000,
            stale_success_window: Duration::minutes(5),
            stranded_window: Duration::minutes(10),
        }
    }
}

/// Background recovery service
#[derive(Clone)]
pub struct RecoveryScanner {
    transactions: MessageTransactionRepository,
    user_providers: UserProviderRepository,
    queue: DispatchQueue,
    config: ScannerConfig,
}

impl RecoveryScanner {
    pub fn new(
        transactions: MessageTransactionRepository,
        user_providers: UserProviderRepository,
        queue: DispatchQueue,
        config: ScannerConfig,
    ) -> Self {
        Self {
            transactions,
            user_providers,
            queue,
            config,
        }
    }

    /// Runs the scanner loop until the shutdown token fires. The first tick
    /// happens synchronously at startup so crash recovery does not wait for
    /// the interval.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_seconds = self.config.interval_seconds,
            "Starting recovery scanner"
        );
        let tick_interval = TokioDuration::from_secs(self.config.interval_seconds);

        loop {
            let tick_started = Instant::now();
            self.tick().await;
            histogram!("recovery_scanner_tick_duration_ms")
                .record(tick_started.elapsed().as_secs_f64() * 1_000.0);

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(tick_interval) => {}
            }
        }

        info!("Recovery scanner stopped");
    }

    /// Executes one scan: pending pickup, non-delivery fallback, stranded
    /// reservation reclaim. Pass failures are logged and do not stop the
    /// other passes.
    pub async fn tick(&self) {
        if let Err(e) = self.pass_pending_pickup().await {
            error!(error = %e, "Pending pickup pass failed");
        }
        if let Err(e) = self.pass_non_delivery_fallback().await {
            error!(error = %e, "Non-delivery fallback pass failed");
        }
        if let Err(e) = self.reclaim_stranded().await {
            error!(error = %e, "Stranded reservation sweep failed");
        }
    }

    /// Pass A: claim pending rows and offer them to the worker pool. Rows
    /// whose enqueue is dropped keep their reservation until the stranded
    /// sweep releases them.
    async fn pass_pending_pickup(&self) -> anyhow::Result<usize> {
        let claimed = self
            .transactions
            .claim_pending_batch(self.config.claim_batch)
            .await?;

        if claimed.is_empty() {
            return Ok(0);
        }

        info!(count = claimed.len(), "Found pending messages to process");

        let mut enqueued = 0;
        for transaction in claimed {
            if self.queue.enqueue(transaction) {
                enqueued += 1;
            }
        }

        counter!("recovery_pending_enqueued_total").increment(enqueued as u64);
        Ok(enqueued)
    }

    /// Pass B: presume non-delivery for stale successful rows and reroute
    /// through the first binding targeting a different provider.
    async fn pass_non_delivery_fallback(&self) -> anyhow::Result<usize> {
        let stale = self
            .transactions
            .find_success_stale(self.config.stale_success_window)
            .await?;

        if stale.is_empty() {
            return Ok(0);
        }

        info!(count = stale.len(), "Found undelivered messages to process");

        let mut rerouted = 0;
        for original in stale {
            let bindings = self
                .user_providers
                .find_by_user_ordered(original.user_id)
                .await?;

            let Some(alternative) = selection::first_alternative(&bindings, original.provider_id)
            else {
                warn!(
                    user_id = original.user_id,
                    transaction_id = original.id,
                    "No alternative provider found for fallback"
                );
                continue;
            };

            info!(
                user_id = original.user_id,
                transaction_id = original.id,
                original_provider_id = original.provider_id,
                new_provider_id = alternative.provider_id,
                "Found alternative provider for fallback"
            );

            let child = self
                .transactions
                .create(NewTransaction {
                    user_id: original.user_id,
                    provider_id: alternative.provider_id,
                    recipients: original.recipients.clone(),
                    body: original.body.clone(),
                    retry_count: 0,
                })
                .await?;

            let update = TransactionUpdate {
                status: Some(TransactionStatus::FallbackTriggered),
                error_message: Some(Some(FALLBACK_ERROR_MESSAGE.to_string())),
                processing: Some(false),
                ..Default::default()
            };
            if let Err(e) = self
                .transactions
                .apply_outcome_and_archive(original.id, update)
                .await
            {
                error!(
                    transaction_id = original.id,
                    error = %e,
                    "Failed to mark original message as fallback triggered"
                );
            }

            self.queue.enqueue(child);
            rerouted += 1;
            counter!("recovery_fallbacks_triggered_total").increment(1);
        }

        Ok(rerouted)
    }

    /// Releases pending reservations whose enqueue was dropped, handing the
    /// rows back to Pass A on a later tick.
    async fn reclaim_stranded(&self) -> anyhow::Result<u64> {
        let reclaimed = self
            .transactions
            .reclaim_stranded(self.config.stranded_window)
            .await?;

        if reclaimed > 0 {
            warn!(count = reclaimed, "Reclaimed stranded message reservations");
            counter!("recovery_stranded_reclaimed_total").increment(reclaimed);
        } else {
            debug!("No stranded reservations found");
        }

        Ok(reclaimed)
    }
}
