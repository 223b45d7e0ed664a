//! Retry planner
//!
//! On-demand replanning of failed transactions onto the next provider in
//! the user's priority chain. Invoked by an external scheduler tick; each
//! invocation consumes the due failed rows exactly once.

use tracing::{debug, info, warn};

use crate::repositories::{
    MessageTransactionRepository, NewTransaction, ProviderRepository, TransactionUpdate,
    UserProviderRepository,
};

use super::queue::DispatchQueue;
use super::selection::{self, NextInChain};

/// Failed-transaction replanner
#[derive(Clone)]
pub struct RetryPlanner {
    transactions: MessageTransactionRepository,
    user_providers: UserProviderRepository,
    providers: ProviderRepository,
    queue: DispatchQueue,
}

impl RetryPlanner {
    pub fn new(
        transactions: MessageTransactionRepository,
        user_providers: UserProviderRepository,
        providers: ProviderRepository,
        queue: DispatchQueue,
    ) -> Self {
        Self {
            transactions,
            user_providers,
            providers,
            queue,
        }
    }

    /// Plans successors for failed transactions whose retry window has
    /// elapsed.
    ///
    /// Every examined row has its `next_retry_at` cleared — successor
    /// created or not — so invoking the planner twice back to back creates
    /// no duplicates. The failed row itself is never re-dispatched; it was
    /// archived by the worker that failed it.
    pub async fn retry_failed(&self) -> anyhow::Result<()> {
        let due = self.transactions.find_failed_due_for_retry().await?;

        if due.is_empty() {
            debug!("No failed messages to retry");
            return Ok(());
        }

        info!(count = due.len(), "Found failed messages to retry");

        for failed in due {
            let bindings = self
                .user_providers
                .find_by_user_ordered(failed.user_id)
                .await?;

            if bindings.is_empty() {
                warn!(
                    user_id = failed.user_id,
                    transaction_id = failed.id,
                    "No providers configured for user, skipping retry"
                );
                self.consume(failed.id).await?;
                continue;
            }

            let provider_ids: Vec<i64> = bindings.iter().map(|b| b.provider_id).collect();
            let providers = self.providers.find_by_ids(&provider_ids).await?;

            match selection::next_in_chain(&bindings, &providers, failed.provider_id) {
                NextInChain::Next(next) => {
                    let child = self
                        .transactions
                        .create(NewTransaction {
                            user_id: failed.user_id,
                            provider_id: next.provider_id,
                            recipients: failed.recipients.clone(),
                            body: failed.body.clone(),
                            retry_count: failed.retry_count + 1,
                        })
                        .await?;

                    self.queue.enqueue(child.clone());

                    info!(
                        user_id = failed.user_id,
                        failed_transaction_id = failed.id,
                        transaction_id = child.id,
                        provider_id = next.provider_id,
                        retry_count = child.retry_count,
                        "Retry message queued for processing"
                    );
                }
                NextInChain::Inactive => {
                    warn!(
                        user_id = failed.user_id,
                        transaction_id = failed.id,
                        failed_provider_id = failed.provider_id,
                        "Next provider in chain is inactive, skipping retry"
                    );
                }
                NextInChain::Exhausted => {
                    warn!(
                        user_id = failed.user_id,
                        transaction_id = failed.id,
                        failed_provider_id = failed.provider_id,
                        "No next provider found for retry"
                    );
                }
            }

            self.consume(failed.id).await?;
        }

        Ok(())
    }

    /// Clears the retry window on a consumed failed row.
    async fn consume(&self, id: i64) -> anyhow::Result<()> {
        self.transactions
            .update(
                id,
                TransactionUpdate {
                    next_retry_at: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}
