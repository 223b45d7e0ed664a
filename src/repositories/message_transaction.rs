//! MessageTransaction repository
//!
//! Encapsulates every query the dispatch core performs against the active
//! transaction table: creation, typed partial updates, the atomic claim of
//! pending batches, the retry and stale-success scans, the daily rate-limit
//! count, and the transactional outcome-plus-archive write.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

use crate::error::StoreError;
use crate::models::TransactionStatus;
use crate::models::message_transaction::{
    self, ActiveModel, Column, Entity as MessageTransaction,
};
use crate::models::message_transaction_history::{
    self, Entity as MessageTransactionHistory,
};

/// Fields for creating a fresh pending transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub provider_id: i64,
    pub recipients: JsonValue,
    pub body: String,
    pub retry_count: i32,
}

/// Explicit partial update of a transaction row.
///
/// The outer `Option` means "leave unchanged"; the inner `Option` on
/// nullable columns means "set to NULL". `updated_at` is always refreshed.
#[derive(Debug, Default, Clone)]
pub struct TransactionUpdate {
    pub status: Option<TransactionStatus>,
    pub error_message: Option<Option<String>>,
    pub request_data: Option<Option<JsonValue>>,
    pub response_data: Option<Option<JsonValue>>,
    pub next_retry_at: Option<Option<DateTimeWithTimeZone>>,
    pub processing: Option<bool>,
    pub processed_at: Option<Option<DateTimeWithTimeZone>>,
}

impl TransactionUpdate {
    fn apply(self, model: message_transaction::Model) -> ActiveModel {
        let mut am: ActiveModel = model.into();

        if let Some(status) = self.status {
            am.status = Set(status.as_str().to_string());
        }
        if let Some(error_message) = self.error_message {
            am.error_message = Set(error_message);
        }
        if let Some(request_data) = self.request_data {
            am.request_data = Set(request_data);
        }
        if let Some(response_data) = self.response_data {
            am.response_data = Set(response_data);
        }
        if let Some(next_retry_at) = self.next_retry_at {
            am.next_retry_at = Set(next_retry_at);
        }
        if let Some(processing) = self.processing {
            am.processing = Set(processing);
        }
        if let Some(processed_at) = self.processed_at {
            am.processed_at = Set(processed_at);
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        am
    }
}

/// Repository for the active transaction table
#[derive(Debug, Clone)]
pub struct MessageTransactionRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageTransactionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a fresh `pending` transaction with `processing = false`.
    pub async fn create(&self, new: NewTransaction) -> Result<message_transaction::Model> {
        let now = Utc::now().fixed_offset();
        let am = ActiveModel {
            user_id: Set(new.user_id),
            provider_id: Set(new.provider_id),
            recipients: Set(new.recipients),
            body: Set(new.body),
            status: Set(TransactionStatus::Pending.as_str().to_string()),
            retry_count: Set(new.retry_count),
            processing: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = am
            .insert(&*self.db)
            .await
            .context("failed to create message transaction")?;

        debug!(
            transaction_id = created.id,
            user_id = created.user_id,
            provider_id = created.provider_id,
            "Created message transaction"
        );

        Ok(created)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<message_transaction::Model>> {
        let found = MessageTransaction::find_by_id(id).one(&*self.db).await?;
        Ok(found)
    }

    /// Returns a user's transactions, newest first.
    pub async fn find_by_user(&self, user_id: i64) -> Result<Vec<message_transaction::Model>> {
        let rows = MessageTransaction::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Applies a partial update to one row and returns the refreshed model.
    /// Raises [`StoreError::NotFound`] for an unknown id.
    pub async fn update(
        &self,
        id: i64,
        update: TransactionUpdate,
    ) -> Result<message_transaction::Model> {
        let existing = MessageTransaction::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or(StoreError::NotFound { id })?;

        let updated = update.apply(existing).update(&*self.db).await?;
        Ok(updated)
    }

    /// Counts transactions the user created within the current UTC calendar
    /// day. Only the active table participates; archived copies in history
    /// do not count twice because terminal rows are retained here.
    pub async fn count_user_messages_for_today(&self, user_id: i64) -> Result<u64> {
        let now = Utc::now();
        let start_of_day = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
        let end_of_day = start_of_day + chrono::Duration::hours(24);

        let count = MessageTransaction::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::CreatedAt.gte(start_of_day.fixed_offset()))
            .filter(Column::CreatedAt.lt(end_of_day.fixed_offset()))
            .count(&*self.db)
            .await?;

        Ok(count)
    }

    /// Atomically claims up to `limit` pending rows for the worker pool.
    ///
    /// Within one database transaction the candidate ids are selected, the
    /// rows are flipped to `processing = true` with `processed_at = now`,
    /// and the claimed models are fetched back. Claimed rows are owned by
    /// the caller until their outcome write clears the flag.
    pub async fn claim_pending_batch(
        &self,
        limit: u64,
    ) -> Result<Vec<message_transaction::Model>> {
        let txn = self.db.begin().await?;

        let ids: Vec<i64> = MessageTransaction::find()
            .select_only()
            .column(Column::Id)
            .filter(Column::Status.eq(TransactionStatus::Pending.as_str()))
            .filter(Column::Processing.eq(false))
            .limit(Some(limit))
            .into_tuple::<i64>()
            .all(&txn)
            .await?;

        if ids.is_empty() {
            txn.commit().await?;
            return Ok(Vec::new());
        }

        let now = Utc::now().fixed_offset();
        MessageTransaction::update_many()
            .col_expr(Column::Processing, Expr::value(true))
            .col_expr(Column::ProcessedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.is_in(ids.clone()))
            .filter(Column::Status.eq(TransactionStatus::Pending.as_str()))
            .filter(Column::Processing.eq(false))
            .exec(&txn)
            .await?;

        let claimed = MessageTransaction::find()
            .filter(Column::Id.is_in(ids))
            .filter(Column::Processing.eq(true))
            .all(&txn)
            .await?;

        txn.commit().await?;

        debug!(count = claimed.len(), "Claimed pending message transactions");
        Ok(claimed)
    }

    /// Failed rows whose retry window has elapsed.
    pub async fn find_failed_due_for_retry(&self) -> Result<Vec<message_transaction::Model>> {
        let now = Utc::now().fixed_offset();
        let rows = MessageTransaction::find()
            .filter(Column::Status.eq(TransactionStatus::Failed.as_str()))
            .filter(Column::NextRetryAt.lte(now))
            .order_by_asc(Column::NextRetryAt)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Successful rows with no sign of delivery for `stale_after` — the
    /// elapsed-time heuristic behind the non-delivery fallback.
    pub async fn find_success_stale(
        &self,
        stale_after: chrono::Duration,
    ) -> Result<Vec<message_transaction::Model>> {
        let cutoff = (Utc::now() - stale_after).fixed_offset();
        let rows = MessageTransaction::find()
            .filter(Column::Status.eq(TransactionStatus::Success.as_str()))
            .filter(Column::Processing.eq(false))
            .filter(Column::UpdatedAt.lte(cutoff))
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Releases reservations whose enqueue was dropped: pending rows stuck
    /// with `processing = true` longer than `older_than` are handed back to
    /// the scanner. Returns the number of reclaimed rows.
    pub async fn reclaim_stranded(&self, older_than: chrono::Duration) -> Result<u64> {
        let cutoff = (Utc::now() - older_than).fixed_offset();
        let result = MessageTransaction::update_many()
            .col_expr(Column::Processing, Expr::value(false))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(Column::Status.eq(TransactionStatus::Pending.as_str()))
            .filter(Column::Processing.eq(true))
            .filter(Column::ProcessedAt.lte(cutoff))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Writes a terminal outcome and its history row in one database
    /// transaction.
    ///
    /// The history insert is guarded by an existence check under the unique
    /// (original_id, status) index, so retrying a crashed outcome write
    /// cannot duplicate the archive. An update that would leave the row
    /// non-terminal is rejected with [`StoreError::InvalidTransition`].
    pub async fn apply_outcome_and_archive(
        &self,
        id: i64,
        update: TransactionUpdate,
    ) -> Result<message_transaction::Model> {
        let txn = self.db.begin().await?;

        let existing = MessageTransaction::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound { id })?;

        let updated = update.apply(existing).update(&txn).await?;

        let status: TransactionStatus = updated
            .status
            .parse()
            .map_err(|e: String| anyhow!(e))?;
        if !status.is_terminal() {
            txn.rollback().await?;
            return Err(StoreError::InvalidTransition {
                id,
                status: updated.status,
            }
            .into());
        }

        let already_archived = MessageTransactionHistory::find()
            .filter(message_transaction_history::Column::OriginalId.eq(updated.id))
            .filter(message_transaction_history::Column::Status.eq(updated.status.clone()))
            .count(&txn)
            .await?
            > 0;

        if !already_archived {
            let now = Utc::now().fixed_offset();
            let history = message_transaction_history::ActiveModel {
                original_id: Set(updated.id),
                user_id: Set(updated.user_id),
                provider_id: Set(updated.provider_id),
                recipients: Set(updated.recipients.clone()),
                body: Set(updated.body.clone()),
                request_data: Set(updated.request_data.clone()),
                response_data: Set(updated.response_data.clone()),
                status: Set(updated.status.clone()),
                error_message: Set(updated.error_message.clone()),
                retry_count: Set(updated.retry_count),
                processed_at: Set(updated.processed_at.unwrap_or(updated.updated_at)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            history.insert(&txn).await?;
        }

        txn.commit().await?;

        debug!(
            transaction_id = updated.id,
            status = %updated.status,
            "Archived terminal message transaction"
        );

        Ok(updated)
    }
}
