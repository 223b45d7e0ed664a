//! MessageTransactionHistory repository
//!
//! Read access to the append-only archive. Inserts happen inside the
//! outcome transaction owned by `MessageTransactionRepository`.

use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;

use crate::models::message_transaction_history::{self, Column, Entity as MessageTransactionHistory};

/// Repository for the history archive
#[derive(Debug, Clone)]
pub struct MessageTransactionHistoryRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageTransactionHistoryRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All archive rows for one original transaction, oldest first. A retry
    /// chain leaves one row per terminal transition.
    pub async fn find_by_original_id(
        &self,
        original_id: i64,
    ) -> Result<Vec<message_transaction_history::Model>> {
        let rows = MessageTransactionHistory::find()
            .filter(Column::OriginalId.eq(original_id))
            .order_by_asc(Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// The most recent archive row for one original transaction.
    pub async fn find_latest_by_original_id(
        &self,
        original_id: i64,
    ) -> Result<Option<message_transaction_history::Model>> {
        let row = MessageTransactionHistory::find()
            .filter(Column::OriginalId.eq(original_id))
            .order_by_desc(Column::Id)
            .one(&*self.db)
            .await?;
        Ok(row)
    }

    /// A user's archived transactions, newest first.
    pub async fn find_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<message_transaction_history::Model>> {
        let rows = MessageTransactionHistory::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }
}
