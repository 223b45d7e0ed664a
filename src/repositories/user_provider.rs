//! UserProvider repository for database operations
//!
//! Bindings are always consumed in ascending priority order; both the
//! dispatcher and the recovery paths rely on that ordering being stable.

use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;

use crate::models::user_provider::{self, Entity as UserProvider};

/// Repository for user-provider binding reads
#[derive(Debug, Clone)]
pub struct UserProviderRepository {
    db: Arc<DatabaseConnection>,
}

impl UserProviderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns all of a user's bindings ordered by ascending priority
    /// (lower number first), with id as the tie-breaker so selection is
    /// deterministic for a given registry snapshot.
    pub async fn find_by_user_ordered(&self, user_id: i64) -> Result<Vec<user_provider::Model>> {
        let bindings = UserProvider::find()
            .filter(user_provider::Column::UserId.eq(user_id))
            .order_by_asc(user_provider::Column::Priority)
            .order_by_asc(user_provider::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(bindings)
    }

    /// Returns the user's active bindings, used by the webhook fan-out.
    pub async fn find_active_by_user(&self, user_id: i64) -> Result<Vec<user_provider::Model>> {
        let bindings = UserProvider::find()
            .filter(user_provider::Column::UserId.eq(user_id))
            .filter(user_provider::Column::Active.eq(true))
            .order_by_asc(user_provider::Column::Priority)
            .order_by_asc(user_provider::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(bindings)
    }
}
