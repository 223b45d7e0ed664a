//! User repository for database operations
//!
//! Users are owned by an external subsystem; the dispatch core only needs
//! point reads for the daily quota check.

use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;

use crate::models::user::{self, Entity as User};

/// Repository for user reads
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a user by id
    pub async fn find_by_id(&self, id: i64) -> Result<Option<user::Model>> {
        let found = User::find_by_id(id).one(&*self.db).await?;
        Ok(found)
    }
}
