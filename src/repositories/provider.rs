//! Provider repository for database operations
//!
//! This module provides the ProviderRepository struct which encapsulates
//! SeaORM operations for the providers catalog. The catalog is read-mostly;
//! CRUD is managed externally.

use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::provider::{self, Entity as Provider};

/// Repository for provider catalog reads
#[derive(Debug, Clone)]
pub struct ProviderRepository {
    db: Arc<DatabaseConnection>,
}

impl ProviderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a provider by id
    pub async fn find_by_id(&self, id: i64) -> Result<Option<provider::Model>> {
        let found = Provider::find_by_id(id).one(&*self.db).await?;
        Ok(found)
    }

    /// Fetches the providers referenced by a set of bindings in one query,
    /// keyed by id for selection lookups.
    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, provider::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let providers = Provider::find()
            .filter(provider::Column::Id.is_in(ids.iter().copied()))
            .all(&*self.db)
            .await?;

        Ok(providers.into_iter().map(|p| (p.id, p)).collect())
    }

    /// Finds all providers ordered by name
    pub async fn find_all(&self) -> Result<Vec<provider::Model>> {
        let providers = Provider::find()
            .order_by_asc(provider::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(providers)
    }
}
