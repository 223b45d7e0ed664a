//! Test utilities for database testing.
//!
//! Sets up in-memory SQLite databases with the real migrations applied and
//! provides fixture helpers for users, providers, bindings, and
//! transactions.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set, Statement};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

use chat_gateway::models::{message_transaction, provider, user, user_provider};

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<Arc<DatabaseConnection>> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    // SQLite does not enforce our Postgres foreign key semantics; disable FK
    // checks so fixtures can be inserted without full relation graphs.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(Arc::new(db))
}

fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

/// Inserts a user with the given daily quota.
pub async fn insert_user(db: &DatabaseConnection, daily_message_limit: i32) -> Result<user::Model> {
    let model = user::ActiveModel {
        daily_message_limit: Set(daily_message_limit),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// Inserts a provider row.
pub async fn insert_provider(
    db: &DatabaseConnection,
    name: &str,
    kind: &str,
    config: Option<JsonValue>,
    active: bool,
) -> Result<provider::Model> {
    let model = provider::ActiveModel {
        name: Set(name.to_string()),
        kind: Set(kind.to_string()),
        description: Set(None),
        config: Set(config),
        active: Set(active),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// Inserts a user-provider binding.
pub async fn insert_binding(
    db: &DatabaseConnection,
    user_id: i64,
    provider_id: i64,
    priority: i32,
    active: bool,
    config: Option<JsonValue>,
) -> Result<user_provider::Model> {
    let model = user_provider::ActiveModel {
        user_id: Set(user_id),
        provider_id: Set(provider_id),
        priority: Set(priority),
        config: Set(config),
        active: Set(active),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// Fine-grained transaction fixture for scanner and planner tests.
pub struct TransactionFixture {
    pub user_id: i64,
    pub provider_id: i64,
    pub status: String,
    pub processing: bool,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<FixedOffset>>,
    pub processed_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl TransactionFixture {
    pub fn pending(user_id: i64, provider_id: i64) -> Self {
        Self {
            user_id,
            provider_id,
            status: "pending".to_string(),
            processing: false,
            retry_count: 0,
            next_retry_at: None,
            processed_at: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn with_processing(mut self, processing: bool) -> Self {
        self.processing = processing;
        self
    }

    pub fn with_retry_count(mut self, retry_count: i32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_next_retry_at(mut self, at: DateTime<FixedOffset>) -> Self {
        self.next_retry_at = Some(at);
        self
    }

    pub fn with_processed_at(mut self, at: DateTime<FixedOffset>) -> Self {
        self.processed_at = Some(at);
        self
    }

    pub fn with_created_at(mut self, at: DateTime<FixedOffset>) -> Self {
        self.created_at = at;
        self
    }

    pub fn with_updated_at(mut self, at: DateTime<FixedOffset>) -> Self {
        self.updated_at = at;
        self
    }

    pub async fn insert(self, db: &DatabaseConnection) -> Result<message_transaction::Model> {
        let model = message_transaction::ActiveModel {
            user_id: Set(self.user_id),
            provider_id: Set(self.provider_id),
            recipients: Set(json!(["+15550100"])),
            body: Set("hello".to_string()),
            status: Set(self.status),
            retry_count: Set(self.retry_count),
            next_retry_at: Set(self.next_retry_at),
            processing: Set(self.processing),
            processed_at: Set(self.processed_at),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(model)
    }
}
