//! MessageTransactionHistory entity model
//!
//! Append-only archive of terminal transactions. `original_id` points back
//! at the archived row; (original_id, status) is unique so archival stays
//! idempotent under crash-retry.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "message_transaction_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Identifier of the archived transaction
    pub original_id: i64,

    pub user_id: i64,

    pub provider_id: i64,

    #[sea_orm(column_type = "JsonBinary")]
    pub recipients: JsonValue,

    pub body: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub request_data: Option<JsonValue>,

    #[sea_orm(column_type = "JsonBinary")]
    pub response_data: Option<JsonValue>,

    /// Terminal status at archive time
    pub status: String,

    pub error_message: Option<String>,

    pub retry_count: i32,

    /// When the archived transaction was last processed
    pub processed_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
