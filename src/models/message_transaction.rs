//! MessageTransaction entity model
//!
//! This module contains the SeaORM entity model for the message_transactions
//! table, the durable state machine rows driving dispatch. A row is created
//! `pending`, claimed by a worker (the `processing` flag is the ownership
//! token), and ends in a terminal status that is mirrored into history.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "message_transactions")]
pub struct Model {
    /// Unique identifier for the transaction (primary key)
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Provider chosen for this attempt
    pub provider_id: i64,

    /// Serialized recipient list
    #[sea_orm(column_type = "JsonBinary")]
    pub recipients: JsonValue,

    /// Message payload
    pub body: String,

    /// Adapter-specific request record
    #[sea_orm(column_type = "JsonBinary")]
    pub request_data: Option<JsonValue>,

    /// Adapter-specific response record
    #[sea_orm(column_type = "JsonBinary")]
    pub response_data: Option<JsonValue>,

    /// One of `pending`, `success`, `failed`, `fallbackTriggered`
    pub status: String,

    /// Last adapter error, if any
    pub error_message: Option<String>,

    /// Number of prior attempts in this retry chain
    pub retry_count: i32,

    /// Earliest instant at which the retry planner may revive this row
    pub next_retry_at: Option<DateTimeWithTimeZone>,

    /// In-flight reservation flag; true means exactly one worker owns the row
    pub processing: bool,

    /// Wall time a worker last picked this row up
    pub processed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
