//! Provider entity model
//!
//! This module contains the SeaORM entity model for the providers table,
//! which serves as a global catalog of messaging backends.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// Provider entity representing a messaging backend
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "providers")]
pub struct Model {
    /// Unique identifier for the provider (primary key)
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Unique human-readable name
    pub name: String,

    /// Kind tag, one of `signal`, `email`, `sms`
    pub kind: String,

    /// Free-form description
    pub description: Option<String>,

    /// Opaque provider configuration, decoded lazily at adapter dispatch
    #[sea_orm(column_type = "JsonBinary")]
    pub config: Option<JsonValue>,

    /// Whether the provider may be selected for dispatch
    pub active: bool,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
