//! Adapter trait definition
//!
//! Defines the standard send contract that all provider adapter
//! implementations must follow.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AdapterError;
use crate::models::{provider, user_provider};

/// Result of a successful hand-off to a provider.
///
/// Both blobs are adapter-specific and are persisted verbatim on the
/// transaction row.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The request record as submitted to the provider
    pub request_data: JsonValue,
    /// The provider's response record
    pub response_data: JsonValue,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Hand one message to the provider.
    ///
    /// `provider` carries the catalog-level configuration blob, `binding`
    /// the user-scoped one (absent when the user no longer binds the
    /// provider); both are decoded lazily by the implementation and a
    /// decode failure surfaces as [`AdapterError::Permanent`].
    async fn send(
        &self,
        provider: &provider::Model,
        binding: Option<&user_provider::Model>,
        recipients: &[String],
        body: &str,
    ) -> Result<SendOutcome, AdapterError>;
}
