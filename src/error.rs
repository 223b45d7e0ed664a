//! # Error Handling
//!
//! Error taxonomies at the library boundaries: submission errors reported
//! synchronously to the caller, and adapter errors classified for the retry
//! machinery.

use thiserror::Error;

/// Errors surfaced synchronously by the submit path.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Malformed submission (empty body, missing recipients)
    #[error("invalid submission: {0}")]
    Validation(String),

    /// The user's daily quota is exhausted
    #[error("daily message rate limit exceeded ({sent_today}/{limit})")]
    RateLimited { limit: i64, sent_today: i64 },

    /// The user has no provider bindings at all
    #[error("no providers configured for user {user_id}")]
    NoProviders { user_id: i64 },

    /// Database failure, unknown user, or no usable binding
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Errors raised by the transaction store on targeted row operations.
///
/// Callers that need to distinguish a missing row from a database failure
/// can downcast to this type; everything else propagates as-is.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message transaction {id} not found")]
    NotFound { id: i64 },

    /// Only terminal rows may be archived to history
    #[error("cannot archive transaction {id} in non-terminal status '{status}'")]
    InvalidTransition { id: i64, status: String },
}

/// Classification of a provider adapter failure.
///
/// The worker persists the message on the transaction row; the category
/// decides how the retry machinery treats the attempt.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The provider rate-limited the account and issued proof-of-work
    /// challenge tokens
    #[error("provider rate limited: {message}")]
    RateLimited {
        challenge_tokens: Vec<String>,
        message: String,
    },

    /// Recoverable failure; a later attempt may succeed
    #[error("{0}")]
    Transient(String),

    /// Non-recoverable failure (unknown kind, bad configuration, stub
    /// provider); only a different provider in the chain can help
    #[error("{0}")]
    Permanent(String),
}

impl AdapterError {
    /// Challenge tokens attached to a rate-limit error, if any.
    pub fn challenge_tokens(&self) -> &[String] {
        match self {
            AdapterError::RateLimited {
                challenge_tokens, ..
            } => challenge_tokens,
            _ => &[],
        }
    }
}
