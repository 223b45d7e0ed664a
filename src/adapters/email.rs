//! Email adapter stub
//!
//! The `email` kind tag is reserved; dispatching to it fails permanently
//! until a real transport lands.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::models::{provider, user_provider};

use super::trait_::{ProviderAdapter, SendOutcome};

#[derive(Debug)]
pub struct EmailAdapter;

#[async_trait]
impl ProviderAdapter for EmailAdapter {
    async fn send(
        &self,
        _provider: &provider::Model,
        _binding: Option<&user_provider::Model>,
        _recipients: &[String],
        _body: &str,
    ) -> Result<SendOutcome, AdapterError> {
        Err(AdapterError::Permanent(
            "email provider not implemented yet".to_string(),
        ))
    }
}
