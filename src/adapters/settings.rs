//! Typed adapter settings
//!
//! Provider and binding configuration lives in opaque JSON columns; this
//! module decodes them into typed settings at dispatch time. A blob that
//! fails to decode is a permanent dispatch error, never a panic.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AdapterError;
use crate::models::{ProviderKind, provider};

/// Catalog-level settings, one variant per provider kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSettings {
    Signal(SignalSettings),
    Email,
    Sms,
}

impl ProviderSettings {
    /// Decodes a provider row's kind tag and config blob.
    pub fn decode(provider: &provider::Model) -> Result<Self, AdapterError> {
        let kind = ProviderKind::from_tag(&provider.kind).ok_or_else(|| {
            AdapterError::Permanent(format!("unsupported provider kind '{}'", provider.kind))
        })?;

        match kind {
            ProviderKind::Signal => {
                let config = provider.config.as_ref().ok_or_else(|| {
                    AdapterError::Permanent(format!(
                        "provider '{}' has no signal configuration",
                        provider.name
                    ))
                })?;
                let settings: SignalSettings =
                    serde_json::from_value(config.clone()).map_err(|e| {
                        AdapterError::Permanent(format!(
                            "invalid signal configuration for provider '{}': {e}",
                            provider.name
                        ))
                    })?;
                Ok(ProviderSettings::Signal(settings))
            }
            ProviderKind::Email => Ok(ProviderSettings::Email),
            ProviderKind::Sms => Ok(ProviderSettings::Sms),
        }
    }
}

/// Settings for the Signal JSON-RPC transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSettings {
    /// Endpoint of the signal-cli JSON-RPC server
    pub rpc_url: String,
    /// Registered account the message is sent from
    pub from_number: String,
}

/// Webhook notification settings carried in a binding's config blob.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WebhookSettings {
    #[serde(default)]
    pub webhook_enabled: bool,
    #[serde(default)]
    pub webhook_url: String,
}

impl WebhookSettings {
    /// Decodes the webhook portion of a binding config. Absent blobs and
    /// unrelated keys decode to the disabled default; a malformed blob is
    /// treated as disabled and reported to the caller as `None`.
    pub fn from_config(config: Option<&JsonValue>) -> Option<Self> {
        let config = config?;
        serde_json::from_value(config.clone()).ok()
    }

    pub fn is_deliverable(&self) -> bool {
        self.webhook_enabled && !self.webhook_url.is_empty()
    }
}
