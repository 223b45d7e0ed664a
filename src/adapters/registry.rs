//! Adapter registry
//!
//! Directory mapping provider kind tags to adapter implementations. The
//! registry is built once at wiring time and handed to the components that
//! dispatch sends; nothing here is process-global.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::ProviderKind;

use super::trait_::ProviderAdapter;

/// Error type for registry lookups
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("no adapter registered for provider kind '{kind}'")]
    AdapterNotFound { kind: String },
}

/// Directory of provider adapters keyed by kind tag
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Builds the standard registry: the Signal transport plus the reserved
    /// email and sms stubs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ProviderKind::Signal, Arc::new(super::signal::SignalAdapter::new()));
        registry.register(ProviderKind::Email, Arc::new(super::email::EmailAdapter));
        registry.register(ProviderKind::Sms, Arc::new(super::sms::SmsAdapter));
        registry
    }

    /// Register an adapter for a provider kind
    pub fn register(&mut self, kind: ProviderKind, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(kind, adapter);
    }

    /// Get the adapter for a kind tag
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderAdapter>, RegistryError> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| RegistryError::AdapterNotFound {
                kind: kind.as_str().to_string(),
            })
    }

    /// Resolve an adapter from a raw kind tag as stored in the catalog.
    pub fn get_by_tag(&self, tag: &str) -> Result<Arc<dyn ProviderAdapter>, RegistryError> {
        let kind = ProviderKind::from_tag(tag).ok_or_else(|| RegistryError::AdapterNotFound {
            kind: tag.to_string(),
        })?;
        self.get(kind)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
