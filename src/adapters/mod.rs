//! # Provider Adapters
//!
//! Capability contract and concrete implementations for handing a message
//! to an external provider. Adapters are resolved by the provider's kind
//! tag through a constructor-wired [`AdapterRegistry`]; configuration blobs
//! are decoded into typed settings at dispatch time.

pub mod email;
pub mod registry;
pub mod settings;
pub mod signal;
pub mod sms;
pub mod trait_;

pub use registry::AdapterRegistry;
pub use settings::{ProviderSettings, SignalSettings, WebhookSettings};
pub use trait_::{ProviderAdapter, SendOutcome};
