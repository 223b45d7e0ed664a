//! Tracing setup for the dispatch core.
//!
//! Emits JSON lines with span context so the per-transaction fields the
//! workers and scanner attach (transaction_id, user_id, provider_id) land
//! as structured keys.

use crate::config::AppConfig;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Directives appended to the configured level: the sqlx statement log and
/// the HTTP client internals drown out dispatch events at `debug`.
const QUIET_DEPENDENCIES: &[&str] = &["sqlx=warn", "hyper_util=warn", "reqwest=warn"];

pub fn init_subscriber(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config));

    let formatter = fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(true);

    let subscriber = Registry::default().with(filter).with(formatter);

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");
}

fn default_filter(config: &AppConfig) -> EnvFilter {
    let mut directives = vec![config.log_level.clone()];
    directives.extend(QUIET_DEPENDENCIES.iter().map(|d| d.to_string()));
    EnvFilter::new(directives.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_includes_level_and_quieted_dependencies() {
        let config = AppConfig {
            log_level: "debug".to_string(),
            ..Default::default()
        };

        let filter = default_filter(&config).to_string();
        assert!(filter.contains("debug"));
        assert!(filter.contains("sqlx=warn"));
        assert!(filter.contains("reqwest=warn"));
    }
}
