//! Plugin-based provider registry
//!
//! The registry allows DNS providers to be registered at startup and created
//! from configuration, avoiding hardcoded if-else chains in the binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vmdns_core::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! vmdns_provider_cloudflare::register(&registry);
//!
//! let provider = registry.create_provider(&config.provider)?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Provider registry for plugin-based DNS provider creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory under `name` (e.g. "cloudflare")
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.insert(name.into(), factory);
    }

    /// Create a provider for `config` using the factory registered under its
    /// type name
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let name = config.type_name();
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = providers.get(name).ok_or_else(|| {
            Error::config(format!(
                "Unknown DNS provider '{}'. Registered: {}",
                name,
                registered_names(&providers)
            ))
        })?;

        factory.create(config)
    }

    /// Whether a provider is registered under `name`
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Registered provider names, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }
}

fn registered_names(providers: &HashMap<String, Box<dyn DnsProviderFactory>>) -> String {
    if providers.is_empty() {
        return "none".to_string();
    }
    let mut names: Vec<&str> = providers.keys().map(String::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DnsRecord, DnsZone};
    use crate::traits::RecordPayload;
    use async_trait::async_trait;

    struct NullProvider;

    #[async_trait]
    impl DnsProvider for NullProvider {
        async fn find_zone(&self, _domain: &str) -> Result<Option<DnsZone>> {
            Ok(None)
        }

        async fn list_a_records(&self, _zone: &DnsZone, _fqdn: &str) -> Result<Vec<DnsRecord>> {
            Ok(Vec::new())
        }

        async fn create_a_record(
            &self,
            _zone: &DnsZone,
            _payload: &RecordPayload,
        ) -> Result<DnsRecord> {
            Err(Error::Other("unused".to_string()))
        }

        async fn update_a_record(
            &self,
            _zone: &DnsZone,
            _record_id: &str,
            _payload: &RecordPayload,
        ) -> Result<DnsRecord> {
            Err(Error::Other("unused".to_string()))
        }

        fn provider_name(&self) -> &'static str {
            "null"
        }
    }

    struct NullFactory;

    impl DnsProviderFactory for NullFactory {
        fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
            Ok(Box::new(NullProvider))
        }
    }

    fn custom(factory: &str) -> ProviderConfig {
        ProviderConfig::Custom {
            factory: factory.to_string(),
            domain: "example.com".to_string(),
            config: serde_json::json!({}),
        }
    }

    #[test]
    fn test_register_and_create() {
        let registry = ProviderRegistry::new();
        registry.register_provider("null", Box::new(NullFactory));

        assert!(registry.has_provider("null"));
        assert_eq!(registry.list_providers(), vec!["null".to_string()]);

        let provider = registry.create_provider(&custom("null")).unwrap();
        assert_eq!(provider.provider_name(), "null");
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let registry = ProviderRegistry::new();
        let err = registry.create_provider(&custom("route53")).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("route53"));
    }
}
