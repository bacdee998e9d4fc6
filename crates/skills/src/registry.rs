//! Source adapter registry.

use dashmap::DashMap;
use std::sync::Arc;

use answer_engine_core::config::{AppConfig, ProvidersConfig};
use answer_engine_core::{types::SourceId, SourceAdapter};

use crate::adapters::{academic, news, synthesis, web};
use crate::adapters::{ExaWebAdapter, NewsApiAdapter, SemanticScholarAdapter, SynthesisAdapter};
use crate::network::ProviderEndpoint;

/// Registered adapters, keyed by source id.
pub struct AdapterRegistry {
    adapters: DashMap<SourceId, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            adapters: DashMap::new(),
        }
    }

    /// Build the registry for every enabled provider.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::from_providers(&config.providers, config.research.adapter_timeout_ms)
    }

    /// Build from the provider section alone.
    pub fn from_providers(providers: &ProvidersConfig, default_timeout_ms: u64) -> Self {
        let registry = Self::new();

        if providers.web.enabled {
            registry.register(Arc::new(ExaWebAdapter::new(ProviderEndpoint::from_config(
                &providers.web,
                web::DEFAULT_BASE_URL,
                default_timeout_ms,
            ))));
        }
        if providers.academic.enabled {
            registry.register(Arc::new(SemanticScholarAdapter::new(
                ProviderEndpoint::from_config(
                    &providers.academic,
                    academic::DEFAULT_BASE_URL,
                    default_timeout_ms,
                ),
            )));
        }
        if providers.news.enabled {
            registry.register(Arc::new(NewsApiAdapter::new(ProviderEndpoint::from_config(
                &providers.news,
                news::DEFAULT_BASE_URL,
                default_timeout_ms,
            ))));
        }
        if providers.synthesis.enabled {
            let model = providers
                .synthesis
                .model
                .clone()
                .unwrap_or_else(|| synthesis::DEFAULT_MODEL.to_string());
            registry.register(Arc::new(SynthesisAdapter::new(
                ProviderEndpoint::from_config(
                    &providers.synthesis,
                    synthesis::DEFAULT_BASE_URL,
                    default_timeout_ms,
                ),
                model,
            )));
        }

        registry
    }

    /// Register an adapter, replacing any previous one with the same id.
    pub fn register(&self, adapter: Arc<dyn SourceAdapter>) {
        let id = adapter.id();
        tracing::info!(source = %id, "Registering source adapter");
        if self.adapters.insert(id, adapter).is_some() {
            tracing::warn!(source = %id, "Replaced existing source adapter");
        }
    }

    /// Look up an adapter.
    pub fn get(&self, id: SourceId) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&id).map(|entry| entry.value().clone())
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: SourceId) -> bool {
        self.adapters.contains_key(&id)
    }

    /// Registered ids in canonical order.
    pub fn ids(&self) -> Vec<SourceId> {
        let mut ids: Vec<_> = self.adapters.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    /// Get the number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_engine_core::mocks::MockAdapter;

    #[test]
    fn test_default_config_registers_enabled_providers() {
        let registry = AdapterRegistry::from_config(&AppConfig::default());
        assert_eq!(
            registry.ids(),
            vec![SourceId::Web, SourceId::Academic, SourceId::Synthesis]
        );
        assert!(!registry.contains(SourceId::News));
    }

    #[test]
    fn test_register_replaces() {
        let registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::with_urls(SourceId::Web, &[])));
        registry.register(Arc::new(MockAdapter::with_urls(SourceId::Web, &[])));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(SourceId::Web).is_some());
        assert!(registry.get(SourceId::News).is_none());
    }
}
