use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use repohub_config::RepositoriesSettings;

use crate::RepositorySource;

/// Dependencies handed to every source at construction time.
///
/// Explicit injection: sources never reach for globals, which keeps them
/// stateless and trivially testable against a mock endpoint.
#[derive(Clone)]
pub struct SourceDeps {
    pub http: reqwest::Client,
    pub settings: RepositoriesSettings,
}

/// Factory trait for creating source instances
pub trait SourceFactory: Send + Sync {
    fn source_id(&self) -> &str;
    fn create(&self, deps: &SourceDeps) -> Arc<dyn RepositorySource>;
}

/// Static registry of enabled repository sources, built once at startup.
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn RepositorySource>>,
    // registration order, so URI matching is deterministic
    order: Vec<String>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a source under its metadata id. Re-registering an id
    /// replaces the previous instance without changing match order.
    pub fn register(&mut self, source: Arc<dyn RepositorySource>) {
        let id = source.metadata().id.clone();
        if self.sources.insert(id.clone(), source).is_some() {
            warn!("[Source Registry] Replacing source '{}'", id);
        } else {
            info!("[Source Registry] Registered source '{}'", id);
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn RepositorySource>> {
        self.sources.get(id).cloned()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn RepositorySource>> {
        self.order.iter().filter_map(|id| self.sources.get(id))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// First registered source whose `validate` accepts the URI.
    ///
    /// Validation is a cheap pattern match, so probing every source is
    /// fine; no fetch happens here.
    pub fn match_source(&self, uri: &str) -> Option<Arc<dyn RepositorySource>> {
        self.iter().find(|source| source.validate(uri)).cloned()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RepositoryRecord, SourceError, SourceMetadata, SourceResult};
    use async_trait::async_trait;

    struct PrefixSource {
        metadata: SourceMetadata,
        prefix: &'static str,
    }

    impl PrefixSource {
        fn new(id: &str, prefix: &'static str) -> Self {
            Self {
                metadata: SourceMetadata {
                    id: id.to_string(),
                    label: id.to_string(),
                    description: String::new(),
                },
                prefix,
            }
        }
    }

    #[async_trait]
    impl RepositorySource for PrefixSource {
        fn metadata(&self) -> &SourceMetadata {
            &self.metadata
        }

        fn validate(&self, uri: &str) -> bool {
            uri.starts_with(self.prefix)
        }

        fn validate_help_text(&self) -> &'static str {
            self.prefix
        }

        async fn get_repo(&self, uri: &str) -> SourceResult<RepositoryRecord> {
            Err(SourceError::NotFound(uri.to_string()))
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(PrefixSource::new("alpha", "a://")));
        registry.register(Arc::new(PrefixSource::new("beta", "b://")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["alpha", "beta"]);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_match_source_in_registration_order() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(PrefixSource::new("broad", "x")));
        registry.register(Arc::new(PrefixSource::new("narrow", "x://")));

        // both match, the earlier registration wins
        let matched = registry.match_source("x://repo").expect("should match");
        assert_eq!(matched.metadata().id, "broad");

        assert!(registry.match_source("y://repo").is_none());
    }

    #[test]
    fn test_reregistering_replaces_without_duplicating() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(PrefixSource::new("alpha", "old://")));
        registry.register(Arc::new(PrefixSource::new("alpha", "new://")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ids(), vec!["alpha"]);
        assert!(registry.match_source("new://repo").is_some());
        assert!(registry.match_source("old://repo").is_none());
    }
}
