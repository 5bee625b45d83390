use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use repohub_config::RepositoriesSettings;
use repohub_plugins::{
    RepositoryRecord, RepositorySource, SourceDeps, SourceError, SourceFactory, SourceRegistry,
};

use crate::content_store::{ContentStore, StoreError};

const USER_AGENT: &str = "RepoHub";

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("No source plugin registered for enabled id '{0}'")]
    UnknownSource(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of attempting to link one repository URI.
#[derive(Debug)]
pub enum AddOutcome {
    /// A record was produced and persisted.
    Saved {
        id: String,
        record: RepositoryRecord,
    },
    /// A record was produced but an equal (source, machine_name) entry
    /// already exists in the store.
    AlreadyLinked { record: RepositoryRecord },
    /// A source recognized the URI but produced no record. The error kind
    /// tells the caller whether to suggest retrying
    /// (`SourceError::is_retryable`) or to reject the URI.
    NoRecord {
        source: String,
        error: SourceError,
    },
    /// No enabled source recognizes the URI. Carries the enabled sources'
    /// format hints for user-facing messaging.
    InvalidUri { help_texts: Vec<String> },
}

/// Drives the repository sources: picks the matching source for a URI,
/// fetches its record, and hands the record to the content store.
pub struct RepositoriesManager {
    registry: SourceRegistry,
    store: Arc<dyn ContentStore>,
}

impl RepositoriesManager {
    /// Build a manager whose registry holds exactly the sources enabled in
    /// `settings`, in the configured order. An enabled id with no compiled-in
    /// factory is a configuration error.
    pub fn from_settings(
        settings: &RepositoriesSettings,
        store: Arc<dyn ContentStore>,
    ) -> Result<Self, ManagerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");
        let deps = SourceDeps {
            http,
            settings: settings.clone(),
        };

        let factories = Self::default_factories();
        let mut registry = SourceRegistry::new();
        for id in &settings.enabled_sources {
            let factory = factories
                .iter()
                .find(|factory| factory.source_id() == id)
                .ok_or_else(|| ManagerError::UnknownSource(id.clone()))?;
            registry.register(factory.create(&deps));
        }

        info!(
            "[Repositories Manager] {} source(s) enabled: {}",
            registry.len(),
            registry.ids().join(", ")
        );
        Ok(Self { registry, store })
    }

    /// Build a manager around an already-populated registry.
    pub fn with_registry(registry: SourceRegistry, store: Arc<dyn ContentStore>) -> Self {
        Self { registry, store }
    }

    fn default_factories() -> Vec<Box<dyn SourceFactory>> {
        let mut factories: Vec<Box<dyn SourceFactory>> = Vec::new();
        #[cfg(feature = "github-plugin")]
        factories.push(Box::new(github_plugin::GithubSourceFactory));
        #[cfg(feature = "gitlab-plugin")]
        factories.push(Box::new(gitlab_plugin::GitlabSourceFactory));
        #[cfg(feature = "yml-remote-plugin")]
        factories.push(Box::new(yml_remote_plugin::YmlRemoteSourceFactory));
        factories
    }

    /// First enabled source whose `validate` accepts the URI.
    pub fn match_source(&self, uri: &str) -> Option<Arc<dyn RepositorySource>> {
        self.registry.match_source(uri)
    }

    /// Format hints of the enabled sources, for "accepted formats" messages.
    pub fn help_texts(&self) -> Vec<String> {
        self.registry
            .iter()
            .map(|source| source.validate_help_text().to_string())
            .collect()
    }

    /// Validate, fetch, and store one repository URI.
    ///
    /// Fetch failures are folded into [`AddOutcome::NoRecord`] rather than
    /// propagated; only store backend failures and misconfiguration surface
    /// as errors.
    pub async fn add_repository(&self, uri: &str) -> Result<AddOutcome, ManagerError> {
        let Some(source) = self.registry.match_source(uri) else {
            warn!(
                "[Repositories Manager] No enabled source recognizes '{}'",
                uri
            );
            return Ok(AddOutcome::InvalidUri {
                help_texts: self.help_texts(),
            });
        };
        let source_id = source.metadata().id.clone();

        let record = match source.get_repo(uri).await {
            Ok(record) => record,
            Err(error) => {
                warn!(
                    "[Repositories Manager] Source '{}' produced no record for '{}': {}",
                    source_id, uri, error
                );
                return Ok(AddOutcome::NoRecord {
                    source: source_id,
                    error,
                });
            }
        };

        if let Some(existing) = self
            .store
            .find_by_source(&record.source, &record.machine_name)
            .await?
        {
            info!(
                "[Repositories Manager] '{}' already linked as '{}'",
                uri, existing.machine_name
            );
            return Ok(AddOutcome::AlreadyLinked { record: existing });
        }

        match self.store.save(record.clone()).await {
            Ok(id) => {
                info!(
                    "[Repositories Manager] Linked '{}' from source '{}' as entry {}",
                    record.machine_name, source_id, id
                );
                Ok(AddOutcome::Saved { id, record })
            }
            // raced with a concurrent save of the same repository
            Err(StoreError::Conflict(_)) => Ok(AddOutcome::AlreadyLinked { record }),
            Err(err) => Err(err.into()),
        }
    }

    /// Process many URIs concurrently. Sources are stateless and share
    /// nothing, so each URI runs as an independent task.
    pub async fn add_repositories(
        &self,
        uris: &[String],
    ) -> Vec<(String, Result<AddOutcome, ManagerError>)> {
        let tasks = uris.iter().map(|uri| async move {
            let outcome = self.add_repository(uri).await;
            (uri.clone(), outcome)
        });
        join_all(tasks).await
    }
}
