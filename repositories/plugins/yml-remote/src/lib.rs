use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use repohub_plugins::{
    machine_name, RepositoryRecord, RepositorySource, SourceDeps, SourceError, SourceFactory,
    SourceMetadata, SourceResult,
};

static REMOTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9_\-.]+(?::\d+)?/\S+\.ya?ml$")
        .expect("remote descriptor pattern is valid")
});

// schemeless path on the local filesystem
static LOCAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s:]+\.ya?ml$").expect("local descriptor pattern is valid"));

/// Repository source reading a YAML descriptor file, remote or local.
pub struct YmlRemoteSource {
    metadata: SourceMetadata,
    client: reqwest::Client,
}

/// Fixed descriptor keys. `name` and `number_of_issues` are required;
/// anything missing fails the parse rather than defaulting silently.
#[derive(Debug, Deserialize)]
struct YmlDescriptor {
    name: String,
    description: Option<String>,
    number_of_issues: u64,
}

impl YmlRemoteSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            metadata: SourceMetadata {
                id: "yml_remote".to_string(),
                label: "Remote .yml file".to_string(),
                description: "Repositories described by a YAML descriptor file".to_string(),
            },
            client,
        }
    }

    fn file_stem(uri: &str) -> &str {
        let file = uri.rsplit('/').next().unwrap_or(uri);
        file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file)
    }

    async fn read_descriptor(&self, uri: &str) -> SourceResult<String> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            debug!("[Yml Remote Source] GET {}", uri);
            let response = self.client.get(uri).send().await?;
            let status = response.status();
            if status.as_u16() == 404 {
                return Err(SourceError::NotFound(format!("no descriptor at {uri}")));
            }
            if !status.is_success() {
                return Err(SourceError::Unreachable(format!(
                    "descriptor fetch returned {status} for {uri}"
                )));
            }
            Ok(response.text().await?)
        } else {
            debug!("[Yml Remote Source] reading {}", uri);
            Ok(tokio::fs::read_to_string(uri).await?)
        }
    }
}

#[async_trait]
impl RepositorySource for YmlRemoteSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn validate(&self, uri: &str) -> bool {
        REMOTE_PATTERN.is_match(uri) || LOCAL_PATTERN.is_match(uri)
    }

    fn validate_help_text(&self) -> &'static str {
        "https://example.com/my-repo.yml (or a local path ending in .yml)"
    }

    async fn get_repo(&self, uri: &str) -> SourceResult<RepositoryRecord> {
        let body = self.read_descriptor(uri).await?;

        let descriptor: YmlDescriptor = serde_yaml::from_str(&body)
            .map_err(|e| SourceError::Malformed(format!("invalid descriptor at {uri}: {e}")))?;

        Ok(RepositoryRecord {
            machine_name: machine_name(Self::file_stem(uri)),
            label: descriptor.name,
            description: descriptor.description.unwrap_or_default(),
            num_open_issues: descriptor.number_of_issues,
            url: uri.to_string(),
            source: self.metadata.id.clone(),
        })
    }
}

/// Factory for creating YAML descriptor source instances
pub struct YmlRemoteSourceFactory;

impl SourceFactory for YmlRemoteSourceFactory {
    fn source_id(&self) -> &str {
        "yml_remote"
    }

    fn create(&self, deps: &SourceDeps) -> Arc<dyn RepositorySource> {
        Arc::new(YmlRemoteSource::new(deps.http.clone()))
    }
}
