use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use repohub_config::GitlabSettings;
use repohub_plugins::{
    machine_name, RepositoryRecord, RepositorySource, SourceDeps, SourceError, SourceFactory,
    SourceMetadata, SourceResult,
};

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://gitlab\.com/[A-Za-z0-9_-]+/[A-Za-z0-9_-]+/?$")
        .expect("gitlab url pattern is valid")
});

/// Repository source backed by the GitLab v4 API.
pub struct GitlabSource {
    metadata: SourceMetadata,
    client: reqwest::Client,
    settings: GitlabSettings,
}

/// Subset of `GET /projects/{id}` we map into a record.
#[derive(Debug, Deserialize)]
struct GitlabProject {
    name: String,
    path: String,
    description: Option<String>,
    // absent when the project has issues disabled
    open_issues_count: Option<u64>,
    web_url: String,
}

impl GitlabSource {
    pub fn new(client: reqwest::Client, settings: GitlabSettings) -> Self {
        Self {
            metadata: SourceMetadata {
                id: "gitlab".to_string(),
                label: "GitLab".to_string(),
                description: "Repositories hosted on gitlab.com".to_string(),
            },
            client,
            settings,
        }
    }

    fn project_path(uri: &str) -> Option<String> {
        let mut segments = uri.trim_end_matches('/').rsplitn(3, '/');
        let name = segments.next()?;
        let owner = segments.next()?;
        if name.is_empty() || owner.is_empty() {
            return None;
        }
        Some(format!("{owner}/{name}"))
    }
}

#[async_trait]
impl RepositorySource for GitlabSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn validate(&self, uri: &str) -> bool {
        URL_PATTERN.is_match(uri)
    }

    fn validate_help_text(&self) -> &'static str {
        "https://gitlab.com/vendor/name"
    }

    async fn get_repo(&self, uri: &str) -> SourceResult<RepositoryRecord> {
        let project = Self::project_path(uri).ok_or_else(|| {
            SourceError::Malformed(format!("not a GitLab repository URL: {uri}"))
        })?;

        // project id is the URL-encoded "owner/name" path
        let endpoint = format!(
            "{}/projects/{}",
            self.settings.api_base_url.trim_end_matches('/'),
            urlencoding::encode(&project)
        );
        debug!("[GitLab Source] GET {}", endpoint);

        let mut request = self.client.get(&endpoint);
        if let Some(token) = &self.settings.token {
            request = request.header("PRIVATE-TOKEN", token.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        match status.as_u16() {
            200..=299 => {}
            404 => {
                return Err(SourceError::NotFound(format!(
                    "{project} does not exist on GitLab"
                )))
            }
            401 => {
                return Err(SourceError::AuthRejected(
                    "GitLab rejected the configured token".to_string(),
                ))
            }
            403 => {
                return Err(SourceError::AuthRejected(format!(
                    "GitLab refused the request: {status}"
                )))
            }
            429 => {
                return Err(SourceError::RateLimited(
                    "GitLab API rate limit exhausted".to_string(),
                ))
            }
            _ => {
                return Err(SourceError::Unreachable(format!(
                    "GitLab API returned {status} for {project}"
                )))
            }
        }

        let project: GitlabProject = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("undecodable GitLab payload: {e}")))?;

        Ok(RepositoryRecord {
            machine_name: machine_name(&project.path),
            label: project.name,
            description: project.description.unwrap_or_default(),
            num_open_issues: project.open_issues_count.unwrap_or(0),
            url: project.web_url,
            source: self.metadata.id.clone(),
        })
    }
}

/// Factory for creating GitLab source instances
pub struct GitlabSourceFactory;

impl SourceFactory for GitlabSourceFactory {
    fn source_id(&self) -> &str {
        "gitlab"
    }

    fn create(&self, deps: &SourceDeps) -> Arc<dyn RepositorySource> {
        Arc::new(GitlabSource::new(
            deps.http.clone(),
            deps.settings.gitlab.clone(),
        ))
    }
}
