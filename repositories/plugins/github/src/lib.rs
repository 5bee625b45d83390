use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use repohub_config::GithubSettings;
use repohub_plugins::{
    machine_name, RepositoryRecord, RepositorySource, SourceDeps, SourceError, SourceFactory,
    SourceMetadata, SourceResult,
};

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://github\.com/[A-Za-z0-9_-]+/[A-Za-z0-9_-]+/?$")
        .expect("github url pattern is valid")
});

const USER_AGENT: &str = "RepoHub";

/// Repository source backed by the GitHub REST API.
pub struct GithubSource {
    metadata: SourceMetadata,
    client: reqwest::Client,
    settings: GithubSettings,
}

/// Subset of `GET /repos/{owner}/{repo}` we map into a record.
#[derive(Debug, Deserialize)]
struct GithubRepo {
    name: String,
    description: Option<String>,
    open_issues_count: u64,
    html_url: String,
}

impl GithubSource {
    pub fn new(client: reqwest::Client, settings: GithubSettings) -> Self {
        Self {
            metadata: SourceMetadata {
                id: "github".to_string(),
                label: "GitHub".to_string(),
                description: "Repositories hosted on github.com".to_string(),
            },
            client,
            settings,
        }
    }

    fn owner_and_name(uri: &str) -> Option<(&str, &str)> {
        let mut segments = uri.trim_end_matches('/').rsplitn(3, '/');
        let name = segments.next()?;
        let owner = segments.next()?;
        if name.is_empty() || owner.is_empty() {
            return None;
        }
        Some((owner, name))
    }
}

#[async_trait]
impl RepositorySource for GithubSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn validate(&self, uri: &str) -> bool {
        URL_PATTERN.is_match(uri)
    }

    fn validate_help_text(&self) -> &'static str {
        "https://github.com/vendor/name"
    }

    async fn get_repo(&self, uri: &str) -> SourceResult<RepositoryRecord> {
        let (owner, name) = Self::owner_and_name(uri).ok_or_else(|| {
            SourceError::Malformed(format!("not a GitHub repository URL: {uri}"))
        })?;

        let endpoint = format!(
            "{}/repos/{}/{}",
            self.settings.api_base_url.trim_end_matches('/'),
            owner,
            name
        );
        debug!("[GitHub Source] GET {}", endpoint);

        let mut request = self
            .client
            .get(&endpoint)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.settings.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        match status.as_u16() {
            200..=299 => {}
            404 => {
                return Err(SourceError::NotFound(format!(
                    "{owner}/{name} does not exist on GitHub"
                )))
            }
            401 => {
                return Err(SourceError::AuthRejected(
                    "GitHub rejected the configured token".to_string(),
                ))
            }
            403 | 429 => {
                // GitHub signals rate limiting as 403 with an exhausted quota header
                let exhausted = response
                    .headers()
                    .get("x-ratelimit-remaining")
                    .and_then(|v| v.to_str().ok())
                    == Some("0");
                return Err(if exhausted || status.as_u16() == 429 {
                    SourceError::RateLimited("GitHub API rate limit exhausted".to_string())
                } else {
                    SourceError::AuthRejected(format!("GitHub refused the request: {status}"))
                });
            }
            _ => {
                return Err(SourceError::Unreachable(format!(
                    "GitHub API returned {status} for {owner}/{name}"
                )))
            }
        }

        let repo: GithubRepo = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("undecodable GitHub payload: {e}")))?;

        Ok(RepositoryRecord {
            machine_name: machine_name(&repo.name),
            label: repo.name,
            description: repo.description.unwrap_or_default(),
            num_open_issues: repo.open_issues_count,
            url: repo.html_url,
            source: self.metadata.id.clone(),
        })
    }
}

/// Factory for creating GitHub source instances
pub struct GithubSourceFactory;

impl SourceFactory for GithubSourceFactory {
    fn source_id(&self) -> &str {
        "github"
    }

    fn create(&self, deps: &SourceDeps) -> Arc<dyn RepositorySource> {
        Arc::new(GithubSource::new(
            deps.http.clone(),
            deps.settings.github.clone(),
        ))
    }
}
