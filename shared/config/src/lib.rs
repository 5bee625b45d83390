use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITLAB_API_URL: &str = "https://gitlab.com/api/v4";
const DEFAULT_ENABLED_SOURCES: &str = "github,gitlab,yml_remote";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSettings {
    pub api_base_url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitlabSettings {
    pub api_base_url: String,
    pub token: Option<String>,
}

/// Settings for the repository-source layer, consumed read-only at
/// construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoriesSettings {
    /// Source ids to enable, in match-priority order.
    pub enabled_sources: Vec<String>,
    pub github: GithubSettings,
    pub gitlab: GitlabSettings,
    /// Timeout applied to the shared HTTP client.
    pub http_timeout_secs: u64,
}

impl Default for RepositoriesSettings {
    fn default() -> Self {
        Self {
            enabled_sources: split_ids(DEFAULT_ENABLED_SOURCES),
            github: GithubSettings {
                api_base_url: DEFAULT_GITHUB_API_URL.to_string(),
                token: None,
            },
            gitlab: GitlabSettings {
                api_base_url: DEFAULT_GITLAB_API_URL.to_string(),
                token: None,
            },
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl RepositoriesSettings {
    /// Load settings from environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, SettingsError> {
        let enabled_sources = split_ids(
            &std::env::var("REPOHUB_ENABLED_SOURCES")
                .unwrap_or_else(|_| DEFAULT_ENABLED_SOURCES.to_string()),
        );

        let http_timeout_secs = match std::env::var("REPOHUB_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|e: std::num::ParseIntError| SettingsError::InvalidValue {
                    var: "REPOHUB_HTTP_TIMEOUT_SECS",
                    reason: e.to_string(),
                })?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let settings = Self {
            enabled_sources,
            github: GithubSettings {
                api_base_url: std::env::var("REPOHUB_GITHUB_API_URL")
                    .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string()),
                token: std::env::var("REPOHUB_GITHUB_TOKEN").ok(),
            },
            gitlab: GitlabSettings {
                api_base_url: std::env::var("REPOHUB_GITLAB_API_URL")
                    .unwrap_or_else(|_| DEFAULT_GITLAB_API_URL.to_string()),
                token: std::env::var("REPOHUB_GITLAB_TOKEN").ok(),
            },
            http_timeout_secs,
        };

        debug!(
            "[Settings] Enabled sources: {}",
            settings.enabled_sources.join(", ")
        );
        Ok(settings)
    }
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}
