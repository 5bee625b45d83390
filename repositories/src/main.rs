use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use repohub_config::RepositoriesSettings;
use repohub_repositories::{AddOutcome, InMemoryContentStore, RepositoriesManager};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = RepositoriesSettings::from_env().context("loading repository settings")?;
    let store = Arc::new(InMemoryContentStore::new());
    let manager = RepositoriesManager::from_settings(&settings, store)
        .context("building the source registry")?;

    let uris: Vec<String> = std::env::args().skip(1).collect();
    if uris.is_empty() {
        info!("[RepoHub] No repository URLs given");
        info!(
            "[RepoHub] Accepted formats: {}",
            manager.help_texts().join(" | ")
        );
        return Ok(ExitCode::SUCCESS);
    }

    let mut rejected = 0usize;
    for (uri, outcome) in manager.add_repositories(&uris).await {
        match outcome {
            Ok(AddOutcome::Saved { id, record }) => {
                info!(
                    "[RepoHub] Linked '{}' ({} open issues) as entry {}",
                    record.label, record.num_open_issues, id
                );
            }
            Ok(AddOutcome::AlreadyLinked { record }) => {
                info!("[RepoHub] {} is already linked as '{}'", uri, record.machine_name);
            }
            Ok(AddOutcome::NoRecord { source, error }) => {
                rejected += 1;
                if error.is_retryable() {
                    error!(
                        "[RepoHub] {} is temporarily unavailable via '{}': {}; try again later",
                        uri, source, error
                    );
                } else {
                    error!("[RepoHub] Could not add {} via '{}': {}", uri, source, error);
                }
            }
            Ok(AddOutcome::InvalidUri { help_texts }) => {
                rejected += 1;
                error!(
                    "[RepoHub] {} is not a recognized repository URL; accepted formats: {}",
                    uri,
                    help_texts.join(" | ")
                );
            }
            Err(err) => {
                rejected += 1;
                error!("[RepoHub] Failed while processing {}: {}", uri, err);
            }
        }
    }

    if rejected > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
