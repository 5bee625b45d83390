use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use github_plugin::GithubSource;
use repohub_config::GithubSettings;
use repohub_plugins::{
    RepositoryRecord, RepositorySource, SourceError, SourceMetadata, SourceRegistry, SourceResult,
};
use repohub_repositories::{
    AddOutcome, ContentStore, InMemoryContentStore, RepositoriesManager,
};
use yml_remote_plugin::YmlRemoteSource;

/// Source double that counts fetches, so tests can assert that `get_repo`
/// is never reached for URIs that fail validation.
struct CountingSource {
    metadata: SourceMetadata,
    fetches: Arc<AtomicUsize>,
    result: fn() -> SourceResult<RepositoryRecord>,
}

impl CountingSource {
    fn new(id: &str, fetches: Arc<AtomicUsize>, result: fn() -> SourceResult<RepositoryRecord>) -> Self {
        Self {
            metadata: SourceMetadata {
                id: id.to_string(),
                label: id.to_string(),
                description: String::new(),
            },
            fetches,
            result,
        }
    }
}

fn stub_record() -> RepositoryRecord {
    RepositoryRecord {
        machine_name: "stub-repo".to_string(),
        label: "Stub repo".to_string(),
        description: String::new(),
        num_open_issues: 1,
        url: "stub://vendor/stub-repo".to_string(),
        source: "stub".to_string(),
    }
}

#[async_trait]
impl RepositorySource for CountingSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn validate(&self, uri: &str) -> bool {
        uri.starts_with("stub://")
    }

    fn validate_help_text(&self) -> &'static str {
        "stub://vendor/name"
    }

    async fn get_repo(&self, _uri: &str) -> SourceResult<RepositoryRecord> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        (self.result)()
    }
}

fn stub_manager(
    fetches: Arc<AtomicUsize>,
    result: fn() -> SourceResult<RepositoryRecord>,
) -> (RepositoriesManager, Arc<InMemoryContentStore>) {
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(CountingSource::new("stub", fetches, result)));
    let store = Arc::new(InMemoryContentStore::new());
    let manager = RepositoriesManager::with_registry(registry, store.clone());
    (manager, store)
}

#[tokio::test]
async fn test_unvalidated_uri_never_reaches_get_repo() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let (manager, _store) = stub_manager(fetches.clone(), || Ok(stub_record()));

    for uri in [
        "https://github.com/vendor/name",
        "http://stub/vendor/name",
        "complete garbage",
        "",
    ] {
        let outcome = manager.add_repository(uri).await.unwrap();
        assert!(matches!(outcome, AddOutcome::InvalidUri { .. }));
    }

    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_uri_outcome_carries_help_texts() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let (manager, _store) = stub_manager(fetches, || Ok(stub_record()));

    let outcome = manager.add_repository("nope").await.unwrap();
    let AddOutcome::InvalidUri { help_texts } = outcome else {
        panic!("expected InvalidUri");
    };
    assert_eq!(help_texts, vec!["stub://vendor/name"]);
    assert_eq!(manager.help_texts(), vec!["stub://vendor/name"]);
}

#[tokio::test]
async fn test_add_then_readd_reports_already_linked() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let (manager, store) = stub_manager(fetches, || Ok(stub_record()));

    let first = manager.add_repository("stub://vendor/stub-repo").await.unwrap();
    let AddOutcome::Saved { id, record } = first else {
        panic!("expected Saved");
    };
    assert!(!id.is_empty());
    assert_eq!(record, stub_record());

    let second = manager.add_repository("stub://vendor/stub-repo").await.unwrap();
    assert!(matches!(second, AddOutcome::AlreadyLinked { .. }));

    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_folds_into_no_record() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let (manager, store) = stub_manager(fetches, || {
        Err(SourceError::Unreachable("connection refused".to_string()))
    });

    let outcome = manager.add_repository("stub://vendor/stub-repo").await.unwrap();
    let AddOutcome::NoRecord { source, error } = outcome else {
        panic!("expected NoRecord");
    };
    assert_eq!(source, "stub");
    assert!(error.is_retryable());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_not_found_is_not_retryable_in_outcome() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let (manager, _store) = stub_manager(fetches, || {
        Err(SourceError::NotFound("no such repo".to_string()))
    });

    let outcome = manager.add_repository("stub://vendor/gone").await.unwrap();
    let AddOutcome::NoRecord { error, .. } = outcome else {
        panic!("expected NoRecord");
    };
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_add_repositories_processes_every_uri() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let (manager, store) = stub_manager(fetches.clone(), || Ok(stub_record()));

    let uris = vec![
        "stub://vendor/stub-repo".to_string(),
        "not a repository".to_string(),
        "stub://vendor/stub-repo".to_string(),
    ];
    let outcomes = manager.add_repositories(&uris).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].0, "stub://vendor/stub-repo");
    assert!(matches!(outcomes[1].1, Ok(AddOutcome::InvalidUri { .. })));

    // two fetches for the two valid URIs, one stored entry after dedupe
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_end_to_end_github_source_through_manager() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/vendor/name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "name",
            "description": "Fixture repository",
            "html_url": "https://github.com/vendor/name",
            "open_issues_count": 2
        })))
        .mount(&server)
        .await;

    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(GithubSource::new(
        reqwest::Client::new(),
        GithubSettings {
            api_base_url: server.uri(),
            token: None,
        },
    )));
    let store = Arc::new(InMemoryContentStore::new());
    let manager = RepositoriesManager::with_registry(registry, store.clone());

    let outcome = manager
        .add_repository("https://github.com/vendor/name")
        .await
        .unwrap();
    let AddOutcome::Saved { record, .. } = outcome else {
        panic!("expected Saved");
    };
    assert_eq!(record.source, "github");
    assert_eq!(record.num_open_issues, 2);

    let stored = store.find_by_source("github", "name").await.unwrap();
    assert_eq!(stored.unwrap(), record);
}

#[tokio::test]
async fn test_registration_order_decides_matching_source() {
    // a descriptor URL is recognized by yml_remote and by nothing else,
    // even with the API sources registered first
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(GithubSource::new(
        reqwest::Client::new(),
        GithubSettings {
            api_base_url: "http://localhost:1".to_string(),
            token: None,
        },
    )));
    registry.register(Arc::new(YmlRemoteSource::new(reqwest::Client::new())));
    let store = Arc::new(InMemoryContentStore::new());
    let manager = RepositoriesManager::with_registry(registry, store);

    let matched = manager
        .match_source("https://example.com/batman-repo.yml")
        .expect("descriptor URL should match");
    assert_eq!(matched.metadata().id, "yml_remote");

    let matched = manager
        .match_source("https://github.com/vendor/name")
        .expect("github URL should match");
    assert_eq!(matched.metadata().id, "github");
}
