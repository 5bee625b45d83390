pub mod error;
pub mod record;
pub mod registry;

pub use error::{SourceError, SourceResult};
pub use record::{machine_name, RepositoryRecord};
pub use registry::{SourceDeps, SourceFactory, SourceRegistry};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity of a repository source, fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub id: String,
    pub label: String,
    pub description: String,
}

/// Contract implemented once per supported repository source.
///
/// Sources are stateless: one instance per source type, read-only after
/// construction, safe to share across tasks.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Get source metadata
    fn metadata(&self) -> &SourceMetadata;

    /// Whether `uri` syntactically matches this source's expected shape.
    ///
    /// Pure pattern match: no network or file I/O, no side effects.
    /// Malformed input yields `false`, never an error.
    fn validate(&self, uri: &str) -> bool;

    /// A static example of an accepted URI, shown to users as a format hint.
    fn validate_help_text(&self) -> &'static str;

    /// Retrieve and normalize metadata for a URI that already passed
    /// [`validate`](RepositorySource::validate).
    ///
    /// May block on network or file I/O. Expected failures surface as
    /// [`SourceError`] variants; a partially populated record is never
    /// returned. Idempotent against an unchanged remote resource.
    async fn get_repo(&self, uri: &str) -> SourceResult<RepositoryRecord>;
}
