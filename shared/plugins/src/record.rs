use serde::{Deserialize, Serialize};

/// Normalized metadata describing one external repository.
///
/// Only ever constructed from a URI that passed the producing source's
/// `validate`; handed to the content store as-is, no mutation afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// URL/filesystem-safe slug, unique per source + owner.
    pub machine_name: String,
    /// Display title.
    pub label: String,
    /// May be empty when the upstream repository has none.
    pub description: String,
    pub num_open_issues: u64,
    /// Canonical URL of the source repository.
    pub url: String,
    /// Id of the producing source.
    pub source: String,
}

/// Derive a machine name from a display name or URL segment: lowercase
/// ASCII alphanumerics, every other run of characters collapsed to a
/// single `-`, no leading or trailing dashes.
pub fn machine_name(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
