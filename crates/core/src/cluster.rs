//! Collaborator seams towards a live API server.

use async_trait::async_trait;
use kube::{core::GroupVersionKind, discovery::Scope};

use crate::Manifest;

/// Maps group/kind (preferring the given version) to its REST scope.
#[async_trait]
pub trait RestScopeMapper: Send + Sync {
    async fn scope_of(&self, gvk: &GroupVersionKind) -> Result<Scope, RestMappingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RestMappingError {
    /// The API server serves no resource for this group/kind.
    #[error("no matches for kind \"{kind}\" in version \"{group}/{version}\"")]
    NoMatch { group: String, version: String, kind: String },
    #[error("discovery failed: {0}")]
    Discovery(#[from] kube::Error),
}

impl RestMappingError {
    pub fn no_match(gvk: &GroupVersionKind) -> Self {
        Self::NoMatch { group: gvk.group.clone(), version: gvk.version.clone(), kind: gvk.kind.clone() }
    }
}

/// Write-capable client restricted to dry-run requests.
///
/// API status failures must surface as a `kube::Error` at the root of the
/// returned `anyhow::Error` so callers can classify them.
#[async_trait]
pub trait DryRunClient: Send + Sync {
    /// Server-side apply with forced ownership, not persisted.
    async fn dry_run_apply(&self, obj: &Manifest, field_manager: &str) -> anyhow::Result<()>;

    /// Plain create, not persisted.
    async fn dry_run_create(&self, obj: &Manifest, field_manager: &str) -> anyhow::Result<()>;
}
