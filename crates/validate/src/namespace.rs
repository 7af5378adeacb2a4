//! Owner-namespace policy: keeps objects inside the owner's namespace unless escalation is allowed.

use std::sync::Arc;

use anyhow::Result;
use kube::discovery::Scope;
use phasegate_core::{Manifest, RestScopeMapper};
use tracing::debug;

use crate::error::NamespaceScopeViolation;

#[derive(Clone)]
pub struct NamespaceScopeValidator {
    mapper: Arc<dyn RestScopeMapper>,
    allow_escalation: bool,
}

impl NamespaceScopeValidator {
    /// Escalation allowed: objects may land in any namespace or at cluster scope.
    pub fn cluster_wide(mapper: Arc<dyn RestScopeMapper>) -> Self {
        Self { mapper, allow_escalation: true }
    }

    /// Escalation disallowed: objects must be namespaced and share the owner's namespace.
    pub fn namespaced(mapper: Arc<dyn RestScopeMapper>) -> Self {
        Self { mapper, allow_escalation: false }
    }

    pub fn allows_escalation(&self) -> bool { self.allow_escalation }

    /// An empty `owner_namespace` disables the check (cluster-scoped owner).
    ///
    /// A missing REST mapping is an environment failure and comes back as
    /// `Err` carrying [`phasegate_core::RestMappingError`].
    pub async fn validate(&self, owner_namespace: &str, obj: &Manifest) -> Result<Option<NamespaceScopeViolation>> {
        if self.allow_escalation || owner_namespace.is_empty() {
            return Ok(None);
        }
        let scope = self.mapper.scope_of(&obj.gvk()).await?;
        let violation = match scope {
            Scope::Cluster => Some(NamespaceScopeViolation::MustBeNamespaceScoped),
            Scope::Namespaced if obj.namespace() == owner_namespace => None,
            Scope::Namespaced => Some(NamespaceScopeViolation::MustBeInNamespace {
                expected: owner_namespace.to_string(),
                actual: obj.namespace().to_string(),
            }),
        };
        if let Some(v) = &violation {
            debug!(object = %obj.object_ref(), owner_ns = owner_namespace, violation = %v, "namespace scope violation");
        }
        Ok(violation)
    }
}
