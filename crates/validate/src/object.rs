//! Object-level verdict: metadata, namespace scope, then dry-run.

use std::sync::Arc;

use anyhow::Result;
use metrics::counter;
use phasegate_core::{DryRunClient, Manifest, RestScopeMapper};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ValidatorConfig;
use crate::dryrun::DryRunValidator;
use crate::error::{ObjectValidationError, ObjectViolation};
use crate::metadata::validate_object_metadata;
use crate::namespace::NamespaceScopeValidator;

#[derive(Clone)]
pub struct ObjectValidator {
    scope: NamespaceScopeValidator,
    dry_run: DryRunValidator,
}

impl ObjectValidator {
    /// Picks the scoping mode from `cfg.allow_namespace_escalation`.
    pub fn new(mapper: Arc<dyn RestScopeMapper>, client: Arc<dyn DryRunClient>, cfg: &ValidatorConfig) -> Self {
        let scope = if cfg.allow_namespace_escalation {
            NamespaceScopeValidator::cluster_wide(mapper)
        } else {
            NamespaceScopeValidator::namespaced(mapper)
        };
        Self { scope, dry_run: DryRunValidator::new(client, cfg) }
    }

    pub fn cluster_wide(mapper: Arc<dyn RestScopeMapper>, client: Arc<dyn DryRunClient>, cfg: &ValidatorConfig) -> Self {
        Self::new(mapper, client, &cfg.clone().with_namespace_escalation(true))
    }

    pub fn namespaced(mapper: Arc<dyn RestScopeMapper>, client: Arc<dyn DryRunClient>, cfg: &ValidatorConfig) -> Self {
        Self::new(mapper, client, &cfg.clone().with_namespace_escalation(false))
    }

    /// `Ok(None)` when valid, `Ok(Some)` with every finding for the object,
    /// `Err` when validity could not be determined.
    ///
    /// A scope violation skips the dry-run. So does a manifest without
    /// apiVersion or kind, which no REST mapping can resolve.
    pub async fn validate(&self, cancel: &CancellationToken, owner: &Manifest, obj: &Manifest) -> Result<Option<ObjectValidationError>> {
        counter!("validate_object_total", 1u64);
        let obj_ref = obj.object_ref();
        let mut violations: Vec<ObjectViolation> = validate_object_metadata(obj).into_iter().map(Into::into).collect();

        if obj.api_version().is_empty() || obj.kind().is_empty() {
            debug!(object = %obj_ref, "type information missing; skipping cluster checks");
            return Ok(finish(obj_ref, violations));
        }

        if let Some(violation) = self.scope.validate(owner.namespace(), obj).await? {
            violations.push(violation.into());
            return Ok(finish(obj_ref, violations));
        }

        if let Some(rejected) = self.dry_run.validate(cancel, obj).await? {
            debug!(object = %obj_ref, reason = rejected.reason(), "dry-run rejected object");
            violations.push(rejected.into());
        }
        Ok(finish(obj_ref, violations))
    }
}

fn finish(obj_ref: phasegate_core::ObjectRef, violations: Vec<ObjectViolation>) -> Option<ObjectValidationError> {
    let err = ObjectValidationError::new(obj_ref, violations);
    if err.is_some() {
        counter!("validate_object_invalid_total", 1u64);
    }
    err
}
