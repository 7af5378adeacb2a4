//! Live verification: dry-run server-side apply, falling back to dry-run create.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use kube::error::ErrorResponse;
use metrics::{counter, histogram};
use phasegate_core::{DryRunClient, Manifest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ValidatorConfig;
use crate::error::{DryRunValidationError, OperationalError};

/// Status reasons that point at the manifest or the caller's permissions.
const VALIDATION_REASONS: [&str; 11] = [
    "Unauthorized",
    "Forbidden",
    "AlreadyExists",
    "Conflict",
    "Invalid",
    "BadRequest",
    "MethodNotAllowed",
    "RequestEntityTooLarge",
    "UnsupportedMediaType",
    "NotAcceptable",
    "NotFound",
];

/// Apply-time structural mismatch reported without a reason. Matched on the
/// message text, which the API server does not guarantee across versions.
const TYPED_PATCH_FAILURE: &str = "failed to create typed patch object";

#[derive(Clone)]
pub struct DryRunValidator {
    client: Arc<dyn DryRunClient>,
    field_manager: String,
    timeout: Option<Duration>,
}

impl DryRunValidator {
    pub fn new(client: Arc<dyn DryRunClient>, cfg: &ValidatorConfig) -> Self {
        Self { client, field_manager: cfg.field_manager.clone(), timeout: cfg.dry_run_timeout }
    }

    /// `Ok(Some)` for a classified rejection, `Ok(None)` when the server accepts
    /// the object, `Err` for anything that says nothing about the manifest.
    pub async fn validate(&self, cancel: &CancellationToken, obj: &Manifest) -> Result<Option<DryRunValidationError>> {
        let started = Instant::now();
        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OperationalError::Cancelled.into()),
            res = self.with_deadline(self.apply_or_create(obj)) => res,
        };
        histogram!("dry_run_latency_ms", started.elapsed().as_secs_f64() * 1000.0);
        match res {
            Ok(()) => Ok(None),
            Err(err) => classify(err).map_err(|err| {
                counter!("dry_run_operational_err_total", 1u64);
                warn!(object = %obj.object_ref(), error = %err, "dry-run could not determine validity");
                err
            }),
        }
    }

    async fn apply_or_create(&self, obj: &Manifest) -> Result<()> {
        // The client only ever sees a private copy.
        let obj = obj.clone();
        match self.client.dry_run_apply(&obj, &self.field_manager).await {
            Err(err) if is_not_found(&err) => {
                counter!("dry_run_fallback_create_total", 1u64);
                debug!(object = %obj.object_ref(), "apply returned NotFound; retrying as dry-run create");
                self.client.dry_run_create(&obj, &self.field_manager).await
            }
            other => other,
        }
    }

    async fn with_deadline<F: Future<Output = Result<()>>>(&self, fut: F) -> Result<()> {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(res) => res,
                Err(_) => Err(OperationalError::DeadlineExceeded(limit).into()),
            },
            None => fut.await,
        }
    }
}

fn api_status(err: &anyhow::Error) -> Option<&ErrorResponse> {
    match err.downcast_ref::<kube::Error>() {
        Some(kube::Error::Api(resp)) => Some(resp),
        _ => None,
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    api_status(err).map_or(false, |s| s.reason == "NotFound" || s.code == 404)
}

/// True when the status describes a defect in the submitted object (or missing permissions).
pub fn is_validation_failure(status: &ErrorResponse) -> bool {
    if VALIDATION_REASONS.contains(&status.reason.as_str()) {
        return true;
    }
    status.reason.is_empty() && status.message.contains(TYPED_PATCH_FAILURE)
}

/// Classified API rejections become a verdict; everything else is handed back untouched.
fn classify(err: anyhow::Error) -> Result<Option<DryRunValidationError>> {
    if !api_status(&err).map_or(false, is_validation_failure) {
        return Err(err);
    }
    let source = err.downcast::<kube::Error>()?;
    Ok(Some(DryRunValidationError::new(source)))
}
