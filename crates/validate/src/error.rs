//! Validation error hierarchy: object -> phase -> revision.
//!
//! Every aggregate renders a single-line `Display` for logs and a nested
//! YAML `report()` for diagnostics. `children()` exposes direct causes so
//! [`find_cause`] can locate a leaf anywhere in the tree.
//!
//! Operational failures (network, cancellation, missing REST mapping) are
//! never represented here; they travel as `anyhow::Error`.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use kube::error::ErrorResponse;
use phasegate_core::ObjectRef;
use serde::Serialize;

type DynError = dyn StdError + 'static;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldErrorKind {
    Required,
    Forbidden,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("required"),
            Self::Forbidden => f.write_str("forbidden"),
        }
    }
}

/// Structural problem with a single manifest field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {kind}, {detail}")]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
    pub detail: String,
}

impl FieldError {
    pub fn required(field: impl Into<String>) -> Self {
        Self { field: field.into(), kind: FieldErrorKind::Required, detail: "must not be empty".into() }
    }

    pub fn forbidden(field: impl Into<String>) -> Self {
        Self { field: field.into(), kind: FieldErrorKind::Forbidden, detail: "must be empty".into() }
    }
}

/// Object escapes the owner's namespace while escalation is disallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceScopeViolation {
    #[error("must be namespace-scoped when namespace escalation is disallowed")]
    MustBeNamespaceScoped,
    #[error("must be in namespace \"{expected}\", actual \"{actual}\"")]
    MustBeInNamespace { expected: String, actual: String },
}

/// API server rejected the dry-run for a reason attributable to the manifest
/// or the caller's permissions.
#[derive(Debug, thiserror::Error)]
#[error("dry-run rejected: {source}")]
pub struct DryRunValidationError {
    source: kube::Error,
}

impl DryRunValidationError {
    pub fn new(source: kube::Error) -> Self { Self { source } }

    /// Original API status, when the rejection came back as one.
    pub fn status(&self) -> Option<&ErrorResponse> {
        match &self.source {
            kube::Error::Api(resp) => Some(resp),
            _ => None,
        }
    }

    pub fn reason(&self) -> &str {
        self.status().map(|s| s.reason.as_str()).unwrap_or("")
    }

    pub fn into_inner(self) -> kube::Error { self.source }
}

/// The same object identity occurs more than once in one validation scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate object found in phases: {}", .phases.join(", "))]
pub struct DuplicateObjectError {
    /// Sorted, deduplicated phase names.
    pub phases: Vec<String>,
}

/// Phase name is not a valid DNS-1035 label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid phase name \"{name}\": {}", .messages.join("; "))]
pub struct PhaseNameError {
    pub name: String,
    pub messages: Vec<String>,
}

/// One finding attached to an object.
#[derive(Debug, thiserror::Error)]
pub enum ObjectViolation {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Scope(#[from] NamespaceScopeViolation),
    #[error(transparent)]
    DryRun(#[from] DryRunValidationError),
    #[error(transparent)]
    Duplicate(#[from] DuplicateObjectError),
}

impl ObjectViolation {
    pub fn as_error(&self) -> &DynError {
        match self {
            Self::Field(e) => e,
            Self::Scope(e) => e,
            Self::DryRun(e) => e,
            Self::Duplicate(e) => e,
        }
    }
}

/// All findings for one object, keyed by its identity.
#[derive(Debug)]
pub struct ObjectValidationError {
    pub object: ObjectRef,
    pub violations: Vec<ObjectViolation>,
}

impl ObjectValidationError {
    /// `None` when there is nothing to report.
    pub fn new(object: ObjectRef, violations: Vec<ObjectViolation>) -> Option<Self> {
        if violations.is_empty() {
            return None;
        }
        Some(Self { object, violations })
    }

    pub fn children(&self) -> Vec<&DynError> {
        self.violations.iter().map(ObjectViolation::as_error).collect()
    }

    /// Fold another error for the same object into this one.
    pub fn merge(&mut self, other: ObjectValidationError) {
        debug_assert_eq!(self.object, other.object);
        self.violations.extend(other.violations);
    }

    pub fn to_report(&self) -> ObjectReport {
        ObjectReport {
            object: self.object.to_string(),
            errors: self.violations.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn report(&self) -> String { render_yaml(&self.to_report(), self) }
}

impl fmt::Display for ObjectValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object {}: ", self.object)?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl StdError for ObjectValidationError {
    /// First finding only; use [`ObjectValidationError::children`] for all of them.
    fn source(&self) -> Option<&DynError> {
        self.violations.first().map(ObjectViolation::as_error)
    }
}

#[derive(Debug)]
pub struct PhaseValidationError {
    pub phase: String,
    pub name_error: Option<PhaseNameError>,
    pub objects: Vec<ObjectValidationError>,
}

impl PhaseValidationError {
    /// `None` when neither the name nor any object produced a finding.
    pub fn new(phase: impl Into<String>, name_error: Option<PhaseNameError>, objects: Vec<ObjectValidationError>) -> Option<Self> {
        if name_error.is_none() && objects.is_empty() {
            return None;
        }
        Some(Self { phase: phase.into(), name_error, objects })
    }

    pub fn children(&self) -> Vec<&DynError> {
        let mut out: Vec<&DynError> = Vec::with_capacity(self.objects.len() + 1);
        if let Some(e) = &self.name_error {
            out.push(e);
        }
        out.extend(self.objects.iter().map(|o| o as &DynError));
        out
    }

    pub fn to_report(&self) -> PhaseReport {
        PhaseReport {
            phase: self.phase.clone(),
            name_errors: self.name_error.as_ref().map(|e| e.messages.clone()).unwrap_or_default(),
            objects: self.objects.iter().map(ObjectValidationError::to_report).collect(),
        }
    }

    pub fn report(&self) -> String { render_yaml(&self.to_report(), self) }
}

impl fmt::Display for PhaseValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase \"{}\": ", self.phase)?;
        match (&self.name_error, self.objects.len()) {
            (Some(_), 0) => f.write_str("invalid phase name"),
            (Some(_), n) => write!(f, "invalid phase name, {n} invalid object(s)"),
            (None, n) => write!(f, "{n} invalid object(s)"),
        }
    }
}

impl StdError for PhaseValidationError {
    fn source(&self) -> Option<&DynError> {
        self.children().into_iter().next()
    }
}

#[derive(Debug)]
pub struct RevisionValidationError {
    pub name: String,
    pub revision: i64,
    pub phases: Vec<PhaseValidationError>,
}

impl RevisionValidationError {
    /// `None` when no phase produced a finding.
    pub fn new(name: impl Into<String>, revision: i64, phases: Vec<PhaseValidationError>) -> Option<Self> {
        if phases.is_empty() {
            return None;
        }
        Some(Self { name: name.into(), revision, phases })
    }

    pub fn children(&self) -> Vec<&DynError> {
        self.phases.iter().map(|p| p as &DynError).collect()
    }

    pub fn to_report(&self) -> RevisionReport {
        RevisionReport {
            revision: self.name.clone(),
            number: self.revision,
            phases: self.phases.iter().map(PhaseValidationError::to_report).collect(),
        }
    }

    pub fn report(&self) -> String { render_yaml(&self.to_report(), self) }
}

impl fmt::Display for RevisionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "revision \"{}\" ({}): {} invalid phase(s)", self.name, self.revision, self.phases.len())
    }
}

impl StdError for RevisionValidationError {
    fn source(&self) -> Option<&DynError> {
        self.phases.first().map(|p| p as &DynError)
    }
}

/// Could not determine validity; retryable and never a manifest defect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationalError {
    #[error("validation cancelled")]
    Cancelled,
    #[error("dry-run exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectReport {
    pub object: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
    pub phase: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name_errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ObjectReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionReport {
    pub revision: String,
    pub number: i64,
    pub phases: Vec<PhaseReport>,
}

fn render_yaml<T: Serialize>(report: &T, fallback: &dyn fmt::Display) -> String {
    serde_yaml::to_string(report).unwrap_or_else(|_| fallback.to_string())
}

/// Direct causes of `err`: aggregate children for this crate's types,
/// otherwise the standard `source()` chain link.
pub fn children<'a>(err: &'a DynError) -> Vec<&'a DynError> {
    if let Some(e) = err.downcast_ref::<RevisionValidationError>() {
        return e.children();
    }
    if let Some(e) = err.downcast_ref::<PhaseValidationError>() {
        return e.children();
    }
    if let Some(e) = err.downcast_ref::<ObjectValidationError>() {
        return e.children();
    }
    if let Some(e) = err.downcast_ref::<ObjectViolation>() {
        return vec![e.as_error()];
    }
    err.source().into_iter().collect()
}

/// Depth-first search for the first error of type `T` in the tree rooted at `err`.
pub fn find_cause<'a, T: StdError + 'static>(err: &'a DynError) -> Option<&'a T> {
    if let Some(found) = err.downcast_ref::<T>() {
        return Some(found);
    }
    children(err).into_iter().find_map(|c| find_cause::<T>(c))
}
