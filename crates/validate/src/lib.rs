//! Phasegate validation engine.
//!
//! Three levels: a single object ([`ObjectValidator`]), a phase
//! ([`PhaseValidator`], cluster-aware, for the moment right before apply) and a
//! whole revision ([`validate_revision`], static and cheap).
//!
//! Results follow one convention: `Ok(None)` is valid, `Ok(Some(err))` is a
//! validation verdict safe to show as "fix your manifest", and `Err` is an
//! operational failure (network, cancellation, missing REST mapping) that
//! callers should treat as retryable.

#![forbid(unsafe_code)]

pub mod config;
pub mod dryrun;
pub mod duplicate;
pub mod error;
pub mod metadata;
pub mod namespace;
pub mod object;
pub mod phase;
pub mod revision;

pub use config::{ValidatorConfig, DEFAULT_FIELD_MANAGER};
pub use dryrun::{is_validation_failure, DryRunValidator};
pub use duplicate::{check_for_duplicates, compact, duplicate_errors};
pub use error::{
    children, find_cause, DryRunValidationError, DuplicateObjectError, FieldError, FieldErrorKind, NamespaceScopeViolation,
    ObjectReport, ObjectValidationError, ObjectViolation, OperationalError, PhaseNameError, PhaseReport, PhaseValidationError,
    RevisionReport, RevisionValidationError,
};
pub use metadata::validate_object_metadata;
pub use namespace::NamespaceScopeValidator;
pub use object::ObjectValidator;
pub use phase::{validate_phase_name, validate_phase_static, PhaseValidator};
pub use revision::validate_revision;
