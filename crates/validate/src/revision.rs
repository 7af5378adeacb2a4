//! Whole-revision static preflight: no cluster calls.

use metrics::counter;
use phasegate_core::Revision;
use tracing::info;

use crate::duplicate::check_for_duplicates;
use crate::error::{PhaseValidationError, RevisionValidationError};
use crate::phase::static_validate_phase;

/// Metadata and phase-name checks for every phase, plus duplicate detection
/// across all phases of the revision.
pub fn validate_revision(rev: &Revision) -> Option<RevisionValidationError> {
    counter!("validate_revision_total", 1u64);
    let conflicts = check_for_duplicates(&rev.phases);
    let phases: Vec<PhaseValidationError> = rev.phases.iter().filter_map(|p| static_validate_phase(p, &conflicts)).collect();
    info!(
        revision = %rev.name,
        number = rev.revision,
        phases = rev.phases.len(),
        invalid_phases = phases.len(),
        duplicates = conflicts.len(),
        "revision preflight complete"
    );
    RevisionValidationError::new(rev.name.clone(), rev.revision, phases)
}
