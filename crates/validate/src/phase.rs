//! Phase-level validation: name, every object, then duplicates within the phase.

use anyhow::Result;
use once_cell::sync::Lazy;
use phasegate_core::{Manifest, Phase};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::duplicate::{check_for_duplicates, compact, duplicates_in_phase};
use crate::error::{ObjectValidationError, PhaseNameError, PhaseValidationError};
use crate::metadata::validate_object_metadata;
use crate::object::ObjectValidator;

const DNS1035_LABEL_MAX_LEN: usize = 63;
const DNS1035_LABEL_FMT: &str = "[a-z]([-a-z0-9]*[a-z0-9])?";

static DNS1035_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{DNS1035_LABEL_FMT}$")).expect("DNS-1035 label pattern compiles"));

/// Checks `name` against DNS-1035 label rules; collects every failed rule.
pub fn validate_phase_name(name: &str) -> Option<PhaseNameError> {
    let mut messages = Vec::new();
    if name.len() > DNS1035_LABEL_MAX_LEN {
        messages.push(format!("must be no more than {DNS1035_LABEL_MAX_LEN} characters"));
    }
    if !DNS1035_LABEL.is_match(name) {
        messages.push(format!(
            "a DNS-1035 label must consist of lower case alphanumeric characters or '-', start with an alphabetic character, \
             and end with an alphanumeric character (e.g. 'my-name', or 'abc-123', regex used for validation is '{DNS1035_LABEL_FMT}')"
        ));
    }
    if messages.is_empty() {
        return None;
    }
    Some(PhaseNameError { name: name.to_string(), messages })
}

/// Cluster-aware phase validation, meant to run right before applying the phase.
#[derive(Clone)]
pub struct PhaseValidator {
    objects: ObjectValidator,
}

impl PhaseValidator {
    pub fn new(objects: ObjectValidator) -> Self { Self { objects } }

    /// Visits every object even after findings. The first operational error
    /// aborts the phase and is returned unchanged.
    pub async fn validate(&self, cancel: &CancellationToken, owner: &Manifest, phase: &Phase) -> Result<Option<PhaseValidationError>> {
        let name_error = validate_phase_name(&phase.name);
        let mut errs: Vec<ObjectValidationError> = Vec::new();
        for obj in &phase.objects {
            match self.objects.validate(cancel, owner, obj).await {
                Ok(found) => errs.extend(found),
                Err(e) => {
                    warn!(phase = %phase.name, object = %obj.object_ref(), error = %e, "phase validation aborted");
                    return Err(e);
                }
            }
        }
        let conflicts = check_for_duplicates([phase]);
        errs.extend(duplicates_in_phase(phase, &conflicts));

        let result = PhaseValidationError::new(phase.name.clone(), name_error, compact(errs));
        info!(phase = %phase.name, objects = phase.objects.len(), valid = result.is_none(), "phase validated");
        Ok(result)
    }
}

/// Static checks for one phase: name, metadata of every object, and duplicates
/// against `conflicts` computed over whatever scope the caller chose.
pub(crate) fn static_validate_phase(
    phase: &Phase,
    conflicts: &std::collections::BTreeMap<phasegate_core::ObjectRef, Vec<String>>,
) -> Option<PhaseValidationError> {
    let name_error = validate_phase_name(&phase.name);
    let mut errs: Vec<ObjectValidationError> = phase
        .objects
        .iter()
        .filter_map(|obj| {
            let violations = validate_object_metadata(obj).into_iter().map(Into::into).collect();
            ObjectValidationError::new(obj.object_ref(), violations)
        })
        .collect();
    errs.extend(duplicates_in_phase(phase, conflicts));
    PhaseValidationError::new(phase.name.clone(), name_error, compact(errs))
}

/// Cluster-free variant of [`PhaseValidator::validate`] for a single phase.
pub fn validate_phase_static(phase: &Phase) -> Option<PhaseValidationError> {
    static_validate_phase(phase, &check_for_duplicates([phase]))
}
