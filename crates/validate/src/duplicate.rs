//! Duplicate object detection across one or more phases.

use std::collections::{BTreeMap, BTreeSet};

use phasegate_core::{ObjectRef, Phase};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{DuplicateObjectError, ObjectValidationError};

/// Conflicting object refs mapped to the sorted names of every phase they occur in.
///
/// A repeat inside the same phase is a conflict too; that phase is then listed once.
pub fn check_for_duplicates<'a>(phases: impl IntoIterator<Item = &'a Phase>) -> BTreeMap<ObjectRef, Vec<String>> {
    let mut first_seen: FxHashMap<ObjectRef, &str> = FxHashMap::default();
    let mut conflicts: BTreeMap<ObjectRef, BTreeSet<String>> = BTreeMap::new();
    for phase in phases {
        for obj in &phase.objects {
            let obj_ref = obj.object_ref();
            match first_seen.get(&obj_ref).copied() {
                None => {
                    first_seen.insert(obj_ref, phase.name.as_str());
                }
                Some(first) => {
                    let names = conflicts.entry(obj_ref).or_default();
                    names.insert(first.to_string());
                    names.insert(phase.name.clone());
                }
            }
        }
    }
    conflicts.into_iter().map(|(r, names)| (r, names.into_iter().collect())).collect()
}

/// One error per conflicting ref, in ref order.
pub fn duplicate_errors(conflicts: &BTreeMap<ObjectRef, Vec<String>>) -> Vec<ObjectValidationError> {
    conflicts
        .iter()
        .filter_map(|(r, phases)| ObjectValidationError::new(r.clone(), vec![DuplicateObjectError { phases: phases.clone() }.into()]))
        .collect()
}

/// Duplicate errors for the conflicting refs that occur in `phase`, at most one per ref,
/// in the order the objects appear.
pub(crate) fn duplicates_in_phase(phase: &Phase, conflicts: &BTreeMap<ObjectRef, Vec<String>>) -> Vec<ObjectValidationError> {
    if conflicts.is_empty() {
        return Vec::new();
    }
    let mut reported: FxHashSet<ObjectRef> = FxHashSet::default();
    let mut out = Vec::new();
    for obj in &phase.objects {
        let obj_ref = obj.object_ref();
        let Some(phases) = conflicts.get(&obj_ref) else { continue };
        if !reported.insert(obj_ref.clone()) {
            continue;
        }
        out.extend(ObjectValidationError::new(obj_ref, vec![DuplicateObjectError { phases: phases.clone() }.into()]));
    }
    out
}

/// Merge errors sharing an object ref into one entry, keeping first-seen order.
pub fn compact(errs: Vec<ObjectValidationError>) -> Vec<ObjectValidationError> {
    let mut index: FxHashMap<ObjectRef, usize> = FxHashMap::default();
    let mut out: Vec<ObjectValidationError> = Vec::with_capacity(errs.len());
    for err in errs {
        match index.get(&err.object) {
            Some(&i) => out[i].merge(err),
            None => {
                index.insert(err.object.clone(), out.len());
                out.push(err);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FieldError, ObjectViolation};
    use phasegate_core::Manifest;
    use serde_json::json;

    fn cm(name: &str) -> Manifest {
        Manifest::new(json!({ "apiVersion": "v1", "kind": "ConfigMap", "metadata": { "name": name, "namespace": "ns1" } }))
    }

    #[test]
    fn no_conflicts_for_distinct_objects() {
        let a = Phase::new("a", vec![cm("one")]);
        let b = Phase::new("b", vec![cm("two")]);
        assert!(check_for_duplicates([&a, &b]).is_empty());
    }

    #[test]
    fn cross_phase_conflict_lists_sorted_phases() {
        let z = Phase::new("zeta", vec![cm("one")]);
        let a = Phase::new("alpha", vec![cm("one")]);
        let m = Phase::new("mid", vec![cm("one"), cm("two")]);
        let conflicts = check_for_duplicates([&z, &a, &m]);
        assert_eq!(conflicts.len(), 1);
        let (r, phases) = conflicts.iter().next().unwrap();
        assert_eq!(r.name, "one");
        assert_eq!(phases, &vec!["alpha".to_string(), "mid".to_string(), "zeta".to_string()]);
        assert_eq!(duplicate_errors(&conflicts).len(), 1);
    }

    #[test]
    fn same_phase_repeat_is_a_conflict() {
        let p = Phase::new("core", vec![cm("one"), cm("one")]);
        let conflicts = check_for_duplicates([&p]);
        assert_eq!(conflicts.values().next().unwrap(), &vec!["core".to_string()]);
        let errs = duplicates_in_phase(&p, &conflicts);
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn compact_merges_by_ref() {
        let r = cm("one").object_ref();
        let other = cm("two").object_ref();
        let errs = vec![
            ObjectValidationError::new(r.clone(), vec![FieldError::forbidden("metadata.uid").into()]).unwrap(),
            ObjectValidationError::new(other, vec![FieldError::required("kind").into()]).unwrap(),
            ObjectValidationError::new(r, vec![DuplicateObjectError { phases: vec!["core".into()] }.into()]).unwrap(),
        ];
        let out = compact(errs);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].object.name, "one");
        assert_eq!(out[0].violations.len(), 2);
        assert!(matches!(out[0].violations[1], ObjectViolation::Duplicate(_)));
        assert_eq!(out[1].object.name, "two");
    }
}
