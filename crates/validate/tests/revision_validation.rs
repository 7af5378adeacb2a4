#![forbid(unsafe_code)]

use phasegate_core::{Manifest, Phase, Revision};
use phasegate_validate::{find_cause, validate_revision, DuplicateObjectError, FieldError, ObjectViolation, PhaseNameError};
use serde_json::json;

fn cm1() -> Manifest {
    Manifest::new(json!({ "apiVersion": "v1", "kind": "ConfigMap", "metadata": { "name": "cm1", "namespace": "ns1" } }))
}

fn cm(name: &str) -> Manifest {
    Manifest::new(json!({ "apiVersion": "v1", "kind": "ConfigMap", "metadata": { "name": name, "namespace": "ns1" } }))
}

#[test]
fn valid_revision_returns_none() {
    let rev = Revision {
        name: "rev-a".into(),
        revision: 1,
        phases: vec![Phase::new("core", vec![cm("a")]), Phase::new("extra", vec![cm("b")])],
    };
    assert!(validate_revision(&rev).is_none());
}

#[test]
fn cross_phase_duplicate_is_reported_in_each_phase() {
    let rev = Revision {
        name: "rev-a".into(),
        revision: 3,
        phases: vec![Phase::new("core", vec![cm1()]), Phase::new("extra", vec![cm1()])],
    };
    let err = validate_revision(&rev).unwrap();
    assert_eq!(err.name, "rev-a");
    assert_eq!(err.revision, 3);
    assert_eq!(err.phases.len(), 2);
    for (phase, expected) in err.phases.iter().zip(["core", "extra"]) {
        assert_eq!(phase.phase, expected);
        assert_eq!(phase.objects.len(), 1);
        let obj = &phase.objects[0];
        assert_eq!(obj.object.name, "cm1");
        assert_eq!(obj.violations.len(), 1);
        match &obj.violations[0] {
            ObjectViolation::Duplicate(DuplicateObjectError { phases }) => {
                assert_eq!(phases, &vec!["core".to_string(), "extra".to_string()])
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
    }
    let report = err.report();
    assert!(report.contains("duplicate object found in phases: core, extra"), "{report}");
}

#[test]
fn duplicate_phase_names_are_sorted_regardless_of_order() {
    let rev = Revision {
        name: "rev-b".into(),
        revision: 1,
        phases: vec![Phase::new("zulu", vec![cm("x")]), Phase::new("alpha", vec![cm("x")])],
    };
    let err = validate_revision(&rev).unwrap();
    let dup = find_cause::<DuplicateObjectError>(&err).unwrap();
    assert_eq!(dup.phases, vec!["alpha".to_string(), "zulu".to_string()]);
}

#[test]
fn only_offending_phases_are_listed() {
    let mut with_uid = cm("a").into_json();
    with_uid["metadata"]["uid"] = json!("1234");
    let rev = Revision {
        name: "rev-c".into(),
        revision: 2,
        phases: vec![Phase::new("core", vec![cm("ok")]), Phase::new("extra", vec![Manifest::new(with_uid)])],
    };
    let err = validate_revision(&rev).unwrap();
    assert_eq!(err.phases.len(), 1);
    assert_eq!(err.phases[0].phase, "extra");
    assert_eq!(find_cause::<FieldError>(&err), Some(&FieldError::forbidden("metadata.uid")));
}

#[test]
fn bad_phase_names_fail_independently_of_objects() {
    let long = "a".repeat(64);
    for name in ["Invalid_Name", "-leadinghyphen", long.as_str()] {
        let rev = Revision { name: "rev".into(), revision: 1, phases: vec![Phase::new(name, vec![])] };
        let err = validate_revision(&rev).unwrap();
        assert_eq!(find_cause::<PhaseNameError>(&err).unwrap().name, name);
        assert!(err.phases[0].objects.is_empty());
    }
}
