//! Structural checks on a single manifest. Pure, no I/O.

use phasegate_core::{is_unset, Manifest};

use crate::error::FieldError;

/// Metadata set by the API server on live objects; templates must leave them empty.
const SERVER_OWNED_METADATA: [&str; 6] = ["uid", "generation", "generateName", "finalizers", "ownerReferences", "resourceVersion"];

/// Every check runs; the result lists all findings in a stable order.
pub fn validate_object_metadata(obj: &Manifest) -> Vec<FieldError> {
    let mut errs = Vec::new();
    if obj.api_version().is_empty() {
        errs.push(FieldError::required("apiVersion"));
    }
    if obj.kind().is_empty() {
        errs.push(FieldError::required("kind"));
    }
    for field in SERVER_OWNED_METADATA {
        if !is_unset(obj.lookup(&["metadata", field])) {
            errs.push(FieldError::forbidden(format!("metadata.{field}")));
        }
    }
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldErrorKind;
    use serde_json::json;

    #[test]
    fn clean_template_passes() {
        let obj = Manifest::new(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "cm1", "namespace": "ns1", "generation": 0, "finalizers": [] },
            "data": { "k": "v" }
        }));
        assert!(validate_object_metadata(&obj).is_empty());
    }

    #[test]
    fn reports_every_problem_without_short_circuit() {
        let obj = Manifest::new(json!({
            "metadata": {
                "name": "x",
                "uid": "5b1c3f3e-2f8e-4f5c-9a7e-0f2b0c1d2e3f",
                "generation": 4,
                "generateName": "x-",
                "finalizers": ["example.com/cleanup"],
                "ownerReferences": [{ "apiVersion": "v1", "kind": "Secret", "name": "o", "uid": "u" }],
                "resourceVersion": "123"
            }
        }));
        let fields: Vec<_> = validate_object_metadata(&obj).into_iter().map(|e| (e.field, e.kind)).collect();
        assert_eq!(fields, vec![
            ("apiVersion".to_string(), FieldErrorKind::Required),
            ("kind".to_string(), FieldErrorKind::Required),
            ("metadata.uid".to_string(), FieldErrorKind::Forbidden),
            ("metadata.generation".to_string(), FieldErrorKind::Forbidden),
            ("metadata.generateName".to_string(), FieldErrorKind::Forbidden),
            ("metadata.finalizers".to_string(), FieldErrorKind::Forbidden),
            ("metadata.ownerReferences".to_string(), FieldErrorKind::Forbidden),
            ("metadata.resourceVersion".to_string(), FieldErrorKind::Forbidden),
        ]);
    }

    #[test]
    fn uid_is_forbidden_even_on_otherwise_valid_object() {
        let obj = Manifest::new(json!({ "apiVersion": "v1", "kind": "ConfigMap", "metadata": { "name": "a", "uid": "abc" } }));
        let errs = validate_object_metadata(&obj);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].to_string(), "metadata.uid: forbidden, must be empty");
    }

    #[test]
    fn empty_api_version_message() {
        let obj = Manifest::new(json!({ "apiVersion": "", "kind": "ConfigMap" }));
        let errs = validate_object_metadata(&obj);
        assert_eq!(errs[0].to_string(), "apiVersion: required, must not be empty");
    }
}
