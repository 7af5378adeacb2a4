//! Phasegate core types: untyped manifests, object identity, phases and revisions.

#![forbid(unsafe_code)]

use std::fmt;

use kube::core::GroupVersionKind;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub mod cluster;

pub use cluster::{DryRunClient, RestMappingError, RestScopeMapper};

/// A single Kubernetes-style manifest (apiVersion, kind, metadata, spec, ...).
///
/// Schema-less: any kind (incl. CRDs) is accepted.
/// Field access goes through explicit path lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Json);

impl Manifest {
    pub fn new(raw: Json) -> Self { Self(raw) }

    pub fn as_json(&self) -> &Json { &self.0 }

    pub fn into_json(self) -> Json { self.0 }

    /// Walk `path` through nested objects, e.g. `["metadata", "uid"]`.
    pub fn lookup(&self, path: &[&str]) -> Option<&Json> {
        let mut cur = &self.0;
        for seg in path {
            cur = cur.as_object()?.get(*seg)?;
        }
        Some(cur)
    }

    /// String at `path`, or `""` when absent or not a string.
    pub fn str_at(&self, path: &[&str]) -> &str {
        self.lookup(path).and_then(|v| v.as_str()).unwrap_or("")
    }

    pub fn api_version(&self) -> &str { self.str_at(&["apiVersion"]) }

    pub fn kind(&self) -> &str { self.str_at(&["kind"]) }

    pub fn name(&self) -> &str { self.str_at(&["metadata", "name"]) }

    pub fn namespace(&self) -> &str { self.str_at(&["metadata", "namespace"]) }

    pub fn gvk(&self) -> GroupVersionKind {
        let (group, version) = split_api_version(self.api_version());
        GroupVersionKind { group, version, kind: self.kind().to_string() }
    }

    pub fn object_ref(&self) -> ObjectRef {
        let gvk = self.gvk();
        ObjectRef {
            group: gvk.group,
            version: gvk.version,
            kind: gvk.kind,
            namespace: self.namespace().to_string(),
            name: self.name().to_string(),
        }
    }
}

impl From<Json> for Manifest {
    fn from(v: Json) -> Self { Self(v) }
}

/// Returns true when the value at a path carries nothing: absent, null,
/// empty string/list/map, or numeric zero.
pub fn is_unset(v: Option<&Json>) -> bool {
    match v {
        None | Some(Json::Null) => true,
        Some(Json::String(s)) => s.is_empty(),
        Some(Json::Array(a)) => a.is_empty(),
        Some(Json::Object(m)) => m.is_empty(),
        Some(Json::Number(n)) => n.as_f64() == Some(0.0),
        Some(Json::Bool(b)) => !b,
    }
}

fn split_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Identity of a manifest within a validation scope.
///
/// Ordering is field-wise so maps keyed by `ObjectRef` iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}, Kind={} ", self.version, self.kind)?;
        } else {
            write!(f, "{}/{}, Kind={} ", self.group, self.version, self.kind)?;
        }
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Named, ordered group of manifests applied as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<Manifest>,
}

impl Phase {
    pub fn new(name: impl Into<String>, objects: Vec<Manifest>) -> Self {
        Self { name: name.into(), objects }
    }
}

/// Ordered sequence of phases making up one version of a deployable set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub name: String,
    #[serde(default)]
    pub revision: i64,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

pub mod prelude {
    pub use super::{is_unset, DryRunClient, Manifest, ObjectRef, Phase, RestMappingError, RestScopeMapper, Revision};
}
