//! In-memory stand-ins for the REST mapper and the dry-run client.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kube::{core::GroupVersionKind, discovery::Scope, error::ErrorResponse};
use phasegate_core::{DryRunClient, Manifest, RestMappingError, RestScopeMapper};
use phasegate_validate::{ObjectValidator, ValidatorConfig};
use serde_json::json;

/// Knows a fixed set of kinds; everything else is `NoMatch`.
pub struct FakeMapper {
    namespaced: HashMap<String, bool>,
}

impl FakeMapper {
    pub fn standard() -> Self {
        let namespaced = [("ConfigMap", true), ("Deployment", true), ("Secret", true), ("Namespace", false), ("ClusterRole", false)]
            .into_iter()
            .map(|(k, n)| (k.to_string(), n))
            .collect();
        Self { namespaced }
    }
}

#[async_trait]
impl RestScopeMapper for FakeMapper {
    async fn scope_of(&self, gvk: &GroupVersionKind) -> Result<Scope, RestMappingError> {
        match self.namespaced.get(&gvk.kind) {
            Some(true) => Ok(Scope::Namespaced),
            Some(false) => Ok(Scope::Cluster),
            None => Err(RestMappingError::no_match(gvk)),
        }
    }
}

#[derive(Clone)]
pub enum Reply {
    Accept,
    Status { reason: &'static str, code: u16, message: &'static str },
    Transport(&'static str),
    Hang,
}

pub fn status(reason: &'static str, code: u16) -> Reply {
    Reply::Status { reason, code, message: "rejected by fake api server" }
}

/// Replies per object name and per verb; unknown names are accepted.
#[derive(Default)]
pub struct FakeClient {
    apply: Mutex<HashMap<String, Reply>>,
    create: Mutex<HashMap<String, Reply>>,
    pub calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeClient {
    pub fn on_apply(self, name: &str, reply: Reply) -> Self {
        self.apply.lock().unwrap().insert(name.to_string(), reply);
        self
    }

    pub fn on_create(self, name: &str, reply: Reply) -> Self {
        self.create.lock().unwrap().insert(name.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, verb: &str, table: &Mutex<HashMap<String, Reply>>, obj: &Manifest, field_manager: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push((verb.to_string(), obj.name().to_string(), field_manager.to_string()));
        let reply = table.lock().unwrap().get(obj.name()).cloned().unwrap_or(Reply::Accept);
        match reply {
            Reply::Accept => Ok(()),
            Reply::Status { reason, code, message } => Err(kube::Error::Api(ErrorResponse {
                status: "Failure".into(),
                message: message.into(),
                reason: reason.into(),
                code,
            })
            .into()),
            Reply::Transport(msg) => Err(anyhow::anyhow!(msg)),
            Reply::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DryRunClient for FakeClient {
    async fn dry_run_apply(&self, obj: &Manifest, field_manager: &str) -> anyhow::Result<()> {
        self.answer("apply", &self.apply, obj, field_manager).await
    }

    async fn dry_run_create(&self, obj: &Manifest, field_manager: &str) -> anyhow::Result<()> {
        self.answer("create", &self.create, obj, field_manager).await
    }
}

pub fn namespaced_validator(client: Arc<FakeClient>) -> ObjectValidator {
    ObjectValidator::namespaced(Arc::new(FakeMapper::standard()), client, &ValidatorConfig::default())
}

pub fn owner(ns: &str) -> Manifest {
    Manifest::new(json!({
        "apiVersion": "example.com/v1",
        "kind": "Rollout",
        "metadata": { "name": "owner", "namespace": ns }
    }))
}

pub fn config_map(name: &str, ns: &str) -> Manifest {
    Manifest::new(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": ns },
        "data": { "key": "value" }
    }))
}

pub fn cluster_role(name: &str) -> Manifest {
    Manifest::new(json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRole",
        "metadata": { "name": name },
        "rules": []
    }))
}
