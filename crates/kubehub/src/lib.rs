//! Phasegate kubehub: kube-rs backed REST scope lookup and dry-run writes.

#![forbid(unsafe_code)]

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::{
    api::{Api, Patch, PatchParams, PostParams},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    discovery::{ApiCapabilities, Discovery, Scope},
    Client,
};
use metrics::{counter, histogram};
use phasegate_core::{DryRunClient, Manifest, RestMappingError, RestScopeMapper};
use tokio::sync::OnceCell;
use tracing::{debug, info};

static CLIENT: OnceCell<Client> = OnceCell::const_new();

/// Shared client for the current kube context, created on first use.
pub async fn get_kube_client() -> Result<Client> {
    let client = CLIENT
        .get_or_try_init(|| async { Client::try_default().await })
        .await
        .context("creating kube client from current context")?;
    Ok(client.clone())
}

/// Discovery snapshot plus client, serving both collaborator seams.
///
/// Discovery runs once at construction; kinds installed afterwards
/// (e.g. freshly created CRDs) need a new backend.
pub struct KubeBackend {
    client: Client,
    discovery: Discovery,
}

impl KubeBackend {
    pub async fn connect() -> Result<Self> {
        let client = get_kube_client().await?;
        Self::from_client(client).await
    }

    pub async fn from_client(client: Client) -> Result<Self> {
        let started = Instant::now();
        let discovery = Discovery::new(client.clone()).run().await.context("running API discovery")?;
        histogram!("discovery_latency_ms", started.elapsed().as_secs_f64() * 1000.0);
        info!(groups = discovery.groups().count(), "discovery complete");
        Ok(Self { client, discovery })
    }

    /// Exact group/version/kind first, then the group's recommended version of the kind.
    fn resolve(&self, gvk: &GroupVersionKind) -> Result<(ApiResource, ApiCapabilities), RestMappingError> {
        if let Some(found) = self.discovery.resolve_gvk(gvk) {
            return Ok(found);
        }
        self.discovery
            .get(&gvk.group)
            .and_then(|g| g.recommended_kind(&gvk.kind))
            .ok_or_else(|| RestMappingError::no_match(gvk))
    }

    fn api_for(&self, obj: &Manifest) -> Result<Api<DynamicObject>> {
        let (ar, caps) = self.resolve(&obj.gvk())?;
        let api = match caps.scope {
            Scope::Namespaced if obj.namespace().is_empty() => Api::default_namespaced_with(self.client.clone(), &ar),
            Scope::Namespaced => Api::namespaced_with(self.client.clone(), obj.namespace(), &ar),
            Scope::Cluster => Api::all_with(self.client.clone(), &ar),
        };
        Ok(api)
    }
}

#[async_trait]
impl RestScopeMapper for KubeBackend {
    async fn scope_of(&self, gvk: &GroupVersionKind) -> Result<Scope, RestMappingError> {
        let (_, caps) = self.resolve(gvk)?;
        Ok(match caps.scope {
            Scope::Namespaced => Scope::Namespaced,
            Scope::Cluster => Scope::Cluster,
        })
    }
}

#[async_trait]
impl DryRunClient for KubeBackend {
    async fn dry_run_apply(&self, obj: &Manifest, field_manager: &str) -> Result<()> {
        let api = self.api_for(obj)?;
        let pp = PatchParams::apply(field_manager).force().dry_run();
        debug!(object = %obj.object_ref(), "dry-run server-side apply");
        counter!("dry_run_requests_total", 1u64);
        api.patch(obj.name(), &pp, &Patch::Apply(obj.as_json())).await?;
        Ok(())
    }

    async fn dry_run_create(&self, obj: &Manifest, field_manager: &str) -> Result<()> {
        let api = self.api_for(obj)?;
        let dyn_obj: DynamicObject = serde_json::from_value(obj.as_json().clone())
            .context("converting manifest into DynamicObject")?;
        let pp = PostParams { dry_run: true, field_manager: Some(field_manager.to_string()) };
        debug!(object = %obj.object_ref(), "dry-run create");
        counter!("dry_run_requests_total", 1u64);
        api.create(&pp, &dyn_obj).await?;
        Ok(())
    }
}
