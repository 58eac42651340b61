use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{Api, ApiResource, DynamicObject, ListParams};
use kube::Client;
use tracing::debug;

use crate::error::FetchError;
use crate::snapshot::{PodSnapshot, ReleaseSnapshot, ResourceSnapshot};
use crate::types::ResourceKind;

/// Read-only access to the cluster objects a scan needs.
///
/// Implementations must be safe to share between concurrently running scan
/// tasks. Timeouts are applied by the caller around each call.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<String>, FetchError>;

    async fn list_resources(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<ResourceSnapshot>, FetchError>;

    /// Fetch a single object again; `None` when it no longer exists.
    async fn get_resource(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ResourceSnapshot>, FetchError>;
}

/// Flux HelmRelease API resource definition.
pub fn helm_release_api() -> ApiResource {
    ApiResource {
        group: "helm.toolkit.fluxcd.io".to_string(),
        version: "v2".to_string(),
        api_version: "helm.toolkit.fluxcd.io/v2".to_string(),
        kind: "HelmRelease".to_string(),
        plural: "helmreleases".to_string(),
    }
}

/// `ResourceClient` backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
}

impl KubeResourceClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn releases(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &helm_release_api())
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn list_namespaces(&self) -> Result<Vec<String>, FetchError> {
        let ns_api: Api<Namespace> = Api::all(self.client.clone());
        let list = ns_api.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn list_resources(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<ResourceSnapshot>, FetchError> {
        let snapshots: Vec<ResourceSnapshot> = match kind {
            ResourceKind::Pods | ResourceKind::PodsDeep => self
                .pods(namespace)
                .list(&ListParams::default())
                .await?
                .items
                .iter()
                .map(|p| ResourceSnapshot::Pod(PodSnapshot::from(p)))
                .collect(),
            ResourceKind::Releases => self
                .releases(namespace)
                .list(&ListParams::default())
                .await?
                .items
                .iter()
                .map(|r| ResourceSnapshot::Release(ReleaseSnapshot::from(r)))
                .collect(),
        };
        debug!(namespace, kind = %kind, count = snapshots.len(), "Listed resources");
        Ok(snapshots)
    }

    async fn get_resource(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ResourceSnapshot>, FetchError> {
        let snapshot = match kind {
            ResourceKind::Pods | ResourceKind::PodsDeep => self
                .pods(namespace)
                .get_opt(name)
                .await?
                .map(|p| ResourceSnapshot::Pod(PodSnapshot::from(&p))),
            ResourceKind::Releases => self
                .releases(namespace)
                .get_opt(name)
                .await?
                .map(|r| ResourceSnapshot::Release(ReleaseSnapshot::from(&r))),
        };
        Ok(snapshot)
    }
}
