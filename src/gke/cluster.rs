/// Handle to a ready GKE cluster
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::auth::{Credentials, GoogleTokenSource};
use super::client::GkeClient;
use super::provider::{ClusterManager, ClusterRef, KubeConnection};
use crate::error::{Error, Result};
use crate::utils::context::BuildContext;

/// Something installed onto a cluster after it is built
pub trait Addon: Send + Sync {
    fn name(&self) -> &str;
}

/// Installed addons by name
pub type Addons = HashMap<String, Arc<dyn Addon>>;

/// A live cluster returned by a successful build.
///
/// The builder keeps no reference to it; the caller owns its lifetime and is
/// responsible for calling [`ClusterHandle::cleanup`].
pub struct ClusterHandle {
    cluster: ClusterRef,
    credentials: Credentials,
    version: Option<String>,
    config: kube::Config,
    client: kube::Client,
    addons: RwLock<Addons>,
    /// Substituted lifecycle client; `None` means a GKE client is opened per cleanup
    manager: Option<Arc<dyn ClusterManager>>,
}

impl ClusterHandle {
    pub(crate) fn new(
        cluster: ClusterRef,
        credentials: Credentials,
        version: Option<String>,
        connection: KubeConnection,
        manager: Option<Arc<dyn ClusterManager>>,
    ) -> Self {
        Self {
            cluster,
            credentials,
            version,
            config: connection.config,
            client: connection.client,
            addons: RwLock::new(Addons::new()),
            manager,
        }
    }

    pub fn name(&self) -> &str {
        &self.cluster.name
    }

    pub fn project(&self) -> &str {
        &self.cluster.project
    }

    pub fn location(&self) -> &str {
        &self.cluster.location
    }

    pub fn cluster_ref(&self) -> &ClusterRef {
        &self.cluster
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Master version reported when the cluster became ready
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// API server connection config
    pub fn config(&self) -> &kube::Config {
        &self.config
    }

    pub fn client(&self) -> kube::Client {
        self.client.clone()
    }

    /// Record an installed addon. Names must be unique per cluster.
    pub async fn register_addon(&self, addon: Arc<dyn Addon>) -> Result<()> {
        let mut addons = self.addons.write().await;
        let name = addon.name().to_string();
        if addons.contains_key(&name) {
            return Err(Error::AddonConflict(name));
        }
        addons.insert(name, addon);
        Ok(())
    }

    pub async fn get_addon(&self, name: &str) -> Option<Arc<dyn Addon>> {
        self.addons.read().await.get(name).cloned()
    }

    /// Names of registered addons, sorted
    pub async fn addon_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.addons.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    fn manager(&self) -> Result<Arc<dyn ClusterManager>> {
        match &self.manager {
            Some(manager) => Ok(manager.clone()),
            None => {
                let tokens = Arc::new(GoogleTokenSource::new(&self.credentials)?);
                Ok(Arc::new(GkeClient::new(tokens)?))
            }
        }
    }

    /// Delete the cluster
    pub async fn cleanup(&self, ctx: &BuildContext) -> Result<()> {
        info!("Deleting cluster {}", self.cluster.resource_name());
        let manager = self.manager()?;
        let operation = ctx
            .run(&self.cluster.name, manager.delete_cluster(&self.cluster))
            .await?;
        info!(
            "✓ Deletion of cluster {} accepted ({})",
            self.cluster.name, operation.name
        );
        Ok(())
    }
}

impl std::fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("cluster", &self.cluster)
            .field("version", &self.version)
            .field("cluster_url", &self.config.cluster_url)
            .finish_non_exhaustive()
    }
}
