/// Builder that provisions a GKE cluster and hands back a ready client
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use super::auth::{Credentials, GoogleTokenSource};
use super::client::GkeClient;
use super::cluster::ClusterHandle;
use super::connector::GkeKubeConnector;
use super::models::Cluster;
use super::provider::{Backends, ClusterRef, KubeConnection, TokenSource};
use super::rollback::RollbackCoordinator;
use super::version::{list_latest_patch_versions, resolve_minor, KubeVersion};
use crate::error::{Error, Result};
use crate::utils::context::BuildContext;
use crate::utils::polling::ReadinessPoller;

/// Accumulates cluster options and builds the cluster.
///
/// Setters never fail; option conflicts are reported by [`Builder::build`]
/// before any network call.
pub struct Builder {
    pub name: String,
    project: String,
    location: String,
    credentials: Credentials,

    cluster_version: Option<KubeVersion>,
    major_minor: Option<(u64, u64)>,

    poller: ReadinessPoller,
    rollback: RollbackCoordinator,
    backends: Option<Backends>,
}

impl Builder {
    /// Create a builder with a generated unique cluster name
    pub fn new(
        credentials: Credentials,
        project: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: format!("t-{}", Uuid::new_v4()),
            project: project.into(),
            location: location.into(),
            credentials,
            cluster_version: None,
            major_minor: None,
            poller: ReadinessPoller::default(),
            rollback: RollbackCoordinator::default(),
            backends: None,
        }
    }

    /// Use a custom cluster name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Create the cluster at an exact Kubernetes version
    pub fn with_cluster_version(mut self, version: KubeVersion) -> Self {
        self.cluster_version = Some(version);
        self
    }

    /// Create the cluster at the latest offered patch of `major.minor`
    pub fn with_cluster_minor_version(mut self, major: u64, minor: u64) -> Self {
        self.major_minor = Some((major, minor));
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = ReadinessPoller::new(interval);
        self
    }

    /// Time allowed for deleting the cluster after a failed build
    pub fn with_rollback_timeout(mut self, timeout: Duration) -> Self {
        self.rollback = RollbackCoordinator::new(timeout);
        self
    }

    /// Replace the Google-backed implementations
    pub fn with_backends(mut self, backends: Backends) -> Self {
        self.backends = Some(backends);
        self
    }

    fn cluster_ref(&self) -> ClusterRef {
        ClusterRef::new(&self.project, &self.location, &self.name)
    }

    fn google_backends(&self) -> Result<Backends> {
        let tokens: Arc<dyn TokenSource> = Arc::new(GoogleTokenSource::new(&self.credentials)?);
        let clusters = Arc::new(GkeClient::new(tokens.clone())?);
        Ok(Backends {
            clusters,
            tokens,
            kube: Arc::new(GkeKubeConnector),
        })
    }

    /// Create the cluster, wait for it to be RUNNING and connect to it.
    ///
    /// Any failure after the create request was accepted triggers deletion of
    /// the cluster before the error is returned. If that deletion also fails
    /// the error is [`Error::CleanupFailure`].
    pub async fn build(mut self, ctx: &BuildContext) -> Result<ClusterHandle> {
        if self.cluster_version.is_some() && self.major_minor.is_some() {
            return Err(Error::conflict(
                "options for full cluster version and partial are mutually exclusive",
            ));
        }

        // Substituted backends outlive the build; Google-backed ones are dropped
        let (backends, kept_manager) = match self.backends.take() {
            Some(backends) => {
                let manager = backends.clusters.clone();
                (backends, Some(manager))
            }
            None => (self.google_backends()?, None),
        };
        let cluster = self.cluster_ref();
        info!("Building GKE cluster {}", cluster.resource_name());

        // Fail on bad credentials before anything billable exists
        ctx.run(&cluster.name, backends.tokens.token()).await?;

        let initial_version = match (self.cluster_version.take(), self.major_minor) {
            (Some(version), _) => Some(version),
            (None, Some((major, minor))) => {
                let catalog = ctx
                    .run(
                        &cluster.name,
                        list_latest_patch_versions(
                            backends.clusters.as_ref(),
                            &cluster.project,
                            &cluster.location,
                        ),
                    )
                    .await?;
                let version = resolve_minor(&catalog, major, minor)?;
                info!("Resolved Kubernetes {}.{} to {}", major, minor, version);
                Some(version)
            }
            (None, None) => None,
        };

        if let Some(reason) = ctx.done() {
            return Err(reason.into_error(&cluster.name));
        }
        // Not raced against the context: a create dropped in flight may still
        // have been accepted. A context that ended meanwhile is reported by the
        // first poll and rolled back.
        let operation = backends
            .clusters
            .create_cluster(&cluster, initial_version.as_ref())
            .await?;
        info!(
            "Creation of cluster {} accepted ({})",
            cluster.name, operation.name
        );

        match self.connect(&backends, &cluster, ctx).await {
            Ok((snapshot, connection)) => {
                info!("✓ Cluster {} is ready", cluster.name);
                Ok(ClusterHandle::new(
                    cluster,
                    self.credentials,
                    snapshot.current_master_version,
                    connection,
                    kept_manager,
                ))
            }
            Err(e) => Err(self
                .rollback
                .rollback(backends.clusters.as_ref(), &cluster, e)
                .await),
        }
    }

    /// Post-creation steps; every error here is rolled back by the caller
    async fn connect(
        &self,
        backends: &Backends,
        cluster: &ClusterRef,
        ctx: &BuildContext,
    ) -> Result<(Cluster, KubeConnection)> {
        self.poller
            .wait_until_running(backends.clusters.as_ref(), cluster, ctx)
            .await?;

        let token = ctx.run(&cluster.name, backends.tokens.token()).await?;
        let snapshot = ctx
            .run(&cluster.name, backends.clusters.get_cluster(cluster))
            .await?;
        debug!(
            "Connecting to cluster {} at {:?}",
            cluster.name, snapshot.endpoint
        );

        let connection = ctx
            .run(&cluster.name, backends.kube.connect(&snapshot, &token))
            .await?;
        Ok((snapshot, connection))
    }
}
