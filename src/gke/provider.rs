/// Capability traits consumed by the cluster builder
///
/// The builder only talks to the outside world through these three seams, so
/// tests can substitute fakes without touching orchestration logic.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

use super::models::{Cluster, Operation, ServerConfig};
use super::version::KubeVersion;
use crate::error::Result;

/// Identifies a cluster within a project and location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub project: String,
    pub location: String,
    pub name: String,
}

impl ClusterRef {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            name: name.into(),
        }
    }

    /// `projects/{project}/locations/{location}`
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.location)
    }

    /// `projects/{project}/locations/{location}/clusters/{name}`
    pub fn resource_name(&self) -> String {
        format!("{}/clusters/{}", self.parent(), self.name)
    }
}

impl std::fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resource_name())
    }
}

/// Cluster lifecycle operations against the provider's control plane
#[async_trait]
pub trait ClusterManager: Send + Sync {
    /// Versions currently offered for a project and location
    async fn server_config(&self, project: &str, location: &str) -> Result<ServerConfig>;

    /// Request cluster creation. Returns once the request is accepted.
    async fn create_cluster(
        &self,
        cluster: &ClusterRef,
        initial_version: Option<&KubeVersion>,
    ) -> Result<Operation>;

    /// Fetch a status snapshot of a cluster
    async fn get_cluster(&self, cluster: &ClusterRef) -> Result<Cluster>;

    /// Request cluster deletion. Returns once the request is accepted.
    async fn delete_cluster(&self, cluster: &ClusterRef) -> Result<Operation>;
}

/// Short-lived bearer token
#[derive(Clone)]
pub struct AccessToken {
    secret: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            expires_at,
        }
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// Whether the token expires within `margin`
    pub fn expires_within(&self, margin: chrono::Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Exchanges stored credentials for access tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<AccessToken>;
}

/// Connection config and client for a running cluster
pub struct KubeConnection {
    pub config: kube::Config,
    pub client: kube::Client,
}

/// Builds a Kubernetes client from cluster connection info
#[async_trait]
pub trait KubeConnector: Send + Sync {
    async fn connect(&self, cluster: &Cluster, token: &AccessToken) -> Result<KubeConnection>;
}

/// The capability implementations used by a build
#[derive(Clone)]
pub struct Backends {
    pub clusters: Arc<dyn ClusterManager>,
    pub tokens: Arc<dyn TokenSource>,
    pub kube: Arc<dyn KubeConnector>,
}
