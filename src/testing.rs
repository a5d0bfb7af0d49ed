/// Fake capability implementations with call counters
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::gke::models::{Cluster, ClusterStatus, MasterAuth, Operation, ServerConfig};
use crate::gke::provider::{
    AccessToken, Backends, ClusterManager, ClusterRef, KubeConnection, KubeConnector, TokenSource,
};
use crate::gke::version::KubeVersion;

/// Scripted cluster manager
#[derive(Default)]
pub struct FakeClusterManager {
    pub versions: Vec<String>,
    /// Statuses returned by successive gets; the last one repeats
    pub statuses: Mutex<VecDeque<ClusterStatus>>,
    pub get_error: Option<String>,
    pub create_error: Option<String>,
    pub delete_error: Option<String>,
    pub delete_hangs: bool,
    /// Create is recorded by the provider and then answered this late
    pub create_delay: Option<Duration>,
    /// Gets after the first `n` calls are answered this late
    pub slow_gets_after: Option<(usize, Duration)>,

    pub server_config_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub created_version: Mutex<Option<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeClusterManager {
    pub fn with_statuses(statuses: impl IntoIterator<Item = ClusterStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn running() -> Self {
        Self::with_statuses([ClusterStatus::Running])
    }

    pub fn never_running() -> Self {
        Self::with_statuses([ClusterStatus::Provisioning])
    }

    pub fn total_calls(&self) -> usize {
        self.server_config_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.get_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }

    fn next_status(&self) -> ClusterStatus {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or_default()
        } else {
            statuses.front().copied().unwrap_or_default()
        }
    }
}

#[async_trait]
impl ClusterManager for FakeClusterManager {
    async fn server_config(&self, _project: &str, _location: &str) -> Result<ServerConfig> {
        self.server_config_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ServerConfig {
            default_cluster_version: String::new(),
            valid_master_versions: self.versions.clone(),
            valid_node_versions: Vec::new(),
        })
    }

    async fn create_cluster(
        &self,
        cluster: &ClusterRef,
        initial_version: Option<&KubeVersion>,
    ) -> Result<Operation> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = &self.create_error {
            return Err(Error::provider(msg.clone()));
        }
        *self.created_version.lock().unwrap() = initial_version.map(ToString::to_string);
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Operation {
            name: format!("operation-create-{}", cluster.name),
            operation_type: "CREATE_CLUSTER".to_string(),
            status: "RUNNING".to_string(),
            target_link: cluster.resource_name(),
        })
    }

    async fn get_cluster(&self, cluster: &ClusterRef) -> Result<Cluster> {
        let previous = self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((after, delay)) = self.slow_gets_after {
            if previous >= after {
                tokio::time::sleep(delay).await;
            }
        }
        if let Some(msg) = &self.get_error {
            return Err(Error::provider(msg.clone()));
        }
        Ok(Cluster {
            name: cluster.name.clone(),
            status: self.next_status(),
            endpoint: Some("10.0.0.1".to_string()),
            master_auth: Some(MasterAuth::default()),
            ..Default::default()
        })
    }

    async fn delete_cluster(&self, cluster: &ClusterRef) -> Result<Operation> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.deleted.lock().unwrap().push(cluster.name.clone());
        if self.delete_hangs {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(msg) = &self.delete_error {
            return Err(Error::provider(msg.clone()));
        }
        Ok(Operation {
            name: format!("operation-delete-{}", cluster.name),
            operation_type: "DELETE_CLUSTER".to_string(),
            status: "RUNNING".to_string(),
            target_link: cluster.resource_name(),
        })
    }
}

#[derive(Default)]
pub struct FakeTokens {
    /// Calls after the first `n` fail
    pub fail_after: Option<usize>,
    pub calls: AtomicUsize,
}

impl FakeTokens {
    pub fn failing() -> Self {
        Self::failing_after(0)
    }

    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Default::default()
        }
    }
}

#[async_trait]
impl TokenSource for FakeTokens {
    async fn token(&self) -> Result<AccessToken> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if matches!(self.fail_after, Some(n) if previous >= n) {
            return Err(Error::credential("invalid_grant"));
        }
        Ok(AccessToken::new(
            "fake-token",
            chrono::Utc::now() + chrono::Duration::hours(1),
        ))
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl KubeConnector for FakeConnector {
    async fn connect(&self, cluster: &Cluster, _token: &AccessToken) -> Result<KubeConnection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::client(format!(
                "cluster {} has no reachable endpoint",
                cluster.name
            )));
        }

        let uri: http::Uri = "https://10.0.0.1"
            .parse()
            .map_err(|e| Error::client(format!("{}", e)))?;
        let service = tower::service_fn(|_req: http::Request<kube::client::Body>| async {
            Ok::<_, std::convert::Infallible>(http::Response::new(kube::client::Body::from(
                Vec::<u8>::new(),
            )))
        });

        Ok(KubeConnection {
            config: kube::Config::new(uri),
            client: kube::Client::new(service, "default"),
        })
    }
}

/// Fakes bundled the way a build consumes them
pub struct Fakes {
    pub clusters: Arc<FakeClusterManager>,
    pub tokens: Arc<FakeTokens>,
    pub kube: Arc<FakeConnector>,
}

impl Fakes {
    pub fn new(clusters: FakeClusterManager) -> Self {
        Self {
            clusters: Arc::new(clusters),
            tokens: Arc::new(FakeTokens::default()),
            kube: Arc::new(FakeConnector::default()),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            clusters: self.clusters.clone(),
            tokens: self.tokens.clone(),
            kube: self.kube.clone(),
        }
    }
}
