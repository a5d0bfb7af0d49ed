/// Readiness polling for newly created clusters
use std::time::Duration;

use tracing::{debug, info, warn};

use super::context::BuildContext;
use crate::error::{Error, Result};
use crate::gke::models::{Cluster, ClusterStatus};
use crate::gke::provider::{ClusterManager, ClusterRef};

/// Default delay between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// States of the readiness poller
#[derive(Debug)]
pub enum ReadinessState {
    /// Cluster observed but not yet RUNNING
    Waiting(ClusterStatus),
    /// Cluster is RUNNING; terminal
    Ready(Cluster),
    /// Status could not be fetched; terminal
    Failed(Error),
    /// Caller's context finished; terminal
    Cancelled(Error),
}

/// Polls a cluster's status at a fixed interval until it is RUNNING
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    pub interval: Duration,
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ReadinessPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Perform a single transition out of the waiting state
    pub async fn step(
        &self,
        manager: &dyn ClusterManager,
        cluster: &ClusterRef,
        ctx: &BuildContext,
    ) -> ReadinessState {
        if let Some(reason) = ctx.done() {
            return ReadinessState::Cancelled(reason.into_error(&cluster.name));
        }

        match ctx.run(&cluster.name, manager.get_cluster(cluster)).await {
            Ok(snapshot) if snapshot.status == ClusterStatus::Running => {
                ReadinessState::Ready(snapshot)
            }
            Ok(snapshot) => {
                if let Some(message) = &snapshot.status_message {
                    debug!("Cluster {} is {}: {}", cluster.name, snapshot.status, message);
                } else {
                    debug!("Cluster {} is {}", cluster.name, snapshot.status);
                }
                ReadinessState::Waiting(snapshot.status)
            }
            Err(e @ (Error::Cancelled { .. } | Error::DeadlineExceeded { .. })) => {
                ReadinessState::Cancelled(e)
            }
            Err(e) => ReadinessState::Failed(e),
        }
    }

    /// Poll until the cluster is RUNNING, a fetch fails, or the context finishes
    pub async fn wait_until_running(
        &self,
        manager: &dyn ClusterManager,
        cluster: &ClusterRef,
        ctx: &BuildContext,
    ) -> Result<Cluster> {
        info!("Waiting for cluster {} to become RUNNING...", cluster.name);

        loop {
            match self.step(manager, cluster, ctx).await {
                ReadinessState::Ready(snapshot) => {
                    info!("✓ Cluster {} is RUNNING", cluster.name);
                    return Ok(snapshot);
                }
                ReadinessState::Failed(e) => {
                    warn!("Failed to retrieve cluster {}: {}", cluster.name, e);
                    return Err(e);
                }
                ReadinessState::Cancelled(e) => return Err(e),
                ReadinessState::Waiting(ClusterStatus::Error) => {
                    warn!("Cluster {} reports ERROR, still waiting", cluster.name);
                }
                ReadinessState::Waiting(_) => {}
            }

            tokio::select! {
                biased;
                reason = ctx.finished() => return Err(reason.into_error(&cluster.name)),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
