/// Best-effort deletion of partially provisioned clusters
use std::time::Duration;

use tracing::{info, warn};

use super::provider::{ClusterManager, ClusterRef};
use crate::error::Error;

/// Default time allowed for the rollback delete request
pub const DEFAULT_ROLLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Deletes a cluster after a post-creation failure and reports both outcomes.
///
/// Rollback runs under its own timeout rather than the caller's context,
/// which is often already expired when rollback starts.
#[derive(Debug, Clone)]
pub struct RollbackCoordinator {
    pub timeout: Duration,
}

impl Default for RollbackCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_ROLLBACK_TIMEOUT)
    }
}

impl RollbackCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Delete `cluster` and return the error to surface for `original`.
    ///
    /// Returns `original` unchanged when deletion is accepted, otherwise a
    /// `CleanupFailure` carrying both errors.
    pub async fn rollback(
        &self,
        manager: &dyn ClusterManager,
        cluster: &ClusterRef,
        original: Error,
    ) -> Error {
        warn!(
            "Build of cluster {} failed ({}), deleting it",
            cluster.name, original
        );

        let cleanup = match tokio::time::timeout(self.timeout, manager.delete_cluster(cluster)).await
        {
            Ok(Ok(operation)) => {
                info!(
                    "✓ Deletion of cluster {} accepted ({})",
                    cluster.name, operation.name
                );
                return original;
            }
            Ok(Err(e)) => e,
            Err(_) => Error::provider(format!(
                "delete of {} timed out after {} seconds",
                cluster.resource_name(),
                self.timeout.as_secs()
            )),
        };

        warn!(
            "Failed to delete cluster {}, it may still be running: {}",
            cluster.resource_name(),
            cleanup
        );
        Error::cleanup_failure(original, cleanup)
    }
}
