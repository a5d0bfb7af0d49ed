/// gkeup - ephemeral GKE clusters
///
/// Creates a Google Kubernetes Engine cluster, resolves the requested
/// Kubernetes version against what the provider offers, waits for the cluster
/// to be RUNNING within the caller's deadline, and deletes it again if any
/// step after creation fails.
///
/// ```ignore
/// use gkeup::gke::{Builder, Credentials};
/// use gkeup::utils::context::BuildContext;
///
/// let cluster = Builder::new(Credentials::from_file("key.json")?, "my-project", "us-central1")
///     .with_cluster_minor_version(1, 28)
///     .build(&BuildContext::with_timeout(Duration::from_secs(1800)))
///     .await?;
/// ```
pub mod config;
pub mod error;
pub mod gke;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
