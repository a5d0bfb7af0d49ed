/// Error types for GKE cluster provisioning
use thiserror::Error;

/// Main error type for cluster build operations
#[derive(Debug, Error)]
pub enum Error {
    /// Mutually exclusive build options were both set
    #[error("configuration conflict: {0}")]
    ConfigurationConflict(String),

    /// No offered master version matches the requested major.minor line
    #[error("no available kubernetes version for {requested}")]
    VersionUnavailable { requested: String },

    /// Service account credentials could not be turned into an access token
    #[error("credential error: {0}")]
    Credential(String),

    /// The GKE control plane rejected a call or could not be reached
    #[error("provider error: {0}")]
    Provider(String),

    /// The Kubernetes client for the cluster could not be constructed
    #[error("kubernetes client error: {0}")]
    Client(String),

    /// The caller's deadline elapsed before the cluster became ready
    #[error("failed to build cluster {cluster}: deadline exceeded")]
    DeadlineExceeded { cluster: String },

    /// The caller cancelled the build before the cluster became ready
    #[error("failed to build cluster {cluster}: cancelled")]
    Cancelled { cluster: String },

    /// A failure after creation whose rollback also failed.
    ///
    /// The cluster may still be running and billing.
    #[error("{original}, then failed to clean up cluster: {cleanup}")]
    CleanupFailure {
        original: Box<Error>,
        cleanup: Box<Error>,
    },

    /// An addon with the same name is already registered on the cluster
    #[error("addon {0} is already registered")]
    AddonConflict(String),

    /// Invalid local configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias for cluster build operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration conflict error with the given message
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConfigurationConflict(msg.into())
    }

    /// Create a credential error with the given message
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Create a provider error with the given message
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a kubernetes client error with the given message
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    /// Combine a build failure with the failure of its rollback
    pub fn cleanup_failure(original: Error, cleanup: Error) -> Self {
        Self::CleanupFailure {
            original: Box::new(original),
            cleanup: Box::new(cleanup),
        }
    }

    /// Whether this error implies a cluster may have been left behind
    pub fn is_orphan_risk(&self) -> bool {
        matches!(self, Self::CleanupFailure { .. })
    }
}
