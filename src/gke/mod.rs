/// GKE cluster provisioning
pub mod auth;
pub mod builder;
pub mod client;
pub mod cluster;
pub mod connector;
pub mod models;
pub mod provider;
pub mod rollback;
pub mod version;

pub use auth::{Credentials, GoogleTokenSource};
pub use builder::Builder;
pub use client::GkeClient;
pub use cluster::{Addon, ClusterHandle};
pub use connector::GkeKubeConnector;
pub use provider::{
    AccessToken, Backends, ClusterManager, ClusterRef, KubeConnection, KubeConnector, TokenSource,
};
pub use rollback::RollbackCoordinator;
pub use version::{list_latest_patch_versions, resolve_minor, KubeVersion, VersionCatalog};
