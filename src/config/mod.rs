/// Configuration management for gkeup
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gke::auth::Credentials;
use crate::gke::version::KubeVersion;
use crate::gke::Builder;

/// Environment variable pointing at a service account key file
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Cluster provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// GCP project to create the cluster in
    pub project: String,

    /// Region or zone (e.g., "us-central1")
    pub location: String,

    /// Cluster name; a unique one is generated when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,

    /// Service account key file (can also be set via GOOGLE_APPLICATION_CREDENTIALS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// Exact Kubernetes version (e.g., "1.28.5-gke.1217000")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,

    /// Latest patch of a minor release (e.g., "1.28")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_minor: Option<String>,

    /// Total time allowed for a build
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between cluster status checks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Time allowed for deleting a cluster after a failed build
    #[serde(default = "default_rollback_timeout_secs")]
    pub rollback_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    1800
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_rollback_timeout_secs() -> u64 {
    120
}

impl ProvisionConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ProvisionConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.is_empty() {
            anyhow::bail!("project cannot be empty");
        }

        if self.location.is_empty() {
            anyhow::bail!("location cannot be empty");
        }

        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than zero");
        }

        if let Some(version) = &self.kubernetes_version {
            version.parse::<KubeVersion>()?;
        }
        self.minor_version()?;

        Ok(())
    }

    /// Parse `kubernetes_minor` into a (major, minor) pair
    pub fn minor_version(&self) -> anyhow::Result<Option<(u64, u64)>> {
        let Some(raw) = &self.kubernetes_minor else {
            return Ok(None);
        };

        let (major, minor) = raw
            .trim_start_matches('v')
            .split_once('.')
            .ok_or_else(|| anyhow::anyhow!("Invalid minor version (expected MAJOR.MINOR): {}", raw))?;

        Ok(Some((major.parse()?, minor.parse()?)))
    }

    /// Get the service account key path from config or environment
    pub fn credentials_path(&self) -> anyhow::Result<PathBuf> {
        self.credentials_file
            .clone()
            .or_else(|| std::env::var_os(CREDENTIALS_ENV).map(PathBuf::from))
            .ok_or_else(|| anyhow::anyhow!(
                "Service account credentials not found. Set {} environment variable or specify credentials_file in config",
                CREDENTIALS_ENV
            ))
    }

    /// Read the service account key
    pub fn load_credentials(&self) -> anyhow::Result<Credentials> {
        let path = self.credentials_path()?;
        Credentials::from_file(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read credentials {}: {}", path.display(), e)
        })
    }

    /// Configure a builder from these settings.
    ///
    /// Both version options are passed through as-is; the builder reports
    /// the conflict if both are set.
    pub fn builder(&self, credentials: Credentials) -> anyhow::Result<Builder> {
        let mut builder = Builder::new(credentials, &self.project, &self.location)
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs))
            .with_rollback_timeout(Duration::from_secs(self.rollback_timeout_secs));

        if let Some(name) = &self.cluster_name {
            builder = builder.with_name(name);
        }
        if let Some(version) = &self.kubernetes_version {
            builder = builder.with_cluster_version(version.parse()?);
        }
        if let Some((major, minor)) = self.minor_version()? {
            builder = builder.with_cluster_minor_version(major, minor);
        }

        Ok(builder)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self {
            project: "my-project".to_string(),
            location: "us-central1".to_string(),
            cluster_name: None,
            credentials_file: None,
            kubernetes_version: None,
            kubernetes_minor: Some("1.28".to_string()),
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            rollback_timeout_secs: default_rollback_timeout_secs(),
        }
    }
}
