/// Kubernetes version parsing and latest-patch resolution
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;

use super::provider::ClusterManager;
use crate::error::{Error, Result};

/// A GKE master version such as `1.28.5-gke.1217000`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// The `N` of a `-gke.N` suffix
    pub gke_build: Option<u64>,
}

impl KubeVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            gke_build: None,
        }
    }

    pub fn with_gke_build(mut self, build: u64) -> Self {
        self.gke_build = Some(build);
        self
    }

    /// The `major.minor` line this version belongs to
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl Ord for KubeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.gke_build).cmp(&(
            other.major,
            other.minor,
            other.patch,
            other.gke_build,
        ))
    }
}

impl PartialOrd for KubeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for KubeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(build) = self.gke_build {
            write!(f, "-gke.{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for KubeVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Config(format!("invalid kubernetes version: {}", s));

        let trimmed = s.trim().trim_start_matches('v');
        let (core, suffix) = match trimmed.split_once('-') {
            Some((core, suffix)) => (core, Some(suffix)),
            None => (trimmed, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let number = |p: &str| p.parse::<u64>().map_err(|_| invalid());

        let gke_build = match suffix {
            None => None,
            Some(suffix) => {
                let build = suffix.strip_prefix("gke.").ok_or_else(invalid)?;
                Some(number(build)?)
            }
        };

        Ok(Self {
            major: number(parts[0])?,
            minor: number(parts[1])?,
            patch: number(parts[2])?,
            gke_build,
        })
    }
}

/// Latest offered patch per `major.minor` line
pub type VersionCatalog = HashMap<String, KubeVersion>;

/// Build a catalog of the latest patch for each line in `versions`
pub fn latest_patches<'a>(versions: impl IntoIterator<Item = &'a str>) -> VersionCatalog {
    let mut catalog = VersionCatalog::new();

    for raw in versions {
        let version = match raw.parse::<KubeVersion>() {
            Ok(v) => v,
            Err(_) => {
                debug!("Skipping unparseable master version {}", raw);
                continue;
            }
        };

        let key = version.major_minor();
        match catalog.get(&key) {
            Some(existing) if existing >= &version => {}
            _ => {
                catalog.insert(key, version);
            }
        }
    }

    catalog
}

/// Query the provider and build a fresh catalog of master versions
pub async fn list_latest_patch_versions(
    manager: &dyn ClusterManager,
    project: &str,
    location: &str,
) -> Result<VersionCatalog> {
    let server_config = manager.server_config(project, location).await?;
    debug!(
        "{} master versions offered in {}/{}",
        server_config.valid_master_versions.len(),
        project,
        location
    );

    Ok(latest_patches(
        server_config.valid_master_versions.iter().map(String::as_str),
    ))
}

/// Pick the latest patch for a requested `major.minor`
pub fn resolve_minor(catalog: &VersionCatalog, major: u64, minor: u64) -> Result<KubeVersion> {
    let requested = format!("{}.{}", major, minor);
    catalog
        .get(&requested)
        .cloned()
        .ok_or(Error::VersionUnavailable { requested })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gke_version() {
        let v: KubeVersion = "1.28.5-gke.1217000".parse().unwrap();
        assert_eq!(v, KubeVersion::new(1, 28, 5).with_gke_build(1217000));
        assert_eq!(v.to_string(), "1.28.5-gke.1217000");
        assert_eq!(v.major_minor(), "1.28");
    }

    #[test]
    fn test_parse_tolerates_v_prefix() {
        let v: KubeVersion = "v1.27.9".parse().unwrap();
        assert_eq!(v, KubeVersion::new(1, 27, 9));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("1.28".parse::<KubeVersion>().is_err());
        assert!("latest".parse::<KubeVersion>().is_err());
        assert!("1.28.5-rc.1".parse::<KubeVersion>().is_err());
    }

    #[test]
    fn test_ordering() {
        let plain = KubeVersion::new(1, 28, 5);
        let built = KubeVersion::new(1, 28, 5).with_gke_build(100);
        let newer_build = KubeVersion::new(1, 28, 5).with_gke_build(2000);
        assert!(plain < built);
        assert!(built < newer_build);
        assert!(newer_build < KubeVersion::new(1, 28, 6));
    }

    #[test]
    fn test_latest_patches_picks_highest() {
        let catalog = latest_patches([
            "1.27.3-gke.100",
            "1.27.9-gke.1000",
            "1.28.2-gke.50",
            "1.28.5-gke.1217000",
            "1.28.5-gke.900",
            "not-a-version",
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog["1.27"].to_string(), "1.27.9-gke.1000");
        assert_eq!(catalog["1.28"].to_string(), "1.28.5-gke.1217000");
    }

    #[test]
    fn test_catalog_from_provider() {
        let manager = crate::testing::FakeClusterManager {
            versions: vec![
                "1.27.9-gke.1000".to_string(),
                "1.28.5-gke.1217000".to_string(),
                "1.28.3-gke.200".to_string(),
            ],
            ..Default::default()
        };

        let catalog =
            tokio_test::block_on(list_latest_patch_versions(&manager, "p", "us-central1"))
                .unwrap();

        assert_eq!(catalog["1.28"].to_string(), "1.28.5-gke.1217000");
        assert_eq!(
            manager
                .server_config_calls
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[test]
    fn test_resolve_minor() {
        let catalog = latest_patches(["1.27.9", "1.28.5"]);

        let v = resolve_minor(&catalog, 1, 28).unwrap();
        assert_eq!(v.to_string(), "1.28.5");

        match resolve_minor(&catalog, 1, 29) {
            Err(Error::VersionUnavailable { requested }) => assert_eq!(requested, "1.29"),
            other => panic!("expected VersionUnavailable, got {:?}", other),
        }
    }
}
