/// Kubernetes client construction for GKE clusters
use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::debug;

use super::models::Cluster;
use super::provider::{AccessToken, KubeConnection, KubeConnector};
use crate::error::{Error, Result};

/// Connects to a cluster's API server with a bearer token
#[derive(Debug, Clone, Copy, Default)]
pub struct GkeKubeConnector;

#[async_trait]
impl KubeConnector for GkeKubeConnector {
    async fn connect(&self, cluster: &Cluster, token: &AccessToken) -> Result<KubeConnection> {
        let config = connection_config(cluster, token).await?;
        debug!("Building Kubernetes client for {}", config.cluster_url);

        let client = kube::Client::try_from(config.clone()).map_err(|e| {
            Error::client(format!(
                "failed to create client for cluster {}: {}",
                cluster.name, e
            ))
        })?;

        Ok(KubeConnection { config, client })
    }
}

/// Single-context kubeconfig for a running cluster
pub fn kubeconfig(cluster: &Cluster, token: &AccessToken) -> Result<Kubeconfig> {
    let endpoint = cluster
        .endpoint
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| Error::client(format!("cluster {} has no endpoint", cluster.name)))?;

    let ca = cluster
        .master_auth
        .as_ref()
        .map(|auth| auth.cluster_ca_certificate.as_str())
        .filter(|ca| !ca.is_empty())
        .ok_or_else(|| {
            Error::client(format!("cluster {} has no CA certificate", cluster.name))
        })?;

    let name = &cluster.name;
    let document = json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{
            "name": name,
            "cluster": {
                "server": format!("https://{}", endpoint),
                "certificate-authority-data": ca,
            },
        }],
        "users": [{
            "name": name,
            "user": { "token": token.secret().expose_secret() },
        }],
        "contexts": [{
            "name": name,
            "context": { "cluster": name, "user": name },
        }],
        "current-context": name,
    });

    serde_json::from_value(document)
        .map_err(|e| Error::client(format!("failed to build kubeconfig for {}: {}", name, e)))
}

/// Build the API server connection config for a running cluster
pub async fn connection_config(cluster: &Cluster, token: &AccessToken) -> Result<kube::Config> {
    let kubeconfig = kubeconfig(cluster, token)?;

    kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| {
            Error::client(format!(
                "failed to load config for cluster {}: {}",
                cluster.name, e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gke::models::MasterAuth;
    use base64::prelude::*;

    fn pem_of(der: &[u8]) -> String {
        format!(
            "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
            BASE64_STANDARD.encode(der)
        )
    }

    fn running_cluster(ca: &str) -> Cluster {
        Cluster {
            name: "t-1".to_string(),
            endpoint: Some("34.1.2.3".to_string()),
            master_auth: Some(MasterAuth {
                cluster_ca_certificate: ca.to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_kubeconfig_has_one_context() {
        let token = AccessToken::new("ya29.token", chrono::Utc::now());
        let kubeconfig = kubeconfig(&running_cluster("Y2E="), &token).unwrap();

        assert_eq!(kubeconfig.current_context.as_deref(), Some("t-1"));
        assert_eq!(kubeconfig.clusters.len(), 1);
        assert_eq!(kubeconfig.auth_infos.len(), 1);
        assert_eq!(kubeconfig.contexts.len(), 1);

        let cluster = kubeconfig.clusters[0].cluster.as_ref().unwrap();
        assert_eq!(cluster.server.as_deref(), Some("https://34.1.2.3"));
        assert_eq!(cluster.certificate_authority_data.as_deref(), Some("Y2E="));
    }

    #[tokio::test]
    async fn test_connection_config() {
        let ca = BASE64_STANDARD.encode(pem_of(b"ca-der"));
        let token = AccessToken::new("ya29.token", chrono::Utc::now());

        let config = connection_config(&running_cluster(&ca), &token)
            .await
            .unwrap();

        assert_eq!(config.cluster_url.scheme_str(), Some("https"));
        assert_eq!(config.cluster_url.host(), Some("34.1.2.3"));
        assert_eq!(config.root_cert, Some(vec![b"ca-der".to_vec()]));
        assert_eq!(
            config.auth_info.token.as_ref().unwrap().expose_secret(),
            "ya29.token"
        );
    }

    #[tokio::test]
    async fn test_bad_ca_encoding_is_client_error() {
        let token = AccessToken::new("t", chrono::Utc::now());
        assert!(matches!(
            connection_config(&running_cluster("%%% not base64 %%%"), &token).await,
            Err(Error::Client(_))
        ));
    }

    #[test]
    fn test_missing_endpoint_is_client_error() {
        let mut cluster = running_cluster("Y2E=");
        cluster.endpoint = None;
        let token = AccessToken::new("t", chrono::Utc::now());

        assert!(matches!(
            kubeconfig(&cluster, &token),
            Err(Error::Client(_))
        ));
    }

    #[test]
    fn test_missing_ca_is_client_error() {
        let token = AccessToken::new("t", chrono::Utc::now());
        assert!(matches!(
            kubeconfig(&running_cluster(""), &token),
            Err(Error::Client(_))
        ));
    }
}
