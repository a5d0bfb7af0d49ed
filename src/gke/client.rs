/// GKE cluster management API client
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::models::*;
use super::provider::{ClusterManager, ClusterRef, TokenSource};
use super::version::KubeVersion;
use crate::error::{Error, Result};

const GKE_API_BASE: &str = "https://container.googleapis.com/v1";

/// Ephemeral clusters start with a single node
pub const INITIAL_NODE_COUNT: u32 = 1;

/// GKE API client authenticated with a token source
#[derive(Clone)]
pub struct GkeClient {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
}

impl GkeClient {
    /// Create a new GKE API client
    pub fn new(tokens: Arc<dyn TokenSource>) -> Result<Self> {
        Self::with_base_url(tokens, GKE_API_BASE)
    }

    /// Create a client against a non-default API endpoint
    pub fn with_base_url(tokens: Arc<dyn TokenSource>, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|e| Error::provider(format!("invalid API base URL {}: {}", base_url, e)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::provider(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn bearer(&self) -> Result<String> {
        let token = self.tokens.token().await?;
        Ok(token.secret().expose_secret().to_string())
    }

    /// Make a GET request to the API
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(|e| Error::provider(format!("failed to send GET {}: {}", url, e)))?;

        handle_response(response).await
    }

    /// Make a POST request to the API
    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.bearer().await?)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::provider(format!("failed to send POST {}: {}", url, e)))?;

        handle_response(response).await
    }

    /// Make a DELETE request to the API
    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(|e| Error::provider(format!("failed to send DELETE {}: {}", url, e)))?;

        handle_response(response).await
    }
}

/// Check an API response for errors and decode the body
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::provider(format!("failed to parse API response: {}", e)))
    } else {
        let error_text = response.text().await.unwrap_or_default();
        Err(api_error(status, &error_text))
    }
}

/// Turn a non-success body into a provider error
fn api_error(status: reqwest::StatusCode, body: &str) -> Error {
    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
        return Error::provider(format!(
            "API error: {} {} - {}",
            error_response.error.code, error_response.error.status, error_response.error.message
        ));
    }
    Error::provider(format!("API request failed with status {}: {}", status, body))
}

#[async_trait]
impl ClusterManager for GkeClient {
    async fn server_config(&self, project: &str, location: &str) -> Result<ServerConfig> {
        self.get(&format!(
            "projects/{}/locations/{}/serverConfig",
            project, location
        ))
        .await
    }

    async fn create_cluster(
        &self,
        cluster: &ClusterRef,
        initial_version: Option<&KubeVersion>,
    ) -> Result<Operation> {
        let request = CreateClusterRequest {
            cluster: ClusterDefinition {
                name: cluster.name.clone(),
                initial_node_count: INITIAL_NODE_COUNT,
                initial_cluster_version: initial_version.map(ToString::to_string),
            },
        };
        self.post(&format!("{}/clusters", cluster.parent()), &request)
            .await
    }

    async fn get_cluster(&self, cluster: &ClusterRef) -> Result<Cluster> {
        self.get(&cluster.resource_name()).await
    }

    async fn delete_cluster(&self, cluster: &ClusterRef) -> Result<Operation> {
        self.delete(&cluster.resource_name()).await
    }
}
