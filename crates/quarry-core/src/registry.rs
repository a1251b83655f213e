//! HTTP registry client.
//!
//! The registry contract is two requests: `GET <registry>/<name>/latest`
//! returns a JSON document whose `dist` object names the tarball and its
//! integrity descriptor, then `GET <tarball>` returns the archive bytes.

use crate::config::{NetworkConfig, RegistryConfig};
use crate::error::{QuarryError, Result};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Download information for the latest version of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryMetadata {
    pub tarball_url: String,
    /// `<algorithm>-<base64 digest>` descriptor of the tarball.
    pub integrity: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct LatestDocument {
    dist: DistDocument,
}

#[derive(Debug, Deserialize, Serialize)]
struct DistDocument {
    tarball: String,
    integrity: String,
}

impl From<DistDocument> for RegistryMetadata {
    fn from(dist: DistDocument) -> Self {
        Self {
            tarball_url: dist.tarball,
            integrity: dist.integrity,
        }
    }
}

/// Client for the package registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
}

impl RegistryClient {
    /// Create a client with the default connect timeout.
    pub fn new() -> Result<Self> {
        Self::with_connect_timeout(NetworkConfig::CONNECT_TIMEOUT)
    }

    /// Create a client with a custom connect timeout.
    ///
    /// No overall request timeout is set; tarballs may be large.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| QuarryError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// URL of the metadata document for a project.
    pub fn metadata_url(registry_url: &str, name: &str) -> String {
        format!(
            "{}/{}/{}",
            registry_url.trim_end_matches('/'),
            name,
            RegistryConfig::LATEST_TAG
        )
    }

    /// Fetch the tarball URL and integrity descriptor of a project.
    pub async fn fetch_metadata(&self, registry_url: &str, name: &str) -> Result<RegistryMetadata> {
        let url = Self::metadata_url(registry_url, name);
        debug!("Fetching metadata for {} from {}", name, url);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| QuarryError::registry(name, &url, e))?
            .error_for_status()
            .map_err(|e| QuarryError::registry(name, &url, e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| QuarryError::registry(name, &url, e))?;

        let document: LatestDocument = serde_json::from_slice(&body).map_err(|e| {
            QuarryError::registry(name, &url, format!("malformed metadata: {}", e))
        })?;

        Ok(document.dist.into())
    }

    /// Fetch the raw bytes of a tarball.
    pub async fn fetch_tarball(&self, name: &str, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching tarball for {} from {}", name, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QuarryError::registry(name, url, e))?
            .error_for_status()
            .map_err(|e| QuarryError::registry(name, url, e))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| QuarryError::registry(name, url, e))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_metadata_url() {
        assert_eq!(
            RegistryClient::metadata_url("http://localhost:4873/", "ddd-asserter"),
            "http://localhost:4873/ddd-asserter/latest"
        );
        assert_eq!(
            RegistryClient::metadata_url("registry", "name"),
            "registry/name/latest"
        );
    }

    #[tokio::test]
    async fn test_fetch_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ddd-asserter/latest"))
            .and(header_matcher("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "ddd-asserter",
                "dist": {
                    "tarball": "http://example.test/ddd-asserter-0.0.2-latest.tgz",
                    "integrity": "sha512-abc"
                }
            })))
            .mount(&server)
            .await;

        let client = RegistryClient::new().unwrap();
        let metadata = client
            .fetch_metadata(&server.uri(), "ddd-asserter")
            .await
            .unwrap();

        assert_eq!(
            metadata.tarball_url,
            "http://example.test/ddd-asserter-0.0.2-latest.tgz"
        );
        assert_eq!(metadata.integrity, "sha512-abc");
    }

    #[tokio::test]
    async fn test_fetch_metadata_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = RegistryClient::new().unwrap();
        let err = client
            .fetch_metadata(&server.uri(), "missing")
            .await
            .unwrap_err();

        let expected_prefix = format!(
            "Could not download missing at url {}/missing/latest:",
            server.uri()
        );
        assert!(err.to_string().starts_with(&expected_prefix));
    }

    #[tokio::test]
    async fn test_fetch_metadata_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"dist\": {}}"))
            .mount(&server)
            .await;

        let client = RegistryClient::new().unwrap();
        let err = client
            .fetch_metadata(&server.uri(), "broken")
            .await
            .unwrap_err();

        assert!(matches!(err, QuarryError::Registry { ref project, .. } if project == "broken"));
        assert!(err.to_string().contains("malformed metadata"));
    }

    #[tokio::test]
    async fn test_fetch_metadata_unreachable() {
        let client = RegistryClient::new().unwrap();
        let err = client
            .fetch_metadata("http://127.0.0.1:9", "name")
            .await
            .unwrap_err();

        assert!(matches!(err, QuarryError::Registry { ref url, .. } if url == "http://127.0.0.1:9/name/latest"));
    }

    #[tokio::test]
    async fn test_fetch_tarball_returns_raw_bytes() {
        let server = MockServer::start().await;
        let payload = vec![0x1f, 0x8b, 0x00, 0xff, 0xfe];
        Mock::given(method("GET"))
            .and(path("/files/pkg-1.0.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .mount(&server)
            .await;

        let client = RegistryClient::new().unwrap();
        let url = format!("{}/files/pkg-1.0.0.tgz", server.uri());
        let bytes = client.fetch_tarball("pkg", &url).await.unwrap();
        assert_eq!(bytes, payload);
    }
}
