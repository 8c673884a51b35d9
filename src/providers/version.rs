//! Checks a plain-text version file for a newer release.

use crate::core::cache::KeyValueCollection;
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tracing::debug;

const VERSION_KEY: &[u8] = b"version";
const UNKNOWN_VERSION: &str = "0.0.0";

pub struct UpdateChecker {
    url: String,
    client: reqwest::Client,
    settings: Arc<dyn KeyValueCollection>,
}

impl UpdateChecker {
    pub fn new(url: &str, settings: Arc<dyn KeyValueCollection>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coinwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            url: url.to_string(),
            client,
            settings,
        })
    }

    /// The version seen on the last check, `0.0.0` if none.
    pub async fn known_version(&self) -> Result<String> {
        Ok(self
            .settings
            .get(VERSION_KEY)
            .await?
            .and_then(|raw| String::from_utf8(raw).ok())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string()))
    }

    /// Fetches the published version and remembers it.
    ///
    /// Returns the new version when it differs from the one seen last time.
    pub async fn check(&self) -> Result<Option<String>> {
        debug!("Checking for updates at {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to reach version file at {}", self.url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for version file {}",
                response.status(),
                self.url
            ));
        }

        let published = response.text().await?.trim().to_string();
        let known = self.known_version().await?;
        if published == known {
            debug!("Version {} is current", known);
            return Ok(None);
        }

        self.settings.put(VERSION_KEY, published.as_bytes()).await?;
        debug!("Version changed from {} to {}", known, published);
        Ok(Some(published))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/version.txt"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_new_version_is_reported_once() {
        let server = create_mock_server(200, "1.4.0\n").await;
        let settings = Arc::new(MemoryCollection::new());
        let checker =
            UpdateChecker::new(&format!("{}/version.txt", server.uri()), settings).unwrap();

        assert_eq!(checker.known_version().await.unwrap(), "0.0.0");
        assert_eq!(checker.check().await.unwrap(), Some("1.4.0".to_string()));
        assert_eq!(checker.known_version().await.unwrap(), "1.4.0");

        // Same version again is not an update
        assert_eq!(checker.check().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_version_file_is_error() {
        let server = create_mock_server(404, "").await;
        let settings = Arc::new(MemoryCollection::new());
        let checker =
            UpdateChecker::new(&format!("{}/version.txt", server.uri()), settings).unwrap();

        let err = checker.check().await.unwrap_err();
        assert!(err.to_string().contains("HTTP error: 404 Not Found"));
        assert_eq!(checker.known_version().await.unwrap(), "0.0.0");
    }
}
