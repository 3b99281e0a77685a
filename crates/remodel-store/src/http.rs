//! HTTP chart store
//!
//! Talks to the analytics server's REST API:
//!
//! ```text
//! GET  {base}/projects/{project}/spaces          -> [SpaceSummary]
//! GET  {base}/projects/{project}/spaces/{space}  -> Space
//! GET  {base}/saved/{chart}                      -> ChartDocument
//! POST {base}/saved/{chart}/version              <- ChartDocument
//! ```
//!
//! Every response is wrapped as `{"status": "ok", "results": ...}`.

use std::time::Duration;

use async_trait::async_trait;
use remodel_engine::ChartDocument;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{ChartStore, Space, SpaceSummary};

/// Connection settings for [`HttpChartStore`]
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// API root, e.g. `http://localhost:3000/api/v1`
    pub base_url: String,
    /// Project whose spaces are listed
    pub project_uuid: String,
    /// Personal access token
    pub api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpStoreConfig {
    /// Create config with the default 30s timeout
    pub fn new(
        base_url: impl Into<String>,
        project_uuid: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            project_uuid: project_uuid.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Chart store backed by the REST API
#[derive(Debug, Clone)]
pub struct HttpChartStore {
    client: reqwest::Client,
    base_url: String,
    project_uuid: String,
}

impl HttpChartStore {
    /// Build the client with authorization headers
    ///
    /// # Errors
    /// - `StoreError::InvalidApiKey` if the key is not a valid header value
    /// - `StoreError::Client` if the HTTP client cannot be built
    pub fn new(config: &HttpStoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("ApiKey {}", config.api_key))
            .map_err(|_| StoreError::InvalidApiKey)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(StoreError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_uuid: config.project_uuid.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&ChartDocument>,
    ) -> Result<T, StoreError> {
        let url = self.url(path);
        tracing::debug!(%method, %url, "store request");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let transport = |source| StoreError::Transport {
            url: url.clone(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        tracing::debug!(%url, status = status.as_u16(), "store response");

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(url));
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                url,
                status: status.as_u16(),
                body: text,
            });
        }

        unwrap_envelope(&url, &text)
    }
}

#[derive(Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    results: Value,
    #[serde(default)]
    error: Value,
}

/// Extract `results` from a `{status, results}` response body
pub(crate) fn unwrap_envelope<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, StoreError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| StoreError::decode(url, e))?;

    if envelope.status != "ok" {
        let message = match envelope.error {
            Value::Null => format!("status '{}'", envelope.status),
            Value::String(s) => s,
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| other.to_string(), str::to_string),
        };
        return Err(StoreError::Envelope {
            url: url.to_string(),
            message,
        });
    }

    serde_json::from_value(envelope.results).map_err(|e| StoreError::decode(url, e))
}

#[async_trait]
impl ChartStore for HttpChartStore {
    async fn list_spaces(&self) -> Result<Vec<SpaceSummary>, StoreError> {
        let path = format!("projects/{}/spaces", self.project_uuid);
        self.call(Method::GET, &path, None).await
    }

    async fn get_space(&self, space_uuid: &str) -> Result<Space, StoreError> {
        let path = format!("projects/{}/spaces/{space_uuid}", self.project_uuid);
        self.call(Method::GET, &path, None).await
    }

    async fn get_chart(&self, chart_uuid: &str) -> Result<ChartDocument, StoreError> {
        self.call(Method::GET, &format!("saved/{chart_uuid}"), None)
            .await
    }

    async fn persist_chart_version(
        &self,
        chart_uuid: &str,
        chart: &ChartDocument,
    ) -> Result<(), StoreError> {
        let _saved: Value = self
            .call(Method::POST, &format!("saved/{chart_uuid}/version"), Some(chart))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://localhost:3000/api/v1/saved/abc";

    #[test]
    fn envelope_ok_returns_results() {
        let spaces: Vec<SpaceSummary> = unwrap_envelope(
            URL,
            r#"{"status":"ok","results":[{"uuid":"s1","name":"Sales","isPrivate":false}]}"#,
        )
        .unwrap();

        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].uuid, "s1");
        assert_eq!(spaces[0].extra["isPrivate"], false);
    }

    #[test]
    fn envelope_error_is_reported() {
        let err = unwrap_envelope::<Value>(
            URL,
            r#"{"status":"error","error":{"statusCode":403,"name":"ForbiddenError","message":"no access"}}"#,
        )
        .unwrap_err();

        match err {
            StoreError::Envelope { message, .. } => assert_eq!(message, "no access"),
            other => panic!("expected Envelope, got {other:?}"),
        }
    }

    #[test]
    fn envelope_garbage_is_decode_error() {
        let err = unwrap_envelope::<Value>(URL, "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn envelope_wrong_results_shape_is_decode_error() {
        let err =
            unwrap_envelope::<Vec<SpaceSummary>>(URL, r#"{"status":"ok","results":{"a":1}}"#)
                .unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn url_joining_ignores_slashes() {
        let config = HttpStoreConfig::new("http://localhost:3000/api/v1/", "p1", "key");
        let store = HttpChartStore::new(&config).unwrap();

        assert_eq!(
            store.url("/saved/abc"),
            "http://localhost:3000/api/v1/saved/abc"
        );
        assert_eq!(
            store.url("projects/p1/spaces"),
            "http://localhost:3000/api/v1/projects/p1/spaces"
        );
    }

    #[test]
    fn api_key_with_newline_rejected() {
        let config = HttpStoreConfig::new("http://localhost", "p1", "bad\nkey");
        assert!(matches!(
            HttpChartStore::new(&config),
            Err(StoreError::InvalidApiKey)
        ));
    }
}
