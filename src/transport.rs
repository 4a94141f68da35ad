//! HTTP transport used to talk to the open platform API.
//!
//! Every call the pipeline makes is a JSON `POST` that answers with a JSON
//! body, so the seam is a single method. Production code uses
//! [`ReqwestTransport`]; tests substitute scripted implementations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `body` as JSON and parse the response body as JSON.
    ///
    /// `query` pairs are appended to the URL. A bearer token, when given,
    /// goes in the `Authorization` header. Non-2xx statuses are not errors
    /// here: the API reports failures inside the body, and callers inspect it.
    async fn post_json(
        &self,
        url: &str,
        query: &[(String, String)],
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<Value>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
///
/// No request timeout is configured; a hung call hangs the run.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        query: &[(String, String)],
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<Value> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let status = response.status();
        let text = response.text().await?;
        serde_json::from_str(&text)
            .with_context(|| format!("{} returned a non-JSON body (HTTP {})", url, status))
    }
}
