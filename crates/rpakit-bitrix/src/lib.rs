//! Bitrix24 webhook REST adapter.
//!
//! Every call is `{webhook}/{method}`: a JSON body for POST, a query string
//! for GET. Responses come back as raw JSON for the caller to pick apart;
//! this crate only does URL shaping and status checking.

use std::time::Duration;

use tracing::{debug, error};

use rpakit_core::{config::BitrixConfig, errors::Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_BODY_SNIPPET: usize = 200;

#[derive(Clone, Debug)]
pub struct BitrixClient {
    webhook_url: String,
    http: reqwest::Client,
}

impl BitrixClient {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(format!("http client build: {e}")))?;

        Ok(Self {
            webhook_url: webhook_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &BitrixConfig) -> Result<Self> {
        Self::new(cfg.webhook_url.clone())
    }

    /// Call an API method with a JSON body, e.g.
    /// `post("tasks.task.add", &json!({"fields": {"TITLE": "New Task"}}))`.
    pub async fn post(&self, method: &str, params: &serde_json::Value) -> Result<serde_json::Value> {
        debug!(method, "bitrix POST");
        let resp = self
            .http
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| request_err(method, e))?;
        parse_response(method, resp).await
    }

    /// Call an API method with query-string parameters, e.g.
    /// `get("tasks.task.get", &[("taskId", "123")])`.
    pub async fn get(&self, method: &str, params: &[(&str, &str)]) -> Result<serde_json::Value> {
        debug!(method, "bitrix GET");
        let resp = self
            .http
            .get(self.method_url(method))
            .query(params)
            .send()
            .await
            .map_err(|e| request_err(method, e))?;
        parse_response(method, resp).await
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.webhook_url, method.trim_start_matches('/'))
    }
}

fn request_err(method: &str, e: reqwest::Error) -> Error {
    error!(method, "bitrix request failed: {e}");
    Error::Http(format!("bitrix request error: {e}"))
}

async fn parse_response(method: &str, resp: reqwest::Response) -> Result<serde_json::Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        error!(method, %status, "bitrix call rejected");
        return Err(Error::Http(format!(
            "bitrix {method} failed: {status} {}",
            body.chars().take(ERROR_BODY_SNIPPET).collect::<String>()
        )));
    }

    resp.json()
        .await
        .map_err(|e| Error::Http(format!("bitrix {method} returned invalid json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_url_joins_without_double_slash() {
        let client = BitrixClient::new("https://example.bitrix24.com/rest/1/abc/").unwrap();
        assert_eq!(
            client.method_url("tasks.task.add"),
            "https://example.bitrix24.com/rest/1/abc/tasks.task.add"
        );
        assert_eq!(
            client.method_url("/tasks.task.get"),
            "https://example.bitrix24.com/rest/1/abc/tasks.task.get"
        );
    }
}
