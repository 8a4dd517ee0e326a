use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use crate::error::HttpClientError;
use crate::scrapper;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Pooled JSON client bound to a single provider base url.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: &str, default_headers: &[(&str, &str)]) -> Result<Self, HttpClientError> {
        Self::with_timeouts(
            base_url,
            default_headers,
            DEFAULT_TIMEOUT,
            DEFAULT_CONNECT_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        base_url: &str,
        default_headers: &[(&str, &str)],
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, HttpClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(scrapper::USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| HttpClientError::Network(format!("invalid header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| HttpClientError::Network(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| HttpClientError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> Result<Value, HttpClientError> {
        let request = self.client.request(Method::GET, self.url(path));
        self.send(Method::GET, path, request).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, HttpClientError> {
        let request = self.client.request(Method::POST, self.url(path)).json(body);
        self.send(Method::POST, path, request).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Value, HttpClientError> {
        let response = request.send().await.map_err(|e| {
            log::error!("network error: {method} {path}: {e}");
            HttpClientError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            log::error!("HTTP {method} {path} returned {status}: {preview}");
            return Err(HttpClientError::Provider(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| HttpClientError::Decode(e.to_string()))
    }
}
