//! reqwest-backed transport for GitHub-compatible hosts.
//!
//! One [`HttpTransport`] implements all three transport traits — REST,
//! GraphQL, and avatar fetches — against a single configured host. The
//! transport is deliberately dumb: it never interprets statuses beyond
//! separating "the server answered" from "the network failed", leaving
//! classification to the gated clients and the avatar cache.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::cache::{AvatarTransport, ConditionalHeaders};
use crate::client::{
    GraphQlRequest, GraphQlResponse, GraphQlTransport, HttpMethod, RestRequest, RestTransport,
};
use crate::types::RawResponse;
use crate::{HeimdallError, Result};

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// API root, e.g. `https://api.github.com` or
    /// `https://github.example.com/api/v3`.
    pub base_url: String,
    /// Bearer token; anonymous when absent.
    pub token: Option<String>,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Per-request timeout. Default: 60s.
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            user_agent: concat!("heimdall/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The production transport: plain reqwest against one host.
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| HeimdallError::Configuration(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<RawResponse> {
        let response = builder
            .send()
            .await
            .map_err(|e| HeimdallError::Http(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| HeimdallError::Http(e.to_string()))?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn execute(&self, request: &RestRequest) -> Result<RawResponse> {
        let url = format!("{}{}", self.config.base_url, request.path);
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .authorize(self.client.request(method, url))
            .header("accept", "application/vnd.github+json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        self.send(builder).await
    }
}

#[async_trait]
impl GraphQlTransport for HttpTransport {
    async fn request(&self, request: &GraphQlRequest) -> Result<GraphQlResponse> {
        let url = format!("{}/graphql", self.config.base_url);
        let payload = serde_json::json!({
            "query": request.query,
            "variables": request.variables,
            "operationName": request.operation_name,
        });
        let raw = self
            .send(self.authorize(self.client.post(url)).json(&payload))
            .await?;
        if !raw.is_success() {
            return Err(HeimdallError::Api {
                status: raw.status,
                message: String::from_utf8_lossy(&raw.body).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&raw.body)?)
    }
}

#[async_trait]
impl AvatarTransport for HttpTransport {
    async fn fetch(&self, url: &str, conditional: &ConditionalHeaders) -> Result<RawResponse> {
        let mut headers = HeaderMap::new();
        if let Some(etag) = &conditional.if_none_match
            && let Ok(value) = HeaderValue::from_str(etag)
        {
            headers.insert("if-none-match", value);
        }
        if let Some(modified) = &conditional.if_modified_since
            && let Ok(value) = HeaderValue::from_str(modified)
        {
            headers.insert("if-modified-since", value);
        }
        self.send(self.authorize(self.client.get(url)).headers(headers))
            .await
    }
}
