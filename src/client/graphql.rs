//! Gated GraphQL client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::gate::{ApiFlavor, Bulkhead, OverloadPolicy, RateLimitTracker};
use crate::telemetry;
use crate::types::RateLimitSample;
use crate::Result;

/// A GraphQL operation: document text, variables, optional declared name.
#[derive(Debug, Clone)]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: Value,
    /// Explicit operation name; when absent the name is extracted from the
    /// document for logging.
    pub operation_name: Option<String>,
}

impl GraphQlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Value::Null,
            operation_name: None,
        }
    }

    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// The operation name used for gate logging and rate-limit accounting.
    ///
    /// Falls back to parsing the document's leading `query`/`mutation`
    /// declaration, then to `"unknown"` — a missing name never fails a call.
    pub fn info(&self) -> String {
        self.operation_name
            .clone()
            .or_else(|| extract_operation_name(&self.query))
            .unwrap_or_else(|| "unknown".to_owned())
    }
}

/// A single error entry from a GraphQL response's `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<Value>>,
}

/// A GraphQL response: `data` payload plus any `errors` entries.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    /// The rate-limit sample, when the query requested the `rateLimit`
    /// field.
    pub fn rate_limit(&self) -> Option<RateLimitSample> {
        RateLimitSample::from_graphql(&self.data)
    }
}

/// The GraphQL transport boundary.
#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    async fn request(&self, request: &GraphQlRequest) -> Result<GraphQlResponse>;
}

/// Decorator that routes GraphQL operations through the gate and tracker.
pub struct GatedGraphQlClient {
    transport: Arc<dyn GraphQlTransport>,
    gate: Arc<Bulkhead>,
    tracker: Arc<RateLimitTracker>,
    policy: OverloadPolicy,
}

impl GatedGraphQlClient {
    pub fn new(
        transport: Arc<dyn GraphQlTransport>,
        gate: Arc<Bulkhead>,
        tracker: Arc<RateLimitTracker>,
    ) -> Self {
        Self {
            transport,
            gate,
            tracker,
            policy: OverloadPolicy::default(),
        }
    }

    /// Set the overload policy for operations made through this client.
    pub fn overload_policy(mut self, policy: OverloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Execute a query operation under the gate.
    pub async fn query(&self, request: GraphQlRequest) -> Result<GraphQlResponse> {
        self.run(request).await
    }

    /// Execute a mutation operation under the gate.
    pub async fn mutate(&self, request: GraphQlRequest) -> Result<GraphQlResponse> {
        self.run(request).await
    }

    async fn run(&self, request: GraphQlRequest) -> Result<GraphQlResponse> {
        let info = request.info();
        let transport = Arc::clone(&self.transport);
        let outcome = self
            .gate
            .execute(&info, self.policy, || async move {
                transport.request(&request).await
            })
            .await;

        match outcome {
            Ok(response) => {
                self.tracker
                    .record(&info, response.rate_limit().as_ref(), ApiFlavor::GraphQl);
                metrics::counter!(telemetry::REQUESTS_TOTAL, "flavor" => "graphql", "status" => "ok")
                    .increment(1);
                Ok(response)
            }
            Err(e) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL, "flavor" => "graphql", "status" => "error")
                    .increment(1);
                Err(e)
            }
        }
    }
}

/// Pull the operation name out of a GraphQL document's leading declaration.
///
/// Handles `query Name(...)`, `mutation Name {`, `subscription Name`;
/// anonymous shorthand documents (`{ viewer { ... } }`) yield `None`.
fn extract_operation_name(document: &str) -> Option<String> {
    let trimmed = document.trim_start();
    for keyword in ["query", "mutation", "subscription"] {
        if let Some(rest) = trimmed.strip_prefix(keyword) {
            // Require a boundary so field names like `queryField` don't match.
            if !rest.starts_with(|c: char| c.is_whitespace()) {
                continue;
            }
            let name: String = rest
                .trim_start()
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            return (!name.is_empty()).then_some(name);
        }
    }
    None
}
