//! Request descriptor → HTTP backends
//!
//! A [`Backend`] performs the I/O for an [`ApiRequest`]. Two adapters ship
//! with the crate: [`ReqwestBackend`] talks HTTP against a base URL, and
//! [`OperationBackend`] hands requests to an executor keyed by operationId.

use std::io::{Cursor, Read};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};

use crate::dispatch::ApiRequest;
use crate::error::ClientError;
use crate::spec::Verb;

/// A lazily read response body.
pub type ByteStream = Box<dyn Read + Send>;

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ApiResponse {
    pub status: StatusCode,
    /// JSON body; non-JSON text is kept as a string, an empty body is `null`
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }
}

/// Injectable request executor.
///
/// Contract:
/// - Each call issues at most one request; retries and batching are up to
///   the implementation.
/// - Failures (network or, by the adapter's policy, non-2xx) are returned
///   as `Err`, never as an `ApiResponse`.
pub trait Backend: Send + Sync {
    fn http(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError>;

    /// Streaming variant used by `get_stream`. Defaults to buffering
    /// [`Backend::http`].
    fn http_stream(&self, request: &ApiRequest) -> Result<ByteStream, ClientError> {
        let response = self.http(request)?;
        let bytes = match response.body {
            Value::Null => Vec::new(),
            Value::String(text) => text.into_bytes(),
            other => serde_json::to_vec(&other).map_err(ClientError::Encode)?,
        };
        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// HTTP backend on a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: Client,
    base_url: String,
}

impl ReqwestBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Build a client with the given timeout and user agent.
    pub fn with_options(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        user_agent: &str,
    ) -> Result<Self, ClientError> {
        let mut builder = Client::builder().user_agent(user_agent.to_string());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ClientError::ClientBuild)?;
        Ok(Self::new(client, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(&self, request: &ApiRequest) -> RequestBuilder {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), request.pathname);
        let mut req = self.client.request(method(request.method), &url);

        if !request.parameters.is_empty() {
            req = req.query(&request.parameters);
        }
        for (name, val) in &request.headers {
            req = req.header(name.as_str(), val.as_str());
        }
        // `json` keeps a content-type that is already set
        if let Some(body) = &request.body {
            req = req.json(body);
        }
        req
    }
}

fn method(verb: Verb) -> Method {
    match verb {
        Verb::Get => Method::GET,
        Verb::Put => Method::PUT,
        Verb::Post => Method::POST,
        Verb::Delete => Method::DELETE,
        Verb::Patch => Method::PATCH,
    }
}

fn parse_body(text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn read_error(resp: reqwest::blocking::Response) -> ClientError {
    let status = resp.status();
    match resp.text() {
        Ok(text) => {
            tracing::warn!(status = status.as_u16(), "request returned non-success status");
            ClientError::from_status(status, parse_body(text))
        }
        Err(e) => ClientError::ResponseRead(e),
    }
}

impl Backend for ReqwestBackend {
    fn http(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let resp = self
            .build(request)
            .send()
            .map_err(ClientError::RequestFailed)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(read_error(resp));
        }

        let text = resp.text().map_err(ClientError::ResponseRead)?;
        Ok(ApiResponse::new(status, parse_body(text)))
    }

    fn http_stream(&self, request: &ApiRequest) -> Result<ByteStream, ClientError> {
        let resp = self
            .build(request)
            .send()
            .map_err(ClientError::RequestFailed)?;
        if !resp.status().is_success() {
            return Err(read_error(resp));
        }
        Ok(Box::new(resp))
    }
}

/// Executes an operation by operationId with one merged parameter map.
pub trait OperationExecutor: Send + Sync {
    fn execute(
        &self,
        operation_id: &str,
        parameters: Map<String, Value>,
    ) -> Result<ApiResponse, ClientError>;
}

/// Backend that forwards to an [`OperationExecutor`] instead of building
/// URLs itself.
///
/// Body fields, query parameters and path parameters are merged into one
/// map, in that order; later sources win on name clashes.
#[derive(Debug, Clone)]
pub struct OperationBackend<E> {
    executor: E,
}

impl<E: OperationExecutor> OperationBackend<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

fn merge_parameters(request: &ApiRequest) -> Map<String, Value> {
    let mut parameters = Map::new();
    if let Some(Value::Object(body)) = &request.body {
        parameters.extend(body.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    for (name, val) in &request.parameters {
        parameters.insert(name.clone(), Value::String(val.clone()));
    }
    for (name, val) in &request.pathname_parameters {
        parameters.insert(name.clone(), Value::String(val.clone()));
    }
    parameters
}

impl<E: OperationExecutor> Backend for OperationBackend<E> {
    fn http(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let operation_id =
            request
                .operation_id
                .as_deref()
                .ok_or_else(|| ClientError::MissingOperationId {
                    method: request.method,
                    pathname: request.pathname.clone(),
                })?;
        self.executor
            .execute(operation_id, merge_parameters(request))
    }
}
