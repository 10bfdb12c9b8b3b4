//! Node + options → request descriptor dispatch
//!
//! Assembles the `ApiRequest` a backend receives from a node's path, the
//! parameter values bound on the way to it and the caller's options, then
//! hands it to the backend.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::backend::{ApiResponse, Backend, ByteStream};
use crate::builder::NodeData;
use crate::error::ClientError;
use crate::spec::{placeholder_names, Verb};

/// Caller-supplied options for a single operation call.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct RequestOptions {
    /// JSON request body
    pub body: Option<Value>,
    /// Query parameters, sent in order
    pub parameters: Vec<(String, String)>,
    /// Extra request headers; a `content-type` here replaces the verb default
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn has_content_type(&self) -> bool {
        self.headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
    }
}

/// A fully resolved request, as handed to a [`Backend`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ApiRequest {
    pub method: Verb,
    /// Absolute path with bound values substituted (e.g. "/api/v1/namespaces/default/pods")
    pub pathname: String,
    /// Placeholder name → bound value
    pub pathname_parameters: BTreeMap<String, String>,
    pub body: Option<Value>,
    /// Query parameters
    pub parameters: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub operation_id: Option<String>,
    /// The verb object from the API description
    pub operation: Option<Value>,
    /// Set by streaming calls
    pub stream: bool,
}

impl ApiRequest {
    /// A bare request for `pathname`, mostly useful to drive a backend directly.
    pub fn new(method: Verb, pathname: impl Into<String>) -> Self {
        Self {
            method,
            pathname: pathname.into(),
            pathname_parameters: BTreeMap::new(),
            body: None,
            parameters: Vec::new(),
            headers: Vec::new(),
            operation_id: None,
            operation: None,
            stream: false,
        }
    }
}

/// Zip a template's placeholder names with values bound in depth order.
pub fn pathname_parameters(template: &str, values: &[String]) -> BTreeMap<String, String> {
    placeholder_names(template)
        .into_iter()
        .zip(values.iter().cloned())
        .collect()
}

/// Join segments into a pathname. Only bound values are percent-encoded;
/// literals from the API description go out as written.
fn encode_pathname(segments: &[String], bound: &[bool]) -> String {
    let encoded: Vec<_> = segments
        .iter()
        .zip(bound)
        .map(|(s, &is_value)| {
            if is_value {
                urlencoding::encode(s).into_owned()
            } else {
                s.clone()
            }
        })
        .collect();
    format!("/{}", encoded.join("/"))
}

pub(crate) fn build_request<X>(
    node: &NodeData<X>,
    verb: Verb,
    options: RequestOptions,
    stream: bool,
) -> ApiRequest {
    let operation = node.operations.get(verb);

    let mut headers = Vec::with_capacity(options.headers.len() + 1);
    if let Some(content_type) = verb.default_content_type() {
        if !options.has_content_type() {
            headers.push(("content-type".to_string(), content_type.to_string()));
        }
    }
    headers.extend(options.headers);

    ApiRequest {
        method: verb,
        pathname: encode_pathname(&node.segments, &node.bound),
        pathname_parameters: node
            .template
            .as_deref()
            .map(|t| pathname_parameters(t, &node.parameter_values))
            .unwrap_or_default(),
        body: options.body,
        parameters: options.parameters,
        headers,
        operation_id: operation.and_then(|op| op.operation_id.clone()),
        operation: operation.map(|op| op.descriptor.clone()),
        stream,
    }
}

pub(crate) fn dispatch(
    backend: &dyn Backend,
    request: &ApiRequest,
) -> Result<ApiResponse, ClientError> {
    tracing::debug!(
        method = %request.method,
        pathname = %request.pathname,
        operation_id = request.operation_id.as_deref().unwrap_or(""),
        "dispatching request"
    );
    backend.http(request)
}

pub(crate) fn dispatch_stream(
    backend: &dyn Backend,
    request: &ApiRequest,
) -> Result<ByteStream, ClientError> {
    tracing::debug!(
        method = %request.method,
        pathname = %request.pathname,
        "dispatching streaming request"
    );
    backend.http_stream(request)
}
