//! Turn OpenAPI path templates into a navigable, callable client tree.
//!
//! Each literal path segment becomes a named child node, each `{placeholder}`
//! becomes a [`Node::resolve`] step, and each verb declared on a path item
//! becomes an operation on the node it ends at:
//!
//! ```text
//! /api/v1/namespaces                        -> api.v1.namespaces
//! GET /api/v1/namespaces                    -> api.v1.namespaces.get()
//! /api/v1/namespaces/{namespace}/pods       -> api.v1.namespaces(namespace).pods
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use openapi_fluent::{Client, RequestOptions};
//! use serde_json::json;
//!
//! let spec = json!({
//!     "paths": { "/magic": { "get": { "operationId": "getMagic" } } }
//! });
//! let client = Client::builder()
//!     .base_url("https://api.example.com")
//!     .build_with_spec(&spec)
//!     .unwrap();
//!
//! let res = client.child("magic").unwrap().get(RequestOptions::new()).unwrap();
//! assert_eq!(res.status_code(), 200);
//! ```

pub mod backend;
pub mod builder;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod node;
pub mod spec;

pub use backend::{
    ApiResponse, Backend, ByteStream, OperationBackend, OperationExecutor, ReqwestBackend,
};
pub use builder::{ExtensionFactory, SegmentNaming};
pub use client::{Client, ClientBuilder, ClientConfig, DEFAULT_USER_AGENT};
pub use dispatch::{pathname_parameters, ApiRequest, RequestOptions};
pub use error::ClientError;
pub use node::Node;
pub use spec::{
    extract_paths, parse_spec, placeholder_names, split_template, Operation, PathDescription,
    Segment, Verb, VerbTable,
};

// Re-export dependencies for downstream crates
pub use reqwest;
pub use serde_json;
