//! Navigable client nodes
//!
//! A [`Node`] is a cheap handle onto one node of a compiled tree. Literal
//! children are reached with [`Node::child`], a parameterized node is bound
//! to a value with [`Node::resolve`], and attached operations are invoked
//! with the verb methods (`get`, `put`, `post`, `delete`, `patch`).
//!
//! ```no_run
//! use openapi_fluent::{Client, RequestOptions};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), openapi_fluent::ClientError> {
//! let spec = json!({
//!     "paths": {
//!         "/api/v1/namespaces/{namespace}/pods": { "get": { "operationId": "listPods" } }
//!     }
//! });
//! let client = Client::builder()
//!     .base_url("https://kube.example.com")
//!     .build_with_spec(&spec)?;
//!
//! let pods = client
//!     .child("api")?
//!     .child("v1")?
//!     .child("namespaces")?
//!     .resolve("default")?
//!     .child("pods")?
//!     .get(RequestOptions::new())?;
//! println!("{}", pods.body);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::{ApiResponse, ByteStream};
use crate::builder::{NodeData, NodeId, Tree};
use crate::dispatch::{self, build_request, RequestOptions};
use crate::error::ClientError;
use crate::spec::{Operation, Verb};

/// Handle onto one node of a compiled tree.
pub struct Node<X = ()> {
    tree: Arc<Tree<X>>,
    id: NodeId,
}

impl<X> Clone for Node<X> {
    fn clone(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            id: self.id,
        }
    }
}

impl<X> fmt::Debug for Node<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path())
            .field("parameterized", &self.is_parameterized())
            .field("verbs", &self.verbs().collect::<Vec<_>>())
            .finish()
    }
}

impl<X> Node<X> {
    pub(crate) fn new(tree: Arc<Tree<X>>, id: NodeId) -> Self {
        Self { tree, id }
    }

    fn data(&self) -> &NodeData<X> {
        self.tree.node(self.id)
    }

    /// The child registered under `name` (a segment or one of its aliases).
    pub fn child(&self, name: &str) -> Result<Node<X>, ClientError> {
        match self.tree.child(self.id, name) {
            Some(id) => Ok(Self::new(Arc::clone(&self.tree), id)),
            None => Err(ClientError::NoSuchChild {
                path: self.path(),
                name: name.to_string(),
            }),
        }
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.tree.child(self.id, name).is_some()
    }

    /// Child names, aliases included, in registration order.
    pub fn child_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.data().children.iter().map(|(name, _)| name.as_str())
    }

    /// Whether [`Node::resolve`] can be called on this node.
    pub fn is_parameterized(&self) -> bool {
        self.data().is_parameterized()
    }

    /// Bind this node's path parameter to `value`.
    ///
    /// Every call builds an independent node with all paths queued under the
    /// placeholder materialized below it.
    pub fn resolve(&self, value: impl Into<String>) -> Result<Node<X>, ClientError> {
        let tree = self.tree.resolve(self.id, value.into())?;
        Ok(Self::new(Arc::new(tree), crate::builder::ROOT))
    }

    /// Absolute segments, bound values included.
    pub fn segments(&self) -> &[String] {
        &self.data().segments
    }

    /// Values bound on the way to this node, outermost first.
    pub fn parameter_values(&self) -> &[String] {
        &self.data().parameter_values
    }

    /// The absolute path, e.g. `/api/v1/namespaces/default`.
    pub fn path(&self) -> String {
        self.data().path()
    }

    /// The template this node's operations were registered from.
    pub fn template(&self) -> Option<&str> {
        self.data().template.as_deref()
    }

    /// Placeholder name → bound value for this node's template.
    pub fn pathname_parameters(&self) -> BTreeMap<String, String> {
        let data = self.data();
        data.template
            .as_deref()
            .map(|t| dispatch::pathname_parameters(t, &data.parameter_values))
            .unwrap_or_default()
    }

    pub fn operation(&self, verb: Verb) -> Option<&Operation> {
        self.data().operations.get(verb)
    }

    pub fn supports(&self, verb: Verb) -> bool {
        self.data().operations.contains(verb)
    }

    pub fn verbs(&self) -> impl Iterator<Item = Verb> + '_ {
        self.data().operations.verbs()
    }

    /// The extension bundle built for this node at creation.
    pub fn extension(&self) -> &X {
        &self.data().extension
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Node<X>) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }

    /// Invoke `verb` on this node.
    pub fn request(&self, verb: Verb, options: RequestOptions) -> Result<ApiResponse, ClientError> {
        self.ensure_supports(verb)?;
        let request = build_request(self.data(), verb, options, false);
        dispatch::dispatch(self.tree.context().backend.as_ref(), &request)
    }

    pub fn get(&self, options: RequestOptions) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Get, options)
    }

    /// GET, returning the response body as a reader.
    pub fn get_stream(&self, options: RequestOptions) -> Result<ByteStream, ClientError> {
        self.ensure_supports(Verb::Get)?;
        let request = build_request(self.data(), Verb::Get, options, true);
        dispatch::dispatch_stream(self.tree.context().backend.as_ref(), &request)
    }

    pub fn put(&self, options: RequestOptions) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Put, options)
    }

    pub fn post(&self, options: RequestOptions) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Post, options)
    }

    pub fn delete(&self, options: RequestOptions) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Delete, options)
    }

    pub fn patch(&self, options: RequestOptions) -> Result<ApiResponse, ClientError> {
        self.request(Verb::Patch, options)
    }

    fn ensure_supports(&self, verb: Verb) -> Result<(), ClientError> {
        if self.supports(verb) {
            Ok(())
        } else {
            Err(ClientError::UnsupportedVerb {
                method: verb,
                path: self.path(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::RecordingBackend;
    use crate::builder::SegmentNaming;
    use crate::client::Client;
    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use std::io::Read;

    fn client(spec: Value) -> (Client, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::ok());
        let client = Client::builder()
            .shared_backend(backend.clone())
            .build_with_spec(&spec)
            .unwrap();
        (client, backend)
    }

    #[test]
    fn placeholder_owner_is_invocable_and_keeps_own_operations() {
        for spec in [
            json!({ "paths": { "/foo/{name}/bar": {}, "/foo": { "get": { "operationId": "fooGet" } } } }),
            json!({ "paths": { "/foo": { "get": { "operationId": "fooGet" } }, "/foo/{name}/bar": {} } }),
        ] {
            let (client, _) = client(spec);
            let foo = client.child("foo").unwrap();
            assert!(foo.is_parameterized());
            assert!(foo.supports(Verb::Get));
            assert!(!foo.has_child("bar"));

            let zoo = foo.resolve("zoo").unwrap();
            assert!(zoo.has_child("bar"));
            assert_eq!(zoo.parameter_values(), ["zoo"]);
            assert_eq!(zoo.child("bar").unwrap().parameter_values(), ["zoo"]);
        }
    }

    #[test]
    fn order_of_registration_calls_does_not_matter() {
        let mut client = Client::builder()
            .shared_backend(Arc::new(RecordingBackend::ok()))
            .build()
            .unwrap();
        client
            .extend(&json!({ "paths": { "/foo": { "get": {} } } }))
            .unwrap();
        client
            .extend(&json!({ "paths": { "/foo/{name}/bar": { "get": {} } } }))
            .unwrap();

        let foo = client.child("foo").unwrap();
        assert!(foo.is_parameterized());
        assert!(foo.supports(Verb::Get));
        assert!(foo.resolve("x").unwrap().child("bar").unwrap().supports(Verb::Get));
    }

    #[test]
    fn nested_placeholders_zip_names_per_path() {
        let (client, backend) = client(json!({
            "paths": {
                "/foo/{name}/bar/{type}": { "get": {} },
                "/foo/{nombre}/baz/{type}": { "get": {} }
            }
        }));
        let foo_a = client.child("foo").unwrap().resolve("a").unwrap();

        let bar = foo_a.child("bar").unwrap().resolve("b").unwrap();
        assert_eq!(bar.parameter_values(), ["a", "b"]);
        let params = bar.pathname_parameters();
        assert_eq!(params.get("name").map(String::as_str), Some("a"));
        assert_eq!(params.get("type").map(String::as_str), Some("b"));

        let baz = foo_a.child("baz").unwrap().resolve("c").unwrap();
        let params = baz.pathname_parameters();
        assert_eq!(params.get("nombre").map(String::as_str), Some("a"));
        assert_eq!(params.get("type").map(String::as_str), Some("c"));
        assert!(params.get("name").is_none());

        bar.get(RequestOptions::new()).unwrap();
        let sent = backend.recorded();
        assert_eq!(sent[0].pathname, "/foo/a/bar/b");
        assert_eq!(sent[0].pathname_parameters, bar.pathname_parameters());
    }

    #[test]
    fn resolved_nodes_are_independent() {
        let (client, _) = client(json!({ "paths": { "/foo/{name}": { "get": {} } } }));
        let foo = client.child("foo").unwrap();
        let a = foo.resolve("a").unwrap();
        let b = foo.resolve("b").unwrap();
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.path(), "/foo/a");
        assert_eq!(b.path(), "/foo/b");
        assert_eq!(a.template(), Some("/foo/{name}"));
    }

    #[test]
    fn aliases_resolve_to_the_identical_node() {
        let backend = Arc::new(RecordingBackend::ok());
        let client = Client::builder()
            .naming(SegmentNaming::Custom(|segment, _| {
                if segment == "bars" {
                    vec!["bar".into(), "bars".into(), "b".into()]
                } else {
                    vec![segment.to_string()]
                }
            }))
            .shared_backend(backend.clone())
            .build_with_spec(&json!({ "paths": { "/foo/bars": { "get": { "operationId": "fooBarsGet" } } } }))
            .unwrap();

        let foo = client.child("foo").unwrap();
        let bars = foo.child("bars").unwrap();
        assert!(bars.ptr_eq(&foo.child("bar").unwrap()));
        assert!(bars.ptr_eq(&foo.child("b").unwrap()));
        assert_eq!(foo.child_names().collect::<Vec<_>>(), vec!["bar", "bars", "b"]);

        foo.child("b").unwrap().get(RequestOptions::new()).unwrap();
        assert_eq!(backend.recorded()[0].pathname, "/foo/bars");
    }

    #[test]
    fn aliases_see_operations_added_later() {
        let mut client = Client::builder()
            .naming(SegmentNaming::WithSingular)
            .shared_backend(Arc::new(RecordingBackend::ok()))
            .build_with_spec(&json!({ "paths": { "/deployments": { "get": {} } } }))
            .unwrap();
        client
            .extend(&json!({ "paths": { "/deployments": { "post": {} } } }))
            .unwrap();

        let singular = client.child("deployment").unwrap();
        assert!(singular.ptr_eq(&client.child("deployments").unwrap()));
        assert_eq!(singular.verbs().collect::<Vec<_>>(), vec![Verb::Get, Verb::Post]);
    }

    #[test]
    fn node_without_verbs_is_still_navigable() {
        let (client, backend) = client(json!({
            "paths": { "/api": {}, "/api/v1/pods": { "get": {} } }
        }));
        let api = client.child("api").unwrap();
        assert_eq!(api.verbs().count(), 0);

        let err = api.get(RequestOptions::new()).unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedVerb { method: Verb::Get, .. }));
        assert!(api.get_stream(RequestOptions::new()).is_err());
        assert!(backend.recorded().is_empty());

        assert!(api.child("v1").unwrap().child("pods").unwrap().supports(Verb::Get));
    }

    #[test]
    fn missing_child_is_an_error() {
        let (client, _) = client(json!({ "paths": { "/api/v1": {} } }));
        let err = client.child("api").unwrap().child("v2").unwrap_err();
        assert!(matches!(err, ClientError::NoSuchChild { ref path, ref name } if path == "/api" && name == "v2"));
    }

    #[test]
    fn resolve_on_literal_node_is_an_error() {
        let (client, _) = client(json!({ "paths": { "/api": {} } }));
        let err = client.child("api").unwrap().resolve("x").unwrap_err();
        assert!(matches!(err, ClientError::NotParameterized { .. }));
    }

    #[test]
    fn get_stream_is_available_for_get_paths() {
        let backend = Arc::new(RecordingBackend::with(StatusCode::OK, Value::String("chunk".into())));
        let client = Client::builder()
            .shared_backend(backend.clone())
            .build_with_spec(&json!({ "paths": { "/logs": { "get": {} } } }))
            .unwrap();

        let mut stream = client
            .child("logs")
            .unwrap()
            .get_stream(RequestOptions::new())
            .unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        assert_eq!(out, "chunk");
        assert!(backend.recorded()[0].stream);
    }

    #[test]
    fn every_verb_dispatches_once_with_its_method() {
        let (client, backend) = client(json!({
            "paths": { "/pods": { "get": {}, "put": {}, "post": {}, "delete": {}, "patch": {} } }
        }));
        let pods = client.child("pods").unwrap();
        pods.get(RequestOptions::new()).unwrap();
        pods.put(RequestOptions::new()).unwrap();
        pods.post(RequestOptions::new()).unwrap();
        pods.delete(RequestOptions::new()).unwrap();
        pods.patch(RequestOptions::new()).unwrap();

        let methods: Vec<_> = backend.recorded().iter().map(|r| r.method).collect();
        assert_eq!(methods, Verb::ALL.to_vec());
    }

    #[test]
    fn backend_errors_pass_through_unchanged() {
        let backend = Arc::new(RecordingBackend::with(
            StatusCode::NOT_FOUND,
            json!({ "message": "fail!" }),
        ));
        let client = Client::builder()
            .shared_backend(backend)
            .build_with_spec(&json!({ "paths": { "/magic": { "get": {} } } }))
            .unwrap();

        let err = client.child("magic").unwrap().get(RequestOptions::new()).unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.message(), "fail!");
    }

    #[test]
    fn extension_is_built_per_node() {
        let client = Client::builder()
            .shared_backend(Arc::new(RecordingBackend::ok()))
            .extension(|segments: &[String]| segments.len())
            .build_with_spec(&json!({ "paths": { "/a/{x}/b": {} } }))
            .unwrap();

        assert_eq!(*client.root().extension(), 0);
        let a = client.child("a").unwrap();
        assert_eq!(*a.extension(), 1);
        let b = a.resolve("v").unwrap().child("b").unwrap();
        assert_eq!(*b.extension(), 3);
    }

    #[test]
    fn nodes_can_be_shared_across_threads() {
        let (client, backend) = client(json!({ "paths": { "/foo/{name}": { "get": {} } } }));
        let foo = client.child("foo").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let foo = foo.clone();
                std::thread::spawn(move || {
                    foo.resolve(i.to_string())
                        .unwrap()
                        .get(RequestOptions::new())
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut paths: Vec<_> = backend.recorded().into_iter().map(|r| r.pathname).collect();
        paths.sort();
        assert_eq!(paths, vec!["/foo/0", "/foo/1", "/foo/2", "/foo/3"]);
    }
}
