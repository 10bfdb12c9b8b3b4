//! Client construction
//!
//! `ClientBuilder` wires a backend, a naming strategy and an optional
//! per-node extension into a `Client`, whose root node the API description
//! is compiled under.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::backend::{Backend, ReqwestBackend};
use crate::builder::{Context, ExtensionFactory, SegmentNaming, Tree, ROOT};
use crate::error::ClientError;
use crate::node::Node;
use crate::spec::{extract_paths, PathDescription};

/// Default User-Agent for the reqwest backend
pub const DEFAULT_USER_AGENT: &str = concat!("openapi-fluent/", env!("CARGO_PKG_VERSION"));

/// Configuration for building a client.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    /// API base URL; used to build a reqwest backend when none is given
    pub base_url: Option<String>,
    /// Strategy for naming child nodes
    pub naming: SegmentNaming,
    /// Request timeout for the reqwest backend
    pub timeout: Option<Duration>,
    /// User-Agent for the reqwest backend
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            naming: SegmentNaming::Identity,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the child naming strategy.
    pub fn naming(mut self, naming: SegmentNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder<X = ()> {
    config: ClientConfig,
    backend: Option<Arc<dyn Backend>>,
    extension: ExtensionFactory<X>,
}

impl Default for ClientBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder<()> {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            backend: None,
            extension: Arc::new(|_: &[String]| ()),
        }
    }
}

impl<X> fmt::Debug for ClientBuilder<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("backend", &self.backend.is_some())
            .finish_non_exhaustive()
    }
}

impl<X> ClientBuilder<X> {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn naming(mut self, naming: SegmentNaming) -> Self {
        self.config.naming = naming;
        self
    }

    pub fn backend(self, backend: impl Backend + 'static) -> Self {
        self.shared_backend(Arc::new(backend))
    }

    pub fn shared_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach an extension bundle to every node, built from the node's
    /// absolute segments when the node is created.
    pub fn extension<Y>(
        self,
        factory: impl Fn(&[String]) -> Y + Send + Sync + 'static,
    ) -> ClientBuilder<Y> {
        ClientBuilder {
            config: self.config,
            backend: self.backend,
            extension: Arc::new(factory),
        }
    }

    /// Build an empty client.
    ///
    /// Fails with [`ClientError::MissingBackend`] when neither a backend nor
    /// a base URL was given.
    pub fn build(self) -> Result<Client<X>, ClientError> {
        let backend: Arc<dyn Backend> = match (self.backend, &self.config.base_url) {
            (Some(backend), _) => backend,
            (None, Some(url)) => Arc::new(ReqwestBackend::with_options(
                url.as_str(),
                self.config.timeout,
                &self.config.user_agent,
            )?),
            (None, None) => return Err(ClientError::MissingBackend),
        };

        let context = Arc::new(Context {
            backend,
            naming: self.config.naming,
            extension: self.extension,
        });
        Ok(Client {
            tree: Arc::new(Tree::new(context)),
        })
    }

    /// Build a client and compile `spec` into it.
    pub fn build_with_spec(self, spec: &Value) -> Result<Client<X>, ClientError>
    where
        X: Clone,
    {
        let mut client = self.build()?;
        client.extend(spec)?;
        Ok(client)
    }
}

/// A compiled API client.
pub struct Client<X = ()> {
    tree: Arc<Tree<X>>,
}

impl Client<()> {
    pub fn builder() -> ClientBuilder<()> {
        ClientBuilder::new()
    }
}

impl<X> fmt::Debug for Client<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("nodes", &self.tree.len())
            .finish()
    }
}

impl<X> Client<X> {
    /// The registration root.
    pub fn root(&self) -> Node<X> {
        Node::new(Arc::clone(&self.tree), ROOT)
    }

    /// Shorthand for `root().child(name)`.
    pub fn child(&self, name: &str) -> Result<Node<X>, ClientError> {
        self.root().child(name)
    }
}

impl<X: Clone> Client<X> {
    /// Compile another API description into this client.
    ///
    /// Growth is cumulative. Nodes handed out before this call keep seeing
    /// the tree as it was.
    pub fn extend(&mut self, spec: &Value) -> Result<(), ClientError> {
        self.extend_paths(extract_paths(spec))
    }

    pub fn extend_paths(&mut self, paths: Vec<PathDescription>) -> Result<(), ClientError> {
        Arc::make_mut(&mut self.tree).compile(ROOT, paths)
    }
}
