//! Path descriptions → node tree compiler
//!
//! Compiles `PathDescription`s into an arena of nodes. Each node stands for
//! one literal segment. A literal followed by a `{placeholder}` becomes a
//! parameterized node: the rest of such paths is queued on it and replayed
//! into a fresh tree each time a concrete value is supplied.

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::ClientError;
use crate::spec::{Operation, PathDescription, Segment, VerbTable};

pub(crate) type NodeId = usize;

/// Id of the registration root in every tree.
pub(crate) const ROOT: NodeId = 0;

/// Builds the per-node extension bundle from the node's absolute segments.
pub type ExtensionFactory<X> = Arc<dyn Fn(&[String]) -> X + Send + Sync>;

/// Strategy for generating child names from path segments.
#[derive(Debug, Clone, Copy, Default)]
pub enum SegmentNaming {
    /// Register each child under its segment only (default).
    #[default]
    Identity,
    /// Also register plural segments under their singular form.
    ///
    /// `"deployments"` → `["deployments", "deployment"]`
    WithSingular,
    /// Custom naming logic.
    ///
    /// Arguments: `(segment, ancestor_segments) -> aliases`
    Custom(fn(&str, &[String]) -> Vec<String>),
}

impl SegmentNaming {
    pub fn apply(&self, segment: &str, ancestors: &[String]) -> Vec<String> {
        let names = match self {
            Self::Identity => return vec![segment.to_string()],
            Self::WithSingular => with_singular(segment),
            Self::Custom(f) => f(segment, ancestors),
        };
        // Guard: a node nobody can name is unreachable
        if names.is_empty() {
            vec![segment.to_string()]
        } else {
            names
        }
    }
}

fn with_singular(segment: &str) -> Vec<String> {
    let mut names = vec![segment.to_string()];
    if let Some(singular) = segment.strip_suffix('s') {
        if !singular.is_empty() && !singular.ends_with('s') {
            names.push(singular.to_string());
        }
    }
    names
}

/// Collaborators shared by every tree derived from one client.
pub(crate) struct Context<X> {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) naming: SegmentNaming,
    pub(crate) extension: ExtensionFactory<X>,
}

impl<X> fmt::Debug for Context<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("naming", &self.naming)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Literal,
    /// Owns a placeholder; `pending` holds what follows it in each path.
    Parameterized { pending: Vec<PathDescription> },
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData<X> {
    pub(crate) segments: Vec<String>,
    /// Parallel to `segments`; `true` where the segment is a bound value
    pub(crate) bound: Vec<bool>,
    pub(crate) parameter_values: Vec<String>,
    pub(crate) kind: NodeKind,
    /// Alias → child, in insertion order
    pub(crate) children: Vec<(String, NodeId)>,
    pub(crate) operations: VerbTable<Operation>,
    pub(crate) template: Option<String>,
    pub(crate) extension: X,
}

impl<X> NodeData<X> {
    pub(crate) fn is_parameterized(&self) -> bool {
        matches!(self.kind, NodeKind::Parameterized { .. })
    }

    fn upgrade(&mut self) {
        if let NodeKind::Literal = self.kind {
            self.kind = NodeKind::Parameterized {
                pending: Vec::new(),
            };
        }
    }

    pub(crate) fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Tree<X> {
    nodes: Vec<NodeData<X>>,
    context: Arc<Context<X>>,
}

impl<X> Tree<X> {
    pub(crate) fn new(context: Arc<Context<X>>) -> Self {
        Self::with_root(context, Vec::new(), Vec::new(), Vec::new())
    }

    fn with_root(
        context: Arc<Context<X>>,
        segments: Vec<String>,
        bound: Vec<bool>,
        parameter_values: Vec<String>,
    ) -> Self {
        let extension = (context.extension)(&segments);
        let root = NodeData {
            segments,
            bound,
            parameter_values,
            kind: NodeKind::Literal,
            children: Vec::new(),
            operations: VerbTable::default(),
            template: None,
            extension,
        };
        Self {
            nodes: vec![root],
            context,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData<X> {
        &self.nodes[id]
    }

    pub(crate) fn context(&self) -> &Context<X> {
        &self.context
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, id)| *id)
    }

    /// Register `paths` below `from`, deepest first.
    pub(crate) fn compile(
        &mut self,
        from: NodeId,
        mut paths: Vec<PathDescription>,
    ) -> Result<(), ClientError> {
        // A node's kind is fixed on first walk; deeper paths go first so
        // placeholders are seen before shallower literal-only paths.
        paths.sort_by_key(|p| Reverse(p.segments.len()));
        tracing::debug!(paths = paths.len(), "compiling path descriptions");
        for path in &paths {
            self.add_path(from, path)?;
        }
        Ok(())
    }

    /// Walk one path. Returns its home node, or `None` if it was queued on a
    /// parameterized node.
    pub(crate) fn add_path(
        &mut self,
        from: NodeId,
        path: &PathDescription,
    ) -> Result<Option<NodeId>, ClientError> {
        let segments = &path.segments;
        let mut parent = from;
        let mut i = 0;

        while i < segments.len() {
            // Placeholders always follow a literal; a stray one is walked as text.
            let split = match &segments[i] {
                Segment::Literal(s) => s.clone(),
                other => other.raw(),
            };
            i += 1;

            let owned = match segments.get(i) {
                Some(Segment::Placeholder(name)) => {
                    i += 1;
                    Some(name)
                }
                _ => None,
            };

            let child = match self.find_segment(parent, &split) {
                Some(id) => {
                    if owned.is_some() {
                        self.nodes[id].upgrade();
                    }
                    id
                }
                None => self.add_child(parent, &split, owned.is_some()),
            };
            parent = child;

            if let Some(placeholder) = owned {
                let NodeKind::Parameterized { pending } = &mut self.nodes[child].kind else {
                    return Err(ClientError::InconsistentSpec {
                        template: path.template.clone(),
                        placeholder: placeholder.clone(),
                    });
                };
                pending.push(path.with_segments(&segments[i..]));
                tracing::trace!(
                    template = %path.template,
                    placeholder = %placeholder,
                    "queued path on parameterized node"
                );
                return Ok(None);
            }
        }

        let home = &mut self.nodes[parent];
        for (verb, op) in path.operations.iter() {
            home.operations.insert(verb, op.clone());
        }
        home.template = Some(path.template.clone());
        tracing::trace!(template = %path.template, "registered path");
        Ok(Some(parent))
    }

    /// Build the tree rooted at `id` bound to `value`.
    pub(crate) fn resolve(&self, id: NodeId, value: String) -> Result<Tree<X>, ClientError> {
        let node = &self.nodes[id];
        let NodeKind::Parameterized { pending } = &node.kind else {
            return Err(ClientError::NotParameterized { path: node.path() });
        };

        let mut segments = node.segments.clone();
        segments.push(value.clone());
        let mut bound = node.bound.clone();
        bound.push(true);
        let mut parameter_values = node.parameter_values.clone();
        parameter_values.push(value);

        let mut tree = Tree::with_root(
            Arc::clone(&self.context),
            segments,
            bound,
            parameter_values,
        );
        for path in pending {
            tree.add_path(ROOT, path)?;
        }
        Ok(tree)
    }

    fn find_segment(&self, parent: NodeId, split: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .map(|(_, id)| *id)
            .find(|id| self.nodes[*id].segments.last().map(String::as_str) == Some(split))
    }

    fn add_child(&mut self, parent: NodeId, split: &str, parameterized: bool) -> NodeId {
        let id = self.nodes.len();
        let parent_node = &self.nodes[parent];

        let mut segments = parent_node.segments.clone();
        segments.push(split.to_string());
        let mut bound = parent_node.bound.clone();
        bound.push(false);
        let names = self.context.naming.apply(split, &parent_node.segments);
        let extension = (self.context.extension)(&segments);

        let node = NodeData {
            segments,
            bound,
            parameter_values: parent_node.parameter_values.clone(),
            kind: if parameterized {
                NodeKind::Parameterized {
                    pending: Vec::new(),
                }
            } else {
                NodeKind::Literal
            },
            children: Vec::new(),
            operations: VerbTable::default(),
            template: None,
            extension,
        };
        self.nodes.push(node);

        let children = &mut self.nodes[parent].children;
        for name in names {
            match children.iter_mut().find(|(alias, _)| *alias == name) {
                Some(slot) => slot.1 = id,
                None => children.push((name, id)),
            }
        }
        id
    }
}
