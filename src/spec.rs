//! API description → path descriptions
//!
//! Reads the `paths` mapping of an OpenAPI/Swagger document into a flat
//! list of `PathDescription`s that the tree builder can compile. Only the
//! path strings, their `/`-delimited segments, `{name}` placeholders and
//! per-verb presence are looked at; nothing is validated.

use std::fmt;

use serde_json::Value;

use crate::error::ClientError;

/// HTTP verbs that produce callable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Put,
    Post,
    Delete,
    Patch,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Put, Verb::Post, Verb::Delete, Verb::Patch];

    /// Uppercase HTTP method (`"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    /// Lowercase key used in a path item and as the node method name.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Patch => "patch",
        }
    }

    /// Parse a path-item key. Anything outside the supported set is `None`.
    pub fn from_method_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.method_name().eq_ignore_ascii_case(name))
    }

    /// Content type applied to requests of this verb unless the caller sets one.
    pub fn default_content_type(self) -> Option<&'static str> {
        match self {
            Self::Put | Self::Post => Some("application/json"),
            Self::Patch => Some("application/merge-patch+json"),
            Self::Get | Self::Delete => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Get => 0,
            Self::Put => 1,
            Self::Post => 2,
            Self::Delete => 3,
            Self::Patch => 4,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One optional slot per [`Verb`].
#[derive(Debug, Clone, PartialEq)]
pub struct VerbTable<T> {
    slots: [Option<T>; 5],
}

impl<T> Default for VerbTable<T> {
    fn default() -> Self {
        Self {
            slots: [None, None, None, None, None],
        }
    }
}

impl<T> VerbTable<T> {
    pub fn get(&self, verb: Verb) -> Option<&T> {
        self.slots[verb.index()].as_ref()
    }

    pub fn insert(&mut self, verb: Verb, value: T) -> Option<T> {
        self.slots[verb.index()].replace(value)
    }

    pub fn contains(&self, verb: Verb) -> bool {
        self.get(verb).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Verb, &T)> + '_ {
        Verb::ALL
            .into_iter()
            .filter_map(move |verb| self.get(verb).map(|v| (verb, v)))
    }

    pub fn verbs(&self) -> impl Iterator<Item = Verb> + '_ {
        self.iter().map(|(verb, _)| verb)
    }
}

/// The per-verb descriptor of a path item.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Operation {
    /// operationId from the description, if any
    pub operation_id: Option<String>,
    /// The verb object as it appeared in the description
    pub descriptor: Value,
}

impl Operation {
    pub fn new(descriptor: Value) -> Self {
        let operation_id = descriptor
            .get("operationId")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Self {
            operation_id,
            descriptor,
        }
    }
}

/// A single `/`-delimited piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Self::Placeholder(name.to_string()),
            None => Self::Literal(raw.to_string()),
        }
    }

    /// The segment as it was written in the template.
    pub fn raw(&self) -> String {
        match self {
            Self::Literal(s) => s.clone(),
            Self::Placeholder(name) => format!("{{{name}}}"),
        }
    }
}

/// Split a path template, ignoring leading and trailing separators.
pub fn split_template(template: &str) -> Vec<Segment> {
    let trimmed = template.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(Segment::parse).collect()
}

/// Placeholder names of a template, in declaration order.
pub fn placeholder_names(template: &str) -> Vec<String> {
    split_template(template)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// A path template with its operations, ready to be compiled.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct PathDescription {
    /// The path template as written (e.g. "/api/v1/namespaces/{namespace}")
    pub template: String,
    /// Segments still to be walked
    pub segments: Vec<Segment>,
    /// Supported operations
    pub operations: VerbTable<Operation>,
}

impl PathDescription {
    pub fn new(template: impl Into<String>, operations: VerbTable<Operation>) -> Self {
        let template = template.into();
        let segments = split_template(&template);
        Self {
            template,
            segments,
            operations,
        }
    }

    /// The same description with only `remaining` left to walk.
    pub(crate) fn with_segments(&self, remaining: &[Segment]) -> Self {
        Self {
            template: self.template.clone(),
            segments: remaining.to_vec(),
            operations: self.operations.clone(),
        }
    }
}

/// Extract all path descriptions from an API description.
pub fn extract_paths(spec: &Value) -> Vec<PathDescription> {
    let paths = match spec.get("paths").and_then(|p| p.as_object()) {
        Some(p) => p,
        None => return Vec::new(),
    };

    paths
        .iter()
        .map(|(template, path_item)| {
            PathDescription::new(template.as_str(), extract_operations(path_item))
        })
        .collect()
}

/// Parse JSON text and extract its path descriptions.
pub fn parse_spec(json: &str) -> Result<Vec<PathDescription>, ClientError> {
    let spec: Value = serde_json::from_str(json).map_err(ClientError::InvalidSpecJson)?;
    Ok(extract_paths(&spec))
}

fn extract_operations(path_item: &Value) -> VerbTable<Operation> {
    let mut table = VerbTable::default();
    let Some(item) = path_item.as_object() else {
        return table;
    };

    for (key, descriptor) in item {
        if descriptor.is_null() {
            continue;
        }
        if let Some(verb) = Verb::from_method_name(key) {
            table.insert(verb, Operation::new(descriptor.clone()));
        }
    }
    table
}
