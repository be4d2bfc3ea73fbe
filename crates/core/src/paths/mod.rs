//! Resource paths
//!
//! A `ResourcePath` is an immutable node in a parent chain addressing a
//! remote resource relative to the service root. Nodes are shared with
//! `Arc`, so cloning a path and hanging a new child under it is cheap.
//! Rebinding a proxy replaces its path; it never mutates one.

use std::fmt;
use std::sync::Arc;

use odatalink_domain::Value;

/// How a resolved item key is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStyle {
    /// `parent/key`
    #[default]
    Segment,
    /// `parent(key)`, string keys single-quoted
    Parenthesized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Plain named segment, rendered verbatim.
    Segment(String),
    /// Item addressed by identifier. An unresolved item (`key = None`)
    /// renders as its parent, e.g. the collection a create posts to.
    Item { key: Option<String>, style: KeyStyle },
    /// `name(arg1,arg2)`; `args = None` renders the bare name.
    ServiceOperation { name: String, args: Option<Vec<Value>> },
}

#[derive(Debug, PartialEq)]
struct PathNode {
    segment: PathSegment,
    parent: Option<ResourcePath>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePath(Arc<PathNode>);

impl ResourcePath {
    fn with(segment: PathSegment, parent: Option<&Self>) -> Self {
        Self(Arc::new(PathNode { segment, parent: parent.cloned() }))
    }

    /// Named segment; a root path when `parent` is `None`.
    pub fn new(segment: impl Into<String>, parent: Option<&Self>) -> Self {
        Self::with(PathSegment::Segment(segment.into()), parent)
    }

    pub fn root(segment: impl Into<String>) -> Self {
        Self::new(segment, None)
    }

    /// Named child of this path.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        Self::new(segment, Some(self))
    }

    /// Unresolved item under `parent`, waiting for a server-assigned key.
    pub fn unresolved_item(parent: Option<&Self>) -> Self {
        Self::with(PathSegment::Item { key: None, style: KeyStyle::Segment }, parent)
    }

    pub fn item(key: impl Into<String>, style: KeyStyle, parent: Option<&Self>) -> Self {
        Self::with(PathSegment::Item { key: Some(key.into()), style }, parent)
    }

    pub fn service_operation(
        name: impl Into<String>,
        args: Option<Vec<Value>>,
        parent: Option<&Self>,
    ) -> Self {
        Self::with(PathSegment::ServiceOperation { name: name.into(), args }, parent)
    }

    pub fn segment(&self) -> &PathSegment {
        &self.0.segment
    }

    pub fn parent(&self) -> Option<&Self> {
        self.0.parent.as_ref()
    }

    /// Key of an item segment, if this node is a resolved item.
    pub fn key(&self) -> Option<&str> {
        match &self.0.segment {
            PathSegment::Item { key, .. } => key.as_deref(),
            _ => None,
        }
    }

    /// False while any node in the chain is an item awaiting its key.
    pub fn is_resolved(&self) -> bool {
        let mut node = Some(self);
        while let Some(path) = node {
            if matches!(path.segment(), PathSegment::Item { key: None, .. }) {
                return false;
            }
            node = path.parent();
        }
        true
    }

    /// Relative URL: segments joined root-to-leaf with `/`.
    pub fn to_url(&self) -> String {
        let parent = self.parent().map(Self::to_url).unwrap_or_default();
        match &self.0.segment {
            PathSegment::Segment(name) => join(&parent, name),
            PathSegment::Item { key: None, .. } => parent,
            PathSegment::Item { key: Some(key), style: KeyStyle::Segment } => {
                join(&parent, &urlencoding::encode(key))
            }
            PathSegment::Item { key: Some(key), style: KeyStyle::Parenthesized } => {
                format!("{parent}({})", key_literal(key))
            }
            PathSegment::ServiceOperation { name, args: None } => join(&parent, name),
            PathSegment::ServiceOperation { name, args: Some(args) } => {
                join(&parent, &format!("{name}({})", format_args_list(args)))
            }
        }
    }

    /// Absolute URL under `service_root` (expected to end with `/`).
    pub fn absolute(&self, service_root: &str) -> String {
        format!("{service_root}{}", self.to_url())
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}/{segment}")
    }
}

fn key_literal(key: &str) -> String {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        key.to_string()
    } else {
        format!("'{}'", key.replace('\'', "''"))
    }
}

/// Render operation arguments as OData literals.
pub fn format_args_list(args: &[Value]) -> String {
    args.iter().map(literal).collect::<Vec<_>>().join(",")
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => other
            .to_plain_json()
            .map_or_else(|| "null".to_string(), |json| json.to_string()),
    }
}
