//! Structure spec loading and validation.
//!
//! A spec is a JSON array of node objects:
//!
//! ```json
//! [
//!   { "path": "src", "type": "directory", "files": [
//!       { "path": "main.rs", "type": "file", "content": "fn main() {}" }
//!   ]},
//!   { "path": "bin/run", "type": "file", "permissions": 493 },
//!   { "path": "latest", "type": "symlink", "target": "src" }
//! ]
//! ```
//!
//! The whole document is validated before it is handed to the materializer, so a
//! malformed spec never leaves a partially applied tree behind.

use std::fs;
use std::path::{Component, Path};

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Highest accepted permission value (setuid/setgid/sticky plus rwx bits).
const MAX_MODE: u64 = 0o7777;

/// One entry of a structure spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Path relative to the directory the node is materialized in.
    pub path: String,
    pub kind: NodeKind,
    /// POSIX mode bits applied after creation.
    pub permissions: Option<u32>,
}

/// Tagged node variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory { children: Vec<Node> },
    File { content: String },
    Symlink { target: String },
    /// Kept only by the lenient loader; the materializer skips it with a warning.
    Unknown { kind: String },
}

impl NodeKind {
    /// Name of the kind as written in the `type` field.
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Directory { .. } => "directory",
            NodeKind::File { .. } => "file",
            NodeKind::Symlink { .. } => "symlink",
            NodeKind::Unknown { kind } => kind.as_str(),
        }
    }
}

impl Node {
    pub fn directory<S: Into<String>>(path: S, children: Vec<Node>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Directory { children },
            permissions: None,
        }
    }

    pub fn file<S: Into<String>, C: Into<String>>(path: S, content: C) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::File {
                content: content.into(),
            },
            permissions: None,
        }
    }

    pub fn symlink<S: Into<String>, T: Into<String>>(path: S, target: T) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Symlink {
                target: target.into(),
            },
            permissions: None,
        }
    }

    pub fn unknown<S: Into<String>, K: Into<String>>(path: S, kind: K) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Unknown { kind: kind.into() },
            permissions: None,
        }
    }

    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode);
        self
    }

    /// Converts the node back into its JSON document form.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("path".into(), Value::String(self.path.clone()));
        map.insert("type".into(), Value::String(self.kind.name().to_string()));
        match &self.kind {
            NodeKind::Directory { children } if !children.is_empty() => {
                map.insert(
                    "files".into(),
                    Value::Array(children.iter().map(Node::to_value).collect()),
                );
            }
            NodeKind::File { content } => {
                map.insert("content".into(), Value::String(content.clone()));
            }
            NodeKind::Symlink { target } => {
                map.insert("target".into(), Value::String(target.clone()));
            }
            _ => {}
        }
        if let Some(mode) = self.permissions {
            map.insert("permissions".into(), Value::from(mode));
        }
        Value::Object(map)
    }
}

/// Ordered forest of nodes. Sibling order is preserved and drives traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spec {
    nodes: Vec<Node>,
}

impl Spec {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of nodes in the forest, nested children included.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|node| match &node.kind {
                    NodeKind::Directory { children } => 1 + count(children),
                    _ => 1,
                })
                .sum()
        }
        count(&self.nodes)
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.nodes.iter().map(Node::to_value).collect())
    }
}

impl From<Vec<Node>> for Spec {
    fn from(nodes: Vec<Node>) -> Self {
        Self::new(nodes)
    }
}

impl Serialize for Spec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Spec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SpecLoader::strict().load_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Parses and validates JSON structure specs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecLoader {
    allow_unknown: bool,
}

impl SpecLoader {
    /// Loader that rejects unrecognized node kinds.
    pub fn strict() -> Self {
        Self {
            allow_unknown: false,
        }
    }

    /// Loader that keeps unrecognized node kinds as [`NodeKind::Unknown`].
    pub fn lenient() -> Self {
        Self {
            allow_unknown: true,
        }
    }

    pub fn allows_unknown(&self) -> bool {
        self.allow_unknown
    }

    /// Reads and validates a spec file.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the file cannot be read or fails validation
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Spec> {
        let path = path.as_ref();
        debug!("Loading structure spec from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("cannot read spec file '{}': {}", path.display(), e))
        })?;
        self.load_str(&content)
    }

    /// Parses and validates a spec document.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the source is not JSON, is not an array, or any
    ///   element is invalid
    pub fn load_str(&self, source: &str) -> Result<Spec> {
        let value: Value = serde_json::from_str(source)
            .map_err(|e| Error::ConfigError(format!("invalid JSON: {}", e)))?;
        self.load_value(&value)
    }

    pub fn load_value(&self, value: &Value) -> Result<Spec> {
        let items = value.as_array().ok_or_else(|| {
            Error::ConfigError("the spec must be a JSON array of nodes".to_string())
        })?;
        let nodes = self.parse_nodes(items, "")?;
        Ok(Spec::new(nodes))
    }

    fn parse_nodes(&self, items: &[Value], parent: &str) -> Result<Vec<Node>> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| self.parse_node(item, &format!("{parent}[{index}]")))
            .collect()
    }

    fn parse_node(&self, item: &Value, location: &str) -> Result<Node> {
        let invalid = |msg: String| Error::ConfigError(format!("node {location}: {msg}"));

        let obj = item.as_object().ok_or_else(|| invalid("expected an object".to_string()))?;

        let path = match obj.get("path") {
            Some(Value::String(path)) => path.clone(),
            Some(_) => return Err(invalid("'path' must be a string".to_string())),
            None => return Err(invalid("missing 'path'".to_string())),
        };
        validate_relative_path(&path).map_err(&invalid)?;

        let kind = match obj.get("type") {
            Some(Value::String(kind)) => kind.as_str(),
            Some(_) => return Err(invalid("'type' must be a string".to_string())),
            None => return Err(invalid("missing 'type'".to_string())),
        };

        let content = optional_str(obj, "content").map_err(&invalid)?;
        let target = optional_str(obj, "target").map_err(&invalid)?;
        let children = match obj.get("files") {
            None | Some(Value::Null) => None,
            Some(Value::Array(children)) => Some(children.as_slice()),
            Some(_) => return Err(invalid("'files' must be an array".to_string())),
        };
        let permissions = match obj.get("permissions") {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_u64() {
                Some(mode) if mode <= MAX_MODE => Some(mode as u32),
                _ => {
                    return Err(invalid(format!(
                        "'permissions' must be an integer between 0 and {MAX_MODE}"
                    )))
                }
            },
        };

        let kind = match kind {
            "directory" => {
                if content.is_some() || target.is_some() {
                    warn!("node {location}: 'content' and 'target' are ignored on directories");
                }
                let children = match children {
                    Some(children) => self.parse_nodes(children, &format!("{location}.files"))?,
                    None => Vec::new(),
                };
                NodeKind::Directory { children }
            }
            "file" => {
                if children.is_some() {
                    return Err(invalid("a file cannot have 'files'".to_string()));
                }
                if target.is_some() {
                    return Err(invalid("a file cannot have a 'target'".to_string()));
                }
                NodeKind::File {
                    content: content.unwrap_or_default(),
                }
            }
            "symlink" => {
                if content.is_some() || children.is_some() {
                    return Err(invalid("a symlink cannot have 'content' or 'files'".to_string()));
                }
                if permissions.is_some() {
                    return Err(invalid("a symlink cannot have 'permissions'".to_string()));
                }
                let target =
                    target.ok_or_else(|| invalid("a symlink requires a 'target'".to_string()))?;
                if target.is_empty() {
                    return Err(invalid("'target' must not be empty".to_string()));
                }
                NodeKind::Symlink { target }
            }
            other if self.allow_unknown => {
                debug!("node {location}: keeping unknown type '{other}'");
                NodeKind::Unknown {
                    kind: other.to_string(),
                }
            }
            other => {
                return Err(invalid(format!(
                    "unknown type '{other}' (expected directory, file or symlink)"
                )))
            }
        };

        Ok(Node {
            path,
            kind,
            permissions,
        })
    }
}

fn optional_str(
    obj: &Map<String, Value>,
    key: &str,
) -> std::result::Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("'{key}' must be a string")),
    }
}

/// Checks that `path` is a non-empty relative path that stays below its root.
pub fn validate_relative_path(path: &str) -> std::result::Result<(), String> {
    if path.trim().is_empty() {
        return Err("'path' must not be empty".to_string());
    }
    let mut normal = 0usize;
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!("path '{path}' must not contain '..'"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("path '{path}' must be relative"));
            }
        }
    }
    if normal == 0 {
        return Err(format!("path '{path}' does not name an entry"));
    }
    Ok(())
}

/// Parses a spec document with the strict loader.
pub fn load(source: &str) -> Result<Spec> {
    SpecLoader::strict().load_str(source)
}
