use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an exclusivity group.
///
/// Kept apart from tag identifiers so a group named like a tag can never
/// satisfy or trip a tag constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group@{}", self.0)
    }
}

fn default_inherited() -> bool {
    true
}

/// A raw, author-supplied tag declaration.
///
/// Only `tag` is mandatory. A tag that is referenced but never declared
/// behaves as if declared with nothing but its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    /// Literal text or a template; defaults to the identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Parent categories.
    #[serde(default, alias = "isA")]
    pub is_a: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub groups: Vec<GroupId>,
    /// Marks non-generative leaves (a named deity, a specific artifact...).
    #[serde(default, alias = "isInstance")]
    pub is_instance: bool,
    /// Whether this tag's own ancestors propagate to its children.
    #[serde(default = "default_inherited")]
    pub inherited: bool,
}

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: None,
            is_a: Vec::new(),
            requires: Vec::new(),
            excludes: Vec::new(),
            groups: Vec::new(),
            is_instance: false,
            inherited: true,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_a(mut self, parents: &[&str]) -> Self {
        self.is_a = parents.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn requires(mut self, tags: &[&str]) -> Self {
        self.requires = tags.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn excludes(mut self, tags: &[&str]) -> Self {
        self.excludes = tags.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| GroupId::new(*g)).collect();
        self
    }

    pub fn instance(mut self) -> Self {
        self.is_instance = true;
        self
    }

    pub fn not_inherited(mut self) -> Self {
        self.inherited = false;
        self
    }

    /// The value, falling back to the identifier.
    pub fn value_or_id(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.tag)
    }
}

/// A content catalog as stored on disk: `(tags: [...])`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagCatalog {
    #[serde(default)]
    pub tags: Vec<Tag>,
}
