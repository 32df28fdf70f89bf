/// Tag Definition Store — raw declarations keyed by identifier.

use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::schema::tag::{Tag, TagCatalog};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raw tag declarations, in declaration order.
///
/// A later declaration of the same identifier replaces the earlier one but
/// keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct TagStore {
    tags: FxHashMap<String, Tag>,
    order: Vec<String>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: Tag) {
        if !self.tags.contains_key(&tag.tag) {
            self.order.push(tag.tag.clone());
        }
        self.tags.insert(tag.tag.clone(), tag);
    }

    pub fn extend(&mut self, tags: impl IntoIterator<Item = Tag>) {
        for tag in tags {
            self.insert(tag);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Tag> {
        self.tags.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tags.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Declared identifiers in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Declarations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.order.iter().filter_map(|id| self.tags.get(id))
    }

    /// Merge another store into this one. Declarations from `other`
    /// override declarations in `self` with the same identifier.
    pub fn merge(&mut self, other: TagStore) {
        let TagStore { mut tags, order } = other;
        for id in order {
            if let Some(tag) = tags.remove(&id) {
                self.insert(tag);
            }
        }
    }

    /// Load a catalog from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<TagStore, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        let store = Self::parse_ron(&contents)?;
        debug!(path = %path.display(), tags = store.len(), "loaded tag catalog");
        Ok(store)
    }

    /// Parse a catalog from a RON string.
    pub fn parse_ron(input: &str) -> Result<TagStore, StoreError> {
        let catalog: TagCatalog = ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(input)?;
        Ok(Self::from(catalog))
    }

    /// Parse a catalog from a JSON string.
    pub fn parse_json(input: &str) -> Result<TagStore, StoreError> {
        let catalog: TagCatalog = serde_json::from_str(input)?;
        Ok(Self::from(catalog))
    }

    /// Load every `.ron` catalog in a directory, in file name order.
    pub fn load_dir(dir: &Path) -> Result<TagStore, StoreError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut store = TagStore::new();
        for path in paths {
            store.merge(Self::load_from_ron(&path)?);
        }
        Ok(store)
    }
}

impl From<TagCatalog> for TagStore {
    fn from(catalog: TagCatalog) -> Self {
        let mut store = TagStore::new();
        store.extend(catalog.tags);
        store
    }
}
