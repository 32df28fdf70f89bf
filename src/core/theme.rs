/// Theme Scope — narrows generation to the themes of the active game.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::core::resolver::{ResolvedTag, TaxonomyResolver};

/// Identifier every theme descends from, unless configured otherwise.
pub const DEFAULT_THEME_ROOT: &str = "__theme";

/// The active thematic scope.
///
/// A theme is any tag under the root. Content bound to themes (through its
/// own identifier, its ancestors or its requirements) is only offered when
/// one of those themes is in scope. Without a scope every theme is visible.
#[derive(Debug, Clone)]
pub struct ThemeScope {
    root: String,
    filters: FxHashSet<String>,
}

impl Default for ThemeScope {
    fn default() -> Self {
        Self::new(DEFAULT_THEME_ROOT)
    }
}

impl ThemeScope {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            filters: FxHashSet::default(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Replace the scope with `ids` and their ancestor closures.
    /// An empty list scopes to the root itself.
    pub fn set<S: AsRef<str>>(&mut self, resolver: &TaxonomyResolver, ids: &[S]) {
        let mut filters = FxHashSet::default();
        let mut add = |id: &str| {
            filters.insert(id.to_string());
            if let Some(resolved) = resolver.get(id) {
                filters.extend(resolved.ancestors.iter().cloned());
            }
        };

        if ids.is_empty() {
            add(&self.root);
        } else {
            for id in ids {
                add(id.as_ref());
            }
        }

        debug!(filters = filters.len(), "theme scope set");
        self.filters = filters;
    }

    pub fn clear(&mut self) {
        debug!("theme scope cleared");
        self.filters.clear();
    }

    pub fn is_active(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.filters.contains(id)
    }

    /// Scope identifiers, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.filters.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_theme(&self, resolver: &TaxonomyResolver, id: &str) -> bool {
        resolver
            .get(id)
            .is_some_and(|t| t.ancestors.contains(&self.root))
    }

    /// True for the root and every tag under it.
    pub fn is_theme_info(&self, info: &ResolvedTag) -> bool {
        info.tag == self.root || info.ancestors.contains(&self.root)
    }

    /// Whether the scope lets `candidate` through.
    pub fn admits(&self, resolver: &TaxonomyResolver, candidate: &ResolvedTag) -> bool {
        if !self.is_active() {
            return true;
        }

        let mut binding = std::iter::once(candidate.tag.as_str())
            .chain(candidate.ancestors.iter().map(String::as_str))
            .chain(candidate.requires.iter().map(String::as_str))
            .filter(|id| self.is_theme(resolver, id))
            .peekable();

        if binding.peek().is_none() {
            return true;
        }
        binding.any(|id| self.contains(id))
    }
}
