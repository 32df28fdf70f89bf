/// Option Filter — which resolved tags may be picked next for a category.

use rustc_hash::FxHashSet;

use crate::core::resolver::{ResolvedTag, TaxonomyResolver};
use crate::core::theme::ThemeScope;
use crate::schema::tag::GroupId;

/// Tags and exclusivity groups already chosen during one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub tags: FxHashSet<String>,
    pub groups: FxHashSet<GroupId>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.as_ref().to_string()).collect(),
            groups: FxHashSet::default(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn has_group(&self, group: &GroupId) -> bool {
        self.groups.contains(group)
    }

    /// Record a pick: its identifier, its whole ancestor closure and its groups.
    pub fn record(&mut self, picked: &ResolvedTag) {
        self.tags.insert(picked.tag.clone());
        self.tags.extend(picked.ancestors.iter().cloned());
        self.groups.extend(picked.groups.iter().cloned());
    }
}

/// Candidates registered under `category` that are eligible given `ctx`
/// and the active theme scope, in index insertion order.
///
/// An empty result is the normal dead-end signal, not an error.
pub fn options<'r>(
    resolver: &'r TaxonomyResolver,
    scope: &ThemeScope,
    category: &str,
    ctx: &Context,
) -> Vec<&'r ResolvedTag> {
    resolver
        .members(category)
        .filter(|candidate| candidate.tag != category)
        .filter(|candidate| is_eligible(resolver, scope, candidate, ctx))
        .collect()
}

fn is_eligible(
    resolver: &TaxonomyResolver,
    scope: &ThemeScope,
    candidate: &ResolvedTag,
    ctx: &Context,
) -> bool {
    // A pure category label is never content.
    if !candidate.is_formula && resolver.has_members(&candidate.tag) {
        return false;
    }

    let present = |tag: &str| ctx.has_tag(tag) || scope.contains(tag);

    if !candidate.requires.iter().all(|r| present(r)) {
        return false;
    }

    if candidate.excludes.iter().any(|e| present(e)) {
        return false;
    }

    if candidate.groups.iter().any(|g| ctx.has_group(g)) {
        return false;
    }

    scope.admits(resolver, candidate)
}
