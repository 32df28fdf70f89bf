/// Taxonomy Resolver — compiles raw declarations into memoized records.
///
/// Records live in an arena and are addressed by position; the identifier
/// map and the category index both point into it. A record is computed once
/// per identifier and never recomputed.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{trace, warn};

use crate::core::names::NAME_REFERENCE;
use crate::core::store::TagStore;
use crate::schema::tag::{GroupId, Tag};
use crate::schema::template::{self, ParsedTag, TemplateError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxonomyError {
    #[error("isA cycle: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },
    #[error("malformed template in '{tag}': {source}")]
    Template {
        tag: String,
        #[source]
        source: TemplateError,
    },
}

/// Fully computed view of a tag: ancestor closure, inherited constraints
/// and parsed value.
#[derive(Debug, Clone)]
pub struct ResolvedTag {
    pub tag: String,
    pub value: String,
    pub parsed_value: Vec<ParsedTag>,
    /// `value` split on `/`, each alternative parsed on its own.
    pub alternatives: Vec<Vec<ParsedTag>>,
    pub is_formula: bool,
    pub is_a: Vec<String>,
    pub ancestors: FxHashSet<String>,
    pub requires: FxHashSet<String>,
    pub excludes: FxHashSet<String>,
    pub groups: FxHashSet<GroupId>,
    pub is_instance: bool,
    pub inherited: bool,
}

impl ResolvedTag {
    pub fn is_a_kind_of(&self, category: &str) -> bool {
        self.ancestors.contains(category)
    }
}

#[derive(Debug, Default)]
pub struct TaxonomyResolver {
    records: Vec<ResolvedTag>,
    by_id: FxHashMap<String, usize>,
    by_category: FxHashMap<String, Vec<usize>>,
    /// Category identifiers in first-insertion order.
    categories: Vec<String>,
    /// Identifiers whose `isA` chain is being walked.
    visiting: Vec<String>,
    /// Template references waiting to be registered.
    pending: VecDeque<String>,
}

impl TaxonomyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `id` and everything reachable from it, returning its record.
    pub fn resolve(&mut self, store: &TagStore, id: &str) -> Result<&ResolvedTag, TaxonomyError> {
        let idx = match self.resolve_reachable(store, id) {
            Ok(idx) => idx,
            Err(e) => {
                self.visiting.clear();
                self.pending.clear();
                return Err(e);
            }
        };
        Ok(&self.records[idx])
    }

    /// Make sure `id` is resolved. Idempotent.
    pub fn register(&mut self, store: &TagStore, id: &str) -> Result<(), TaxonomyError> {
        self.resolve(store, id).map(|_| ())
    }

    pub fn get(&self, id: &str) -> Option<&ResolvedTag> {
        self.by_id.get(id).map(|&idx| &self.records[idx])
    }

    pub fn is_resolved(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Every record counting `category` among its ancestors, in insertion order.
    pub fn members(&self, category: &str) -> impl Iterator<Item = &ResolvedTag> {
        self.by_category
            .get(category)
            .into_iter()
            .flatten()
            .map(|&idx| &self.records[idx])
    }

    pub fn has_members(&self, category: &str) -> bool {
        self.by_category
            .get(category)
            .is_some_and(|members| !members.is_empty())
    }

    /// Identifiers that have at least one member, in first-insertion order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    /// All records in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedTag> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn resolve_reachable(&mut self, store: &TagStore, id: &str) -> Result<usize, TaxonomyError> {
        let idx = self.resolve_index(store, id)?;
        while let Some(reference) = self.pending.pop_front() {
            self.resolve_index(store, &reference)?;
        }
        Ok(idx)
    }

    fn resolve_index(&mut self, store: &TagStore, id: &str) -> Result<usize, TaxonomyError> {
        if let Some(&idx) = self.by_id.get(id) {
            return Ok(idx);
        }

        if let Some(pos) = self.visiting.iter().position(|v| v == id) {
            let mut chain = self.visiting[pos..].to_vec();
            chain.push(id.to_string());
            return Err(TaxonomyError::Cycle { chain });
        }

        let raw = store.get(id).cloned().unwrap_or_else(|| Tag::new(id));
        let value = raw.value_or_id().to_string();
        let template_error = |source| TaxonomyError::Template {
            tag: id.to_string(),
            source,
        };
        let parsed_value = template::parse(&value).map_err(template_error)?;
        let alternatives = template::alternatives(&value)
            .into_iter()
            .map(template::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(template_error)?;

        self.visiting.push(id.to_string());
        let ancestors = self.ancestor_closure(store, &raw);
        self.visiting.pop();
        let ancestors = ancestors?;

        let mut requires: FxHashSet<String> = raw.requires.iter().cloned().collect();
        let mut excludes: FxHashSet<String> = raw.excludes.iter().cloned().collect();
        let mut groups: FxHashSet<GroupId> = raw.groups.iter().cloned().collect();
        for ancestor in ancestors.iter().filter_map(|a| self.get(a)) {
            requires.extend(ancestor.requires.iter().cloned());
            excludes.extend(ancestor.excludes.iter().cloned());
            groups.extend(ancestor.groups.iter().cloned());
        }
        excludes.retain(|e| !requires.contains(e));

        let record = ResolvedTag {
            tag: id.to_string(),
            is_formula: template::is_formula(&parsed_value),
            value,
            parsed_value,
            alternatives,
            is_a: raw.is_a,
            ancestors,
            requires,
            excludes,
            groups,
            is_instance: raw.is_instance,
            inherited: raw.inherited,
        };
        trace!(tag = id, ancestors = record.ancestors.len(), "resolved tag");

        let idx = self.records.len();
        for ancestor in &record.ancestors {
            let members = self.by_category.entry(ancestor.clone()).or_insert_with(|| {
                self.categories.push(ancestor.clone());
                Vec::new()
            });
            members.push(idx);
        }
        self.pending.extend(
            template::references(&record.parsed_value)
                .filter(|r| *r != NAME_REFERENCE)
                .map(str::to_string),
        );
        self.by_id.insert(id.to_string(), idx);
        self.records.push(record);

        Ok(idx)
    }

    /// Direct parents plus, for every parent that propagates, its own closure.
    fn ancestor_closure(
        &mut self,
        store: &TagStore,
        raw: &Tag,
    ) -> Result<FxHashSet<String>, TaxonomyError> {
        let mut ancestors = FxHashSet::default();
        for parent in &raw.is_a {
            if *parent == raw.tag {
                warn!(tag = %raw.tag, "ignoring tag declared as its own parent");
                continue;
            }
            let parent_idx = self.resolve_index(store, parent)?;
            let parent_record = &self.records[parent_idx];
            ancestors.insert(parent.clone());
            if parent_record.inherited {
                ancestors.extend(parent_record.ancestors.iter().cloned());
            }
        }
        Ok(ancestors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> FxHashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn resolver_with(tags: Vec<Tag>) -> (TagStore, TaxonomyResolver) {
        let mut store = TagStore::new();
        store.extend(tags);
        let mut resolver = TaxonomyResolver::new();
        let ids: Vec<String> = store.ids().map(str::to_string).collect();
        for id in ids {
            resolver.register(&store, &id).unwrap();
        }
        (store, resolver)
    }

    #[test]
    fn undeclared_tag_resolves_to_defaults() {
        let store = TagStore::new();
        let mut resolver = TaxonomyResolver::new();
        let t = resolver.resolve(&store, "t").unwrap();
        assert_eq!(t.value, "t");
        assert!(t.ancestors.is_empty());
        assert!(t.requires.is_empty());
        assert!(!t.is_formula);
        assert!(!t.is_instance);
        assert!(t.inherited);
    }

    #[test]
    fn ancestors_are_transitive() {
        let (_, resolver) = resolver_with(vec![
            Tag::new("t").is_a(&["u"]),
            Tag::new("u").is_a(&["v"]),
            Tag::new("v"),
        ]);
        assert_eq!(resolver.get("t").unwrap().ancestors, set(&["u", "v"]));
        assert_eq!(resolver.get("u").unwrap().ancestors, set(&["v"]));
    }

    #[test]
    fn non_inherited_parent_stops_propagation() {
        let (_, resolver) = resolver_with(vec![
            Tag::new("t").is_a(&["u"]),
            Tag::new("u").is_a(&["v"]).not_inherited(),
            Tag::new("v"),
        ]);
        assert_eq!(resolver.get("t").unwrap().ancestors, set(&["u"]));
        assert!(resolver.get("t").unwrap().is_a_kind_of("u"));
    }

    #[test]
    fn constraints_merge_from_ancestors() {
        let (_, resolver) = resolver_with(vec![
            Tag::new("sabre").is_a(&["arme"]).requires(&["Pirates"]),
            Tag::new("arme").excludes(&["Pacifique"]).groups(&["equipement"]),
        ]);
        let sabre = resolver.get("sabre").unwrap();
        assert_eq!(sabre.requires, set(&["Pirates"]));
        assert_eq!(sabre.excludes, set(&["Pacifique"]));
        assert!(sabre.groups.contains(&GroupId::new("equipement")));
    }

    #[test]
    fn requires_wins_over_excludes() {
        let (_, resolver) = resolver_with(vec![
            Tag::new("child").is_a(&["parent"]).requires(&["nuit"]),
            Tag::new("parent").excludes(&["nuit", "jour"]),
        ]);
        let child = resolver.get("child").unwrap();
        assert_eq!(child.requires, set(&["nuit"]));
        assert_eq!(child.excludes, set(&["jour"]));
        assert!(child.requires.is_disjoint(&child.excludes));
    }

    #[test]
    fn resolution_is_memoized() {
        let (store, mut resolver) = resolver_with(vec![Tag::new("t").is_a(&["u"])]);
        let before = resolver.len();
        resolver.register(&store, "t").unwrap();
        resolver.register(&store, "u").unwrap();
        assert_eq!(resolver.len(), before);
        assert_eq!(resolver.members("u").count(), 1);
    }

    #[test]
    fn registers_under_every_ancestor_in_order() {
        let (_, resolver) = resolver_with(vec![
            Tag::new("t").is_a(&["u"]),
            Tag::new("u").is_a(&["v"]),
            Tag::new("v"),
            Tag::new("w").is_a(&["u"]),
        ]);
        let under_u: Vec<&str> = resolver.members("u").map(|t| t.tag.as_str()).collect();
        assert_eq!(under_u, vec!["t", "w"]);
        let under_v: FxHashSet<String> = resolver.members("v").map(|t| t.tag.clone()).collect();
        assert_eq!(under_v, set(&["t", "u", "w"]));
        assert!(!resolver.has_members("t"));
    }

    #[test]
    fn template_references_are_registered() {
        let (_, resolver) = resolver_with(vec![
            Tag::new("intrigue").value("#{personnage} cherche #{objet,tresor} de #{__name__}"),
        ]);
        let intrigue = resolver.get("intrigue").unwrap();
        assert!(intrigue.is_formula);
        assert!(resolver.is_resolved("personnage"));
        assert!(resolver.is_resolved("objet"));
        assert!(resolver.is_resolved("tresor"));
        assert!(!resolver.is_resolved(NAME_REFERENCE));
    }

    #[test]
    fn template_reference_back_to_descendant_is_not_a_cycle() {
        let (_, resolver) = resolver_with(vec![
            Tag::new("a").is_a(&["c"]),
            Tag::new("c").value("#{a}"),
        ]);
        assert!(resolver.get("a").unwrap().is_a_kind_of("c"));
    }

    #[test]
    fn alternatives_are_parsed_separately() {
        let (_, resolver) = resolver_with(vec![Tag::new("x").value("un #{A}/deux")]);
        let x = resolver.get("x").unwrap();
        assert_eq!(x.alternatives.len(), 2);
        assert_eq!(x.alternatives[1], vec![ParsedTag::Literal("deux".to_string())]);
    }

    #[test]
    fn cycle_is_a_structural_error() {
        let mut store = TagStore::new();
        store.extend(vec![
            Tag::new("a").is_a(&["b"]),
            Tag::new("b").is_a(&["c"]),
            Tag::new("c").is_a(&["a"]),
        ]);
        let mut resolver = TaxonomyResolver::new();
        let err = resolver.resolve(&store, "a").unwrap_err();
        assert_eq!(
            err,
            TaxonomyError::Cycle {
                chain: vec!["a".into(), "b".into(), "c".into(), "a".into()]
            }
        );
        assert!(!resolver.is_resolved("a"));
    }

    #[test]
    fn self_parent_is_ignored() {
        let (_, resolver) = resolver_with(vec![Tag::new("t").is_a(&["t"])]);
        let t = resolver.get("t").unwrap();
        assert!(t.ancestors.is_empty());
        assert!(!resolver.has_members("t"));
    }

    #[test]
    fn malformed_template_names_the_tag() {
        let mut store = TagStore::new();
        store.insert(Tag::new("bad").value("#{oops"));
        let mut resolver = TaxonomyResolver::new();
        let err = resolver.resolve(&store, "bad").unwrap_err();
        assert!(matches!(err, TaxonomyError::Template { ref tag, .. } if tag == "bad"));
        assert!(err.to_string().contains("bad"));
    }
}
