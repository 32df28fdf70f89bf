/// The engine facade: catalog loading, option queries, random generation
/// and theme scoping over one owned taxonomy.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::generator::{GenerationError, Generator};
use crate::core::names::{MarkovNames, NameGenerator, DEFAULT_NAMES};
use crate::core::options::{self, Context};
use crate::core::resolver::{ResolvedTag, TaxonomyError, TaxonomyResolver};
use crate::core::store::{StoreError, TagStore};
use crate::core::theme::{ThemeScope, DEFAULT_THEME_ROOT};
use crate::schema::tag::Tag;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),
    #[error("catalog error: {0}")]
    Store(#[from] StoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("no tags loaded")]
    NoTagsLoaded,
}

/// One content catalog compiled into a queryable taxonomy.
///
/// Not reentrant: share it across threads behind a single lock.
pub struct OracleEngine {
    store: TagStore,
    resolver: TaxonomyResolver,
    scope: ThemeScope,
    names: Box<dyn NameGenerator>,
    seed: u64,
    generation_count: u64,
}

/// Builder for constructing an `OracleEngine`.
pub struct OracleEngineBuilder {
    catalogs: Vec<String>,
    catalog_dir: Option<String>,
    seed: Option<u64>,
    theme_root: String,
    /// Directly provided tags (for testing without files).
    tags: Vec<Tag>,
    name_generator: Option<Box<dyn NameGenerator>>,
}

impl OracleEngine {
    pub fn builder() -> OracleEngineBuilder {
        OracleEngineBuilder {
            catalogs: Vec::new(),
            catalog_dir: None,
            seed: None,
            theme_root: DEFAULT_THEME_ROOT.to_string(),
            tags: Vec::new(),
            name_generator: None,
        }
    }

    /// Add declarations after construction.
    ///
    /// The whole batch is stored before anything is resolved, so tags may
    /// refer to each other in any order. An identifier that is already
    /// resolved keeps its record.
    pub fn add(&mut self, tags: impl IntoIterator<Item = Tag>) -> Result<(), EngineError> {
        let mut batch = Vec::new();
        for tag in tags {
            if self.resolver.is_resolved(&tag.tag) {
                warn!(tag = %tag.tag, "ignoring redefinition of an already resolved tag");
                continue;
            }
            batch.push(tag.tag.clone());
            self.store.insert(tag);
        }
        for id in &batch {
            self.resolver.register(&self.store, id)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ResolvedTag> {
        self.resolver.get(id)
    }

    /// Eligible next picks for `category` given the tags chosen so far.
    pub fn options<S: AsRef<str>>(
        &self,
        category: &str,
        tags: &[S],
    ) -> Result<Vec<&ResolvedTag>, EngineError> {
        self.ensure_loaded()?;
        Ok(options::options(
            &self.resolver,
            &self.scope,
            category,
            &Context::from_tags(tags),
        ))
    }

    /// Generate text for `category`. `Ok(None)` means nothing fits.
    ///
    /// Every call draws from a fresh generator seeded with the engine seed
    /// plus the number of previous calls.
    pub fn random<S: AsRef<str>>(
        &mut self,
        category: &str,
        tags: &[S],
    ) -> Result<Option<String>, EngineError> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.generation_count));
        self.generation_count += 1;
        self.random_with(&mut rng, category, tags)
    }

    /// Generate text for `category` with a caller-supplied random source.
    pub fn random_with<S: AsRef<str>>(
        &self,
        rng: &mut StdRng,
        category: &str,
        tags: &[S],
    ) -> Result<Option<String>, EngineError> {
        self.ensure_loaded()?;
        let generator = Generator::new(&self.resolver, &self.scope, self.names.as_ref());
        Ok(generator.generate(category, Context::from_tags(tags), rng)?)
    }

    /// `count` independent draws; dead ends are left out.
    pub fn random_variants<S: AsRef<str>>(
        &mut self,
        category: &str,
        tags: &[S],
        count: usize,
    ) -> Result<Vec<String>, EngineError> {
        let mut results = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(text) = self.random(category, tags)? {
                results.push(text);
            }
        }
        Ok(results)
    }

    /// Scope generation to `ids` and their ancestors; empty means the theme root.
    pub fn set_filters<S: AsRef<str>>(&mut self, ids: &[S]) {
        self.scope.set(&self.resolver, ids);
    }

    pub fn clear_filters(&mut self) {
        self.scope.clear();
    }

    pub fn scope(&self) -> &ThemeScope {
        &self.scope
    }

    /// The theme root and every tag under it.
    pub fn theme_infos(&self) -> Vec<&ResolvedTag> {
        self.resolver
            .iter()
            .filter(|t| self.scope.is_theme_info(t))
            .collect()
    }

    pub fn non_theme_infos(&self) -> Vec<&ResolvedTag> {
        self.resolver
            .iter()
            .filter(|t| !self.scope.is_theme_info(t))
            .collect()
    }

    /// The active scope when one is set, otherwise every theme identifier.
    pub fn themes(&self) -> Vec<&str> {
        if self.scope.is_active() {
            self.scope.ids()
        } else {
            self.theme_infos().into_iter().map(|t| t.tag.as_str()).collect()
        }
    }

    /// Non-theme identifiers whose theme requirements the scope satisfies.
    pub fn non_theme_tags(&self) -> Vec<&str> {
        self.non_theme_infos()
            .into_iter()
            .filter(|t| {
                t.requires
                    .iter()
                    .filter(|r| self.scope.is_theme(&self.resolver, r))
                    .all(|r| self.scope.contains(r))
            })
            .map(|t| t.tag.as_str())
            .collect()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.resolver.categories()
    }

    /// Raw declarations as loaded.
    pub fn store(&self) -> &TagStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.resolver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolver.is_empty()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.generation_count = 0;
    }

    fn ensure_loaded(&self) -> Result<(), EngineError> {
        if self.resolver.is_empty() {
            return Err(EngineError::NoTagsLoaded);
        }
        Ok(())
    }

    fn register_all(&mut self) -> Result<(), EngineError> {
        for id in self.store.ids() {
            self.resolver.register(&self.store, id)?;
        }
        Ok(())
    }
}

impl OracleEngineBuilder {
    /// Named catalogs, loaded from `catalog_data/<name>.ron`.
    pub fn catalogs(mut self, names: &[&str]) -> Self {
        self.catalogs = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Every `.ron` catalog in a directory; overrides named catalogs.
    pub fn catalog_dir(mut self, path: &str) -> Self {
        self.catalog_dir = Some(path.to_string());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn theme_root(mut self, root: &str) -> Self {
        self.theme_root = root.to_string();
        self
    }

    /// Provide tags directly; they override catalog files.
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn with_name_generator(mut self, names: Box<dyn NameGenerator>) -> Self {
        self.name_generator = Some(names);
        self
    }

    pub fn build(self) -> Result<OracleEngine, EngineError> {
        let mut store = TagStore::new();

        for name in &self.catalogs {
            let path = format!("catalog_data/{}.ron", name);
            if Path::new(&path).exists() {
                store.merge(TagStore::load_from_ron(Path::new(&path))?);
            } else {
                warn!(catalog = %name, "catalog not found, skipping");
            }
        }

        if let Some(ref dir) = self.catalog_dir {
            if Path::new(dir).exists() {
                store.merge(TagStore::load_dir(Path::new(dir))?);
            } else {
                warn!(dir = %dir, "catalog directory not found, skipping");
            }
        }

        store.extend(self.tags);

        let seed = self.seed.unwrap_or_else(rand::random);
        let names = self
            .name_generator
            .unwrap_or_else(|| Box::new(MarkovNames::train(DEFAULT_NAMES, 3)));

        let mut engine = OracleEngine {
            store,
            resolver: TaxonomyResolver::new(),
            scope: ThemeScope::new(self.theme_root),
            names,
            seed,
            generation_count: 0,
        };
        engine.register_all()?;
        debug!(tags = engine.len(), seed, "engine built");
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_test_engine() -> OracleEngine {
        OracleEngine::builder()
            .seed(42)
            .with_tags(vec![
                Tag::new("Pirates").is_a(&["__theme"]),
                Tag::new("Fantaisie").is_a(&["__theme"]),
                Tag::new("sabre").is_a(&["arme", "Pirates"]),
                Tag::new("epee").is_a(&["arme", "Fantaisie"]).value("une épée"),
                Tag::new("gourdin").is_a(&["arme"]),
                Tag::new("q").is_a(&["__query"]).value("#{arme}"),
            ])
            .build()
            .unwrap()
    }

    fn option_ids(engine: &OracleEngine, category: &str) -> Vec<String> {
        engine
            .options::<&str>(category, &[])
            .unwrap()
            .into_iter()
            .map(|t| t.tag.clone())
            .collect()
    }

    #[test]
    fn empty_engine_fails_loudly() {
        let mut engine = OracleEngine::builder().seed(1).build().unwrap();
        assert!(matches!(
            engine.options::<&str>("x", &[]),
            Err(EngineError::NoTagsLoaded)
        ));
        assert!(matches!(
            engine.random::<&str>("x", &[]),
            Err(EngineError::NoTagsLoaded)
        ));
    }

    #[test]
    fn builder_with_seed() {
        let engine = OracleEngine::builder().seed(12345).build().unwrap();
        assert_eq!(engine.seed(), 12345);
    }

    #[test]
    fn random_is_reproducible_for_a_seed() {
        let mut a = build_test_engine();
        let mut b = build_test_engine();
        for _ in 0..5 {
            assert_eq!(
                a.random::<&str>("__query", &[]).unwrap(),
                b.random::<&str>("__query", &[]).unwrap()
            );
        }
    }

    #[test]
    fn filters_narrow_and_clear_restores() {
        let mut engine = build_test_engine();
        assert_eq!(option_ids(&engine, "arme"), vec!["sabre", "epee", "gourdin"]);

        engine.set_filters(&["Pirates"]);
        assert_eq!(option_ids(&engine, "arme"), vec!["sabre", "gourdin"]);

        engine.clear_filters();
        assert_eq!(option_ids(&engine, "arme"), vec!["sabre", "epee", "gourdin"]);
    }

    #[test]
    fn themes_follow_scope() {
        let mut engine = build_test_engine();
        let mut all = engine.themes();
        all.sort_unstable();
        assert_eq!(all, vec!["Fantaisie", "Pirates", "__theme"]);

        engine.set_filters(&["Fantaisie"]);
        assert_eq!(engine.themes(), vec!["Fantaisie", "__theme"]);
    }

    #[test]
    fn add_after_build_extends_graph() {
        let mut engine = build_test_engine();
        engine
            .add(vec![Tag::new("harpon").is_a(&["arme", "Pirates"])])
            .unwrap();
        assert!(option_ids(&engine, "arme").contains(&"harpon".to_string()));
    }

    #[test]
    fn redefinition_keeps_cached_record() {
        let mut engine = build_test_engine();
        engine.add(vec![Tag::new("epee").value("autre")]).unwrap();
        assert_eq!(engine.get("epee").unwrap().value, "une épée");
    }

    #[test]
    fn variants_collect_successful_draws() {
        let mut engine = build_test_engine();
        let variants = engine.random_variants::<&str>("__query", &[], 4).unwrap();
        assert_eq!(variants.len(), 4);
        assert!(engine
            .random_variants::<&str>("rien", &[], 3)
            .unwrap()
            .is_empty());
    }
}
