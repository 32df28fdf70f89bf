/// Procedural Generator — turns a category into text by recursive expansion.
///
/// One pick per reference slot; every pick extends the context handed to the
/// slots after it, which is what keeps a single generation consistent.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::trace;

use crate::core::grammar;
use crate::core::names::{NameGenerator, NAME_REFERENCE};
use crate::core::options::{self, Context};
use crate::core::resolver::TaxonomyResolver;
use crate::core::theme::ThemeScope;
use crate::schema::template::ParsedTag;

/// Nesting limit for reference expansion; deeper means a reference cycle.
pub const MAX_EXPANSION_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("expansion of '{category}' nested deeper than {depth} references")]
    TooDeep { category: String, depth: usize },
}

/// Text produced for one category together with the context it left behind.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub text: String,
    pub context: Context,
}

pub struct Generator<'a> {
    resolver: &'a TaxonomyResolver,
    scope: &'a ThemeScope,
    names: &'a dyn NameGenerator,
}

impl<'a> Generator<'a> {
    pub fn new(
        resolver: &'a TaxonomyResolver,
        scope: &'a ThemeScope,
        names: &'a dyn NameGenerator,
    ) -> Self {
        Self {
            resolver,
            scope,
            names,
        }
    }

    /// Generate normalized text for `category`.
    ///
    /// `Ok(None)` means no content is available: some slot on the way had
    /// no eligible option, or the result came out empty.
    pub fn generate(
        &self,
        category: &str,
        ctx: Context,
        rng: &mut StdRng,
    ) -> Result<Option<String>, GenerationError> {
        let Some(expansion) = self.expand(category, ctx, rng, 0)? else {
            return Ok(None);
        };
        let text = grammar::normalize(&expansion.text);
        Ok((!text.is_empty()).then_some(text))
    }

    /// Expand `category` without normalizing, returning the extended context.
    pub fn expand(
        &self,
        category: &str,
        mut ctx: Context,
        rng: &mut StdRng,
        depth: usize,
    ) -> Result<Option<Expansion>, GenerationError> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(GenerationError::TooDeep {
                category: category.to_string(),
                depth: MAX_EXPANSION_DEPTH,
            });
        }

        let candidates = options::options(self.resolver, self.scope, category, &ctx);
        let Some(picked) = candidates.choose(rng) else {
            trace!(category, "dead end");
            return Ok(None);
        };
        trace!(category, picked = %picked.tag, candidates = candidates.len(), "picked");
        ctx.record(picked);

        let blocks = if picked.alternatives.len() > 1 {
            picked.alternatives.choose(rng)
        } else {
            picked.alternatives.first()
        };

        let mut text = String::new();
        for block in blocks.into_iter().flatten() {
            match block {
                ParsedTag::Literal(literal) => text.push_str(literal),
                ParsedTag::Reference(required) => {
                    let Some(filled) = self.fill(required, &ctx, rng, depth)? else {
                        return Ok(None);
                    };
                    text.push_str(&filled.text);
                    ctx = filled.context;
                }
            }
        }

        Ok(Some(Expansion { text, context: ctx }))
    }

    /// Fill one reference slot from the first category that yields something.
    fn fill(
        &self,
        required: &[String],
        ctx: &Context,
        rng: &mut StdRng,
        depth: usize,
    ) -> Result<Option<Expansion>, GenerationError> {
        for category in required {
            if category == NAME_REFERENCE {
                if let Some(name) = self.names.generate(rng) {
                    return Ok(Some(Expansion {
                        text: name,
                        context: ctx.clone(),
                    }));
                }
                continue;
            }
            if let Some(expansion) = self.expand(category, ctx.clone(), rng, depth + 1)? {
                return Ok(Some(expansion));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::TagStore;
    use crate::schema::tag::Tag;
    use rand::SeedableRng;

    struct FixedName(&'static str);

    impl NameGenerator for FixedName {
        fn generate(&self, _rng: &mut StdRng) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn build(tags: Vec<Tag>) -> TaxonomyResolver {
        let mut store = TagStore::new();
        store.extend(tags);
        let mut resolver = TaxonomyResolver::new();
        let ids: Vec<String> = store.ids().map(str::to_string).collect();
        for id in ids {
            resolver.register(&store, &id).unwrap();
        }
        resolver
    }

    fn generate(resolver: &TaxonomyResolver, category: &str, seed: u64) -> Option<String> {
        let scope = ThemeScope::default();
        let names = FixedName("Ysolde");
        Generator::new(resolver, &scope, &names)
            .generate(category, Context::new(), &mut StdRng::seed_from_u64(seed))
            .unwrap()
    }

    #[test]
    fn concatenates_single_options() {
        let resolver = build(vec![
            Tag::new("t").is_a(&["__query"]).value("#{A}#{B}"),
            Tag::new("a").is_a(&["A"]),
            Tag::new("b").is_a(&["B"]),
        ]);
        for seed in 0..10 {
            assert_eq!(generate(&resolver, "__query", seed).as_deref(), Some("ab"));
        }
    }

    #[test]
    fn dead_end_propagates_as_none() {
        let resolver = build(vec![
            Tag::new("t").is_a(&["__query"]).value("#{A} et #{vide}"),
            Tag::new("a").is_a(&["A"]),
        ]);
        assert_eq!(generate(&resolver, "__query", 0), None);
        assert_eq!(generate(&resolver, "inconnu", 0), None);
    }

    #[test]
    fn multi_reference_falls_back_in_order() {
        let resolver = build(vec![
            Tag::new("t").is_a(&["__query"]).value("#{vide,B}"),
            Tag::new("b").is_a(&["B"]),
        ]);
        assert_eq!(generate(&resolver, "__query", 3).as_deref(), Some("b"));
    }

    #[test]
    fn name_reference_uses_name_generator() {
        let resolver = build(vec![Tag::new("t").is_a(&["pnj"]).value("#{__name__} le forgeron")]);
        assert_eq!(
            generate(&resolver, "pnj", 0).as_deref(),
            Some("Ysolde le forgeron")
        );
    }

    #[test]
    fn slash_alternatives_pick_one() {
        let resolver = build(vec![Tag::new("t").is_a(&["couleur"]).value("rouge/vert/bleu")]);
        let mut seen = std::collections::BTreeSet::new();
        for seed in 0..64 {
            seen.insert(generate(&resolver, "couleur", seed).unwrap());
        }
        assert_eq!(
            seen.into_iter().collect::<Vec<_>>(),
            vec!["bleu", "rouge", "vert"]
        );
    }

    #[test]
    fn output_is_normalized() {
        let resolver = build(vec![
            Tag::new("t").is_a(&["lieu"]).value("le repaire de #{chef}"),
            Tag::new("capitaine").is_a(&["chef"]).value("le capitaine"),
        ]);
        assert_eq!(
            generate(&resolver, "lieu", 0).as_deref(),
            Some("le repaire du capitaine")
        );
    }

    #[test]
    fn picks_extend_context_for_later_slots() {
        let resolver = build(vec![
            Tag::new("t").is_a(&["__query"]).value("#{A} #{B}"),
            Tag::new("jour").is_a(&["A"]),
            Tag::new("soleil").is_a(&["B"]).requires(&["jour"]),
            Tag::new("lune").is_a(&["B"]).excludes(&["jour"]),
        ]);
        for seed in 0..20 {
            assert_eq!(generate(&resolver, "__query", seed).as_deref(), Some("jour soleil"));
        }
    }

    #[test]
    fn reference_cycle_is_reported() {
        let resolver = build(vec![Tag::new("boucle").is_a(&["X"]).value("encore #{X}")]);
        let scope = ThemeScope::default();
        let names = FixedName("x");
        let err = Generator::new(&resolver, &scope, &names)
            .generate("X", Context::new(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, GenerationError::TooDeep { .. }));
    }
}
