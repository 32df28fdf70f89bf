//! WASM bindings for gm-oracle — the generation panel of the web app.

use wasm_bindgen::prelude::*;

use gm_oracle::core::engine::OracleEngine;
use gm_oracle::core::grammar;
use gm_oracle::core::store::TagStore;

// ---------------------------------------------------------------------------
// Bundled catalogs — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const BASE: &str = include_str!("../../catalog_data/base.ron");
    pub const PIRATES: &str = include_str!("../../catalog_data/pirates.ron");
    pub const HORREUR: &str = include_str!("../../catalog_data/horreur.ron");
}

// ---------------------------------------------------------------------------
// JSON helpers for the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct OptionInfo<'a> {
    tag: &'a str,
    value: &'a str,
    #[serde(rename = "isInstance")]
    is_instance: bool,
}

/// A JSON array of tag ids; an empty string means no tags.
fn parse_ids(json: &str) -> Result<Vec<String>, JsError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json).map_err(|e| JsError::new(&format!("Invalid tag list: {e}")))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn bundled_store() -> Result<TagStore, JsError> {
    let mut store = TagStore::new();
    for src in [data::BASE, data::PIRATES, data::HORREUR] {
        let catalog = TagStore::parse_ron(src)
            .map_err(|e| JsError::new(&format!("Bundled catalog error: {e}")))?;
        store.merge(catalog);
    }
    Ok(store)
}

#[wasm_bindgen]
pub struct GmOracle {
    engine: OracleEngine,
}

#[wasm_bindgen]
impl GmOracle {
    /// Build an engine from a JSON catalog (`{"tags": [...]}`).
    /// An empty string loads the bundled catalogs.
    #[wasm_bindgen(constructor)]
    pub fn new(catalog_json: &str, seed: u64) -> Result<GmOracle, JsError> {
        let store = if catalog_json.trim().is_empty() {
            bundled_store()?
        } else {
            TagStore::parse_json(catalog_json)
                .map_err(|e| JsError::new(&format!("Catalog parse error: {e}")))?
        };

        let engine = OracleEngine::builder()
            .seed(seed)
            .with_tags(store.iter().cloned().collect())
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;

        Ok(GmOracle { engine })
    }

    /// Add user-defined tags, given as a JSON catalog.
    pub fn add(&mut self, tags_json: &str) -> Result<(), JsError> {
        let store = TagStore::parse_json(tags_json)
            .map_err(|e| JsError::new(&format!("Catalog parse error: {e}")))?;
        self.engine
            .add(store.iter().cloned())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Eligible picks for `category` as a JSON array of `{tag, value, isInstance}`.
    pub fn options(&self, category: &str, context_json: &str) -> Result<String, JsError> {
        let tags = parse_ids(context_json)?;
        let options = self
            .engine
            .options(category, &tags)
            .map_err(|e| JsError::new(&e.to_string()))?;
        let infos: Vec<OptionInfo> = options
            .iter()
            .map(|t| OptionInfo {
                tag: &t.tag,
                value: &t.value,
                is_instance: t.is_instance,
            })
            .collect();
        to_json(&infos)
    }

    /// Generated text, or `undefined` when nothing fits.
    pub fn random(&mut self, category: &str, context_json: &str) -> Result<Option<String>, JsError> {
        let tags = parse_ids(context_json)?;
        self.engine
            .random(category, &tags)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Several draws as a JSON array of strings; dead ends are left out.
    #[wasm_bindgen(js_name = randomVariants)]
    pub fn random_variants(
        &mut self,
        category: &str,
        context_json: &str,
        count: usize,
    ) -> Result<String, JsError> {
        let tags = parse_ids(context_json)?;
        let texts = self
            .engine
            .random_variants(category, &tags, count)
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_json(&texts)
    }

    /// Scope generation to the themes in a JSON array. `[]` scopes to the
    /// theme root alone, hiding every theme-bound tag; `clearFilters` lifts
    /// the scope.
    #[wasm_bindgen(js_name = setFilters)]
    pub fn set_filters(&mut self, ids_json: &str) -> Result<(), JsError> {
        let ids = parse_ids(ids_json)?;
        self.engine.set_filters(&ids);
        Ok(())
    }

    #[wasm_bindgen(js_name = clearFilters)]
    pub fn clear_filters(&mut self) {
        self.engine.clear_filters();
    }

    /// Visible themes as a JSON array.
    pub fn themes(&self) -> Result<String, JsError> {
        to_json(&self.engine.themes())
    }

    /// Non-theme tags visible under the current scope, as a JSON array.
    #[wasm_bindgen(js_name = nonThemeTags)]
    pub fn non_theme_tags(&self) -> Result<String, JsError> {
        to_json(&self.engine.non_theme_tags())
    }

    pub fn reseed(&mut self, seed: u64) {
        self.engine.set_seed(seed);
    }

    /// Apply the grammar normalizer to arbitrary text.
    pub fn normalize(text: &str) -> String {
        grammar::normalize(text)
    }
}
