/// Taxonomy Linter — checks a tag catalog for structural errors and dead ends.
///
/// Usage: taxonomy_linter <catalog_path> [--theme-root <id>] [--theme <id>]

use gm_oracle::core::engine::OracleEngine;
use gm_oracle::core::names::NAME_REFERENCE;
use gm_oracle::core::resolver::ResolvedTag;
use gm_oracle::core::store::TagStore;
use gm_oracle::core::theme::DEFAULT_THEME_ROOT;
use gm_oracle::schema::template;
use std::collections::BTreeSet;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: taxonomy_linter <catalog_path> [--theme-root <id>] [--theme <id>]");
        process::exit(0);
    }

    let catalog_path = &args[1];
    let mut theme_root = DEFAULT_THEME_ROOT.to_string();
    let mut themes: Vec<String> = Vec::new();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--theme-root" if i + 1 < args.len() => {
                i += 1;
                theme_root = args[i].clone();
            }
            "--theme" if i + 1 < args.len() => {
                i += 1;
                themes.push(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let store = match load_store(Path::new(catalog_path)) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };
    println!("Loaded {} tag declarations", store.len());

    let mut engine = match OracleEngine::builder()
        .seed(0)
        .theme_root(&theme_root)
        .with_tags(store.iter().cloned().collect())
        .build()
    {
        Ok(engine) => engine,
        Err(e) => {
            // Cycles and malformed templates abort resolution.
            println!("\n=== Taxonomy Lint Report ===\n");
            println!("ERROR: {}", e);
            println!("\nSummary: 1 errors, 0 warnings");
            process::exit(1);
        }
    };

    if !themes.is_empty() {
        engine.set_filters(&themes);
        println!("Theme scope: {}", engine.themes().join(", "));
    }

    let warnings = lint(&engine, &store);

    println!("\n=== Taxonomy Lint Report ===\n");

    if warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    println!("\nSummary: 0 errors, {} warnings", warnings.len());
}

fn load_store(path: &Path) -> Result<TagStore, String> {
    if path.is_dir() {
        return TagStore::load_dir(path).map_err(|e| e.to_string());
    }
    if !path.is_file() {
        return Err(format!("Path '{}' does not exist", path.display()));
    }
    if path.extension().and_then(|s| s.to_str()) == Some("json") {
        let input = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        TagStore::parse_json(&input).map_err(|e| e.to_string())
    } else {
        TagStore::load_from_ron(path).map_err(|e| e.to_string())
    }
}

fn lint(engine: &OracleEngine, store: &TagStore) -> Vec<String> {
    let mut warnings = Vec::new();
    let categories: BTreeSet<&str> = engine.categories().collect();

    let mut infos: Vec<&ResolvedTag> = engine.theme_infos();
    infos.extend(engine.non_theme_infos());

    let mut referenced: BTreeSet<&str> = BTreeSet::new();
    for info in &infos {
        for blocks in &info.alternatives {
            if blocks.is_empty() && info.alternatives.len() > 1 {
                warnings.push(format!("Tag '{}' has an empty slash alternative", info.tag));
            }
            referenced.extend(template::references(blocks));
        }
    }
    referenced.remove(NAME_REFERENCE);

    for category in &referenced {
        if !categories.contains(category) {
            let hint = if store.contains(category) {
                "is declared but has no members"
            } else {
                "is never declared"
            };
            warnings.push(format!("Referenced category '{}' {}", category, hint));
            continue;
        }
        match engine.options::<&str>(category, &[]) {
            Ok(options) if options.is_empty() => {
                warnings.push(format!(
                    "Category '{}' has no eligible option (dead end)",
                    category
                ));
            }
            Ok(_) => {}
            Err(e) => warnings.push(format!("Category '{}': {}", category, e)),
        }
    }

    for id in store.ids() {
        let Some(tag) = store.get(id) else { continue };
        for required in &tag.requires {
            if !store.contains(required) && !categories.contains(required.as_str()) {
                warnings.push(format!(
                    "Tag '{}' requires '{}' which is never declared",
                    id, required
                ));
            }
        }
    }

    warnings
}
