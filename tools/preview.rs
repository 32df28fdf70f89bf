/// Preview — interactive generation shell for trying out tag catalogs.
///
/// Usage: preview --catalog <path> [--seed <n>]
///
/// Commands:
///   random <category> [tags..]  — generate text for a category
///   options <category> [tags..] — list eligible picks
///   theme <ids..>               — scope generation to themes
///   clear                       — remove the theme scope
///   seed <n>                    — set RNG seed
///   bulk <category> <n>         — generate n texts with variety stats
///   help                        — list commands
///   quit                        — exit

use gm_oracle::core::engine::OracleEngine;
use gm_oracle::core::store::TagStore;
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut catalog_path = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(catalog_path) = catalog_path else {
        print_usage();
        std::process::exit(1);
    };

    let mut engine = match build_engine(Path::new(&catalog_path), seed) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!("Loaded {} tags", engine.len());
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "random" | "r" => {
                if parts.len() < 2 {
                    println!("Usage: random <category> [tags..]");
                    continue;
                }
                match engine.random(parts[1], &parts[2..]) {
                    Ok(Some(text)) => println!("{}", text),
                    Ok(None) => println!("(nothing fits)"),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "options" | "o" => {
                if parts.len() < 2 {
                    println!("Usage: options <category> [tags..]");
                    continue;
                }
                match engine.options(parts[1], &parts[2..]) {
                    Ok(options) if options.is_empty() => println!("(no options)"),
                    Ok(options) => {
                        for info in options {
                            println!("  {:<24} {}", info.tag, info.value);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "theme" => {
                engine.set_filters(&parts[1..]);
                println!("Scope: {}", engine.themes().join(", "));
            }
            "themes" => {
                println!("Themes: {}", engine.themes().join(", "));
            }
            "clear" => {
                engine.clear_filters();
                println!("Scope cleared.");
            }
            "seed" => {
                if parts.len() < 2 {
                    println!("Current seed: {}", engine.seed());
                    continue;
                }
                match parts[1].parse::<u64>() {
                    Ok(s) => {
                        engine.set_seed(s);
                        println!("Seed set to {}", s);
                    }
                    Err(_) => println!("Invalid seed: {}", parts[1]),
                }
            }
            "bulk" => {
                if parts.len() < 3 {
                    println!("Usage: bulk <category> <n>");
                    continue;
                }
                let count: usize = match parts[2].parse() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        println!("Invalid count: {}", parts[2]);
                        continue;
                    }
                };

                let texts = match engine.random_variants::<&str>(parts[1], &[], count) {
                    Ok(texts) => texts,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };

                for (n, text) in texts.iter().enumerate() {
                    println!("{:>4}. {}", n + 1, text);
                }

                let unique: HashSet<&String> = texts.iter().collect();
                println!("\n--- Variety ---");
                println!("  generated: {}/{}", texts.len(), count);
                println!("  dead ends: {}", count - texts.len());
                println!("  unique:    {}", unique.len());
                if !texts.is_empty() {
                    println!(
                        "  ratio:     {:.2}",
                        unique.len() as f64 / texts.len() as f64
                    );
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn build_engine(path: &Path, seed: u64) -> Result<OracleEngine, String> {
    let builder = OracleEngine::builder().seed(seed);
    let builder = if path.is_dir() {
        builder.catalog_dir(&path.to_string_lossy())
    } else if path.extension().and_then(|s| s.to_str()) == Some("json") {
        let input = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let store = TagStore::parse_json(&input).map_err(|e| e.to_string())?;
        builder.with_tags(store.iter().cloned().collect())
    } else {
        let store = TagStore::load_from_ron(path).map_err(|e| e.to_string())?;
        builder.with_tags(store.iter().cloned().collect())
    };
    builder.build().map_err(|e| e.to_string())
}

fn print_usage() {
    println!("Usage: preview --catalog <path> [--seed <n>]");
    println!();
    println!("  --catalog <path>  Catalog file (.ron or .json) or directory of .ron files");
    println!("  --seed <n>        RNG seed (default 42)");
}

fn print_help() {
    println!("Commands:");
    println!("  random <category> [tags..]   Generate text (tags seed the context)");
    println!("  options <category> [tags..]  List eligible picks");
    println!("  theme <ids..>                Scope to themes (no ids: every theme)");
    println!("  themes                       Show the visible themes");
    println!("  clear                        Remove the theme scope");
    println!("  seed <n>                     Set RNG seed");
    println!("  bulk <category> <n>          Generate n texts with variety statistics");
    println!("  help                         Show this help");
    println!("  quit                         Exit");
}
