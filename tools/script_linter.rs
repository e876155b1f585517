/// Script Linter: runs the continuity validator and the format enforcer
/// over archived episode scripts.
///
/// Usage: script_linter <file|dir> [--episode N] [--rules <file>]

use screenplay_engine::core::archive::episode_from_filename;
use screenplay_engine::core::enforcer::FormatEnforcer;
use screenplay_engine::core::rules::RuleTables;
use screenplay_engine::core::validator::ConsistencyValidator;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: script_linter <file|dir> [--episode N] [--rules <file>]");
        process::exit(0);
    }

    let target = Path::new(&args[1]);
    let mut episode_override = None;
    let mut rules_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--episode" if i + 1 < args.len() => {
                i += 1;
                match args[i].parse::<u32>() {
                    Ok(n) if n > 0 => episode_override = Some(n),
                    _ => {
                        eprintln!("ERROR: invalid episode number '{}'", args[i]);
                        process::exit(2);
                    }
                }
            }
            "--rules" if i + 1 < args.len() => {
                i += 1;
                rules_path = Some(PathBuf::from(&args[i]));
            }
            other => {
                eprintln!("WARNING: ignoring argument '{}'", other);
            }
        }
        i += 1;
    }

    let rules = match rules_path {
        Some(path) => match RuleTables::load_from_ron(&path) {
            Ok(rules) => rules,
            Err(e) => {
                eprintln!("ERROR: Failed to load rules file: {}", e);
                process::exit(2);
            }
        },
        None => RuleTables::default(),
    };

    let files = if target.is_file() {
        vec![target.to_path_buf()]
    } else if target.is_dir() {
        let mut files = Vec::new();
        collect_scripts(target, &mut files);
        files.sort();
        files
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target.display());
        process::exit(2);
    };

    let validator = ConsistencyValidator::new(Arc::new(rules));
    let enforcer = FormatEnforcer::default();

    let mut total_issues = 0;
    let mut total_warnings = 0;
    let mut checked = 0;

    println!("\n=== Script Lint Report ===");

    for path in &files {
        let Some(episode) = episode_override.or_else(|| episode_from_filename(path)) else {
            println!("\nSKIP: {} (no episode number in file name)", path.display());
            continue;
        };
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                println!("\nERROR: {}: {}", path.display(), e);
                total_issues += 1;
                continue;
            }
        };
        checked += 1;

        let validation = validator.validate(episode, &content);
        let style = enforcer.check_script(&content, Some(episode));

        println!("\n--- 第{}集 ({}) ---", episode, path.display());
        if validation.is_valid() && validation.warnings.is_empty() && style.is_clean() {
            println!("All checks passed!");
        }
        for issue in validation.issues.iter().chain(&style.all_issues) {
            println!("ERROR: {}", issue);
        }
        for warning in &validation.warnings {
            println!("WARNING: {}", warning);
        }

        total_issues += validation.issues.len() + style.all_issues.len();
        total_warnings += validation.warnings.len();
    }

    println!(
        "\nSummary: {} scripts, {} errors, {} warnings",
        checked, total_issues, total_warnings
    );

    if total_issues == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn collect_scripts(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_scripts(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("md") {
                files.push(path);
            }
        }
    }
}
