/// Preview: interactive shell for assembling and checking episodes.
///
/// Usage: preview [--config <file>] --story <path> [--rules <path>] [--state <path>] [--output <dir>]
///
/// Flags override the values read from `--config`.
///
/// Commands:
///   episode <n> [save]           generate an episode, optionally archive it
///   validate <n> [file]          re-check an archived script or a file
///   stage <character> <n>        character stage, identity and appearance
///   unlock <kind> <name> <n>     is an ability/force/item unlocked at n
///   plot <n>                     plot stage containing episode n
///   batch <start> <end> [save]   generate a range in the background
///   save                         write the ledger
///   help                         list commands
///   quit                         exit

use screenplay_engine::core::batch::{BatchRequest, BatchRunner, ProgressEvent};
use screenplay_engine::core::config::EngineConfig;
use screenplay_engine::core::pipeline::ScriptEngine;
use screenplay_engine::core::rules::UnlockKind;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut config = match args.iter().position(|a| a == "--config") {
        Some(pos) if pos + 1 < args.len() => match EngineConfig::load_from_ron(Path::new(&args[pos + 1])) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config file: {}", e);
                std::process::exit(1);
            }
        },
        _ => EngineConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
            }
            "--story" if i + 1 < args.len() => {
                i += 1;
                config.story_file = Some(PathBuf::from(&args[i]));
            }
            "--rules" if i + 1 < args.len() => {
                i += 1;
                config.rules_file = Some(PathBuf::from(&args[i]));
            }
            "--state" if i + 1 < args.len() => {
                i += 1;
                config.state_file = PathBuf::from(&args[i]);
            }
            "--output" if i + 1 < args.len() => {
                i += 1;
                config.output_dir = PathBuf::from(&args[i]);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if config.story_file.is_none() {
        eprintln!("ERROR: --story is required unless the config file names one");
        print_usage();
        std::process::exit(1);
    }

    let engine = match ScriptEngine::builder().config(config).build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: Failed to build engine: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("ERROR: Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    println!("Loaded {} outlines", engine.story().outlines.len());
    println!("Ledger at episode {}", engine.tracker().ledger().current_episode);
    println!("Type 'help' for commands.\n");

    let engine = Arc::new(Mutex::new(engine));
    let runner = BatchRunner::from_shared(Arc::clone(&engine));

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
            "episode" => {
                let Some(episode) = parts.get(1).and_then(|s| parse_episode(s)) else {
                    println!("Usage: episode <n> [save]");
                    continue;
                };
                let archive = parts.get(2) == Some(&"save");
                let mut engine = engine.blocking_lock();
                let generated = match engine.generate(episode) {
                    Ok(generated) => generated,
                    Err(e) => {
                        println!("ERROR: {}", e);
                        continue;
                    }
                };

                println!("\n--- Generated Script ---");
                println!("{}", generated.text);
                println!("--- End ---\n");
                println!("Characters: {}", generated.characters.join("、"));
                println!("Scenes: {}", generated.scenes.join("；"));
                if let Some(ref validation) = generated.validation {
                    print_findings("Consistency", &validation.issues, &validation.warnings);
                }
                if let Some(ref style) = generated.style {
                    print_findings("Style", &style.all_issues, &[]);
                }

                engine.record(&generated);
                if archive {
                    match engine.archive_episode(&generated) {
                        Ok(path) => println!("Archived to {}", path.display()),
                        Err(e) => println!("ERROR: {}", e),
                    }
                }
            }
            "validate" => {
                let Some(episode) = parts.get(1).and_then(|s| parse_episode(s)) else {
                    println!("Usage: validate <n> [file]");
                    continue;
                };
                let engine = engine.blocking_lock();
                let result = match parts.get(2) {
                    Some(path) => match std::fs::read_to_string(path) {
                        Ok(content) => {
                            let style = engine.check_style(&content, Some(episode));
                            print_findings("Style", &style.all_issues, &[]);
                            engine.validate(episode, &content)
                        }
                        Err(e) => {
                            println!("ERROR: {}: {}", path, e);
                            continue;
                        }
                    },
                    None => engine.validate_archived(episode),
                };
                print_findings("Consistency", &result.issues, &result.warnings);
            }
            "stage" => {
                if parts.len() < 3 {
                    println!("Usage: stage <character> <n>");
                    continue;
                }
                let Some(episode) = parse_episode(parts[2]) else {
                    println!("Invalid episode: {}", parts[2]);
                    continue;
                };
                let name = parts[1];
                let engine = engine.blocking_lock();
                let tracker = engine.tracker();
                println!("{} @ 第{}集", name, episode);
                println!("  stage:      {}", tracker.stage_for(name, episode).label());
                println!("  identity:   {}", or_dash(tracker.identity_for(name, episode)));
                println!("  appearance: {}", or_dash(tracker.appearance_for(name, episode)));
            }
            "unlock" => {
                if parts.len() < 4 {
                    println!("Usage: unlock <ability|force|item> <name> <n>");
                    continue;
                }
                let Some(kind) = UnlockKind::parse(parts[1]) else {
                    println!("Unknown kind: {}", parts[1]);
                    continue;
                };
                let Some(episode) = parse_episode(parts[3]) else {
                    println!("Invalid episode: {}", parts[3]);
                    continue;
                };
                let engine = engine.blocking_lock();
                let name = parts[2];
                let unlock = engine.rules().table(kind).unlock_episode(name);
                let verdict = if engine.tracker().is_unlocked(kind, name, episode) {
                    "unlocked"
                } else {
                    "LOCKED"
                };
                println!("{}【{}】 unlocks at 第{}集: {} at 第{}集", kind.label(), name, unlock, verdict, episode);
            }
            "plot" => {
                let Some(episode) = parts.get(1).and_then(|s| parse_episode(s)) else {
                    println!("Usage: plot <n>");
                    continue;
                };
                let engine = engine.blocking_lock();
                match engine.plot_stage(episode) {
                    Some(stage) => println!(
                        "第{}阶段·{} ({}-{}): {}",
                        stage.stage, stage.name, stage.range.0, stage.range.1, stage.description
                    ),
                    None => println!("No plot stage contains episode {}", episode),
                }
            }
            "batch" => {
                if parts.len() < 3 {
                    println!("Usage: batch <start> <end> [save]");
                    continue;
                }
                let (Some(start), Some(end)) = (parse_episode(parts[1]), parse_episode(parts[2])) else {
                    println!("Invalid range: {} {}", parts[1], parts[2]);
                    continue;
                };
                let mut request = BatchRequest::new(start, end);
                if parts.get(3) == Some(&"save") {
                    request = request.archived();
                }
                runtime.block_on(run_batch(&runner, request));
            }
            "save" => match engine.blocking_lock().save() {
                Ok(()) => println!("Ledger saved."),
                Err(e) => println!("ERROR: {}", e),
            },
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

async fn run_batch(runner: &BatchRunner, request: BatchRequest) {
    let mut handle = match runner.start(request).await {
        Ok(handle) => handle,
        Err(e) => {
            println!("ERROR: {}", e);
            return;
        }
    };
    println!("Started {}", handle.batch_id);

    while let Some(event) = handle.subscription.receiver.recv().await {
        let status = event.status();
        match &event {
            ProgressEvent::Progress(_) => {
                let outcome = status.episodes.last().map(|r| {
                    if let Some(ref e) = r.error {
                        format!("failed: {}", e)
                    } else {
                        let valid = r.is_valid.map_or("unchecked".to_string(), |v| v.to_string());
                        format!("{} chars, valid={}", r.word_count.unwrap_or_default(), valid)
                    }
                });
                println!(
                    "  [{:5.1}%] 第{}集 {}",
                    status.progress,
                    status.current_episode,
                    outcome.unwrap_or_default()
                );
            }
            ProgressEvent::Completed(_) | ProgressEvent::Cancelled(_) => {
                println!(
                    "Batch {:?}: {}/{} completed, failed {:?}",
                    status.state,
                    status.completed_episodes,
                    status.total_episodes,
                    status.failed_episodes()
                );
            }
        }
        if event.is_final() {
            break;
        }
    }

    if let Err(e) = handle.task.await {
        println!("ERROR: batch task failed: {}", e);
    }
}

fn parse_episode(s: &str) -> Option<u32> {
    s.parse().ok().filter(|&n| n > 0)
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn print_findings(label: &str, issues: &[String], warnings: &[String]) {
    if issues.is_empty() && warnings.is_empty() {
        println!("{}: all checks passed", label);
        return;
    }
    println!("{}: {} issues, {} warnings", label, issues.len(), warnings.len());
    for issue in issues {
        println!("  ERROR: {}", issue);
    }
    for warning in warnings {
        println!("  WARNING: {}", warning);
    }
}

fn print_usage() {
    println!("Usage: preview [--config <file>] --story <path> [--rules <path>] [--state <path>] [--output <dir>]");
    println!();
    println!("Options:");
    println!("  --config <file>  RON engine config; the other flags override it");
    println!("  --story <path>   Story data file (.json or .ron)");
    println!("  --rules <path>   RON rule overrides");
    println!("  --state <path>   Ledger file (default data/state.json)");
    println!("  --output <dir>   Archive directory (default output)");
}

fn print_help() {
    println!("Commands:");
    println!("  episode <n> [save]           Generate an episode, optionally archive it");
    println!("  validate <n> [file]          Re-check an archived script or a file");
    println!("  stage <character> <n>        Character stage, identity and appearance");
    println!("  unlock <kind> <name> <n>     Check an ability/force/item unlock");
    println!("  plot <n>                     Plot stage containing episode n");
    println!("  batch <start> <end> [save]   Generate a range in the background");
    println!("  save                         Write the ledger");
    println!("  help                         Show this help");
    println!("  quit                         Exit");
}
