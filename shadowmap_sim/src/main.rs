//! ShadowMap Simulator CLI
//!
//! Run live-loop vs background-export scenarios and check the isolation
//! guarantees of the shadow view.

use clap::Parser;
use shadowmap_sim::scenarios::ScenarioId;
use shadowmap_sim::{ScenarioResult, ScenarioRunner};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// ShadowMap Simulation CLI
#[derive(Parser, Debug)]
#[command(name = "shadowmap-sim")]
#[command(about = "Run live-loop vs background-export scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,
    
    /// Scenario to run (steady, despawn_storm, spawn_flood, hidden_kinds, threaded, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,
    
    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,
    
    /// Live ticks before the export starts
    #[arg(long, default_value = "10")]
    warmup: u64,
    
    /// Upper bound on live ticks while the export runs
    #[arg(long, default_value = "500")]
    episode_limit: u64,
    
    /// Live ticks after the view is dropped
    #[arg(long, default_value = "10")]
    cooldown: u64,
    
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
    
    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
    
    /// Write the snapshot export of a single scenario to this JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn main() {
    let args = Args::parse();
    
    init_logging(args.verbose);
    
    if !args.json {
        info!("ShadowMap Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
    
    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: steady, despawn_storm, spawn_flood, hidden_kinds, threaded, all");
            std::process::exit(1);
        })]
    };
    
    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        eprintln!("Error: --export only supports a single scenario and seed");
        std::process::exit(1);
    }
    
    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };
    
    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;
    
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        
        let runner = ScenarioRunner::new(seed)
            .with_warmup(args.warmup)
            .with_episode_limit(args.episode_limit)
            .with_cooldown(args.cooldown);
        
        for scenario in &scenarios {
            let result = runner.run(*scenario);
            
            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED | exported={} reintroduced={} hidden={} ticks={}",
                        scenario.name(),
                        seed,
                        result.metrics.exported,
                        result.metrics.reintroduced,
                        result.metrics.hidden,
                        result.episode_ticks,
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            
            if !result.passed {
                failed_count += 1;
            }
            
            all_results.push(result);
        }
    }
    
    if let Some(path) = &args.export {
        if let Some(export) = all_results.first().and_then(|r| r.export.as_ref()) {
            match export.write_to_file(path) {
                Ok(()) => info!("Exported {} entities to {}", export.total(), path.display()),
                Err(e) => {
                    error!("Failed to write export: {}", e);
                    failed_count += 1;
                }
            }
        }
    }
    
    // Summary
    let total = all_results.len();
    let passed = total - failed_count.min(total);
    
    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "episode_ticks": r.episode_ticks,
                    "exported": r.metrics.exported,
                    "reintroduced": r.metrics.reintroduced,
                    "hidden": r.metrics.hidden,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to render summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        
        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
    
    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
