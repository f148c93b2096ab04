//! Verification harness CLI
//!
//! Run adder verification scenarios under the virtual or wall clock.

use clap::Parser;
use tbench_sim::scenarios::ScenarioId;
use tbench_env::ComponentPath;
use tbench_sim::{HarnessConfig, RunExport, ScenarioResult, ScenarioRunner};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Constrained-random verification harness CLI
#[derive(Parser, Debug)]
#[command(name = "tbench-sim")]
#[command(
    about = "Run constrained-random verification scenarios against an adder",
    long_about = None
)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Operand width in bits
    #[arg(short, long)]
    width: Option<u32>,

    /// Random transactions per run
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Scenario to run (smoke, max_operands, random, empty, stuck_output, carry_drop, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    seeds: u64,

    /// Load the harness configuration from a JSON file
    #[arg(short, long)]
    config: Option<String>,

    /// Use the wall clock instead of the virtual clock
    #[arg(long)]
    realtime: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the run report and timeline to a JSON file
    #[arg(long)]
    export: Option<String>,
}

/// Merges the config file and command-line overrides.
fn load_config(args: &Args) -> Result<HarnessConfig, String> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => HarnessConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = if seed == 0 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        } else {
            seed
        };
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }

    config
        .validate(&ComponentPath::root("config"))
        .map_err(|e| e.to_string())?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Verification Harness v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            let names: Vec<_> = ScenarioId::all().iter().map(ScenarioId::name).collect();
            eprintln!("Available scenarios: {}, all", names.join(", "));
            std::process::exit(2);
        })]
    };

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    });

    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        eprintln!("Error: --export only supports a single scenario and seed");
        std::process::exit(2);
    }

    let base_seed = config.seed;
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset);
        let runner = ScenarioRunner::new(config.clone())
            .with_seed(seed)
            .with_realtime(args.realtime);

        for scenario in &scenarios {
            let result = match runner.run(*scenario).await {
                Ok(result) => result,
                Err(e) => {
                    error!("✗ {} (seed={}) ERROR: {}", scenario.name(), seed, e);
                    errors.push(format!("{} seed={}: {}", scenario.name(), seed, e));
                    continue;
                }
            };

            if !args.json {
                if result.as_expected {
                    info!(
                        "✓ {} (seed={}) {}/{} verdicts passed",
                        scenario.name(),
                        seed,
                        result.report.passes,
                        result.report.verdicts
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) UNEXPECTED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if let Some(path) = &args.export {
                match RunExport::from_result(&result).write_to_file(path) {
                    Ok(()) => info!("Exported {} events to {}", result.timeline.len(), path),
                    Err(e) => warn!("Failed to write export: {:?}", e),
                }
            }

            all_results.push(result);
        }
    }

    let total = all_results.len() + errors.len();
    let unexpected = all_results.iter().filter(|r| !r.as_expected).count() + errors.len();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "as_expected": total - unexpected,
            "unexpected": unexpected,
            "errors": errors,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "as_expected": r.as_expected,
                    "passed": r.report.passed,
                    "verdicts": r.report.verdicts,
                    "failures": r.report.failures,
                    "pair_coverage": r.report.coverage.pair_coverage,
                    "elapsed_ns": r.report.elapsed_ns,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if unexpected == 0 {
            info!("✅ All {} scenario runs behaved as expected!", total);
        } else {
            error!("❌ {}/{} scenario runs did not behave as expected!", unexpected, total);
            for result in all_results.iter().filter(|r| !r.as_expected) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
            for e in &errors {
                error!("  - {}", e);
            }
        }
    }

    // Exit with proper code for CI
    if unexpected > 0 {
        std::process::exit(1);
    }
}
