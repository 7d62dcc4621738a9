//! Algorithm trace CLI.
//!
//! Provides the `algotrace` binary for listing the registered algorithms,
//! running one on an input to get its result envelope, rendering the
//! narrative walkthrough, and checking that every example narrates cleanly.
//!
//! The step budget comes from `ALGOTRACE_MAX_STEPS` (default 10,000) and can
//! be overridden with `--max-steps`.

use std::process;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::Level;

use algotrace_algorithms::{default_registry, narrative_oracle};
use algotrace_core::{
    check_completeness, AlgorithmRegistry, ResultEnvelope, RunError, TracerConfig,
    DEFAULT_MAX_STEPS,
};

const MAX_STEPS_VAR: &str = "ALGOTRACE_MAX_STEPS";

/// Instrumented teaching algorithms.
#[derive(Parser)]
#[command(name = "algotrace", about = "Run and narrate instrumented teaching algorithms")]
struct Cli {
    /// Step budget per run (overrides ALGOTRACE_MAX_STEPS).
    #[arg(long, global = true)]
    max_steps: Option<usize>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List registered algorithms as JSON.
    List,

    /// Run an algorithm and print its result envelope as JSON.
    Run {
        /// Registered algorithm name.
        name: String,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Run an algorithm and print its narrative as markdown.
    Narrate {
        /// Registered algorithm name.
        name: String,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Run and narrate every example input of every algorithm.
    Check,
}

/// Where the algorithm input comes from. Defaults to example 0.
#[derive(Args)]
struct InputArgs {
    /// Input as a JSON document.
    #[arg(long, conflicts_with = "example")]
    input: Option<String>,

    /// Index of a registered example input.
    #[arg(long)]
    example: Option<usize>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let config = match resolve_config(cli.max_steps, std::env::var(MAX_STEPS_VAR).ok()) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            process::exit(1);
        }
    };

    let registry = match default_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: failed to build the algorithm registry: {}", e);
            process::exit(1);
        }
    };

    let exit_code = match cli.command {
        Commands::List => run_list(&registry),
        Commands::Run { name, input } => run_algorithm(&registry, &name, &input, &config),
        Commands::Narrate { name, input } => run_narrate(&registry, &name, &input, &config),
        Commands::Check => run_check(&registry, &config),
    };
    process::exit(exit_code);
}

/// Picks the step budget: flag, then environment, then the default.
fn resolve_config(flag: Option<usize>, env: Option<String>) -> Result<TracerConfig, String> {
    let max_steps = match (flag, env) {
        (Some(n), _) => n,
        (None, Some(raw)) => raw.trim().parse().map_err(|_| {
            format!("{} must be a positive integer, got '{}'", MAX_STEPS_VAR, raw)
        })?,
        (None, None) => DEFAULT_MAX_STEPS,
    };
    if max_steps == 0 {
        return Err("the step budget must be at least 1".to_string());
    }
    Ok(TracerConfig { max_steps })
}

/// Resolves the input JSON for `name` from `--input` or `--example`.
fn load_input(registry: &AlgorithmRegistry, name: &str, args: &InputArgs) -> Result<Value, String> {
    match &args.input {
        Some(raw) => {
            serde_json::from_str(raw).map_err(|e| format!("--input is not valid JSON: {}", e))
        }
        None => registry
            .example_input(name, args.example.unwrap_or(0))
            .cloned()
            .map_err(|e| e.to_string()),
    }
}

/// Loads the input and runs `name`, reporting failures on stderr.
///
/// Returns the envelope, or exit code 1 for any caller error.
fn execute(
    registry: &AlgorithmRegistry,
    name: &str,
    args: &InputArgs,
    config: &TracerConfig,
) -> Result<ResultEnvelope, i32> {
    let input = load_input(registry, name, args).map_err(|msg| {
        eprintln!("Error: {}", msg);
        1
    })?;
    registry.run(name, &input, config).map_err(|e| {
        match &e {
            RunError::Registry(_) => eprintln!("Error: {}", e),
            RunError::Trace(_) => eprintln!("Error: {} failed: {}", name, e),
        }
        1
    })
}

/// Execute the list subcommand.
fn run_list(registry: &AlgorithmRegistry) -> i32 {
    print_json(&registry.list_all())
}

/// Execute the run subcommand.
fn run_algorithm(
    registry: &AlgorithmRegistry,
    name: &str,
    args: &InputArgs,
    config: &TracerConfig,
) -> i32 {
    match execute(registry, name, args, config) {
        Ok(envelope) => print_json(&envelope),
        Err(code) => code,
    }
}

/// Execute the narrate subcommand.
///
/// Returns exit code: 0 = success, 1 = caller error, 2 = narrative gap.
fn run_narrate(
    registry: &AlgorithmRegistry,
    name: &str,
    args: &InputArgs,
    config: &TracerConfig,
) -> i32 {
    let envelope = match execute(registry, name, args, config) {
        Ok(envelope) => envelope,
        Err(code) => return code,
    };
    match narrative_oracle().narrate(&envelope) {
        Ok(text) => {
            print!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Narrative incomplete: {}", e);
            2
        }
    }
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = every example narrates, 2 = at least one failure.
fn run_check(registry: &AlgorithmRegistry, config: &TracerConfig) -> i32 {
    let report = check_completeness(registry, &narrative_oracle(), config);
    if report.is_complete() {
        println!("{} example(s) checked, all complete", report.checked);
        return 0;
    }
    eprintln!(
        "{} of {} example(s) failed:",
        report.failures.len(),
        report.checked
    );
    for failure in &report.failures {
        eprintln!(
            "  - {} example {}: {}",
            failure.algorithm, failure.example_index, failure.kind
        );
    }
    2
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: failed to serialize output: {}", e);
            1
        }
    }
}
