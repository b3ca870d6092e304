//! promql-smith command line
//!
//! Prints randomly generated PromQL expressions, one per line, to stdout.
//! Logs go to stderr.
//!
//! # Configuration
//!
//! Settings are read from, in increasing precedence:
//! 1. Built-in defaults
//! 2. The TOML file given with `--config`
//! 3. `PROMQLSMITH_*` and `RUST_LOG` environment variables
//! 4. Command-line flags
//!
//! # Example Usage
//!
//! ```bash
//! # Ten instant queries over the built-in demo catalog
//! promql-smith generate
//!
//! # Reproducible range queries over a series dump
//! promql-smith --series series.json generate --kind range --count 100 --seed 42
//!
//! # Show the effective configuration
//! promql-smith --config smith.toml dump-config
//! ```

use clap::{Parser, Subcommand};
use promql_smith::{
    config::{Config, QueryKind},
    LabelSet, PromQLSmith, SeriesCatalog,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// CLI Definition
// =============================================================================

/// promql-smith - randomized PromQL expression generator
#[derive(Parser)]
#[command(name = "promql-smith")]
#[command(version)]
#[command(about = "Generate random, type-correct PromQL expressions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON file with the series catalog (overrides run.series_file)
    #[arg(short, long, global = true)]
    series: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate expressions (default)
    Generate {
        /// Entry point: instant, range, expr or selectors
        #[arg(short, long)]
        kind: Option<QueryKind>,

        /// Number of expressions to print
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum expression depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Enable offset modifiers
        #[arg(long)]
        offset: bool,

        /// Enable `@` modifiers
        #[arg(long)]
        at_modifier: bool,

        /// Enable vector matching
        #[arg(long)]
        vector_matching: bool,

        /// Enable experimental functions and aggregators
        #[arg(long)]
        experimental: bool,
    },

    /// Validate configuration without generating anything
    CheckConfig,

    /// Print the effective configuration as TOML
    DumpConfig,
}

// =============================================================================
// Configuration loading
// =============================================================================

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file_with_env(path)?,
        None => Config::from_env(),
    };
    if let Some(series) = &cli.series {
        config.run.series_file = Some(series.clone());
    }
    Ok(config)
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(config: &Config) -> Result<SeriesCatalog, Box<dyn std::error::Error>> {
    match &config.run.series_file {
        Some(path) => {
            let catalog = SeriesCatalog::from_json_file(path)?;
            info!(path = %path.display(), series = catalog.len(), "loaded series catalog");
            Ok(catalog)
        },
        None => {
            debug!("no series file given, using the demo catalog");
            Ok(SeriesCatalog::new(demo_series()))
        },
    }
}

/// A small catalog covering counters, gauges and a histogram
fn demo_series() -> Vec<LabelSet> {
    let mut series = Vec::new();
    for (job, instance) in [("api", "10.0.0.1:9090"), ("api", "10.0.0.2:9090"), ("db", "10.0.1.1:9100")] {
        series.push(LabelSet::from_pairs([("__name__", "up"), ("job", job), ("instance", instance)]));
        series.push(LabelSet::from_pairs([
            ("__name__", "process_cpu_seconds_total"),
            ("job", job),
            ("instance", instance),
        ]));
    }
    for (method, code) in [("get", "200"), ("get", "500"), ("post", "200"), ("put", "404")] {
        series.push(LabelSet::from_pairs([
            ("__name__", "http_requests_total"),
            ("job", "api"),
            ("method", method),
            ("code", code),
        ]));
    }
    for le in ["0.1", "0.5", "1", "+Inf"] {
        series.push(LabelSet::from_pairs([
            ("__name__", "http_request_duration_seconds_bucket"),
            ("job", "api"),
            ("le", le),
        ]));
    }
    series
}

// =============================================================================
// Command Handlers
// =============================================================================

fn cmd_check_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let resolved = config.generator.resolve()?;
    let catalog = load_catalog(config)?;
    catalog.validate()?;

    println!("Configuration is valid!");
    println!();
    println!("Generator:");
    println!("  Max depth: {}", resolved.max_depth);
    println!("  Binary operators: {}", resolved.binops.len());
    println!("  Aggregators: {}", resolved.aggregators.len());
    println!("  Functions: {}", resolved.functions.len());
    println!("  Expression kinds: {}", resolved.exprs.len());
    println!("  Vector matching: {}", resolved.enable_vector_matching);
    println!();
    println!("Catalog:");
    println!("  Series: {}", catalog.len());
    println!("  Label names: {}", catalog.label_names().join(", "));

    Ok(())
}

fn cmd_generate(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let catalog = Arc::new(load_catalog(config)?);
    let resolved = Arc::new(config.generator.resolve()?);

    let seed = config.run.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!(seed, kind = ?config.run.query_kind, count = config.run.count, "generating");

    let mut smith = PromQLSmith::from_parts(StdRng::seed_from_u64(seed), catalog, resolved)?;

    for i in 0..config.run.count {
        let generated = match config.run.query_kind {
            QueryKind::Instant => smith.walk_instant_query().map(|e| e.to_string()),
            QueryKind::Range => smith.walk_range_query().map(|e| e.to_string()),
            QueryKind::Expr => smith.walk(&[]).map(|e| e.to_string()),
            QueryKind::Selectors => {
                let matchers: Vec<String> =
                    smith.walk_selectors().iter().map(ToString::to_string).collect();
                Some(format!("{{{}}}", matchers.join(", ")))
            },
        };

        match generated {
            Some(text) => println!("{}", text),
            None => warn!(index = i, "no expression could be generated"),
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    init_tracing(&config.run.log_level);

    match cli.command {
        Some(Commands::CheckConfig) => cmd_check_config(&config),
        Some(Commands::DumpConfig) => {
            print!("{}", config.to_toml()?);
            Ok(())
        },
        Some(Commands::Generate {
            kind,
            count,
            seed,
            max_depth,
            offset,
            at_modifier,
            vector_matching,
            experimental,
        }) => {
            if let Some(kind) = kind {
                config.run.query_kind = kind;
            }
            if let Some(count) = count {
                config.run.count = count;
            }
            if seed.is_some() {
                config.run.seed = seed;
            }
            if let Some(depth) = max_depth {
                config.generator.max_depth = depth;
            }
            config.generator.enable_offset |= offset;
            config.generator.enable_at_modifier |= at_modifier;
            config.generator.enable_vector_matching |= vector_matching;
            config.generator.enable_experimental_functions |= experimental;
            cmd_generate(&config)
        },
        None => cmd_generate(&config),
    }
}
