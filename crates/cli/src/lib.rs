//! CLI for mongobench.
//!
//! This crate provides the command-line interface: the `run` subcommand
//! benchmarks a definitions file against a live server, and `list` shows
//! what a definitions file contains without connecting.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use mongobench_benchmarks::{
    io, load_definitions, markdown, report, AverageBasis, BenchmarkResult, QueryDefinition,
    Runner, RunnerConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// mongobench CLI.
#[derive(Parser, Debug)]
#[command(name = "mongobench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "MONGOBENCH_LOG_JSON")]
    pub log_json: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark every query in a definitions file and print the results.
    Run(RunArgs),

    /// List the queries in a definitions file and how each would execute.
    List {
        /// Query definitions file (JSON array).
        #[arg(short, long, env = "MONGOBENCH_QUERIES", default_value = "queries.json")]
        queries: PathBuf,
    },
}

/// Arguments for `mongobench run`.
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// MongoDB connection string.
    #[arg(long, env = "MONGOBENCH_URI", default_value = "mongodb://localhost:27017")]
    pub uri: String,

    /// Database to run queries against.
    #[arg(short, long, env = "MONGOBENCH_DATABASE", default_value = "benchmark")]
    pub database: String,

    /// Query definitions file (JSON array).
    #[arg(short, long, env = "MONGOBENCH_QUERIES", default_value = "queries.json")]
    pub queries: PathBuf,

    /// Timed iterations per query.
    #[arg(short = 'n', long, env = "MONGOBENCH_ITERATIONS", default_value_t = 10)]
    pub iterations: u32,

    /// Seconds allowed for connecting, pinging and disconnecting.
    #[arg(long, env = "MONGOBENCH_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    /// Divisor for the average time.
    #[arg(long, value_enum, default_value_t = AverageArg::Configured)]
    pub average: AverageArg,

    /// Report format written to stdout.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write all_results.json and summary.md to this directory.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Build the runner configuration.
    pub fn runner_config(&self) -> RunnerConfig {
        let timeout = Duration::from_secs(self.timeout);
        RunnerConfig::new(&self.uri, &self.database, self.iterations)
            .with_connect_timeout(timeout)
            .with_disconnect_timeout(timeout)
            .with_average_basis(self.average.into())
    }
}

/// `--average` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AverageArg {
    /// Total over the configured iteration count.
    Configured,
    /// Total over the iterations that succeeded.
    Successful,
}

impl From<AverageArg> for AverageBasis {
    fn from(arg: AverageArg) -> Self {
        match arg {
            AverageArg::Configured => AverageBasis::Configured,
            AverageArg::Successful => AverageBasis::Successful,
        }
    }
}

/// `--format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text report.
    Text,
    /// Pretty-printed JSON array.
    Json,
    /// Markdown summary table.
    Markdown,
}

/// Install the global tracing subscriber. Logs go to stderr so stdout only
/// carries the report.
pub fn init_tracing(json: bool) {
    let log_level = std::env::var("MONGOBENCH_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Parse arguments and run the CLI.
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if the command fails.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    execute(cli.command).await
}

/// Run a parsed command.
pub async fn execute(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => run_benchmarks(args).await,
        Commands::List { queries } => {
            let definitions = load_definitions(&queries)?;
            print!("{}", render_listing(&definitions));
            Ok(())
        }
    }
}

async fn run_benchmarks(args: RunArgs) -> anyhow::Result<()> {
    let queries = load_definitions(&args.queries)?;
    info!(count = queries.len(), path = %args.queries.display(), "loaded query definitions");

    let runner = Runner::open(args.runner_config()).await?;
    let results = runner.run_benchmarks(&queries).await;
    let closed = runner.close().await;

    print!("{}", render_results(&results, args.format)?);

    if let Some(dir) = &args.output {
        let written = io::write_all_outputs(&results, dir)
            .with_context(|| format!("failed to write results to {}", dir.display()))?;
        if args.verbose {
            for path in written {
                eprintln!("Wrote {}", path.display());
            }
        }
    }

    if let Err(e) = closed {
        error!(error = %e, "failed to close connection");
        return Err(e.into());
    }
    Ok(())
}

/// Render results in the requested format.
pub fn render_results(results: &[BenchmarkResult], format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => report::render(results),
        OutputFormat::Json => to_pretty_json(results)?,
        OutputFormat::Markdown => markdown::generate_summary(results),
    })
}

fn to_pretty_json(results: &[BenchmarkResult]) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(results)?;
    json.push('\n');
    Ok(json)
}

/// One line per definition: name, collection and execution path.
pub fn render_listing(definitions: &[QueryDefinition]) -> String {
    let mut output = String::new();
    for definition in definitions {
        output.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            definition.name,
            definition.collection,
            definition.shape(),
            definition.description
        ));
    }
    output
}
