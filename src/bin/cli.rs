//! Binary entry point for the `stride` pattern-matching CLI.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use stride::{
    cli::{load_graph, load_pattern, render_rows, RenderedRow},
    query::{
        profile::profile_snapshot, translate, Executor, ExecutorOptions, JoinStrategy,
        PlanExplain, Planner, PlannerConfig,
    },
    MatchError,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use config::{CliConfig, ConfigError};
use ui::{report_error, Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "stride",
    version,
    about = "Evaluate graph patterns against JSON graph fixtures",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        help = "Output format for structured responses"
    )]
    format: Option<OutputFormat>,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "STRIDE_CONFIG",
        help = "Path to the CLI config file"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = Theme::Auto,
        help = "Colour theme for text output"
    )]
    theme: Theme,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Translate and plan a pattern, printing the explain tree")]
    Explain(ExplainCmd),

    #[command(about = "Evaluate a pattern against a graph fixture")]
    Run(RunCmd),
}

#[derive(Args, Debug)]
struct ExplainCmd {
    #[arg(long, value_name = "FILE", help = "Pattern AST as JSON")]
    pattern: PathBuf,

    #[arg(long, value_enum, help = "Adjacency join algorithm")]
    join: Option<JoinArg>,
}

#[derive(Args, Debug)]
struct RunCmd {
    #[arg(long, value_name = "FILE", help = "Graph fixture as JSON")]
    graph: PathBuf,

    #[arg(long, value_name = "FILE", help = "Pattern AST as JSON")]
    pattern: PathBuf,

    #[arg(long, value_enum, help = "Adjacency join algorithm")]
    join: Option<JoinArg>,

    #[arg(
        long,
        value_name = "ROWS",
        help = "Fail once any intermediate result exceeds this many rows"
    )]
    max_rows: Option<usize>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum JoinArg {
    Hash,
    #[value(name = "nested-loop")]
    NestedLoop,
}

impl From<JoinArg> for JoinStrategy {
    fn from(arg: JoinArg) -> Self {
        match arg {
            JoinArg::Hash => JoinStrategy::Hash,
            JoinArg::NestedLoop => JoinStrategy::NestedLoop,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            CliError::Match(err) => err.code(),
            CliError::Config(_) => "Config",
            CliError::Output(_) => "Serialization",
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        report_error(err.code(), &err.to_string());
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = CliConfig::load(cli.config)?;
    let format = cli
        .format
        .or_else(|| config.format())
        .unwrap_or(OutputFormat::Text);
    let ui = Ui::new(cli.theme);

    match cli.command {
        Command::Explain(cmd) => {
            let planner = Planner::new(PlannerConfig {
                join_strategy: resolve_join(cmd.join, &config),
            });
            let spec = translate(&load_pattern(&cmd.pattern)?)?;
            let output = planner.plan(&spec)?;
            let report = ExplainReport {
                patterns: spec.strides().iter().map(ToString::to_string).collect(),
                plan_hash: format!("{:016x}", output.plan_hash),
                plan: &output.explain,
            };
            emit(format, &report, || {
                ui.list("Strides", report.patterns.iter().cloned());
                ui.block("Plan", &output.explain.to_text());
                ui.section("Summary", [("plan_hash", report.plan_hash.as_str())]);
            })?;
        }
        Command::Run(cmd) => {
            let mut options = ExecutorOptions::new().join_strategy(resolve_join(cmd.join, &config));
            if let Some(limit) = cmd.max_rows.or_else(|| config.max_rows()) {
                options = options.max_rows(limit);
            }
            let graph = Arc::new(load_graph(&cmd.graph)?);
            let spec = translate(&load_pattern(&cmd.pattern)?)?;
            let executor = Executor::new(graph.clone(), options);
            let started = Instant::now();
            let result = executor.evaluate(&spec)?;
            let elapsed = started.elapsed();
            let rows = render_rows(&graph, &result)?;
            let report = RunReport {
                count: rows.len(),
                rows,
            };
            emit(format, &report, || {
                ui.list("Matches", report.rows.iter().map(RenderedRow::to_text));
                ui.section(
                    "Summary",
                    [
                        ("rows", report.count.to_string()),
                        ("elapsed", format!("{:.3}ms", elapsed.as_secs_f64() * 1_000.0)),
                    ],
                );
                if let Some(profile) = profile_snapshot(true) {
                    ui.section(
                        "Profile",
                        [
                            ("scan_count", profile.scan_count),
                            ("scan_ns", profile.scan_ns),
                            ("join_count", profile.join_count),
                            ("join_ns", profile.join_ns),
                            ("join_pairs", profile.join_pairs),
                        ],
                    );
                }
            })?;
        }
    }
    Ok(())
}

fn resolve_join(flag: Option<JoinArg>, config: &CliConfig) -> JoinStrategy {
    flag.map(JoinStrategy::from)
        .or_else(|| config.join_strategy())
        .unwrap_or_default()
}

#[derive(Serialize)]
struct ExplainReport<'a> {
    patterns: Vec<String>,
    plan_hash: String,
    plan: &'a PlanExplain,
}

#[derive(Serialize)]
struct RunReport {
    count: usize,
    rows: Vec<RenderedRow>,
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), CliError>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}
