//! CLI command definitions for tagforge.
//!
//! One `run` command drives the whole pipeline: enumerate orders, tag
//! them, log the summary, and write the JSON artifact.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::export::SummaryWriter;
use crate::gateway::GatewayClient;
use crate::pipeline::TagPipeline;

/// Order payment-gateway tagger for the Shopify Admin API.
#[derive(Parser)]
#[command(name = "tagforge")]
#[command(about = "Tag every order with its payment gateway")]
#[command(version)]
#[command(
    long_about = "tagforge enumerates all orders in a store via cursor pagination, derives each order's payment gateway from its first transaction, and appends it as an order tag when missing.\n\nCredentials come from SHOPIFY_STORE_DOMAIN and SHOPIFY_ACCESS_TOKEN.\n\nExample usage:\n  tagforge run --test 10 --workers 5 --output ./runs"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the tagging pipeline over the store's orders.
    Run(RunArgs),
}

/// Arguments for `tagforge run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Test mode: stop enumeration after N orders.
    #[arg(long, value_name = "N")]
    pub test: Option<usize>,

    /// Number of concurrent tagging workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Orders requested per pagination call.
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Output directory for the run summary artifact.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before
/// running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// This is the main entry point for the tagforge CLI. A fatal
/// enumeration abort propagates out as an error (non-zero exit);
/// per-order failures do not.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_pipeline_command(args).await,
    }
}

async fn run_pipeline_command(args: RunArgs) -> anyhow::Result<()> {
    let mut config = RunConfig::from_env().context("Failed to load configuration")?;

    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(page_size) = args.page_size {
        config = config.with_page_size(page_size);
    }
    if let Some(output) = args.output {
        config = config.with_output_dir(output);
    }
    config = config.with_test_limit(args.test);
    config
        .validate()
        .context("Invalid configuration after CLI overrides")?;

    let gateway = Arc::new(GatewayClient::new(&config));
    let pipeline = TagPipeline::new(gateway, &config);

    let summary = pipeline
        .run()
        .await
        .context("Run aborted during order enumeration")?;

    if summary.has_failures() {
        warn!(
            failed = summary.failed,
            "Run completed with per-order failures"
        );
    }

    let writer = SummaryWriter::new(&config.output_dir);
    let path = writer
        .write(&summary)
        .await
        .context("Failed to write run summary")?;

    info!(
        path = %path.display(),
        orders_seen = summary.orders_seen,
        tagged = summary.tagged,
        skipped = summary.skipped,
        failed = summary.failed,
        "tagforge finished"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_with_test_limit() {
        let cli = Cli::try_parse_from(["tagforge", "run", "--test", "10"]).expect("should parse");

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.test, Some(10));
                assert!(args.workers.is_none());
            }
        }
    }

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "tagforge",
            "run",
            "--workers",
            "8",
            "--page-size",
            "100",
            "--output",
            "./out",
        ])
        .expect("should parse");

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.workers, Some(8));
                assert_eq!(args.page_size, Some(100));
                assert_eq!(args.output, Some(PathBuf::from("./out")));
            }
        }
    }

    #[test]
    fn test_cli_rejects_non_numeric_test_limit() {
        assert!(Cli::try_parse_from(["tagforge", "run", "--test", "many"]).is_err());
    }

    #[test]
    fn test_log_level_is_global() {
        let cli = Cli::try_parse_from(["tagforge", "run", "--log-level", "debug"])
            .expect("should parse");
        assert_eq!(cli.log_level, "debug");
    }
}
