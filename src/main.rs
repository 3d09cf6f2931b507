//! CLI entry point for the search-console analysis tool.
//!
//! Provides subcommands for one-shot reports over an export file and a
//! `serve` mode that exposes the same reports as tools over stdio.

use anyhow::Result;
use clap::{Parser, Subcommand};
use seo_gsc_analysis::analyzers::types::{OpportunityParams, QueryParams};
use seo_gsc_analysis::config::Settings;
use seo_gsc_analysis::mcp::run_stdio;
use seo_gsc_analysis::output::{OutputFormat, render_many, render_one, write_output};
use seo_gsc_analysis::tools::{ToolExecutor, definitions};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "seo_gsc_analysis")]
#[command(about = "SEO metrics from Google Search Console exports", long_about = None)]
struct Cli {
    /// Output format for report subcommands
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Site-level totals with impression-weighted CTR and position
    Summary {
        /// Path to a CSV or JSON export
        #[arg(value_name = "FILE")]
        path: String,
    },
    /// Queries ranked by clicks
    TopQueries {
        #[arg(value_name = "FILE")]
        path: String,

        /// Maximum number of queries to return
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Drop rows with fewer impressions before grouping
        #[arg(long, default_value_t = 0.0)]
        min_impressions: f64,
    },
    /// Pages with high impressions but a middling average position
    PageOpportunities {
        #[arg(value_name = "FILE")]
        path: String,

        /// Minimum summed impressions per page
        #[arg(long, default_value_t = 100.0)]
        min_impressions: f64,

        /// Lowest average position to keep (inclusive)
        #[arg(long, default_value_t = 5.0)]
        min_position: f64,

        /// Highest average position to keep (inclusive)
        #[arg(long, default_value_t = 20.0)]
        max_position: f64,

        /// Maximum number of pages to return
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the tool catalogue exposed by `serve`
    ListTools,
    /// Serve the analysis tools over stdio (Model Context Protocol)
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let settings = Settings::from_env();

    // Logging setup: colored stderr + JSON rolling log file. Stdout is reserved
    // for reports and protocol traffic.
    let log_dir = settings
        .log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = settings
        .log_file_path
        .file_name()
        .unwrap_or(OsStr::new("seo_gsc_analysis.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let executor = ToolExecutor::new(&settings);

    let report = match cli.command {
        Commands::Summary { path } => {
            let summary = executor.summary(&path)?;
            render_one(&summary, cli.format)?
        }
        Commands::TopQueries {
            path,
            limit,
            min_impressions,
        } => {
            let params = QueryParams {
                limit,
                min_impressions,
            };
            render_many(&executor.top_queries(&path, &params)?, cli.format)?
        }
        Commands::PageOpportunities {
            path,
            min_impressions,
            min_position,
            max_position,
            limit,
        } => {
            let params = OpportunityParams {
                min_impressions,
                min_position,
                max_position,
                limit,
            };
            render_many(&executor.page_opportunities(&path, &params)?, cli.format)?
        }
        Commands::ListTools => serde_json::to_string_pretty(&definitions())?,
        Commands::Serve => {
            run_stdio(executor).await?;
            return Ok(());
        }
    };

    match &cli.output {
        Some(path) => {
            write_output(path, &report)?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{report}"),
    }

    Ok(())
}
