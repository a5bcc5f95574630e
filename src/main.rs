use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use serpcluster::config::Config;
use serpcluster::input::{self, LoadOptions};
use serpcluster::output::{csv, terminal};
use serpcluster::pipeline::run::{self, RunContext};
use serpcluster::serp::{Device, Location, SerpProvider, ValueSerpClient};

/// serpcluster: group keywords that share ranking domains.
///
/// Searches every keyword in a keyword report, collects the top 10 organic
/// results and reports keywords whose results share a minimum number of
/// domains.
#[derive(Parser)]
#[command(name = "serpcluster", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster the keywords in a CSV/TSV/TXT keyword report
    Cluster {
        /// Keyword report to load
        file: PathBuf,

        /// Name of the keyword column (default: "keyword", "query" or the first column)
        #[arg(long)]
        column: Option<String>,

        /// Treat every line as a keyword (no header row)
        #[arg(long)]
        no_header: bool,

        /// Number of searches to run in parallel, 1-25 (default: 15)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Minimum shared domain hits to report a keyword, 2-5 (default: 3)
        #[arg(long)]
        min_match: Option<u32>,

        /// Only count domains containing this text (e.g. your own site)
        #[arg(long)]
        domain_filter: Option<String>,

        /// Print the table as JSON instead of the terminal view
        #[arg(long)]
        json: bool,

        /// Also write the full keyword x domain table to this CSV file
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Search a single keyword and show its organic results
    Search {
        /// The keyword to search
        keyword: String,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// List supported search locations
    Locations,
}

/// Search options shared by every command that hits the API.
#[derive(Args)]
struct SearchArgs {
    /// ValueSERP API key (default: VALUESERP_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Location to search from, e.g. US, UK, DE (default: US)
    #[arg(long)]
    location: Option<Location>,

    /// Device to search as: mobile, desktop or tablet (default: mobile)
    #[arg(long)]
    device: Option<Device>,
}

impl SearchArgs {
    fn apply(self, config: &mut Config) {
        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }
        if let Some(location) = self.location {
            config.location = location;
        }
        if let Some(device) = self.device {
            config.device = device;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("serpcluster=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Cluster {
            file,
            column,
            no_header,
            concurrency,
            min_match,
            domain_filter,
            json,
            output,
            search,
        } => {
            let mut config = Config::load()?;
            search.apply(&mut config);
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            if let Some(min_match) = min_match {
                config.min_match = min_match;
            }
            if domain_filter.is_some() {
                config.domain_filter = domain_filter;
            }
            let settings = config.settings()?;

            let options = LoadOptions {
                column,
                has_header: !no_header,
            };
            let keywords = input::load_keywords(&file, &options)?;
            println!(
                "Loaded {} keywords from {}",
                keywords.len(),
                file.display()
            );

            let client = ValueSerpClient::new(&settings.search)?;
            let ctx = RunContext::new(settings);

            // Ctrl-C stops new searches; what has already been fetched is still clustered
            let cancel = ctx.cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling remaining searches");
                    cancel.cancel();
                }
            });

            println!(
                "Searching ({} {}, {} concurrent)...",
                ctx.settings.search.location.api_name(),
                ctx.settings.search.device,
                ctx.settings.concurrency,
            );

            let pb = ProgressBar::new(keywords.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  Keywords [{bar:30}] {pos}/{len} ({elapsed} elapsed, {eta} left)")?,
            );

            let report = run::execute(&ctx, &client, &keywords, &pb).await?;
            pb.finish_and_clear();

            terminal::display_run_summary(&report);

            if json {
                println!("{}", serde_json::to_string_pretty(&report.table)?);
            } else {
                terminal::display_cluster_table(&report.table, ctx.settings.min_match);
            }

            if let Some(path) = output {
                csv::write(&report.table, &path)?;
                info!(path = %path.display(), rows = report.table.rows.len(), "CSV written");
                println!("Table written to {}", path.display());
            }
        }

        Commands::Search { keyword, search } => {
            let mut config = Config::load()?;
            search.apply(&mut config);
            let settings = config.search_settings()?;

            let keyword = keyword.trim();
            if keyword.is_empty() {
                anyhow::bail!("Keyword must not be empty");
            }

            let client = ValueSerpClient::new(&settings)?;
            let results = client
                .search(keyword)
                .await
                .with_context(|| format!("Search for {keyword:?} failed"))?;

            terminal::display_search_results(keyword, &results);
        }

        Commands::Locations => {
            println!("{}", "Supported locations:".bold());
            for location in Location::ALL {
                println!("  {:<4} {}", location.code(), location.api_name());
            }
        }
    }

    Ok(())
}
