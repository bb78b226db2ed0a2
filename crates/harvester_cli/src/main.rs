//! Harvester CLI - collects RPA-related GitHub repositories into CSV datasets.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "harvester")]
#[command(version)]
#[command(about = "Collects metadata about RPA-related GitHub repositories")]
#[command(
    long_about = "Harvester pages the GitHub search API across star brackets, working around \
its 1000-result cap, and keeps the results in flat CSV datasets. It can also search code \
for RPA tool fingerprints, fetch per-repository details and intersect the datasets."
)]
#[command(after_long_help = r#"EXAMPLES
    Collect repositories with at least 100 stars pushed in the last 120 days:
        $ harvester stars

    Collect a single bracket into a custom file:
        $ harvester stars --start 5000 --stop 4999 --max-stars 10000 -o big.csv

    Search code for two fingerprints only:
        $ harvester code -s extension:robot -s "\"import rpa\" in:file"

    Fetch details for the code-search hits, skipping ones already fetched:
        $ harvester details --resume

    Intersect the starred and code-search datasets:
        $ harvester intersect

    List configuration files of a repository:
        $ harvester config-files robocorp/rpaframework

CONFIGURATION
    Harvester reads configuration from:
      1. ~/.config/harvester/config.toml (or $XDG_CONFIG_HOME/harvester/config.toml)
      2. ./harvester.toml
      3. Environment variables (HARVESTER_* prefix, e.g., HARVESTER_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    HARVESTER_GITHUB_TOKEN    GitHub personal access token
    GITHUB_TOKEN              Used when no token is configured
    RUST_LOG                  Log filter for non-interactive runs
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect repositories from the star-bracketed search
    Stars(StarsArgs),
    /// Search code for RPA tool fingerprints
    Code(CodeArgs),
    /// Fetch details for every repository of the code-search dataset
    Details(DetailsArgs),
    /// Intersect the starred dataset with the code-search dataset
    Intersect(IntersectArgs),
    /// List configuration files of repositories
    ConfigFiles {
        /// Repositories as owner/name
        #[arg(required = true)]
        repositories: Vec<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Options of the star-bracketed collection.
#[derive(Debug, Clone, clap::Args)]
struct StarsArgs {
    /// Highest bracket minimum (default from config or 1000)
    #[arg(long)]
    start: Option<u64>,

    /// Exclusive lower end of the brackets (default from config or 100)
    #[arg(long)]
    stop: Option<u64>,

    /// Distance between bracket minimums (default from config or 200)
    #[arg(long)]
    step: Option<u64>,

    /// Upper star bound shared by every bracket (default: unbounded)
    #[arg(short = 'm', long)]
    max_stars: Option<u64>,

    /// Only include repos pushed within this many days (default from config or 120)
    #[arg(short = 'd', long)]
    recent_days: Option<u64>,

    /// Output CSV (default from config)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Options of the code search.
#[derive(Debug, Clone, clap::Args)]
struct CodeArgs {
    /// Search string; may be repeated (default: the configured fingerprints)
    #[arg(short = 's', long = "search-string")]
    search_strings: Vec<String>,

    /// Highest page requested per search string (default from config or 100)
    #[arg(short = 'p', long)]
    max_pages: Option<u32>,

    /// Output CSV (default from config)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Options of the details collection.
#[derive(Debug, Clone, clap::Args)]
struct DetailsArgs {
    /// Code-search CSV to read repositories from (default from config)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output CSV (default from config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip repositories already present in the output
    #[arg(short, long)]
    resume: bool,
}

/// Options of the intersection.
#[derive(Debug, Clone, clap::Args)]
struct IntersectArgs {
    /// Starred-search CSV (default from config)
    #[arg(long)]
    projects: Option<PathBuf>,

    /// Code-search or details CSV keyed by `repository` (default from config)
    #[arg(long)]
    by_code: Option<PathBuf>,

    /// Output CSV (default from config)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not connected to a TTY
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("harvester=info,harvester_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stars(args) => commands::stars::handle_stars(args, &config).await?,
        Commands::Code(args) => commands::code::handle_code(args, &config).await?,
        Commands::Details(args) => commands::details::handle_details(args, &config).await?,
        Commands::Intersect(args) => commands::intersect::handle_intersect(args, &config)?,
        Commands::ConfigFiles { repositories } => {
            commands::tree::handle_config_files(repositories, &config).await?;
        }
        Commands::Completions { shell } => commands::meta::handle_completions(shell)?,
    }

    Ok(())
}
