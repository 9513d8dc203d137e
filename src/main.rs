//! # Missioni CLI
//!
//! The `missioni` binary drives the acquisition pipeline end to end.
//!
//! ## Usage
//!
//! ```bash
//! missioni --config ./config/missioni.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `missioni sources` | List configured sources and their pattern sets |
//! | `missioni run all` | Discover, fetch, extract, merge, and export |
//! | `missioni run <source>` | Same, restricted to one source |
//! | `missioni fetch <url>` | Fetch a single document into the store |
//! | `missioni reconcile <master> <dataset>` | Link a dataset into the master CSV |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use missioni::{config, fetch, pipeline, sources, store};

/// Missioni — a resilient acquisition pipeline for international-mission
/// documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/missioni.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "missioni",
    about = "Acquisition pipeline for international-mission documents",
    version,
    long_about = "Missioni discovers document links on institutional sites, fetches them with \
    retry and archival-snapshot fallback, stores artifacts content-addressed, extracts structured \
    mission records with per-language pattern sets, and merges them into deduplicated CSV exports."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/missioni.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured sources and their status.
    ///
    /// Shows each source's language, URL counts, and whether its pattern
    /// set resolves. Useful for verifying configuration before a run.
    Sources,

    /// Run the acquisition pipeline.
    ///
    /// Discovers document links for the selected sources, fetches and
    /// stores every document, extracts and normalizes records, merges
    /// duplicates, classifies, and writes the CSV exports.
    Run {
        /// Source selector: `all` or a configured source name.
        #[arg(default_value = "all")]
        source: String,

        /// Maximum number of documents to fetch per source.
        #[arg(long)]
        limit: Option<usize>,

        /// Discover and list links without fetching documents or writing exports.
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch a single document into the artifact store.
    ///
    /// Applies the full retry and archive-fallback policy, then prints
    /// where the artifact landed.
    Fetch {
        /// Document URL.
        url: String,
    },

    /// Reconcile a scraped dataset into the curated master CSV.
    ///
    /// Fuzzy-links each dataset record to its best-matching master row;
    /// matches above the similarity threshold overwrite the row, the rest
    /// are appended. Touched rows carry a `merge_status` marker.
    Reconcile {
        /// Path to the curated master CSV.
        master: PathBuf,

        /// Path to a dataset CSV produced by `run`.
        dataset: PathBuf,

        /// Output path; defaults to overwriting the master in place.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Run {
            source,
            limit,
            dry_run,
        } => {
            pipeline::run(&cfg, &source, limit, dry_run).await?;
        }
        Commands::Fetch { url } => {
            let store = store::ArtifactStore::open(&cfg.storage.root)?;
            let fetcher = fetch::Fetcher::new(cfg.fetch.clone(), store)?;
            let result = fetcher.fetch(&url).await?;
            println!("fetch");
            println!("  url       {}", result.url);
            println!("  method    {}", result.method.as_str());
            println!("  hash      {}", result.content_hash);
            println!("  size      {}", result.size);
            println!("  artifact  {}", result.artifact.display());
            println!("ok");
        }
        Commands::Reconcile {
            master,
            dataset,
            output,
        } => {
            pipeline::reconcile(&cfg, &master, &dataset, output)?;
        }
    }

    Ok(())
}
