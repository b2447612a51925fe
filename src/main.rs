//! Tracksync CLI
//!
//! Command-line interface for the track geometry sync:
//! - Convert tracks and push geometries to the record store
//! - Generate a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracksync::config::{generate_default_config, Config};
use tracksync::index::TrackIndex;
use tracksync::remote::{read_token, RecordStore};
use tracksync::sync::{run_batch, SyncReport};

#[derive(Parser)]
#[command(name = "tracksync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sync GPS track geometries into a CSV index and a remote record store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert all tracks and push their geometries
    Sync {
        /// Directory of YYYY-MM-DD.gpx files (overrides config)
        #[arg(long)]
        tracks_dir: Option<PathBuf>,

        /// CSV index file (overrides config)
        #[arg(long)]
        index: Option<PathBuf>,

        /// Record store API root (overrides config)
        #[arg(long)]
        base_url: Option<String>,

        /// Bearer token file (overrides config)
        #[arg(long)]
        token_file: Option<PathBuf>,

        /// Geometry column header (overrides config)
        #[arg(long)]
        geometry_column: Option<String>,

        /// Load and match everything, but skip remote calls and the index rewrite
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config);

    match cli.command {
        Commands::Sync {
            tracks_dir,
            index,
            base_url,
            token_file,
            geometry_column,
            dry_run,
        } => {
            let tracks_dir = tracks_dir.unwrap_or_else(|| PathBuf::from(&config.tracks.dir));
            let index_path = index.unwrap_or_else(|| PathBuf::from(&config.index.path));
            let token_file = token_file.unwrap_or_else(|| PathBuf::from(&config.remote.token_file));
            let geometry_column =
                geometry_column.unwrap_or_else(|| config.index.geometry_column.clone());
            if let Some(url) = base_url {
                config.remote.base_url = url;
            }

            tracing::info!("Tracksync v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Track directory: {:?}", tracks_dir);
            tracing::info!("Index file: {:?}", index_path);

            if !tracks_dir.is_dir() {
                anyhow::bail!("Track directory not found: {:?}", tracks_dir);
            }

            // Prerequisites for any useful work are fatal; everything
            // per-file is not.
            let mut index = TrackIndex::load(&index_path, &geometry_column)?;

            let report = if dry_run {
                tracing::info!("Dry run: no remote calls, no index rewrite");
                run_batch(&tracks_dir, &mut index, None).await?
            } else {
                let token = read_token(&token_file)?;
                let store = RecordStore::new(&config.remote, token);
                run_batch(&tracks_dir, &mut index, Some(&store)).await?
            };

            print_report(&report);
        }

        Commands::Config { output } => {
            let content = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", content);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("tracksync={}", config.logging.level))
        });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_report(report: &SyncReport) {
    if report.files.is_empty() {
        println!("No track files found.");
        return;
    }

    for file in &report.files {
        println!("{:<20} {}", file.file, file.outcome);
    }

    if !report.rows_without_tracks.is_empty() {
        let dates: Vec<String> = report
            .rows_without_tracks
            .iter()
            .map(|d| d.to_string())
            .collect();
        println!();
        println!("Index rows with no track file: {}", dates.join(", "));
    }

    let mut parts = vec![
        format!("{} updated", report.updated()),
        format!("{} skipped", report.skipped()),
    ];
    if report.failed() > 0 {
        parts.push(format!("{} failed", report.failed()));
    }
    if report.diverged() > 0 {
        parts.push(format!(
            "{} diverged (remote update failed, local geometry kept)",
            report.diverged()
        ));
    }

    println!();
    println!("Track sync complete: {}", parts.join(", "));
    if report.index_saved {
        println!("Index rewritten.");
    }
}
