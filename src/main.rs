//! gpx-enrich - elevation enrichment and static viewer for GPX tracks
//!
//! `process` writes `<stem>_modified.gpx` and `<stem>_gpx_viewer.html` into the
//! upload directory; `points` prints the enriched point list as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use gpx_enrich::config::Config;
use gpx_enrich::storage::OutputStore;
use gpx_enrich::{HttpElevationSource, NoElevation, Pipeline, process_upload};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

/// Enrich GPX tracks with elevation data and render a track viewer
#[derive(Parser, Debug)]
#[command(name = "gpx-enrich", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/gpx-enrich.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich a GPX file and write the modified GPX and viewer page
    Process {
        input: PathBuf,
        /// Override the first track's name
        #[arg(long)]
        name: Option<String>,
        /// Viewer page title (default: track name, then file name)
        #[arg(long)]
        title: Option<String>,
        /// Skip elevation lookups
        #[arg(long)]
        offline: bool,
        /// Output directory (overrides storage.upload_dir)
        #[arg(long)]
        upload_dir: Option<PathBuf>,
    },
    /// Enrich a GPX file and print its point list as JSON
    Points {
        input: PathBuf,
        /// Skip elevation lookups
        #[arg(long)]
        offline: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `points` output stays machine-readable.
    // Default: INFO, use RUST_LOG=debug for per-point lookups
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let mut config = Config::load_from_path(&config_path)?;

    match args.command {
        Command::Process {
            input,
            name,
            title,
            offline,
            upload_dir,
        } => {
            if offline {
                config.disable_elevation();
            }
            if let Some(dir) = upload_dir {
                config.set_upload_dir(dir);
            }
            log_config(&config);
            process(&config, &input, name.as_deref(), title.as_deref())
        }
        Command::Points { input, offline } => {
            if offline {
                config.disable_elevation();
            }
            log_config(&config);
            let raw = read_input(&input)?;
            let enriched = build_pipeline(&config)?
                .enrich(&raw)
                .with_context(|| format!("Failed to enrich {}", input.display()))?;
            println!("{}", serde_json::to_string_pretty(&enriched.points)?);
            Ok(())
        }
    }
}

fn process(config: &Config, input: &Path, name: Option<&str>, title: Option<&str>) -> anyhow::Result<()> {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file path", input.display()))?;
    let raw = read_input(input)?;

    let store = OutputStore::new(config.upload_dir());
    let (_, stored) = process_upload(&build_pipeline(config)?, &store, &file_name, &raw, name, title)
        .with_context(|| format!("Failed to process {}", input.display()))?;

    println!("{}", stored.gpx_path.display());
    println!("{}", stored.html_path.display());
    Ok(())
}

fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let options = config.pipeline().clone();
    if !options.resolve_elevation {
        return Ok(Pipeline::new(options, NoElevation));
    }
    let source = HttpElevationSource::new(config.elevation_endpoint(), config.elevation_timeout())
        .context("Failed to build elevation HTTP client")?;
    Ok(Pipeline::new(options, source))
}

fn read_input(input: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(input).with_context(|| format!("Failed to read {}", input.display()))
}

fn log_config(config: &Config) {
    let opts = config.pipeline();
    info!(
        config_file = %config.config_file(),
        upload_dir = %config.upload_dir().display(),
        elevation_endpoint = %config.elevation_endpoint(),
        timeout_ms = config.elevation_timeout().as_millis() as u64,
        resolve_elevation = opts.resolve_elevation,
        normalize_namespaces = opts.normalize_namespaces,
        strip_extensions = opts.strip_extensions,
        compute_distance = opts.compute_distance,
        distance_mode = ?opts.distance_mode,
        "config_loaded"
    );
}
