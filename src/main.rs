//! Headless demo driver for the gallery cache.
//!
//! Starts the cache against a media library and walks the slideshow from the
//! terminal; rendering belongs to the embedding frame application.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use gallery_cache::{CacheConfig, DecodedMedia, MediaCache};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "gallery-cache", about = "Photo-frame media cache demo")]
struct Cli {
    /// Media library root to scan
    library: PathBuf,

    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of items to pull before exiting
    #[arg(short = 'n', long, default_value_t = 20)]
    count: usize,

    /// Delay between items (ms)
    #[arg(long, value_name = "MILLIS", default_value_t = 1000)]
    delay_ms: u64,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(
        format!("gallery_cache={level}")
            .parse()
            .expect("valid log directive"),
    );
    fmt().with_env_filter(filter).with_target(true).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => gallery_cache::config::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CacheConfig::default(),
    };
    config.validate().context("validating configuration")?;

    let mut cache = MediaCache::new(config);
    cache.start(&cli.library)?;

    for shown in 0..cli.count {
        match cache.next() {
            Ok(item) => {
                let dims = item.decoded().map(DecodedMedia::dimensions);
                info!(location = %item.location(), kind = ?item.kind(), ?dims, shown, "showing");
            }
            Err(err) => {
                warn!(error = %err, "nothing to show");
                break;
            }
        }
        thread::sleep(Duration::from_millis(cli.delay_ms));
    }
    cache.stop();
    Ok(())
}
