mod config;
mod decode;
mod info;
mod monitor;
mod output;

use std::{io::stderr, path::PathBuf, time::Duration};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor a live sensor stream.
    ///
    /// Reads from a serial device, a capture file, or stdin when the input is `-`.
    /// The serial device must already be configured, e.g., using stty, preferably
    /// with a read timeout. Alerts and command frames are printed as they are seen,
    /// followed by a summary once the input ends.
    Monitor {
        /// Serial device, capture file, or `-` for stdin.
        input: PathBuf,

        /// How often, in milliseconds, to process data read from the input.
        #[arg(short, long, default_value = "100", value_name = "ms")]
        interval_ms: u64,

        /// JSON file with session settings. Unset settings use their defaults.
        #[arg(short, long, value_name = "path")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,

        /// Also print every decoded telemetry record.
        #[arg(short, long, action)]
        records: bool,
    },
    /// Decode every frame in a capture file.
    Decode {
        /// Input capture file
        input: PathBuf,

        /// Output format; json writes one object per line.
        #[arg(short, long, default_value = "text")]
        format: info::Format,

        /// JSON file with session settings.
        #[arg(short, long, value_name = "path")]
        config: Option<PathBuf>,
    },
    /// Show statistics and behavior summary for a capture file.
    Info {
        /// Input capture file
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,

        /// JSON file with session settings.
        #[arg(short, long, value_name = "path")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("LD2412_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Monitor {
            input,
            interval_ms,
            config,
            format,
            records,
        } => {
            if interval_ms == 0 {
                bail!("--interval-ms must be greater than 0");
            }
            let config = config::load(config.as_deref())?;
            let opts = monitor::Options {
                interval: Duration::from_millis(interval_ms),
                format,
                records,
            };
            monitor::monitor(&input, config, &opts)
        }
        Commands::Decode {
            input,
            format,
            config,
        } => {
            let config = config::load(config.as_deref())?;
            decode::decode(&input, &format, &config)
        }
        Commands::Info {
            input,
            format,
            config,
        } => {
            let config = config::load(config.as_deref())?;
            info::info(&input, &format, config)
        }
    }
}
