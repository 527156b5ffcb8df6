//! # STAC Inventory Loader CLI (`stacload`)
//!
//! ## Usage
//!
//! ```bash
//! stacload [--config ./stacload.toml] [--progress human] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stacload list-images <FILE>` | Write every selected image identifier to a file |
//! | `stacload process ...` | Convert a to-do list into STAC items, resumably |
//! | `stacload show <ID>` | Print the STAC item for one image |
//!
//! ## Examples
//!
//! ```bash
//! # Build the to-do list
//! stacload list-images all.txt
//!
//! # Write one file per image, stopping after 100
//! stacload process --todo-file all.txt --done-file done.txt \
//!     --error-file errors.txt --catalog wv04 --stac-folder out/ --max-images 100
//!
//! # Publish to a queue instead
//! stacload process --todo-file all.txt --done-file done.txt \
//!     --error-file errors.txt --catalog wv04 \
//!     --queue-url https://sqs.us-east-1.amazonaws.com/123456789012/stac-items
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use stac_loader::batch::{BatchOptions, LedgerFiles};
use stac_loader::config;
use stac_loader::ingest::{self, Destination};
use stac_loader::progress::ProgressMode;

/// Load satellite image metadata from inventory as STAC items.
#[derive(Parser)]
#[command(
    name = "stacload",
    about = "Load satellite image metadata from inventory as STAC items",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Batch progress on stderr. Defaults to `human` on a terminal, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select all image identifiers and write them one per line.
    ListImages {
        /// Output file.
        file: PathBuf,

        /// Bearer token to use instead of a credential exchange.
        #[arg(long)]
        token: Option<String>,
    },

    /// Process a to-do list, skipping identifiers already in the done file.
    ///
    /// Every identifier with a final outcome is appended to the done file;
    /// skipped and failed ones are also appended to the error file with a
    /// category tag. Rerunning with the same files resumes where the last
    /// run stopped.
    #[command(group(
        ArgGroup::new("destination")
            .required(true)
            .multiple(false)
            .args(["stac_folder", "queue_url"])
    ))]
    Process {
        /// Identifiers to process, one per line.
        #[arg(long)]
        todo_file: PathBuf,

        /// Append-only list of finished identifiers.
        #[arg(long)]
        done_file: PathBuf,

        /// Append-only list of `<id> <category>` for skipped or failed records.
        #[arg(long)]
        error_file: PathBuf,

        /// Catalog name for self links and the queue `catalog` attribute.
        #[arg(long)]
        catalog: String,

        /// Write one `<id>.geojson` per record into this folder.
        #[arg(long)]
        stac_folder: Option<PathBuf>,

        /// Publish one message per record to this SQS queue.
        #[arg(long)]
        queue_url: Option<String>,

        /// Stop after attempting this many records. 0 means no cap.
        #[arg(long)]
        max_images: Option<usize>,

        /// Bearer token to use instead of a credential exchange.
        #[arg(long)]
        token: Option<String>,
    },

    /// Fetch one image and print its STAC FeatureCollection.
    Show {
        /// Image identifier.
        id: String,

        /// Catalog name for the self link.
        #[arg(long)]
        catalog: String,

        /// Bearer token to use instead of a credential exchange.
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_or_default(cli.config.as_deref())?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::ListImages { file, token } => {
            ingest::run_list_images(&cfg, &file, token).await?;
        }
        Commands::Process {
            todo_file,
            done_file,
            error_file,
            catalog,
            stac_folder,
            queue_url,
            max_images,
            token,
        } => {
            let destination = match (stac_folder, queue_url) {
                (Some(folder), None) => Destination::Folder(folder),
                (None, Some(url)) => Destination::Queue(url),
                // The argument group rejects every other combination.
                _ => anyhow::bail!("exactly one of --stac-folder or --queue-url is required"),
            };
            let files = LedgerFiles {
                todo: todo_file,
                done: done_file,
                error: error_file,
            };
            let options = BatchOptions::new(catalog, max_images);
            ingest::run_process(&cfg, &files, &destination, &options, token, progress).await?;
        }
        Commands::Show { id, catalog, token } => {
            ingest::run_show(&cfg, &id, &catalog, token).await?;
        }
    }

    Ok(())
}
