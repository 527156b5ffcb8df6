//! Command entry points.
//!
//! Wires configuration, credentials, the inventory client and a sink
//! together for each `stacload` subcommand. Library users who want a
//! different source or sink build a [`BatchRunner`] directly.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::batch::{print_report, BatchOptions, BatchRunner, LedgerFiles};
use crate::config::Config;
use crate::fetch::{FetchOrchestrator, FetchOutcome};
use crate::inventory::InventoryClient;
use crate::ledger;
use crate::models::FeatureCollection;
use crate::normalize::{build_item, NormalizeOptions};
use crate::progress::ProgressMode;
use crate::sink::{render, FolderSink, QueueSink, Sink};
use crate::sqs::{AwsCredentials, SqsQueue};
use crate::token::{StaticToken, TokenManager, TokenProvider};

/// Where finished items go. Exactly one per run.
#[derive(Debug, Clone)]
pub enum Destination {
    Folder(PathBuf),
    Queue(String),
}

/// Use a fixed bearer when one is given, otherwise exchange credentials.
pub fn token_provider(config: &Config, token: Option<String>) -> Box<dyn TokenProvider> {
    match token {
        Some(t) => Box::new(StaticToken(t)),
        None => Box::new(TokenManager::from_config(&config.auth)),
    }
}

pub fn open_sink(config: &Config, destination: &Destination) -> Result<Box<dyn Sink>> {
    Ok(match destination {
        Destination::Folder(folder) => Box::new(FolderSink::new(folder)?),
        Destination::Queue(url) => {
            let queue = SqsQueue::new(
                url,
                config.queue.region.as_deref(),
                AwsCredentials::from_env()?,
            )?;
            Box::new(QueueSink::new(queue))
        }
    })
}

pub async fn run_list_images(config: &Config, output: &Path, token: Option<String>) -> Result<()> {
    let mut tokens = token_provider(config, token);
    let client = InventoryClient::new(&config.inventory)?;

    let token = tokens.get_token().await?;
    let ids = client.list_images(&token, &config.selection).await?;
    ledger::write_id_list(output, &ids)?;
    info!(count = ids.len(), path = %output.display(), "wrote image list");

    println!("list-images");
    println!("  selected: {}", ids.len());
    println!("  written to: {}", output.display());
    println!("ok");
    Ok(())
}

pub async fn run_process(
    config: &Config,
    files: &LedgerFiles,
    destination: &Destination,
    options: &BatchOptions,
    token: Option<String>,
    progress: ProgressMode,
) -> Result<()> {
    let mut tokens = token_provider(config, token);
    let normalize = NormalizeOptions::from_config(&config.normalize, &config.catalog.url);
    let orchestrator = FetchOrchestrator::new(
        InventoryClient::new(&config.inventory)?,
        config.inventory.concurrency,
        normalize.stereo,
    );
    let sink = open_sink(config, destination)?;
    let reporter = progress.reporter();

    let mut runner = BatchRunner {
        orchestrator: &orchestrator,
        tokens: tokens.as_mut(),
        sink: sink.as_ref(),
        normalize: &normalize,
        progress: reporter.as_ref(),
    };
    let report = runner.run(files, options).await?;
    print_report(&options.catalog, &report);
    Ok(())
}

/// Fetch and normalize one record and print it, without touching any
/// ledger or sink.
pub async fn run_show(
    config: &Config,
    image_id: &str,
    catalog: &str,
    token: Option<String>,
) -> Result<()> {
    let mut tokens = token_provider(config, token);
    let normalize = NormalizeOptions::from_config(&config.normalize, &config.catalog.url);
    let orchestrator = FetchOrchestrator::new(
        InventoryClient::new(&config.inventory)?,
        config.inventory.concurrency,
        normalize.stereo,
    );

    let fragments = match orchestrator.fetch_all(tokens.as_mut(), image_id).await? {
        FetchOutcome::Fetched(fragments) => fragments,
        FetchOutcome::Skipped(reason) => bail!("{} skipped: {}", image_id, reason),
        FetchOutcome::Failed(e) => return Err(e.into()),
    };
    let (item, attachments) = build_item(
        &fragments.image,
        &fragments.points,
        &fragments.cloud,
        fragments.stereo.as_ref(),
        catalog,
        &normalize,
    )?;
    println!("{}", render(&FeatureCollection::single(item, attachments))?);
    Ok(())
}
