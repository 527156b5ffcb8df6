//! Resumable batch processing.
//!
//! A run moves through four phases:
//!
//! 1. **Loading**: read the to-do list and the done ledger; the work list is
//!    every to-do identifier not already done, in to-do order.
//! 2. **Processing**: one record at a time, fetch its fragments, build the
//!    item, write it to the sink, then record the outcome in the ledger.
//! 3. **Reporting**: return a [`BatchReport`]; the CLI prints it.
//! 4. **Terminal**.
//!
//! Every record with a final outcome (written, skipped, or failed) is
//! appended to the done ledger, so a rerun never revisits it. Skipped and
//! failed records are additionally logged to the error ledger with a
//! category tag. Two things end a run early: an authentication failure and
//! a sink failure. In both cases the record in flight is not marked done.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::fetch::{FetchOrchestrator, FetchOutcome};
use crate::inventory::MetadataSource;
use crate::ledger::{self, Ledger};
use crate::models::FeatureCollection;
use crate::normalize::{build_item, NormalizeOptions};
use crate::progress::{BatchProgressEvent, BatchProgressReporter};
use crate::sink::Sink;
use crate::token::TokenProvider;

/// The three checkpoint files of a run.
#[derive(Debug, Clone)]
pub struct LedgerFiles {
    pub todo: PathBuf,
    pub done: PathBuf,
    pub error: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Catalog name used in self links and as the queue message attribute.
    pub catalog: String,
    /// Stop after this many records have been attempted.
    pub max_records: Option<usize>,
}

impl BatchOptions {
    /// A cap of zero means no cap.
    pub fn new(catalog: impl Into<String>, max_records: Option<usize>) -> Self {
        Self {
            catalog: catalog.into(),
            max_records: max_records.filter(|&max| max > 0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Identifiers left after subtracting the done ledger.
    pub pending: usize,
    pub attempted: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Attempted records that did not produce an item.
    pub fn not_processed(&self) -> usize {
        self.skipped + self.failed
    }

    pub fn seconds_per_record(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.elapsed.as_secs_f64() / self.attempted as f64
        }
    }
}

/// Print the final report on stdout.
pub fn print_report(catalog: &str, report: &BatchReport) {
    println!("process {}", catalog);
    println!("  pending: {}", report.pending);
    println!("  attempted: {}", report.attempted);
    println!("  not processed: {}", report.not_processed());
    println!("  written: {}", report.written);
    println!(
        "  elapsed: {}",
        crate::progress::format_elapsed(report.elapsed)
    );
    println!("  seconds per image: {:.3}", report.seconds_per_record());
    println!("ok");
}

enum RecordOutcome {
    Written,
    Skipped(String),
    Failed(String),
}

pub struct BatchRunner<'a, S> {
    pub orchestrator: &'a FetchOrchestrator<S>,
    pub tokens: &'a mut dyn TokenProvider,
    pub sink: &'a dyn Sink,
    pub normalize: &'a NormalizeOptions,
    pub progress: &'a dyn BatchProgressReporter,
}

impl<'a, S: MetadataSource> BatchRunner<'a, S> {
    pub async fn run(&mut self, files: &LedgerFiles, options: &BatchOptions) -> Result<BatchReport> {
        let todo = ledger::read_id_list(&files.todo)?;
        let done = ledger::read_done(&files.done)?;
        let work = ledger::remaining(todo, &done);
        let mut ledger = Ledger::open(&files.done, &files.error)?;

        info!(
            pending = work.len(),
            already_done = done.len(),
            sink = %self.sink.describe(),
            "batch loaded"
        );
        self.progress.report(BatchProgressEvent::Loaded {
            total: work.len() as u64,
            already_done: done.len() as u64,
        });

        let start = Instant::now();
        let mut report = BatchReport {
            pending: work.len(),
            ..BatchReport::default()
        };

        for (index, image_id) in work.iter().enumerate() {
            if options.max_records.is_some_and(|max| report.attempted >= max) {
                info!(max = report.attempted, "record cap reached");
                break;
            }
            self.progress.report(BatchProgressEvent::Processing {
                n: index as u64 + 1,
                total: work.len() as u64,
                image_id: image_id.clone(),
            });

            report.attempted += 1;
            match self.process_one(image_id, &options.catalog).await? {
                RecordOutcome::Written => report.written += 1,
                RecordOutcome::Skipped(category) => {
                    ledger.record_error(image_id, &category)?;
                    report.skipped += 1;
                }
                RecordOutcome::Failed(category) => {
                    ledger.record_error(image_id, &category)?;
                    report.failed += 1;
                }
            }
            ledger.mark_done(image_id)?;

            report.elapsed = start.elapsed();
            self.progress.report(BatchProgressEvent::Throughput {
                elapsed: report.elapsed,
                seconds_per_record: report.seconds_per_record(),
            });
        }

        report.elapsed = start.elapsed();
        info!(
            attempted = report.attempted,
            written = report.written,
            skipped = report.skipped,
            failed = report.failed,
            "batch finished"
        );
        Ok(report)
    }

    async fn process_one(&mut self, image_id: &str, catalog: &str) -> Result<RecordOutcome> {
        let outcome = match self.orchestrator.fetch_all(&mut *self.tokens, image_id).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => {
                error!(image_id, error = %e, "stopping batch");
                bail!(e);
            }
            Err(e) => FetchOutcome::Failed(e),
        };

        let fragments = match outcome {
            FetchOutcome::Fetched(fragments) => fragments,
            FetchOutcome::Skipped(reason) => {
                info!(image_id, reason = %reason, "skipped");
                return Ok(RecordOutcome::Skipped(reason.ledger_category()));
            }
            FetchOutcome::Failed(e) => {
                warn!(image_id, error = %e, "fetch failed");
                return Ok(RecordOutcome::Failed(e.ledger_category()));
            }
        };

        let built = build_item(
            &fragments.image,
            &fragments.points,
            &fragments.cloud,
            fragments.stereo.as_ref(),
            catalog,
            self.normalize,
        );
        let (item, attachments) = match built {
            Ok(built) => built,
            Err(e) => {
                warn!(image_id, error = %e, "normalization failed");
                return Ok(RecordOutcome::Failed(e.ledger_category()));
            }
        };

        let collection = FeatureCollection::single(item, attachments);
        self.sink
            .write(catalog, &collection)
            .await
            .with_context(|| format!("Failed to write {} to {}", image_id, self.sink.describe()))?;
        Ok(RecordOutcome::Written)
    }
}
