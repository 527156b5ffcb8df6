//! Batch progress reporting.
//!
//! Reports per-record progress and a running throughput estimate during
//! `stacload process`, so operators can see how far a long batch has come
//! and how long the rest will take. Progress is emitted on **stderr** so
//! stdout stays reserved for the final report.

use std::io::Write;
use std::time::Duration;

/// A single progress event for a batch.
#[derive(Clone, Debug)]
pub enum BatchProgressEvent {
    /// The to-do list was read and reduced by the done ledger.
    Loaded { total: u64, already_done: u64 },
    /// Record `n` of `total` is about to be fetched.
    Processing { n: u64, total: u64, image_id: String },
    /// Running estimate after a record finished.
    Throughput { elapsed: Duration, seconds_per_record: f64 },
}

/// Reports batch progress. Implementations write to stderr (human or JSON).
pub trait BatchProgressReporter: Send + Sync {
    fn report(&self, event: BatchProgressEvent);
}

/// Human-friendly progress on stderr: "processing 1,234 / 5,000  <id>".
pub struct StderrProgress;

impl BatchProgressReporter for StderrProgress {
    fn report(&self, event: BatchProgressEvent) {
        let line = match &event {
            BatchProgressEvent::Loaded {
                total,
                already_done,
            } => format!(
                "loaded  {} to process  ({} already done)\n",
                format_number(*total),
                format_number(*already_done)
            ),
            BatchProgressEvent::Processing { n, total, image_id } => format!(
                "processing  {} / {}  {}\n",
                format_number(*n),
                format_number(*total),
                image_id
            ),
            BatchProgressEvent::Throughput {
                elapsed,
                seconds_per_record,
            } => format!(
                "elapsed  {}  seconds per image  {:.3}\n",
                format_elapsed(*elapsed),
                seconds_per_record
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl BatchProgressReporter for JsonProgress {
    fn report(&self, event: BatchProgressEvent) {
        let obj = match &event {
            BatchProgressEvent::Loaded {
                total,
                already_done,
            } => serde_json::json!({
                "event": "progress",
                "phase": "loaded",
                "total": total,
                "already_done": already_done
            }),
            BatchProgressEvent::Processing { n, total, image_id } => serde_json::json!({
                "event": "progress",
                "phase": "processing",
                "n": n,
                "total": total,
                "image_id": image_id
            }),
            BatchProgressEvent::Throughput {
                elapsed,
                seconds_per_record,
            } => serde_json::json!({
                "event": "progress",
                "phase": "throughput",
                "elapsed_secs": elapsed.as_secs_f64(),
                "seconds_per_record": seconds_per_record
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BatchProgressReporter for NoProgress {
    fn report(&self, _event: BatchProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// `H:MM:SS.mmm`
pub fn format_elapsed(d: Duration) -> String {
    let total = d.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        total / 3600,
        (total / 60) % 60,
        total % 60,
        d.subsec_millis()
    )
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn BatchProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn format_elapsed_hms() {
        assert_eq!(format_elapsed(Duration::from_millis(0)), "0:00:00.000");
        assert_eq!(format_elapsed(Duration::from_millis(61_250)), "0:01:01.250");
        assert_eq!(format_elapsed(Duration::from_secs(3 * 3600 + 7)), "3:00:07.000");
    }
}
