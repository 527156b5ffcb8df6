//! Checkpoint files for resumable batches.
//!
//! Three plain-text, newline-delimited files drive a batch:
//!
//! - **to-do**: identifiers to process, in order (input, never written)
//! - **done**: identifiers whose outcome is final; append-only
//! - **error**: `"<id> <category>"` for records that were skipped or
//!   failed; append-only
//!
//! Both output files are held open in append mode for the whole run and
//! flushed after every line, so a crash loses at most the record in flight.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Read a newline-delimited identifier list, skipping blank lines.
pub fn read_id_list(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut ids = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        let id = line.trim();
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// Read the done ledger. A missing file means nothing is done yet.
pub fn read_done(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    Ok(read_id_list(path)?.into_iter().collect())
}

/// Identifiers from `todo` not in `done`, in to-do order, each once.
pub fn remaining(todo: Vec<String>, done: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    todo.into_iter()
        .filter(|id| !done.contains(id) && seen.insert(id.clone()))
        .collect()
}

/// Write identifiers one per line, replacing the file.
pub fn write_id_list(path: &Path, ids: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut content = ids.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Open append-only done/error files for one run.
pub struct Ledger {
    done_path: PathBuf,
    done: File,
    error_path: PathBuf,
    errors: File,
}

impl Ledger {
    pub fn open(done_path: &Path, error_path: &Path) -> Result<Self> {
        Ok(Self {
            done: open_append(done_path)?,
            done_path: done_path.to_path_buf(),
            errors: open_append(error_path)?,
            error_path: error_path.to_path_buf(),
        })
    }

    pub fn mark_done(&mut self, image_id: &str) -> Result<()> {
        append_line(&mut self.done, &self.done_path, image_id)
    }

    pub fn record_error(&mut self, image_id: &str, category: &str) -> Result<()> {
        append_line(
            &mut self.errors,
            &self.error_path,
            &format!("{} {}", image_id, category),
        )
    }
}

fn open_append(path: &Path) -> Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open ledger {}", path.display()))?;
    terminate_last_line(&mut file)
        .with_context(|| format!("Failed to repair ledger {}", path.display()))?;
    Ok(file)
}

/// End a non-empty file with a newline so the next append starts a line.
fn terminate_last_line(file: &mut File) -> std::io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
        file.flush()?;
    }
    Ok(())
}

fn append_line(file: &mut File, path: &Path, line: &str) -> Result<()> {
    file.write_all(format!("{}\n", line).as_bytes())
        .and_then(|_| file.flush())
        .with_context(|| format!("Failed to append to ledger {}", path.display()))
}
