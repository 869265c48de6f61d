//! File-backed progress store
//!
//! The ledger is read once at startup and rewritten in full after every page.
//! Writes go to a sibling temp file which is synced and renamed over the
//! ledger, so a reader sees either the previous or the new document.

use crate::progress::{ChannelProgress, ProgressLedger};
use crate::{ArchiveError, ProgressError, ProgressResult};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Durable store for the progress ledger
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    /// Creates a store backed by the JSON file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the ledger, returning an empty ledger if none has been saved yet
    ///
    /// Creates the containing directory if it does not exist. A file that
    /// cannot be read, does not parse, or violates checkpoint invariants is an
    /// error; existing history is never discarded.
    pub fn load(&self) -> Result<ProgressLedger, ArchiveError> {
        self.ensure_parent_dir()?;

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    "No progress ledger at {}, starting fresh",
                    self.path.display()
                );
                return Ok(ProgressLedger::new());
            }
            Err(source) => return Err(self.io_error(source).into()),
        };

        let ledger: ProgressLedger =
            serde_json::from_str(&content).map_err(|source| ProgressError::Corrupt {
                path: self.path.display().to_string(),
                source,
            })?;

        ledger.validate()?;

        tracing::debug!(
            "Loaded progress for {} channels from {}",
            ledger.len(),
            self.path.display()
        );
        Ok(ledger)
    }

    /// Overwrites the ledger file with `ledger`
    pub fn save(&self, ledger: &ProgressLedger) -> ProgressResult<()> {
        self.ensure_parent_dir()?;

        let temp_path = self.temp_path();
        {
            let file = File::create(&temp_path).map_err(|e| self.io_error(e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, ledger)?;
            writer.write_all(b"\n").map_err(|e| self.io_error(e))?;
            writer.flush().map_err(|e| self.io_error(e))?;
            writer.get_ref().sync_all().map_err(|e| self.io_error(e))?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    /// Returns the checkpoint for a channel, or the zero value if it has none
    pub fn get_or_default(ledger: &ProgressLedger, channel_id: &str) -> ChannelProgress {
        ledger.get_or_default(channel_id)
    }

    fn ensure_parent_dir(&self) -> ProgressResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "progress.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> ProgressError {
        ProgressError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
