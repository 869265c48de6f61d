use crate::archive::MessageRecord;
use crate::state::ChannelTarget;
use crate::ArchiveError;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Append-only message logs, one JSON record per line
///
/// Existing lines are never rewritten. Re-fetching a page after a crash
/// appends the same records again; readers must tolerate duplicates.
#[derive(Debug, Clone)]
pub struct MessageLog {
    root: PathBuf,
}

impl MessageLog {
    /// Creates a log set rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the log file for a channel
    pub fn channel_path(&self, target: &ChannelTarget) -> PathBuf {
        self.root
            .join(&target.server_id)
            .join(format!("{}.jsonl", target.channel_id))
    }

    /// Appends a batch of records to the channel's log and syncs it to disk
    ///
    /// Returns once the data is durable. An empty batch is a no-op.
    pub fn append(
        &self,
        target: &ChannelTarget,
        records: &[MessageRecord],
    ) -> Result<(), ArchiveError> {
        if records.is_empty() {
            return Ok(());
        }

        let path = self.channel_path(target);
        let log_error = |source: std::io::Error| ArchiveError::Log {
            channel_id: target.channel_id.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(log_error)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(log_error)?;

        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record)
                .map_err(|e| log_error(std::io::Error::from(e)))?;
            writer.write_all(b"\n").map_err(log_error)?;
        }
        writer.flush().map_err(log_error)?;
        writer.get_ref().sync_data().map_err(log_error)?;

        tracing::trace!(
            "Appended {} records to {}",
            records.len(),
            path.display()
        );
        Ok(())
    }

    /// Reads every record from a channel's log
    ///
    /// Used by tooling and tests; the crawl itself only appends.
    pub fn read_all(&self, target: &ChannelTarget) -> Result<Vec<MessageRecord>, ArchiveError> {
        let path = self.channel_path(target);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ArchiveError::Log {
                    channel_id: target.channel_id.clone(),
                    source,
                })
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| ArchiveError::Log {
                    channel_id: target.channel_id.clone(),
                    source: std::io::Error::from(e),
                })
            })
            .collect()
    }
}
