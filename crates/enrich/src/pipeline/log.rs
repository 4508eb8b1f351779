//! Append-only enriched log (newline-delimited JSON).
//!
//! Each line holds one [`EnrichedRecord`]. The log is the only durable
//! progress marker of the enrichment stage: the set of emails it contains
//! decides which profiles a re-run skips.

use std::collections::HashSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use segment_enrich_core::{Email, EnrichedRecord};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// Errors reading or appending to the enriched log.
#[derive(Debug, Error)]
pub enum LogError {
    /// Filesystem operation failed.
    #[error("Enriched log I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be serialized.
    #[error("Failed to serialize enriched record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LogError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the log file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Counters from a pass over the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogStats {
    /// Lines parsed into records.
    pub records: usize,
    /// Non-blank lines that were not valid records.
    pub malformed: usize,
}

/// Stream every valid record of the log at `path` into `on_record`.
///
/// Blank lines are ignored; malformed lines are logged and skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub async fn scan_log<F>(path: &Path, mut on_record: F) -> Result<LogStats, LogError>
where
    F: FnMut(EnrichedRecord),
{
    let file = File::open(path).await.map_err(|e| LogError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();
    let mut stats = LogStats::default();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await.map_err(|e| LogError::io(path, e))? {
        line_number += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<EnrichedRecord>(trimmed) {
            Ok(record) => {
                stats.records += 1;
                on_record(record);
            }
            Err(e) => {
                stats.malformed += 1;
                warn!(path = %path.display(), line = line_number, error = %e, "Ignoring malformed log line");
            }
        }
    }

    Ok(stats)
}

/// Read all valid records of the log.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub async fn read_log(path: &Path) -> Result<Vec<EnrichedRecord>, LogError> {
    let mut records = Vec::new();
    scan_log(path, |record| records.push(record)).await?;
    Ok(records)
}

/// Emails already present in the enriched log.
#[derive(Debug, Clone, Default)]
pub struct ProcessedEmails {
    emails: HashSet<Email>,
}

impl ProcessedEmails {
    /// Load the set from the log at `path`. A missing log yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing log cannot be read.
    pub async fn load(path: &Path) -> Result<Self, LogError> {
        let mut emails = HashSet::new();
        match scan_log(path, |record| {
            emails.insert(record.email);
        })
        .await
        {
            Ok(stats) => {
                info!(
                    path = %path.display(),
                    records = stats.records,
                    malformed = stats.malformed,
                    unique_emails = emails.len(),
                    "Loaded already-processed emails"
                );
            }
            Err(e) if e.is_not_found() => {
                info!(path = %path.display(), "No enriched log yet, starting fresh");
            }
            Err(e) => return Err(e),
        }
        Ok(Self { emails })
    }

    /// Whether `email` already has a record.
    #[must_use]
    pub fn contains(&self, email: &Email) -> bool {
        self.emails.contains(email)
    }

    /// Mark `email` as processed. Returns `false` if it already was.
    pub fn insert(&mut self, email: Email) -> bool {
        self.emails.insert(email)
    }

    /// Number of processed emails.
    #[must_use]
    pub fn len(&self) -> usize {
        self.emails.len()
    }

    /// Whether no email has been processed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Appends records to the enriched log, one JSON object per line.
#[derive(Debug)]
pub struct EnrichedLogWriter {
    file: File,
    path: PathBuf,
}

impl EnrichedLogWriter {
    /// Open (or create) the log for appending.
    ///
    /// A log whose last line was cut off by an interrupted write is
    /// terminated first, so the next record starts on its own line.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub async fn open(path: &Path) -> Result<Self, LogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LogError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| LogError::io(path, e))?;

        if ends_mid_line(&mut file)
            .await
            .map_err(|e| LogError::io(path, e))?
        {
            warn!(path = %path.display(), "Enriched log ends with a partial line, terminating it");
            file.write_all(b"\n")
                .await
                .map_err(|e| LogError::io(path, e))?;
            file.flush().await.map_err(|e| LogError::io(path, e))?;
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Append one record and flush it to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn append(&mut self, record: &EnrichedRecord) -> Result<(), LogError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        self.file
            .write_all(&line)
            .await
            .map_err(|e| LogError::io(&self.path, e))?;
        self.file
            .flush()
            .await
            .map_err(|e| LogError::io(&self.path, e))
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether a non-empty file lacks a trailing newline.
async fn ends_mid_line(file: &mut File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last != *b"\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use segment_enrich_core::{OrderSummary, ProfileId};

    use super::*;

    fn record(email: &str) -> EnrichedRecord {
        EnrichedRecord {
            profile_id: ProfileId::new("P"),
            email: Email::parse(email).unwrap(),
            first_name: None,
            last_name: None,
            most_recent_order: Some(OrderSummary::from_parts(Some("A"), Some("1"), None)),
        }
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/enriched.ndjson");

        let mut writer = EnrichedLogWriter::open(&path).await.unwrap();
        writer.append(&record("a@x.io")).await.unwrap();
        writer.append(&record("b@x.io")).await.unwrap();
        drop(writer);

        // Reopening appends instead of truncating.
        let mut writer = EnrichedLogWriter::open(&path).await.unwrap();
        writer.append(&record("c@x.io")).await.unwrap();
        drop(writer);

        let records = read_log(&path).await.unwrap();
        let emails: Vec<_> = records.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, ["a@x.io", "b@x.io", "c@x.io"]);
    }

    #[tokio::test]
    async fn test_append_after_truncated_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.ndjson");
        let valid = serde_json::to_string(&record("a@x.io")).unwrap();
        tokio::fs::write(&path, format!("{valid}\n{{\"profileId\":\"P\",\"email\":\"b@x"))
            .await
            .unwrap();

        let mut writer = EnrichedLogWriter::open(&path).await.unwrap();
        writer.append(&record("c@x.io")).await.unwrap();
        drop(writer);

        let mut seen = Vec::new();
        let stats = scan_log(&path, |r| seen.push(r.email)).await.unwrap();

        assert_eq!(stats, LogStats { records: 2, malformed: 1 });
        let emails: Vec<_> = seen.iter().map(Email::as_str).collect();
        assert_eq!(emails, ["a@x.io", "c@x.io"]);
    }

    #[tokio::test]
    async fn test_append_after_record_missing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.ndjson");
        let valid = serde_json::to_string(&record("a@x.io")).unwrap();
        tokio::fs::write(&path, valid).await.unwrap();

        let mut writer = EnrichedLogWriter::open(&path).await.unwrap();
        writer.append(&record("b@x.io")).await.unwrap();
        drop(writer);

        let records = read_log(&path).await.unwrap();
        let emails: Vec<_> = records.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, ["a@x.io", "b@x.io"]);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_and_blank_lines_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.ndjson");
        let valid = serde_json::to_string(&record("a@x.io")).unwrap();
        tokio::fs::write(&path, format!("{valid}\n{{not json\n\n{{\"email\":\"x@y.z\"}}\n"))
            .await
            .unwrap();

        let mut seen = Vec::new();
        let stats = scan_log(&path, |r| seen.push(r.email)).await.unwrap();

        assert_eq!(stats, LogStats { records: 1, malformed: 2 });
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn test_processed_emails_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let processed = ProcessedEmails::load(&dir.path().join("absent.ndjson"))
            .await
            .unwrap();
        assert!(processed.is_empty());
    }

    #[tokio::test]
    async fn test_processed_emails_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.ndjson");
        tokio::fs::write(
            &path,
            "{\"profileId\":\"P\",\"email\":\"Ada@Example.com\",\"mostRecentOrder\":null}\n",
        )
        .await
        .unwrap();

        let processed = ProcessedEmails::load(&path).await.unwrap();
        assert!(processed.contains(&Email::parse("ada@example.com").unwrap()));
        assert_eq!(processed.len(), 1);
    }
}
