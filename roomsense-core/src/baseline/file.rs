//! File-backed baseline log
//!
//! One JSON object per line, appended and synced on every write:
//!
//! ```json
//! {"version":1,"captured_at":1700000000000,"datetime":"2023-11-14T22:13:20Z","eco2_base":37195,"tvoc_base":37419,"is_calibrating":false}
//! ```
//!
//! ## Crash tolerance
//!
//! A power cut can leave a torn last line. Readers skip any line that does
//! not decode to a complete record of a known version, so the previous
//! complete record stays retrievable. Writers start a fresh line when the
//! file does not end in a newline, so a torn tail never glues onto the next
//! record.
//!
//! Records are addressed by content (`captured_at`), never by line position.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{newest, BaselineSnapshot, BaselineStore};
use crate::errors::StoreError;
use crate::time::{to_rfc3339, Timestamp};

/// Current on-disk record layout
pub const RECORD_VERSION: u32 = 1;

/// On-disk record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BaselineRecord {
    version: u32,
    captured_at: Timestamp,
    /// Informational only, never parsed back
    #[serde(default)]
    datetime: String,
    eco2_base: u16,
    tvoc_base: u16,
    is_calibrating: bool,
}

impl From<&BaselineSnapshot> for BaselineRecord {
    fn from(s: &BaselineSnapshot) -> Self {
        Self {
            version: RECORD_VERSION,
            captured_at: s.captured_at,
            datetime: to_rfc3339(s.captured_at),
            eco2_base: s.eco2_base,
            tvoc_base: s.tvoc_base,
            is_calibrating: s.is_calibrating,
        }
    }
}

impl From<BaselineRecord> for BaselineSnapshot {
    fn from(r: BaselineRecord) -> Self {
        Self {
            eco2_base: r.eco2_base,
            tvoc_base: r.tvoc_base,
            captured_at: r.captured_at,
            is_calibrating: r.is_calibrating,
        }
    }
}

/// Summary of a full scan of the log
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    /// Complete records decoded
    pub records: usize,
    /// Lines skipped (torn, corrupt or unknown version)
    pub skipped: usize,
}

/// JSON-lines baseline store
///
/// ## Example
///
/// ```rust,no_run
/// use roomsense_core::baseline::{BaselineSnapshot, BaselineStore, JsonLinesBaselineStore};
/// use roomsense_core::traits::Baseline;
///
/// let mut store = JsonLinesBaselineStore::new("baseline.jsonl");
/// let snapshot = BaselineSnapshot::new(Baseline { eco2: 37195, tvoc: 37419 }, 1_700_000_000_000, false);
/// store.append(&snapshot)?;
/// assert_eq!(store.latest()?, Some(snapshot));
/// # Ok::<(), roomsense_core::errors::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonLinesBaselineStore {
    path: PathBuf,
}

impl JsonLinesBaselineStore {
    /// Store at `path`; the file is created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File backing the store
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every complete record in append order, with scan statistics
    pub fn scan(&self) -> Result<(Vec<BaselineSnapshot>, ScanStats), StoreError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Vec::new(), ScanStats::default()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut snapshots = Vec::new();
        let mut stats = ScanStats::default();

        // Split on raw bytes: a torn tail may end mid-character
        for (line_no, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<BaselineRecord>(&line) {
                Ok(record) if record.version == RECORD_VERSION => {
                    stats.records += 1;
                    snapshots.push(record.into());
                }
                Ok(record) => {
                    stats.skipped += 1;
                    log::warn!(
                        "{}:{}: skipping record with unknown version {}",
                        self.path.display(),
                        line_no + 1,
                        record.version
                    );
                }
                Err(e) => {
                    stats.skipped += 1;
                    log::warn!(
                        "{}:{}: skipping unreadable record: {}",
                        self.path.display(),
                        line_no + 1,
                        e
                    );
                }
            }
        }

        Ok((snapshots, stats))
    }

    /// Whether the file is non-empty and lacks a trailing newline
    fn has_torn_tail(file: &mut File) -> Result<bool, StoreError> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(false);
        }

        file.seek(SeekFrom::Start(len - 1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(last[0] != b'\n')
    }
}

impl BaselineStore for JsonLinesBaselineStore {
    fn append(&mut self, snapshot: &BaselineSnapshot) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut buf = Vec::with_capacity(160);
        if Self::has_torn_tail(&mut file)? {
            buf.push(b'\n');
        }
        serde_json::to_writer(&mut buf, &BaselineRecord::from(snapshot))
            .map_err(|e| StoreError::Encoding(e.to_string()))?;
        buf.push(b'\n');

        // Single write so a record is either whole or a torn tail
        file.write_all(&buf)?;
        file.sync_data()?;

        log::debug!(
            "appended baseline eco2={} tvoc={} calibrating={} to {}",
            snapshot.eco2_base,
            snapshot.tvoc_base,
            snapshot.is_calibrating,
            self.path.display()
        );
        Ok(())
    }

    fn latest(&self) -> Result<Option<BaselineSnapshot>, StoreError> {
        let (snapshots, _) = self.scan()?;
        Ok(newest(snapshots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Baseline;

    fn snap(eco2: u16, at: Timestamp, calibrating: bool) -> BaselineSnapshot {
        BaselineSnapshot::new(Baseline { eco2, tvoc: 40_000 }, at, calibrating)
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLinesBaselineStore::new(dir.path().join("nope.jsonl"));
        assert_eq!(store.latest().unwrap(), None);
    }

    #[test]
    fn record_carries_datetime_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.jsonl");
        let mut store = JsonLinesBaselineStore::new(&path);
        store.append(&snap(37195, 1_700_000_000_000, true)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\"version\":1"));
        assert!(text.contains("\"datetime\":\"2023-11-14T22:13:20Z\""));
        assert!(text.contains("\"is_calibrating\":true"));
    }
}
