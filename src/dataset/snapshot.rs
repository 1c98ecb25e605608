//! Dated snapshot files: discovery, reading and crash-safe writing.
//!
//! A snapshot is written to `<name>.tmp`, synced and renamed into place; only
//! then is the working file removed. If a run dies between the rename and the
//! removal, the next `publish` merges the same working rows again, which the
//! last-write-wins dedup makes harmless. If the write itself fails the working
//! file is untouched and `publish` can simply be re-run.

use crate::error::{PipelineError, Result};
use crate::models::SnapshotRow;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SNAPSHOT_SUFFIX: &str = "_properties.csv";

/// Identity of one published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId {
    pub file_name: String,
    pub date: Option<NaiveDate>,
    pub path: PathBuf,
}

impl SnapshotId {
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let stem = file_name.strip_suffix(SNAPSHOT_SUFFIX)?;
        Some(Self {
            date: NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok(),
            file_name,
            path: path.to_path_buf(),
        })
    }
}

pub fn snapshot_file_name(date: NaiveDate) -> String {
    format!("{}{SNAPSHOT_SUFFIX}", date.format("%Y-%m-%d"))
}

/// Every snapshot in `dir`, oldest first. A missing directory has none.
pub fn list_snapshots(dir: &Path) -> Result<Vec<SnapshotId>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(id) = SnapshotId::from_path(&path) {
                ids.push(id);
            }
        }
    }
    ids.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(ids)
}

pub fn latest_snapshot(dir: &Path) -> Result<Option<SnapshotId>> {
    Ok(list_snapshots(dir)?.pop())
}

pub fn read_snapshot(path: &Path) -> Result<Vec<SnapshotRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<SnapshotRow>, _>>()?;
    Ok(rows)
}

/// Read every snapshot in `dir`, oldest first.
pub fn read_all_snapshots(dir: &Path) -> Result<Vec<Vec<SnapshotRow>>> {
    list_snapshots(dir)?
        .iter()
        .map(|id| read_snapshot(&id.path))
        .collect()
}

/// Serialize rows as snapshot CSV. The header is always present.
pub fn write_rows<W: Write>(out: W, rows: &[SnapshotRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(SnapshotRow::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `rows` to `path` via a temporary sibling file and a rename.
pub fn write_snapshot(path: &Path, rows: &[SnapshotRow]) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    let snapshot_error = |source: std::io::Error| PipelineError::SnapshotWrite {
        path: path.to_path_buf(),
        source,
    };

    let write_tmp = || -> Result<()> {
        let mut file = File::create(&tmp)?;
        write_rows(&mut file, rows)?;
        file.sync_all()?;
        Ok(())
    };

    if let Err(e) = write_tmp() {
        let _ = fs::remove_file(&tmp);
        return Err(match e {
            PipelineError::Io(source) => snapshot_error(source),
            PipelineError::Csv(err) => snapshot_error(err.into()),
            other => other,
        });
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(snapshot_error(e));
    }
    Ok(())
}

/// Publishes merged rows as today's snapshot and retires the working file.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    data_dir: PathBuf,
    working_file: PathBuf,
}

impl SnapshotWriter {
    pub fn new(data_dir: impl Into<PathBuf>, working_file: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            working_file: working_file.into(),
        }
    }

    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(snapshot_file_name(date))
    }

    /// Write the snapshot for `date`, then delete the working file.
    ///
    /// The working file is only removed after the snapshot is fully on disk.
    pub fn publish(&self, rows: &[SnapshotRow], date: NaiveDate) -> Result<PathBuf> {
        fs::create_dir_all(&self.data_dir).map_err(|source| PipelineError::SnapshotWrite {
            path: self.data_dir.clone(),
            source,
        })?;

        let path = self.snapshot_path(date);
        write_snapshot(&path, rows)?;
        info!(path = %path.display(), rows = rows.len(), "Wrote snapshot");

        match fs::remove_file(&self.working_file) {
            Ok(()) => info!(path = %self.working_file.display(), "Removed working file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.working_file.display(), "No working file to remove")
            }
            Err(e) => return Err(e.into()),
        }

        Ok(path)
    }
}
