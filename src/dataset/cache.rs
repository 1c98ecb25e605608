use crate::dataset::snapshot::{latest_snapshot, read_snapshot, SnapshotId};
use crate::error::Result;
use crate::models::SnapshotRow;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub id: SnapshotId,
    pub rows: Vec<SnapshotRow>,
}

/// Holds at most one loaded snapshot, keyed by its identity.
///
/// Nothing is loaded implicitly: callers `get_or_load` a specific snapshot or
/// `reload` the newest one, and `invalidate` to drop it.
#[derive(Debug)]
pub struct SnapshotCache {
    dir: PathBuf,
    current: Option<LoadedSnapshot>,
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: None,
        }
    }

    /// Load `id`, reusing the cached rows when it is already the current snapshot.
    pub fn get_or_load(&mut self, id: &SnapshotId) -> Result<&LoadedSnapshot> {
        let loaded = match self.current.take() {
            Some(loaded) if &loaded.id == id => {
                debug!(snapshot = %id.file_name, "Snapshot cache hit");
                loaded
            }
            previous => match read(id) {
                Ok(loaded) => loaded,
                Err(e) => {
                    self.current = previous;
                    return Err(e);
                }
            },
        };
        Ok(&*self.current.insert(loaded))
    }

    /// Re-read the newest snapshot on disk, replacing whatever is cached.
    pub fn reload(&mut self) -> Result<Option<&LoadedSnapshot>> {
        self.invalidate();
        match latest_snapshot(&self.dir)? {
            Some(id) => self.get_or_load(&id).map(Some),
            None => Ok(None),
        }
    }

    pub fn invalidate(&mut self) {
        if let Some(loaded) = self.current.take() {
            debug!(snapshot = %loaded.id.file_name, "Snapshot cache invalidated");
        }
    }
}

fn read(id: &SnapshotId) -> Result<LoadedSnapshot> {
    let rows = read_snapshot(&id.path)?;
    info!(snapshot = %id.file_name, rows = rows.len(), "Loaded snapshot");
    Ok(LoadedSnapshot {
        id: id.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::snapshot::write_rows;
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::tempdir;

    fn row(url: &str, price: i64) -> SnapshotRow {
        SnapshotRow {
            url: url.to_string(),
            price,
            ber: "B2".to_string(),
            postcode: "D06".to_string(),
            property_type: "Semi-Detached House".to_string(),
            bedrooms: Some(4),
            bathrooms: Some(3),
        }
    }

    fn write(dir: &Path, name: &str, rows: &[SnapshotRow]) -> SnapshotId {
        let path = dir.join(name);
        write_rows(File::create(&path).unwrap(), rows).unwrap();
        SnapshotId::from_path(&path).unwrap()
    }

    #[test]
    fn reload_picks_newest_snapshot() {
        let dir = tempdir().unwrap();
        write(dir.path(), "2024-03-08_properties.csv", &[row("a/", 1)]);
        let mut cache = SnapshotCache::new(dir.path());

        let loaded = cache.reload().unwrap().unwrap();
        assert_eq!(loaded.id.file_name, "2024-03-08_properties.csv");

        write(dir.path(), "2024-03-15_properties.csv", &[row("a/", 2), row("b/", 3)]);
        let loaded = cache.reload().unwrap().unwrap();
        assert_eq!(loaded.id.file_name, "2024-03-15_properties.csv");
        assert_eq!(loaded.rows.len(), 2);
    }

    #[test]
    fn get_or_load_reuses_cached_rows_until_invalidated() {
        let dir = tempdir().unwrap();
        let id = write(dir.path(), "2024-03-08_properties.csv", &[row("a/", 1)]);
        let mut cache = SnapshotCache::new(dir.path());
        cache.get_or_load(&id).unwrap();

        // Rewriting the file does not change what a cached id returns.
        write(dir.path(), "2024-03-08_properties.csv", &[row("a/", 9), row("b/", 9)]);
        assert_eq!(cache.get_or_load(&id).unwrap().rows.len(), 1);

        cache.invalidate();
        assert_eq!(cache.get_or_load(&id).unwrap().rows.len(), 2);
    }

    #[test]
    fn reload_rereads_even_when_newest_is_cached() {
        let dir = tempdir().unwrap();
        let id = write(dir.path(), "2024-03-08_properties.csv", &[row("a/", 1)]);
        let mut cache = SnapshotCache::new(dir.path());
        cache.get_or_load(&id).unwrap();

        write(dir.path(), "2024-03-08_properties.csv", &[row("a/", 9), row("b/", 9)]);
        assert_eq!(cache.reload().unwrap().unwrap().rows.len(), 2);
    }

    #[test]
    fn failed_load_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let id = write(dir.path(), "2024-03-08_properties.csv", &[row("a/", 1)]);
        let missing = SnapshotId::from_path(&dir.path().join("2024-03-09_properties.csv")).unwrap();
        let mut cache = SnapshotCache::new(dir.path());
        cache.get_or_load(&id).unwrap();

        assert!(cache.get_or_load(&missing).is_err());
        // Still served from memory after the file is gone.
        fs::remove_file(&id.path).unwrap();
        assert_eq!(cache.get_or_load(&id).unwrap().rows.len(), 1);
    }

    #[test]
    fn reload_with_no_snapshots_is_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("data.csv"), "url\n").unwrap();
        let mut cache = SnapshotCache::new(dir.path());
        assert!(cache.reload().unwrap().is_none());
    }
}
