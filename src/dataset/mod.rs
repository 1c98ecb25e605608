pub mod cache;
pub mod merge;
pub mod snapshot;
pub mod working;

use crate::error::Result;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

pub use cache::SnapshotCache;
pub use merge::{dedup_keep_last, merge, MergeStats};
pub use snapshot::SnapshotWriter;

/// Result of publishing one run.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub path: PathBuf,
    pub stats: MergeStats,
}

/// Merge every published snapshot with the working file and publish the
/// result as the snapshot for `date`.
///
/// Works with no history and no working rows: the result is a header-only snapshot.
pub fn publish(data_dir: &Path, working_file: &Path, date: NaiveDate) -> Result<PublishReport> {
    let historical = snapshot::read_all_snapshots(data_dir)?;
    let new_records = working::read_records(working_file)?;
    info!(
        snapshots = historical.len(),
        working = new_records.len(),
        "Publishing dataset"
    );

    let outcome = merge(historical, new_records);
    let path = SnapshotWriter::new(data_dir, working_file).publish(&outcome.rows, date)?;

    Ok(PublishReport {
        path,
        stats: outcome.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingRecord;
    use std::fs;
    use tempfile::tempdir;

    fn listing(id: u32, price: i64) -> ListingRecord {
        ListingRecord {
            url: format!("https://www.property.ie/property-for-sale/dublin-6/{id}/"),
            price,
            ber: "A2".to_string(),
            address: "Rathmines, Dublin 6".to_string(),
            postcode: "D06".to_string(),
            property_type: "Apartment".to_string(),
            bedrooms: Some(2),
            bathrooms: Some(2),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn successive_runs_accumulate_and_override() {
        let dir = tempdir().unwrap();
        let working = dir.path().join("data.csv");

        working::append_records(&working, &[listing(1, 300_000), listing(2, 450_000)]).unwrap();
        let first = publish(dir.path(), &working, day("2024-03-08")).unwrap();
        assert_eq!(first.stats.published, 2);
        assert!(!working.exists());

        working::append_records(&working, &[listing(1, 310_000), listing(3, 500_000)]).unwrap();
        let second = publish(dir.path(), &working, day("2024-03-15")).unwrap();

        let rows = snapshot::read_snapshot(&second.path).unwrap();
        let summary: Vec<(&str, i64)> = rows.iter().map(|r| (r.url.as_str(), r.price)).collect();
        assert_eq!(
            summary,
            vec![
                ("dublin-6/2/", 450_000),
                ("dublin-6/1/", 310_000),
                ("dublin-6/3/", 500_000)
            ]
        );
    }

    #[test]
    fn nothing_to_publish_writes_header_only_snapshot() {
        let dir = tempdir().unwrap();
        let report = publish(dir.path(), &dir.path().join("data.csv"), day("2024-03-08")).unwrap();

        assert_eq!(report.stats.published, 0);
        let text = fs::read_to_string(&report.path).unwrap();
        assert_eq!(text, "url,price,ber,postcode,property_type,bedrooms,bathrooms\n");
    }

    #[test]
    fn rerun_after_interrupted_cleanup_is_idempotent() {
        let dir = tempdir().unwrap();
        let working = dir.path().join("data.csv");
        working::append_records(&working, &[listing(1, 300_000)]).unwrap();

        let first = publish(dir.path(), &working, day("2024-03-08")).unwrap();
        let published = fs::read_to_string(&first.path).unwrap();

        // Working file survived a crash after the snapshot was written
        working::append_records(&working, &[listing(1, 300_000)]).unwrap();
        let again = publish(dir.path(), &working, day("2024-03-08")).unwrap();

        assert_eq!(fs::read_to_string(&again.path).unwrap(), published);
    }
}
