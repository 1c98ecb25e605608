use crate::models::{ListingRecord, SnapshotRow};
use std::collections::HashMap;
use tracing::info;

/// Row counts at each merge step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub historical: usize,
    pub new: usize,
    pub deduplicated: usize,
    pub published: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub rows: Vec<SnapshotRow>,
    pub stats: MergeStats,
}

/// Drop all but the last row for each key, keeping the survivors in their original order.
pub fn dedup_keep_last<T, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let last: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (key(row).to_string(), idx))
        .collect();

    rows.into_iter()
        .enumerate()
        .filter(|(idx, row)| last.get(key(row)) == Some(idx))
        .map(|(_, row)| row)
        .collect()
}

/// Merge historical snapshots (oldest first) with this run's records.
///
/// Rows are concatenated with the new run last, deduplicated by url with the
/// last occurrence winning, then filtered to publishable rows. New records are
/// converted to the published shape first so both sides share the same url key.
pub fn merge(historical: Vec<Vec<SnapshotRow>>, new_records: Vec<ListingRecord>) -> MergeOutcome {
    let historical_rows: Vec<SnapshotRow> = historical.into_iter().flatten().collect();
    let mut stats = MergeStats {
        historical: historical_rows.len(),
        new: new_records.len(),
        ..Default::default()
    };

    let mut combined = historical_rows;
    combined.extend(new_records.into_iter().map(ListingRecord::into_snapshot_row));

    let deduplicated = dedup_keep_last(combined, |row| row.url.as_str());
    stats.deduplicated = deduplicated.len();

    let rows: Vec<SnapshotRow> = deduplicated
        .into_iter()
        .filter(SnapshotRow::is_publishable)
        .collect();
    stats.published = rows.len();

    info!(
        historical = stats.historical,
        new = stats.new,
        deduplicated = stats.deduplicated,
        published = stats.published,
        "Merged dataset"
    );

    MergeOutcome { rows, stats }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(url: &str, price: i64, bedrooms: Option<u32>) -> ListingRecord {
        ListingRecord {
            url: format!("https://www.property.ie/property-for-sale/{url}"),
            price,
            ber: "D1".to_string(),
            address: "1 Tara St, Dublin 2".to_string(),
            postcode: "D02".to_string(),
            property_type: "Terraced House".to_string(),
            bedrooms,
            bathrooms: Some(1),
        }
    }

    fn snapshot_row(url: &str, price: i64) -> SnapshotRow {
        listing(url, price, Some(3)).into_snapshot_row()
    }

    #[test]
    fn dedup_keeps_last_in_original_position() {
        let rows = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4)];
        let kept = dedup_keep_last(rows, |r| r.0);
        assert_eq!(kept, vec![("b", 2), ("a", 3), ("c", 4)]);
    }

    #[test]
    fn newest_run_wins() {
        let historical = vec![vec![snapshot_row("dublin-2/77/", 300_000)]];
        let outcome = merge(historical, vec![listing("dublin-2/77/", 310_000, Some(3))]);

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].price, 310_000);
        assert_eq!(outcome.rows[0].url, "dublin-2/77/");
    }

    #[test]
    fn merging_a_snapshot_with_itself_does_not_grow() {
        let snapshot = vec![
            snapshot_row("dublin-2/1/", 250_000),
            snapshot_row("dublin-2/2/", 275_000),
        ];
        let once = merge(vec![snapshot.clone()], Vec::new());
        let twice = merge(vec![snapshot.clone(), snapshot], Vec::new());
        assert_eq!(once.rows, twice.rows);
        assert_eq!(twice.stats.published, 2);
    }

    #[test]
    fn validity_filter_applies() {
        let new = vec![
            listing("zero-beds/", 300_000, Some(0)),
            listing("too-dear/", 1_200_000, Some(4)),
            listing("boundary/", 1_000_000, Some(4)),
            listing("no-price/", 0, Some(2)),
        ];
        let outcome = merge(Vec::new(), new);
        let urls: Vec<&str> = outcome.rows.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["boundary/"]);
        assert_eq!(outcome.stats.deduplicated, 4);
    }

    #[test]
    fn empty_inputs_merge_to_empty() {
        let outcome = merge(Vec::new(), Vec::new());
        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.stats, MergeStats::default());
    }

    #[test]
    fn empty_run_keeps_history() {
        let historical = vec![vec![snapshot_row("dublin-2/1/", 250_000)]];
        let outcome = merge(historical.clone(), Vec::new());
        assert_eq!(outcome.rows, historical[0]);
    }
}
