//! Feature and target preparation shared by training and serving.
//!
//! Both paths call [`prepare`]; the only difference is that training drops
//! listings above the price cap. Categorical columns are encoded by a fitted
//! [`FeatureEncoder`] that training saves and serving loads.

pub mod ber;
pub mod encoder;

use crate::dataset::dedup_keep_last;
use crate::error::Result;
use crate::models::SnapshotRow;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::info;

pub use ber::{encode_ber, BER_MISSING};
pub use encoder::FeatureEncoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareMode {
    /// Apply the training price cap
    Training { price_cap: i64 },
    Serving,
}

/// Model-ready features for one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub bathrooms: u32,
    pub bedrooms: u32,
    pub ber: i32,
    pub postcode: String,
    pub property_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedTable {
    pub urls: Vec<String>,
    pub features: Vec<FeatureRow>,
    pub target: Vec<i64>,
}

impl PreparedTable {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Concatenate snapshots (oldest first), dedup by url keeping the last row,
/// cap prices when training, encode BER and drop rows missing a feature.
pub fn prepare(snapshots: Vec<Vec<SnapshotRow>>, mode: PrepareMode) -> PreparedTable {
    let combined: Vec<SnapshotRow> = snapshots.into_iter().flatten().collect();
    let rows = dedup_keep_last(combined, |row| row.url.as_str());
    let total = rows.len();

    let mut table = PreparedTable::default();
    for row in rows {
        if let PrepareMode::Training { price_cap } = mode {
            if row.price > price_cap {
                continue;
            }
        }
        let Some(features) = to_features(&row) else {
            continue;
        };
        table.urls.push(row.url);
        table.features.push(features);
        table.target.push(row.price);
    }

    info!(?mode, rows = total, kept = table.len(), "Prepared feature table");
    table
}

fn to_features(row: &SnapshotRow) -> Option<FeatureRow> {
    if row.postcode.is_empty() || row.property_type.is_empty() {
        return None;
    }
    Some(FeatureRow {
        bathrooms: row.bathrooms?,
        bedrooms: row.bedrooms?,
        ber: encode_ber(&row.ber),
        postcode: row.postcode.clone(),
        property_type: row.property_type.clone(),
    })
}

/// Write the encoded design matrix with a trailing `price` column.
pub fn write_design_matrix<W: Write>(
    out: W,
    table: &PreparedTable,
    encoder: &FeatureEncoder,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["url".to_string()];
    header.extend(encoder.column_names());
    header.push("price".to_string());
    writer.write_record(&header)?;

    for ((url, features), price) in table.urls.iter().zip(&table.features).zip(&table.target) {
        let mut record = vec![url.clone()];
        record.extend(encoder.encode(features).iter().map(|v| v.to_string()));
        record.push(price.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
