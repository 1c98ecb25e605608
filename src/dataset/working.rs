//! The working accumulation: raw records of the current, unpublished run.

use crate::error::Result;
use crate::models::ListingRecord;
use crate::scrapers::ListingSource;
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::{debug, info};

const WORKING_COLUMNS: [&str; 8] = [
    "url",
    "price",
    "ber",
    "address",
    "postcode",
    "property_type",
    "bedrooms",
    "bathrooms",
];

/// Append records to the working file, writing the header only when the file is new or empty.
pub fn append_records(path: &Path, records: &[ListingRecord]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let needs_header = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if needs_header {
        writer.write_record(WORKING_COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), records = records.len(), "Appended to working file");
    Ok(records.len())
}

/// Crawl `source`, appending each page to the working file as soon as it is parsed.
///
/// A failed fetch ends the crawl with its error; pages parsed before it are already on disk.
pub async fn crawl_into(source: &dyn ListingSource, path: &Path) -> Result<usize> {
    source
        .crawl(&mut |records: &[ListingRecord]| append_records(path, records).map(drop))
        .await
}

/// Read the working file. A missing file is an empty run, not an error.
pub fn read_records(path: &Path) -> Result<Vec<ListingRecord>> {
    if !path.exists() {
        debug!(path = %path.display(), "No working file");
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ListingRecord>, _>>()?;
    Ok(records)
}
