use serde::{Deserialize, Deserializer, Serialize};

/// Path segment that prefixes every listing URL on the site. Published
/// snapshots keep only what follows it.
pub const URL_MARKER: &str = "for-sale/";

/// Base used to turn a published url back into a clickable link.
pub const LISTING_BASE_URL: &str = "https://www.property.ie/property-for-sale/";

/// Upper bound (inclusive) on prices kept in a published snapshot.
pub const MAX_PUBLISHED_PRICE: i64 = 1_000_000;

/// One listing as scraped from a results page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingRecord {
    pub url: String,
    pub price: i64,
    pub ber: String,
    pub address: String,
    pub postcode: String,
    pub property_type: String,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub bedrooms: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub bathrooms: Option<u32>,
}

impl ListingRecord {
    /// Convert to the published shape: url trimmed to its trailing path, address dropped.
    pub fn into_snapshot_row(self) -> SnapshotRow {
        SnapshotRow {
            url: strip_url_marker(&self.url),
            price: self.price,
            ber: self.ber,
            postcode: self.postcode,
            property_type: self.property_type,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
        }
    }
}

/// One row of a published, dated snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotRow {
    pub url: String,
    pub price: i64,
    pub ber: String,
    pub postcode: String,
    pub property_type: String,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub bedrooms: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub bathrooms: Option<u32>,
}

impl SnapshotRow {
    /// Header of every published snapshot, written even when there are no rows.
    pub const COLUMNS: [&'static str; 7] = [
        "url",
        "price",
        "ber",
        "postcode",
        "property_type",
        "bedrooms",
        "bathrooms",
    ];

    /// At least one bedroom, a price in (0, 1_000_000] and a known bathroom count.
    pub fn is_publishable(&self) -> bool {
        self.bedrooms.is_some_and(|beds| beds > 0)
            && self.price > 0
            && self.price <= MAX_PUBLISHED_PRICE
            && self.bathrooms.is_some()
    }

    pub fn listing_url(&self) -> String {
        format!("{LISTING_BASE_URL}{}", self.url)
    }
}

/// Keep only the part of `url` after [`URL_MARKER`]; urls without the marker are returned as-is.
pub fn strip_url_marker(url: &str) -> String {
    match url.find(URL_MARKER) {
        Some(pos) => url[pos + URL_MARKER.len()..].to_string(),
        None => url.to_string(),
    }
}

/// Parse a bedroom/bathroom count. Accepts `3` and `3.0`; blanks and junk are missing.
pub fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<u32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u32)
    })
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(price: i64, bedrooms: Option<u32>, bathrooms: Option<u32>) -> SnapshotRow {
        SnapshotRow {
            url: "dublin-4/12345".to_string(),
            price,
            ber: "C2".to_string(),
            postcode: "D04".to_string(),
            property_type: "Apartment".to_string(),
            bedrooms,
            bathrooms,
        }
    }

    #[test]
    fn publishable_bounds() {
        assert!(row(1_000_000, Some(2), Some(1)).is_publishable());
        assert!(!row(1_200_000, Some(2), Some(1)).is_publishable());
        assert!(!row(0, Some(2), Some(1)).is_publishable());
        assert!(!row(350_000, Some(0), Some(1)).is_publishable());
        assert!(!row(350_000, None, Some(1)).is_publishable());
        assert!(!row(350_000, Some(2), None).is_publishable());
    }

    #[test]
    fn strips_everything_up_to_marker() {
        assert_eq!(
            strip_url_marker("https://www.property.ie/property-for-sale/dublin-4/12345/"),
            "dublin-4/12345/"
        );
        assert_eq!(strip_url_marker("dublin-4/12345/"), "dublin-4/12345/");
    }

    #[test]
    fn counts_accept_float_formatting() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("2.0"), Some(2));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("2.5"), None);
        assert_eq!(parse_count("many"), None);
    }

    #[test]
    fn snapshot_row_reads_blank_counts_as_missing() {
        let data = "url,price,ber,postcode,property_type,bedrooms,bathrooms\n\
                    a/1,300000,,D08,House,3.0,\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<SnapshotRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[0].bedrooms, Some(3));
        assert_eq!(rows[0].bathrooms, None);
        assert_eq!(rows[0].ber, "");
    }
}
