//! Filtering, sorting and paging of a published snapshot for display.

use crate::features::encode_ber;
use crate::models::SnapshotRow;
use clap::ValueEnum;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortKey {
    Bathrooms,
    Bedrooms,
    Ber,
    Postcode,
    #[default]
    Price,
    PropertyType,
}

/// Listing filter. Unset ranges and empty sets match everything.
#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub price: Option<RangeInclusive<i64>>,
    pub bedrooms: Option<RangeInclusive<u32>>,
    pub bathrooms: Option<RangeInclusive<u32>>,
    pub ber: BTreeSet<String>,
    pub postcodes: BTreeSet<String>,
    pub property_types: BTreeSet<String>,
    pub sort: SortKey,
    pub ascending: bool,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            price: None,
            bedrooms: None,
            bathrooms: None,
            ber: BTreeSet::new(),
            postcodes: BTreeSet::new(),
            property_types: BTreeSet::new(),
            sort: SortKey::default(),
            ascending: true,
        }
    }
}

impl ListingQuery {
    pub fn matches(&self, row: &SnapshotRow) -> bool {
        let (Some(bedrooms), Some(bathrooms)) = (row.bedrooms, row.bathrooms) else {
            return false;
        };

        in_range(&self.price, row.price)
            && in_range(&self.bedrooms, bedrooms)
            && in_range(&self.bathrooms, bathrooms)
            && in_set(&self.ber, &row.ber)
            && in_set(&self.postcodes, &row.postcode)
            && in_set(&self.property_types, &row.property_type)
    }

    /// Matching rows in the requested order. The sort is stable.
    pub fn apply<'a>(&self, rows: &'a [SnapshotRow]) -> Vec<&'a SnapshotRow> {
        let mut matched: Vec<&SnapshotRow> = rows.iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| {
            let ord = compare(self.sort, a, b);
            if self.ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        matched
    }
}

fn in_range<T: PartialOrd>(range: &Option<RangeInclusive<T>>, value: T) -> bool {
    range.as_ref().map_or(true, |r| r.contains(&value))
}

fn in_set(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

fn compare(key: SortKey, a: &SnapshotRow, b: &SnapshotRow) -> Ordering {
    match key {
        SortKey::Bathrooms => a.bathrooms.cmp(&b.bathrooms),
        SortKey::Bedrooms => a.bedrooms.cmp(&b.bedrooms),
        SortKey::Ber => ber_rank(&a.ber).cmp(&ber_rank(&b.ber)),
        SortKey::Postcode => a.postcode.cmp(&b.postcode),
        SortKey::Price => a.price.cmp(&b.price),
        SortKey::PropertyType => a.property_type.cmp(&b.property_type),
    }
}

/// Unrated listings sort after every rating.
fn ber_rank(ber: &str) -> i32 {
    match encode_ber(ber) {
        crate::features::BER_MISSING => i32::MAX,
        rank => rank,
    }
}

pub fn page_count(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE)
}

/// 1-based page of `items`; out-of-range pages are empty.
pub fn page<T>(items: &[T], page: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(PAGE_SIZE);
    if start >= items.len() {
        return &[];
    }
    &items[start..(start + PAGE_SIZE).min(items.len())]
}

/// Median price per postcode.
pub fn postcode_medians(rows: &[SnapshotRow]) -> BTreeMap<String, f64> {
    let mut prices: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for row in rows {
        prices.entry(row.postcode.clone()).or_default().push(row.price);
    }

    prices
        .into_iter()
        .map(|(postcode, mut values)| {
            values.sort_unstable();
            let mid = values.len() / 2;
            let median = if values.len() % 2 == 0 {
                (values[mid - 1] as f64 + values[mid] as f64) / 2.0
            } else {
                values[mid] as f64
            };
            (postcode, median)
        })
        .collect()
}

/// `450000` -> `€450,000`
pub fn format_euros(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}€{grouped}")
}

/// Human-readable slug of a listing url, e.g. `12-main-street-dublin-4`.
pub fn listing_title(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').nth(1).unwrap_or(url)
}

pub fn render_listing(row: &SnapshotRow) -> String {
    let ber = if row.ber.is_empty() { "No" } else { row.ber.as_str() };
    format!(
        "{} | {} | {} BER, {} Bedrooms, {} Bathrooms, {} | {}",
        listing_title(&row.url),
        format_euros(row.price),
        ber,
        row.bedrooms.unwrap_or_default(),
        row.bathrooms.unwrap_or_default(),
        row.property_type,
        row.listing_url()
    )
}
