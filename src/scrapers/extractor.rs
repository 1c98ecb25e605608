//! Turns one results page into listing records.
//!
//! The page is read as five parallel sequences (link, price, address, badge,
//! summary). Every field extractor below is total: a missing or malformed
//! sub-field produces an empty value, never an error.

use crate::models::ListingRecord;
use crate::scrapers::types::CompiledSelectors;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::{debug, warn};

static BER_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ber_(.*?)\.").unwrap());
static BEDROOMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+) Bed").unwrap());
static BATHROOMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+) Bath").unwrap());
static DUBLIN_DISTRICT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Dublin (\d+)").unwrap());

/// Substrings removed from the raw address text, in order.
const ADDRESS_NOISE: [&str; 4] = [", Ireland", ", Co. Dublin", "\\", "\n"];

/// Raw text for one listing, taken from the same index of each sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub url: String,
    pub price: String,
    pub address: String,
    /// Badge markup, or empty when the listing has no rating
    pub badge: String,
    pub summary: String,
}

/// The five sequences scraped from one page.
#[derive(Debug, Clone, Default)]
pub struct PageSlots {
    pub urls: Vec<String>,
    pub prices: Vec<String>,
    pub addresses: Vec<String>,
    pub badges: Vec<String>,
    pub summaries: Vec<String>,
}

impl PageSlots {
    pub fn from_document(document: &Html, selectors: &CompiledSelectors) -> Self {
        let links: Vec<ElementRef> = document.select(&selectors.listing_link).collect();

        Self {
            urls: links
                .iter()
                .map(|a| a.value().attr("href").unwrap_or_default().to_string())
                .collect(),
            addresses: links.iter().map(|a| a.text().collect()).collect(),
            prices: document
                .select(&selectors.price)
                .map(|h| h.text().collect())
                .collect(),
            // One slot per container so a missing badge stays in place as ""
            badges: document
                .select(&selectors.ber_container)
                .map(|c| {
                    c.select(&selectors.ber_badge)
                        .next()
                        .map(|img| img.html())
                        .unwrap_or_default()
                })
                .collect(),
            summaries: document
                .select(&selectors.summary)
                .map(|h| h.text().collect())
                .collect(),
        }
    }

    fn lengths(&self) -> [usize; 5] {
        [
            self.urls.len(),
            self.prices.len(),
            self.addresses.len(),
            self.badges.len(),
            self.summaries.len(),
        ]
    }

    pub fn is_aligned(&self) -> bool {
        let lens = self.lengths();
        lens.iter().all(|&n| n == lens[0])
    }

    /// Number of listings that have an entry in every sequence.
    pub fn aligned_len(&self) -> usize {
        self.lengths().into_iter().min().unwrap_or(0)
    }

    /// Consume the slots as a one-pass sequence of records.
    ///
    /// Sequences of unequal length are truncated to the shortest one.
    pub fn into_records(self) -> impl Iterator<Item = ListingRecord> {
        if !self.is_aligned() {
            let [urls, prices, addresses, badges, summaries] = self.lengths();
            warn!(
                urls,
                prices,
                addresses,
                badges,
                summaries,
                kept = self.aligned_len(),
                "Listing sequences differ in length, extra entries are ignored"
            );
        }

        let PageSlots {
            urls,
            prices,
            addresses,
            badges,
            summaries,
        } = self;

        urls.into_iter()
            .zip(prices)
            .zip(addresses)
            .zip(badges)
            .zip(summaries)
            .map(|((((url, price), address), badge), summary)| RawListing {
                url,
                price,
                address,
                badge,
                summary,
            })
            .map(build_record)
    }
}

/// Apply every field extractor to one raw listing.
pub fn build_record(raw: RawListing) -> ListingRecord {
    let address = clean_address(&raw.address);
    let summary = parse_summary(&raw.summary);
    let record = ListingRecord {
        postcode: derive_postcode(&address),
        price: extract_price(&raw.price),
        ber: extract_ber(&raw.badge),
        url: raw.url,
        address,
        property_type: summary.property_type,
        bedrooms: summary.bedrooms,
        bathrooms: summary.bathrooms,
    };
    debug!(url = %record.url, price = record.price, "Extracted listing");
    record
}

/// Digits of the price text as an integer; 0 when there are none.
pub fn extract_price(text: &str) -> i64 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Rating code between `ber_` and the next `.` in the badge markup.
pub fn extract_ber(badge: &str) -> String {
    if badge.is_empty() {
        return String::new();
    }
    BER_CODE
        .captures(badge)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

pub fn clean_address(raw: &str) -> String {
    ADDRESS_NOISE
        .iter()
        .fold(raw.to_string(), |acc, noise| acc.replace(noise, ""))
        .trim()
        .to_string()
}

/// `D` + zero-padded district for Dublin addresses, otherwise the last `", "` segment.
pub fn derive_postcode(address: &str) -> String {
    match DUBLIN_DISTRICT.captures(address).and_then(|caps| caps.get(1)) {
        Some(district) => format!("D{:0>2}", district.as_str()),
        None => address.rsplit(", ").next().unwrap_or_default().to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryFields {
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub property_type: String,
}

/// Parse a blurb like `"3 Bed, 2 Bath, Semi-Detached House"`.
pub fn parse_summary(raw: &str) -> SummaryFields {
    let summary = raw.replace('\n', "");
    let summary = summary.trim();

    SummaryFields {
        bedrooms: first_count(&BEDROOMS, summary),
        bathrooms: first_count(&BATHROOMS, summary),
        property_type: summary
            .rsplit(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

fn first_count(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
