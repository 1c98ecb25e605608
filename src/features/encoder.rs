use crate::error::Result;
use crate::features::FeatureRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Which output column a value lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Category(usize),
    Infrequent,
    /// Unseen value with no infrequent bucket to fall into; encodes as all zeros
    Unknown,
}

/// One-hot encoder whose rare categories share one bucket.
///
/// Categories seen fewer than `min_frequency` times while fitting go to the
/// infrequent bucket, and so do values never seen at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    categories: Vec<String>,
    infrequent: Vec<String>,
    min_frequency: usize,
}

impl CategoricalEncoder {
    pub fn fit<'a, I>(values: I, min_frequency: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values {
            *counts.entry(value).or_default() += 1;
        }

        let (frequent, rare): (Vec<_>, Vec<_>) = counts
            .into_iter()
            .partition(|&(_, count)| count >= min_frequency);

        Self {
            categories: frequent.into_iter().map(|(v, _)| v.to_string()).collect(),
            infrequent: rare.into_iter().map(|(v, _)| v.to_string()).collect(),
            min_frequency,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn infrequent(&self) -> &[String] {
        &self.infrequent
    }

    pub fn has_infrequent_bucket(&self) -> bool {
        !self.infrequent.is_empty()
    }

    /// Number of output columns.
    pub fn width(&self) -> usize {
        self.categories.len() + usize::from(self.has_infrequent_bucket())
    }

    pub fn bucket(&self, value: &str) -> Bucket {
        match self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(idx) => Bucket::Category(idx),
            Err(_) if self.has_infrequent_bucket() => Bucket::Infrequent,
            Err(_) => Bucket::Unknown,
        }
    }

    pub fn encode_into(&self, value: &str, out: &mut Vec<f64>) {
        let start = out.len();
        out.resize(start + self.width(), 0.0);
        match self.bucket(value) {
            Bucket::Category(idx) => out[start + idx] = 1.0,
            Bucket::Infrequent => out[start + self.categories.len()] = 1.0,
            Bucket::Unknown => {}
        }
    }

    pub fn column_names(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .categories
            .iter()
            .map(|c| format!("{prefix}_{c}"))
            .collect();
        if self.has_infrequent_bucket() {
            names.push(format!("{prefix}_infrequent"));
        }
        names
    }
}

/// Encoding shared by training and serving: one-hot postcode and property
/// type followed by the numeric columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    pub postcode: CategoricalEncoder,
    pub property_type: CategoricalEncoder,
}

impl FeatureEncoder {
    pub fn fit(rows: &[FeatureRow], min_frequency: usize) -> Self {
        Self {
            postcode: CategoricalEncoder::fit(rows.iter().map(|r| r.postcode.as_str()), min_frequency),
            property_type: CategoricalEncoder::fit(
                rows.iter().map(|r| r.property_type.as_str()),
                min_frequency,
            ),
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.postcode.column_names("postcode");
        names.extend(self.property_type.column_names("property_type"));
        names.extend(["ber", "bathrooms", "bedrooms"].map(String::from));
        names
    }

    pub fn encode(&self, row: &FeatureRow) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.postcode.width() + self.property_type.width() + 3);
        self.postcode.encode_into(&row.postcode, &mut out);
        self.property_type.encode_into(&row.property_type, &mut out);
        out.push(f64::from(row.ber));
        out.push(f64::from(row.bathrooms));
        out.push(f64::from(row.bedrooms));
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}
