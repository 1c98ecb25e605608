use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_START_URL: &str = "https://www.property.ie/property-for-sale/dublin/";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Runtime settings, read from the environment and overridable from the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    pub start_url: String,
    pub data_dir: PathBuf,
    pub user_agent: String,
    pub timeout: Duration,
    /// Categories seen fewer times than this collapse into the infrequent bucket.
    pub min_category_frequency: usize,
    /// Training rows priced above this are dropped.
    pub training_price_cap: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            data_dir: PathBuf::from("data"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            min_category_frequency: 10,
            training_price_cap: 800_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            start_url: env::var("START_URL").unwrap_or(defaults.start_url),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            user_agent: env::var("USER_AGENT").unwrap_or(defaults.user_agent),
            timeout: match optional_env::<u64>("REQUEST_TIMEOUT_SECS")? {
                Some(secs) => Duration::from_secs(secs),
                None => defaults.timeout,
            },
            min_category_frequency: optional_env("MIN_CATEGORY_FREQUENCY")?
                .unwrap_or(defaults.min_category_frequency),
            training_price_cap: optional_env("TRAINING_PRICE_CAP")?
                .unwrap_or(defaults.training_price_cap),
        })
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = url.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_min_category_frequency(mut self, n: usize) -> Self {
        self.min_category_frequency = n;
        self
    }

    /// Working accumulation file for the current crawl.
    pub fn working_file(&self) -> PathBuf {
        self.data_dir.join("data.csv")
    }

    pub fn encoder_file(&self) -> PathBuf {
        self.data_dir.join("encoder.json")
    }
}

fn optional_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_and_encoder_files_live_in_data_dir() {
        let config = Config::default().with_data_dir("/tmp/props");
        assert_eq!(config.working_file(), PathBuf::from("/tmp/props/data.csv"));
        assert_eq!(config.encoder_file(), PathBuf::from("/tmp/props/encoder.json"));
    }

    #[test]
    fn defaults_match_published_settings() {
        let config = Config::default();
        assert_eq!(config.start_url, DEFAULT_START_URL);
        assert_eq!(config.min_category_frequency, 10);
        assert_eq!(config.training_price_cap, 800_000);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
