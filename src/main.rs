mod browse;
mod config;
mod dataset;
mod error;
mod features;
mod models;
mod scrapers;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use config::Config;
use dataset::SnapshotCache;
use features::{FeatureEncoder, PrepareMode};
use scrapers::{ListingSource, PropertyIeScraper};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dublin-property-scout")]
#[command(about = "Scrape Dublin property listings into dated CSV snapshots")]
#[command(version)]
struct Cli {
    /// Directory holding the working file and published snapshots
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// First results page of the crawl
    #[arg(long, global = true)]
    start_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every results page into the working file
    Crawl,

    /// Merge the working file into a new dated snapshot
    Publish {
        /// Snapshot date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Crawl, then publish
    Run,

    /// Fit the categorical encoder and write the training design matrix
    Features {
        /// Where to write the design matrix CSV
        #[arg(long, default_value = "features.csv")]
        output: PathBuf,

        /// Override the minimum category frequency
        #[arg(long)]
        min_frequency: Option<usize>,
    },

    /// Encode the latest snapshot with the saved encoder, for prediction
    Encode {
        /// Where to write the encoded rows
        #[arg(long, default_value = "serving.csv")]
        output: PathBuf,
    },

    /// Filter and page through the latest snapshot
    Browse {
        #[arg(long)]
        min_price: Option<i64>,
        #[arg(long)]
        max_price: Option<i64>,
        #[arg(long)]
        min_beds: Option<u32>,
        #[arg(long)]
        max_beds: Option<u32>,
        #[arg(long)]
        min_baths: Option<u32>,
        #[arg(long)]
        max_baths: Option<u32>,
        /// Repeatable, e.g. --ber A2 --ber B1
        #[arg(long)]
        ber: Vec<String>,
        #[arg(long)]
        postcode: Vec<String>,
        #[arg(long)]
        property_type: Vec<String>,
        #[arg(long, value_enum, default_value_t)]
        sort: browse::SortKey,
        #[arg(long)]
        descending: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Print median price per postcode instead of listings
        #[arg(long)]
        medians: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(url) = cli.start_url {
        config = config.with_start_url(url);
    }

    match cli.command {
        Commands::Crawl => crawl(&config).await,
        Commands::Publish { date } => publish(&config, date),
        Commands::Run => {
            // Pages saved before a failed fetch are still published.
            let crawled = crawl(&config).await;
            if let Err(e) = &crawled {
                warn!(error = %e, "Crawl incomplete, publishing what was saved");
            }
            publish(&config, None)?;
            crawled
        }
        Commands::Features {
            output,
            min_frequency,
        } => {
            if let Some(n) = min_frequency {
                config = config.with_min_category_frequency(n);
            }
            build_features(&config, &output)
        }
        Commands::Encode { output } => encode_latest(&config, &output),
        Commands::Browse {
            min_price,
            max_price,
            min_beds,
            max_beds,
            min_baths,
            max_baths,
            ber,
            postcode,
            property_type,
            sort,
            descending,
            page,
            medians,
        } => {
            let query = browse::ListingQuery {
                price: bounds(min_price, max_price, 0, i64::MAX),
                bedrooms: bounds(min_beds, max_beds, 0, u32::MAX),
                bathrooms: bounds(min_baths, max_baths, 0, u32::MAX),
                ber: BTreeSet::from_iter(ber),
                postcodes: BTreeSet::from_iter(postcode),
                property_types: BTreeSet::from_iter(property_type),
                sort,
                ascending: !descending,
            };
            browse_latest(&config, &query, page, medians)
        }
    }
}

async fn crawl(config: &Config) -> Result<()> {
    let scraper = PropertyIeScraper::new(config).context("Failed to set up scraper")?;
    info!(source = scraper.source_name(), "Starting crawl");

    let path = config.working_file();
    let scraped = dataset::working::crawl_into(&scraper, &path)
        .await
        .with_context(|| format!("Crawl failed; pages already parsed are in {}", path.display()))?;
    if scraped == 0 {
        warn!("Crawl produced no listings");
    }

    info!("✅ Scraped {} listings into {}", scraped, path.display());
    Ok(())
}

fn publish(config: &Config, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let report = dataset::publish(&config.data_dir, &config.working_file(), date)
        .context("Publishing snapshot failed; working file left in place")?;

    info!(
        published = report.stats.published,
        "💾 Saved snapshot to {}",
        report.path.display()
    );
    Ok(())
}

fn build_features(config: &Config, output: &Path) -> Result<()> {
    let snapshots = dataset::snapshot::read_all_snapshots(&config.data_dir)
        .context("Failed to read snapshots")?;
    if snapshots.is_empty() {
        warn!(dir = %config.data_dir.display(), "No snapshots found");
    }

    let table = features::prepare(
        snapshots,
        PrepareMode::Training {
            price_cap: config.training_price_cap,
        },
    );
    if table.is_empty() {
        warn!("No rows survived preparation; the design matrix will be header-only");
    }
    let encoder = FeatureEncoder::fit(&table.features, config.min_category_frequency);

    let encoder_path = config.encoder_file();
    encoder
        .save(&encoder_path)
        .with_context(|| format!("Failed to save {}", encoder_path.display()))?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    features::write_design_matrix(file, &table, &encoder)?;

    println!("Rows:           {}", table.len());
    println!(
        "Postcodes:      {} (+{} infrequent)",
        encoder.postcode.categories().len(),
        encoder.postcode.infrequent().len()
    );
    println!(
        "Property types: {} (+{} infrequent)",
        encoder.property_type.categories().len(),
        encoder.property_type.infrequent().len()
    );
    println!("Encoder:        {}", encoder_path.display());
    println!("Design matrix:  {}", output.display());
    Ok(())
}

fn encode_latest(config: &Config, output: &Path) -> Result<()> {
    let encoder_path = config.encoder_file();
    let encoder = FeatureEncoder::load(&encoder_path).with_context(|| {
        format!(
            "Failed to load {}; run `features` first",
            encoder_path.display()
        )
    })?;

    let mut cache = SnapshotCache::new(&config.data_dir);
    let Some(snapshot) = cache.reload().context("Failed to load snapshot")? else {
        anyhow::bail!("No snapshots in {}", config.data_dir.display());
    };

    let table = features::prepare(vec![snapshot.rows.clone()], PrepareMode::Serving);
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    features::write_design_matrix(file, &table, &encoder)?;

    info!(
        snapshot = %snapshot.id.file_name,
        rows = table.len(),
        "Encoded snapshot to {}",
        output.display()
    );
    Ok(())
}

fn browse_latest(
    config: &Config,
    query: &browse::ListingQuery,
    page: usize,
    medians: bool,
) -> Result<()> {
    let Some(id) = dataset::snapshot::latest_snapshot(&config.data_dir)
        .context("Failed to list snapshots")?
    else {
        println!("No snapshots in {}", config.data_dir.display());
        return Ok(());
    };
    let mut cache = SnapshotCache::new(&config.data_dir);
    let snapshot = cache
        .get_or_load(&id)
        .with_context(|| format!("Failed to load {}", id.file_name))?;

    let updated = snapshot
        .id
        .date
        .map_or_else(|| snapshot.id.file_name.clone(), |d| d.to_string());
    println!("Property listings last updated on {updated}");

    if medians {
        for (postcode, median) in browse::postcode_medians(&snapshot.rows) {
            println!("{postcode:<12} {}", browse::format_euros(median.round() as i64));
        }
        return Ok(());
    }

    let matched = query.apply(&snapshot.rows);
    println!(
        "Total properties: {}  Remaining properties: {}",
        snapshot.rows.len(),
        matched.len()
    );
    println!(
        "Page {page} of {}",
        browse::page_count(matched.len()).max(1)
    );
    for row in browse::page(&matched, page) {
        println!("{}", browse::render_listing(row));
    }
    Ok(())
}

/// Inclusive range from optional bounds; `None` when neither is given.
fn bounds<T: Copy>(
    min: Option<T>,
    max: Option<T>,
    floor: T,
    ceiling: T,
) -> Option<std::ops::RangeInclusive<T>> {
    match (min, max) {
        (None, None) => None,
        (min, max) => Some(min.unwrap_or(floor)..=max.unwrap_or(ceiling)),
    }
}
