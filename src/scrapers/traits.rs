use crate::error::Result;
use crate::models::ListingRecord;
use async_trait::async_trait;
use url::Url;

/// Receives each page's records before the next page is requested.
pub type PageSink<'a> = dyn FnMut(&[ListingRecord]) -> Result<()> + Send + 'a;

/// A site that can be crawled into listing records.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Walk every results page, handing records to `sink` page by page in
    /// scrape order. Returns the number of records produced. Pages already
    /// handed over stay with the sink when a later fetch fails.
    async fn crawl(&self, sink: &mut PageSink<'_>) -> Result<usize>;

    fn source_name(&self) -> &'static str;
}

/// Fetch layer. Retry and backoff belong to implementations, not to the crawl.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String>;
}
