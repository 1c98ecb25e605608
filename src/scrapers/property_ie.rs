use crate::config::Config;
use crate::error::Result;
use crate::models::ListingRecord;
use crate::scrapers::extractor::PageSlots;
use crate::scrapers::fetch::HttpFetcher;
use crate::scrapers::pagination::{pagination_links, PaginationWalker};
use crate::scrapers::traits::{ListingSource, PageFetcher, PageSink};
use crate::scrapers::types::{CompiledSelectors, SelectorSet};
use async_trait::async_trait;
use scraper::Html;
use tracing::{error, info, warn};
use url::Url;

/// Crawler for the property.ie search results.
pub struct PropertyIeScraper<F = HttpFetcher> {
    fetcher: F,
    start_url: Url,
    selectors: CompiledSelectors,
}

impl PropertyIeScraper<HttpFetcher> {
    /// Create a scraper that fetches over HTTP using the configured start url
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_fetcher(HttpFetcher::new(config)?, &config.start_url)
    }
}

impl<F: PageFetcher> PropertyIeScraper<F> {
    pub fn with_fetcher(fetcher: F, start_url: &str) -> Result<Self> {
        Ok(Self {
            fetcher,
            start_url: Url::parse(start_url)?,
            selectors: SelectorSet::default().compile()?,
        })
    }

    /// Records and pagination links of one page.
    fn parse_page(&self, html: &str) -> (Vec<ListingRecord>, Vec<String>) {
        let document = Html::parse_document(html);
        let records = PageSlots::from_document(&document, &self.selectors)
            .into_records()
            .collect();
        let links = pagination_links(&document, &self.selectors);
        (records, links)
    }
}

#[async_trait]
impl<F: PageFetcher> ListingSource for PropertyIeScraper<F> {
    async fn crawl(&self, sink: &mut PageSink<'_>) -> Result<usize> {
        info!(start = %self.start_url, "Starting property.ie crawl");

        let mut walker = PaginationWalker::new(self.start_url.clone());
        let mut total = 0;

        while let Some(url) = walker.next_page() {
            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    error!(url = %url, error = %e, records = total, "Fetch failed, stopping crawl");
                    return Err(e);
                }
            };
            let (page_records, links) = self.parse_page(&html);

            if page_records.is_empty() {
                warn!(url = %url, "No listings found on page");
            } else {
                info!(url = %url, records = page_records.len(), "Parsed results page");
            }

            sink(&page_records)?;
            total += page_records.len();
            walker.observe(&links);
        }

        info!(
            pages = walker.pages(),
            records = total,
            exhausted = walker.is_exhausted(),
            "Crawl finished"
        );
        Ok(total)
    }

    fn source_name(&self) -> &'static str {
        "property.ie"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const START: &str = "https://www.property.ie/property-for-sale/dublin/";

    /// Serves canned pages and records every request.
    struct FakeFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.clone()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<String> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| PipelineError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    async fn collect(scraper: &PropertyIeScraper<FakeFetcher>) -> Result<Vec<ListingRecord>> {
        let mut records = Vec::new();
        scraper
            .crawl(&mut |batch: &[ListingRecord]| {
                records.extend_from_slice(batch);
                Ok(())
            })
            .await?;
        Ok(records)
    }

    fn page(id: u32, next: Option<&str>) -> String {
        let pagination = match next {
            Some(href) => format!(r#"<a href="{START}">1</a><a href="{href}">Next</a>"#),
            None => format!(r#"<a href="{START}">1</a>"#),
        };
        format!(
            r#"<html><body>
                <h2><a href="{START}dublin-{id}/{id}/">{id} Some Road, Dublin {id}, Ireland</a></h2>
                <h3>€{id}00,000</h3>
                <div class="ber-search-results"><img src="ber_B{id}.png"></div>
                <h4>{id} Bed, 1 Bath, Terraced House</h4>
                <div id="pages">{pagination}</div>
            </body></html>"#
        )
    }

    #[tokio::test]
    async fn follows_next_links_until_exhausted() {
        let second = format!("{START}p_2/");
        let fetcher = FakeFetcher::new(&[
            (START, page(1, Some("p_2/"))),
            (second.as_str(), page(2, None)),
        ]);
        let scraper = PropertyIeScraper::with_fetcher(fetcher, START).unwrap();

        let records = collect(&scraper).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].postcode, "D01");
        assert_eq!(records[1].postcode, "D02");
        assert_eq!(records[1].price, 200_000);
        assert_eq!(records[1].ber, "B2");
        assert_eq!(
            *scraper.fetcher.requested.lock().unwrap(),
            vec![START.to_string(), second]
        );
    }

    #[tokio::test]
    async fn fetch_failure_surfaces() {
        let fetcher = FakeFetcher::new(&[(START, page(1, Some("p_2/")))]);
        let scraper = PropertyIeScraper::with_fetcher(fetcher, START).unwrap();

        let err = collect(&scraper).await.unwrap_err();
        assert!(matches!(err, PipelineError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn page_without_listings_still_terminates() {
        let fetcher = FakeFetcher::new(&[(START, "<html><body></body></html>".to_string())]);
        let scraper = PropertyIeScraper::with_fetcher(fetcher, START).unwrap();

        assert!(collect(&scraper).await.unwrap().is_empty());
        assert_eq!(scraper.source_name(), "property.ie");
    }

    #[tokio::test]
    async fn pages_before_a_failed_fetch_reach_the_working_file() {
        let dir = tempfile::tempdir().unwrap();
        let working = dir.path().join("data.csv");
        // Page 2 is linked but never served, so its fetch fails.
        let fetcher = FakeFetcher::new(&[(START, page(1, Some("p_2/")))]);
        let scraper = PropertyIeScraper::with_fetcher(fetcher, START).unwrap();

        let err = crate::dataset::working::crawl_into(&scraper, &working)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::HttpStatus { status: 404, .. }));

        let saved = crate::dataset::working::read_records(&working).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].postcode, "D01");
        assert_eq!(saved[0].price, 100_000);
        assert_eq!(scraper.fetcher.requested.lock().unwrap().len(), 2);
    }
}
