use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::scrapers::types::CompiledSelectors;

/// Label text that marks the link to the following results page.
const NEXT_LABEL: &str = "Next";

/// Where the walker is in the crawl.
///
/// There is no visited set: a site whose "Next" links form a cycle is walked forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkState {
    /// A page is ready to be fetched
    HasNext(Url),
    /// This page has been handed out and its pagination bar not yet seen
    Fetching(Url),
    /// No further page; terminal
    Exhausted,
}

#[derive(Debug)]
pub struct PaginationWalker {
    state: WalkState,
    pages: usize,
}

impl PaginationWalker {
    pub fn new(start: Url) -> Self {
        Self {
            state: WalkState::HasNext(start),
            pages: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == WalkState::Exhausted
    }

    /// Pages handed out so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Take the next page to fetch. Returns `None` once exhausted, or while the
    /// previous page is still waiting for [`observe`](Self::observe).
    pub fn next_page(&mut self) -> Option<Url> {
        match std::mem::replace(&mut self.state, WalkState::Exhausted) {
            WalkState::HasNext(url) => {
                self.pages += 1;
                self.state = WalkState::Fetching(url.clone());
                Some(url)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Feed the pagination link markup of the page being fetched.
    pub fn observe(&mut self, links: &[String]) -> &WalkState {
        let WalkState::Fetching(current) = &self.state else {
            return &self.state;
        };

        self.state = match next_href(links) {
            Some(href) => match current.join(&href) {
                Ok(next) => {
                    debug!(next = %next, "Found next page");
                    WalkState::HasNext(next)
                }
                Err(e) => {
                    warn!(href = %href, error = %e, "Unresolvable next-page link, stopping");
                    WalkState::Exhausted
                }
            },
            None => {
                info!(pages = self.pages, "No next page, pagination exhausted");
                WalkState::Exhausted
            }
        };
        &self.state
    }
}

/// Outer markup of every pagination anchor on the page.
pub fn pagination_links(document: &Html, selectors: &CompiledSelectors) -> Vec<String> {
    document
        .select(&selectors.pagination)
        .map(|a| a.html())
        .collect()
}

/// The first quoted attribute of the first link whose markup contains "Next".
pub fn next_href(links: &[String]) -> Option<String> {
    let link = links.iter().find(|l| l.contains(NEXT_LABEL))?;
    match link.split('"').nth(1) {
        Some(href) => Some(href.to_string()),
        None => {
            warn!(link = %link, "Next link without a quoted target");
            None
        }
    }
}
