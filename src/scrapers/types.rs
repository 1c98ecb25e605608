use crate::error::{PipelineError, Result};
use scraper::Selector;

/// CSS selectors for the five parallel listing sequences plus the pagination links.
#[derive(Debug, Clone)]
pub struct SelectorSet {
    /// Listing link; `href` gives the url, text gives the address
    pub listing_link: &'static str,
    /// Heading holding the price text
    pub price: &'static str,
    /// One container per listing that may hold a rating badge image
    pub ber_container: &'static str,
    /// Badge image inside `ber_container`
    pub ber_badge: &'static str,
    /// Free-text blurb with beds, baths and property type
    pub summary: &'static str,
    /// Anchors inside the pagination bar
    pub pagination: &'static str,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            listing_link: "h2 a",
            price: "h3",
            ber_container: ".ber-search-results",
            ber_badge: "img",
            summary: "h4",
            pagination: "#pages a",
        }
    }
}

impl SelectorSet {
    pub fn compile(&self) -> Result<CompiledSelectors> {
        Ok(CompiledSelectors {
            listing_link: parse(self.listing_link)?,
            price: parse(self.price)?,
            ber_container: parse(self.ber_container)?,
            ber_badge: parse(self.ber_badge)?,
            summary: parse(self.summary)?,
            pagination: parse(self.pagination)?,
        })
    }
}

/// Parsed form of [`SelectorSet`], built once per scraper.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub listing_link: Selector,
    pub price: Selector,
    pub ber_container: Selector,
    pub ber_badge: Selector,
    pub summary: Selector,
    pub pagination: Selector,
}

fn parse(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| PipelineError::Selector(format!("{css:?}: {e:?}")))
}
