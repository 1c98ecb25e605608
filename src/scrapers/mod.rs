pub mod extractor;
pub mod fetch;
pub mod pagination;
pub mod property_ie;
pub mod traits;
pub mod types;

pub use property_ie::PropertyIeScraper;
pub use traits::ListingSource;
