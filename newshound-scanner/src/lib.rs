pub mod error;
pub mod matcher;
pub mod result;
pub mod scraper;
pub mod site;

pub use error::ScanError;
pub use matcher::contains_any_term;
pub use result::{ScrapeReport, ScrapeResult, SiteFailure};
pub use scraper::{FailurePolicy, ProgressCallback, ScraperOptions, SharedResults, SiteScraper};
pub use site::SiteSpec;
