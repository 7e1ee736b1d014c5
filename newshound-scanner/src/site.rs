use crate::error::{Result, ScanError};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

/// One page to scrape: where it lives, which elements to look at and which
/// terms make an element interesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSpec {
    pub url: String,
    #[serde(alias = "elementSelector")]
    pub selector: String,
    #[serde(default)]
    pub terms: Vec<String>,
}

impl SiteSpec {
    pub fn new(url: impl Into<String>, selector: impl Into<String>, terms: &[&str]) -> Self {
        Self {
            url: url.into(),
            selector: selector.into(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Check the site can be scraped at all, without touching the network.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                self.url,
                url.scheme()
            )));
        }
        self.parsed_selector()?;
        Ok(())
    }

    pub(crate) fn parsed_selector(&self) -> Result<Selector> {
        Selector::parse(&self.selector).map_err(|e| ScanError::InvalidSelector {
            selector: self.selector.clone(),
            reason: format!("{:?}", e),
        })
    }
}
