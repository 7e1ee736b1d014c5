use crate::error::{Result, ScanError};
use crate::matcher::contains_any_term;
use crate::result::{ScrapeReport, ScrapeResult, SiteFailure};
use crate::site::SiteSpec;
use reqwest::Client;
use scraper::Html;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// What a failed site does to the rest of the scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any failed site fails the whole scrape once every task has finished
    #[default]
    Abort,
    /// Failed sites are recorded in the report and the others still count
    Continue,
}

#[derive(Debug, Clone)]
pub struct ScraperOptions {
    pub max_in_flight: usize,
    /// Zero disables the request timeout entirely
    pub timeout_secs: u64,
    pub accept_invalid_certs: bool,
    pub failure_policy: FailurePolicy,
    pub user_agent: String,
}

impl Default for ScraperOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
            failure_policy: FailurePolicy::Abort,
            user_agent: format!("newshound/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Result map shared by every site task.
///
/// The lock guards a single insert and is never held across a fetch.
#[derive(Clone, Default)]
pub struct SharedResults {
    inner: Arc<Mutex<ScrapeResult>>,
}

impl SharedResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, href: String, text: String) {
        let mut results = self.inner.lock().await;
        results.insert(href, text);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn snapshot(&self) -> ScrapeResult {
        self.inner.lock().await.clone()
    }
}

pub struct SiteScraper {
    client: Client,
    limiter: Arc<Semaphore>,
    failure_policy: FailurePolicy,
    progress_callback: Option<ProgressCallback>,
}

impl SiteScraper {
    pub fn new(options: ScraperOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(options.user_agent.as_str())
            .pool_max_idle_per_host(options.max_in_flight.max(1))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .danger_accept_invalid_certs(options.accept_invalid_certs);

        if options.timeout_secs > 0 {
            builder = builder
                .timeout(Duration::from_secs(options.timeout_secs))
                .connect_timeout(Duration::from_secs((options.timeout_secs / 2).max(1)));
        }

        Ok(Self {
            client: builder.build()?,
            limiter: Arc::new(Semaphore::new(options.max_in_flight.max(1))),
            failure_policy: options.failure_policy,
            progress_callback: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Scrape every site concurrently and merge the matches.
    ///
    /// Returns only after every site task has finished, whatever the policy.
    pub async fn scrape(&self, specs: &[SiteSpec]) -> Result<ScrapeReport> {
        info!(
            "Scraping {} site(s), at most {} in flight",
            specs.len(),
            self.limiter.available_permits()
        );
        let started = Instant::now();
        let results = SharedResults::new();

        let mut handles = Vec::with_capacity(specs.len());
        for spec in specs {
            let client = self.client.clone();
            let limiter = self.limiter.clone();
            let results = results.clone();
            let progress_cb = self.progress_callback.clone();
            let spec = spec.clone();

            handles.push(tokio::spawn(async move {
                let outcome = Self::scrape_site(&client, &limiter, &spec, &results).await;
                if let Some(callback) = progress_cb {
                    let status = match &outcome {
                        Ok(count) => format!("{} match(es)", count),
                        Err(e) => format!("failed: {}", e),
                    };
                    callback(format!("{} {}", spec.url, status));
                }
                outcome
            }));
        }

        let outcomes = futures::future::join_all(handles).await;

        let mut report = ScrapeReport::default();
        let mut first_error = None;
        for (spec, outcome) in specs.iter().zip(outcomes) {
            match outcome.map_err(ScanError::from).and_then(|r| r) {
                Ok(count) => {
                    report.sites_visited += 1;
                    debug!("{}: {} matching link(s)", spec.url, count);
                }
                Err(e) => {
                    let e = e.for_site(&spec.url);
                    warn!("Scrape failed for {}: {}", spec.url, e);
                    match self.failure_policy {
                        FailurePolicy::Abort => {
                            if first_error.is_none() {
                                first_error = Some(e);
                            }
                        }
                        FailurePolicy::Continue => report.failures.push(SiteFailure {
                            url: spec.url.clone(),
                            reason: e.to_string(),
                        }),
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        report.results = results.snapshot().await;
        info!(
            "Scrape complete in {:?}: {} link(s) from {} site(s), {} failure(s)",
            started.elapsed(),
            report.results.len(),
            report.sites_visited,
            report.failures.len()
        );
        Ok(report)
    }

    async fn scrape_site(
        client: &Client,
        limiter: &Semaphore,
        spec: &SiteSpec,
        results: &SharedResults,
    ) -> Result<usize> {
        let body = {
            let _permit = limiter.acquire().await.map_err(|e| ScanError::Fetch {
                url: spec.url.clone(),
                reason: e.to_string(),
            })?;
            Self::fetch_page(client, &spec.url).await?
        };

        let matches = extract_matches(&body, spec)?;
        let count = matches.len();
        for (href, text) in matches {
            results.record(href, text).await;
        }
        Ok(count)
    }

    async fn fetch_page(client: &Client, url: &str) -> Result<String> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Fetched {} ({} bytes) in {:?}", url, body.len(), start.elapsed());
        Ok(body)
    }
}

/// Walk every element matching `selector` that carries an `href`, handing the
/// resolved link and its normalized text to `on_element`.
pub fn visit_elements<F>(html: &str, page_url: &str, spec: &SiteSpec, mut on_element: F) -> Result<()>
where
    F: FnMut(String, String),
{
    let selector = spec.parsed_selector()?;
    let document = Html::parse_document(html);

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(link) = resolve_href(page_url, href) else {
            continue;
        };
        let text = element.text().collect::<String>();
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        on_element(link, text);
    }

    Ok(())
}

/// The `(link, text)` pairs on a page whose text mentions one of the site's terms.
pub fn extract_matches(html: &str, spec: &SiteSpec) -> Result<Vec<(String, String)>> {
    let mut matches = Vec::new();
    visit_elements(html, &spec.url, spec, |link, text| {
        if contains_any_term(&text, &spec.terms) {
            debug!("  matched {} ({})", link, text);
            matches.push((link, text));
        }
    })?;
    Ok(matches)
}

fn resolve_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut url = Url::parse(base).ok()?.join(href).ok()?;
    url.set_fragment(None);
    Some(url.to_string())
}
