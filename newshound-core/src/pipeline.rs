use crate::config::validate_sites;
use crate::dedup::{merge_seen, prune_expired, remove_seen};
use crate::error::{NotifyError, PipelineError, StoreError};
use crate::fingerprint::Fingerprinter;
use crate::notify::{EmailEnvelope, Mailer, notify};
use crate::seen::SeenSet;
use crate::store::{QueueClient, StateStore};
use chrono::NaiveDate;
use newshound_scanner::{ScrapeResult, SiteFailure, SiteScraper, SiteSpec};
use tracing::{error, info, warn};

/// Inputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sites: Vec<SiteSpec>,
    pub ttl_days: i64,
    pub fingerprinter: Fingerprinter,
    pub envelope: EmailEnvelope,
    /// Date stamped on newly reported links and used as "now" for expiry
    pub today: NaiveDate,
    /// Scrape and filter only: no email, seen-set left as it was
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub sites_visited: usize,
    pub scraped: usize,
    pub new_results: ScrapeResult,
    pub expired: usize,
    pub failures: Vec<SiteFailure>,
    pub persisted_entries: usize,
    pub notified: bool,
    pub dry_run: bool,
}

/// Run the whole scrape, filter, notify and persist sequence once.
///
/// A dry run only peeks at the stored seen-set and never writes it. A real
/// run consumes the seen-set at the start; if anything fails afterwards the
/// seen-set exactly as loaded is written back before returning, so history
/// survives a failed run. A failed notification therefore leaves the new
/// links unmarked and they are reported again next run.
///
/// `mailer` may be `None` only for dry runs.
pub async fn execute_run<Q: QueueClient>(
    options: &RunOptions,
    scraper: &SiteScraper,
    store: &StateStore<Q>,
    mailer: Option<&dyn Mailer>,
) -> Result<RunSummary, PipelineError> {
    validate_sites(&options.sites)?;

    if options.dry_run {
        let loaded = store.peek_seen()?;
        return run_stages(options, scraper, store, mailer, &loaded).await;
    }

    let loaded = store.load_seen()?;

    match run_stages(options, scraper, store, mailer, &loaded).await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            error!("Run failed at {} stage: {}", e.stage(), e);
            match restore_seen(store, &loaded) {
                Ok(()) => Err(e),
                Err(restore) => {
                    error!("Could not restore previous seen-set: {}", restore);
                    Err(PipelineError::Restore {
                        cause: Box::new(e),
                        restore,
                    })
                }
            }
        }
    }
}

async fn run_stages<Q: QueueClient>(
    options: &RunOptions,
    scraper: &SiteScraper,
    store: &StateStore<Q>,
    mailer: Option<&dyn Mailer>,
    loaded: &SeenSet,
) -> Result<RunSummary, PipelineError> {
    let pruned = prune_expired(loaded, options.today, options.ttl_days)?;
    let expired = loaded.len() - pruned.len();
    info!(
        "Seen-set: {} entries, {} expired (ttl {} days)",
        loaded.len(),
        expired,
        options.ttl_days
    );

    let report = scraper.scrape(&options.sites).await?;
    for failure in &report.failures {
        warn!("Skipped {}: {}", failure.url, failure.reason);
    }

    let new_results = remove_seen(&report.results, &pruned, &options.fingerprinter);
    info!(
        "Scraped {} matching link(s), {} new",
        report.results.len(),
        new_results.len()
    );

    let mut summary = RunSummary {
        sites_visited: report.sites_visited,
        scraped: report.results.len(),
        expired,
        failures: report.failures,
        dry_run: options.dry_run,
        ..RunSummary::default()
    };

    if options.dry_run {
        info!("Dry run: not notifying, seen-set left unchanged");
        summary.new_results = new_results;
        return Ok(summary);
    }

    if !new_results.is_empty() {
        let mailer = mailer.ok_or(NotifyError::NoTransport)?;
        notify(&new_results, &options.envelope, mailer).await?;
        summary.notified = true;
    }

    let next = merge_seen(&pruned, &new_results, options.today, &options.fingerprinter);
    store.save_seen(&next)?;

    summary.persisted_entries = next.len();
    summary.new_results = new_results;
    Ok(summary)
}

fn restore_seen<Q: QueueClient>(store: &StateStore<Q>, loaded: &SeenSet) -> Result<(), StoreError> {
    store.save_seen(loaded)?;
    warn!("Restored previous seen-set ({} entries)", loaded.len());
    Ok(())
}
