use crate::dedup::DEFAULT_TTL_DAYS;
use crate::error::ConfigError;
use crate::fingerprint::{DEFAULT_FINGERPRINT_LEN, Fingerprinter};
use crate::notify::{EmailEnvelope, SmtpConfig};
use crate::pipeline::RunOptions;
use chrono::NaiveDate;
use newshound_scanner::{ScraperOptions, SiteSpec};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SITES_FILE: &str = "input.json";

/// Read and validate the ordered site list.
pub fn load_site_specs(path: &Path) -> Result<Vec<SiteSpec>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_site_specs(&path.display().to_string(), &content)
}

/// Parse a JSON site list; `origin` only labels errors.
pub fn parse_site_specs(origin: &str, content: &str) -> Result<Vec<SiteSpec>, ConfigError> {
    let specs: Vec<SiteSpec> =
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;

    if specs.is_empty() {
        return Err(ConfigError::Empty(origin.to_string()));
    }
    validate_sites(&specs)?;
    Ok(specs)
}

pub fn validate_sites(specs: &[SiteSpec]) -> Result<(), ConfigError> {
    for (index, spec) in specs.iter().enumerate() {
        spec.validate()
            .map_err(|source| ConfigError::InvalidSite { index, source })?;
    }
    Ok(())
}

/// Everything one invocation needs, built once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sites: Vec<SiteSpec>,
    pub state_db: PathBuf,
    pub envelope: EmailEnvelope,
    pub smtp: SmtpConfig,
    pub ttl_days: i64,
    pub fingerprint_len: usize,
    pub scraper: ScraperOptions,
    pub dry_run: bool,
}

impl RunConfig {
    pub fn new(sites: Vec<SiteSpec>, state_db: PathBuf, envelope: EmailEnvelope, smtp: SmtpConfig) -> Self {
        Self {
            sites,
            state_db,
            envelope,
            smtp,
            ttl_days: DEFAULT_TTL_DAYS,
            fingerprint_len: DEFAULT_FINGERPRINT_LEN,
            scraper: ScraperOptions::default(),
            dry_run: false,
        }
    }

    pub fn run_options(&self, today: NaiveDate) -> Result<RunOptions, ConfigError> {
        Ok(RunOptions {
            sites: self.sites.clone(),
            ttl_days: self.ttl_days,
            fingerprinter: Fingerprinter::new(self.fingerprint_len)?,
            envelope: self.envelope.clone(),
            today,
            dry_run: self.dry_run,
        })
    }
}
