use crate::commands::{DEFAULT_CONFIG_DIR, DEFAULT_STATE_DB};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use newshound_core::config::{DEFAULT_SITES_FILE, RunConfig, load_site_specs};
use newshound_core::dedup::DEFAULT_TTL_DAYS;
use newshound_core::fingerprint::DEFAULT_FINGERPRINT_LEN;
use newshound_core::notify::{EmailEnvelope, Mailer, SmtpConfig, SmtpMailer};
use newshound_core::{QueueClient, RunSummary, SeenSet, SqliteQueue, StateStore, execute_run};
use newshound_scanner::scraper::{DEFAULT_MAX_IN_FLIGHT, DEFAULT_TIMEOUT_SECS};
use newshound_scanner::{FailurePolicy, ProgressCallback, ScraperOptions, SiteScraper, SiteSpec};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const STATE_DB_FILE: &str = "state.db";
const DEFAULT_SUBJECT: &str = "New links found";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Expand a leading `~` to the home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn string_arg(args: &ArgMatches, name: &str) -> String {
    args.get_one::<String>(name).cloned().unwrap_or_default()
}

/// Turn the `run` subcommand's arguments into a [`RunConfig`], loading the
/// site list on the way.
pub fn build_run_config(args: &ArgMatches) -> Result<RunConfig> {
    let sites_path = expand_path(
        args.get_one::<String>("sites")
            .map(String::as_str)
            .unwrap_or(DEFAULT_SITES_FILE),
    );
    let sites = load_site_specs(&sites_path)
        .with_context(|| format!("Failed to load sites from {}", sites_path.display()))?;

    let state_db = expand_path(
        args.get_one::<String>("db")
            .map(String::as_str)
            .unwrap_or(DEFAULT_STATE_DB),
    );

    let envelope = EmailEnvelope {
        from: string_arg(args, "from"),
        to: string_arg(args, "to"),
        subject: args
            .get_one::<String>("subject")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
    };
    let smtp = SmtpConfig {
        host: string_arg(args, "smtp-host"),
        port: args
            .get_one::<u16>("smtp-port")
            .copied()
            .unwrap_or(DEFAULT_SMTP_PORT),
        username: string_arg(args, "smtp-user"),
        password: string_arg(args, "smtp-pass"),
    };

    let mut config = RunConfig::new(sites, state_db, envelope, smtp);
    config.ttl_days = args
        .get_one::<i64>("ttl-days")
        .copied()
        .unwrap_or(DEFAULT_TTL_DAYS);
    config.fingerprint_len = args
        .get_one::<usize>("fingerprint-len")
        .copied()
        .unwrap_or(DEFAULT_FINGERPRINT_LEN);
    config.dry_run = args.get_flag("dry-run");
    config.scraper = ScraperOptions {
        max_in_flight: args
            .get_one::<usize>("max-in-flight")
            .copied()
            .unwrap_or(DEFAULT_MAX_IN_FLIGHT),
        timeout_secs: args
            .get_one::<u64>("timeout")
            .copied()
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        accept_invalid_certs: args.get_flag("insecure"),
        failure_policy: if args.get_flag("keep-going") {
            FailurePolicy::Continue
        } else {
            FailurePolicy::Abort
        },
        ..ScraperOptions::default()
    };

    Ok(config)
}

pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let heading = if summary.dry_run {
        "DRY RUN COMPLETE".yellow().bold()
    } else {
        "RUN COMPLETE".green().bold()
    };
    out.push_str(&format!("{}\n", heading));
    out.push_str(&format!(
        "  Sites scraped: {}\n",
        summary.sites_visited.to_string().cyan()
    ));
    out.push_str(&format!(
        "  Matching links: {}\n",
        summary.scraped.to_string().cyan()
    ));
    out.push_str(&format!(
        "  New links: {}\n",
        summary.new_results.len().to_string().cyan()
    ));
    out.push_str(&format!(
        "  Expired entries: {}\n",
        summary.expired.to_string().cyan()
    ));

    if summary.dry_run {
        out.push_str(&format!(
            "{} No email sent, state left unchanged\n",
            "→".yellow()
        ));
    } else {
        if summary.notified {
            out.push_str(&format!("{} Digest emailed\n", "✓".green().bold()));
        } else {
            out.push_str(&format!("{} Nothing new to report\n", "→".blue()));
        }
        out.push_str(&format!(
            "  Remembered links: {}\n",
            summary.persisted_entries.to_string().cyan()
        ));
    }

    if !summary.failures.is_empty() {
        out.push_str(&format!("\n{}\n", "FAILED SITES".red().bold()));
        for failure in &summary.failures {
            out.push_str(&format!("  {} {}: {}\n", "✗".red(), failure.url, failure.reason));
        }
    }

    if !summary.new_results.is_empty() {
        out.push_str(&format!("\n{}\n", "NEW LINKS".bright_blue().bold()));
        for (url, text) in &summary.new_results {
            out.push_str(&format!("  {} {}\n    {}\n", "•".blue(), text, url));
        }
    }

    out
}

fn run_spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn open_store(path: &Path) -> Result<StateStore<SqliteQueue>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let queue = SqliteQueue::open(path)
        .with_context(|| format!("Failed to open state database {}", path.display()))?;
    Ok(StateStore::new(queue))
}

pub async fn handle_run(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = build_run_config(args)?;
    let today = chrono::Local::now().date_naive();
    let options = config.run_options(today)?;
    let store = open_store(&config.state_db)?;

    let spinner = run_spinner(quiet)?;
    spinner.set_message(format!("Scraping {} site(s)...", config.sites.len()));
    let progress: ProgressCallback = {
        let spinner = spinner.clone();
        Arc::new(move |line: String| spinner.set_message(line))
    };
    let scraper = SiteScraper::new(config.scraper.clone())?.with_progress_callback(progress);

    let mailer = if config.dry_run {
        None
    } else {
        Some(SmtpMailer::new(&config.smtp).context("Failed to set up SMTP transport")?)
    };

    let outcome = execute_run(
        &options,
        &scraper,
        &store,
        mailer.as_ref().map(|m| m as &dyn Mailer),
    )
    .await;
    spinner.finish_and_clear();

    let summary = outcome.map_err(|e| anyhow!("Run failed at the {} stage: {}", e.stage(), e))?;
    print!("{}", format_summary(&summary));
    Ok(())
}

/// Create the config directory and an empty state database inside it.
///
/// An existing database is kept unless `force` is set. Returns the database
/// path.
pub fn init_state_db(dir: &Path, force: bool) -> Result<PathBuf> {
    let db_path = dir.join(STATE_DB_FILE);

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    if SqliteQueue::exists(&db_path) {
        if !force {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!(
                "State database already exists at {}",
                db_path.display().to_string().bright_white()
            );
            println!("Use --force to replace it and forget every reported link.");
            return Ok(db_path);
        }
        println!(
            "{} Deleting existing database (force mode)",
            "→".yellow().bold()
        );
        SqliteQueue::remove(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
    }

    SqliteQueue::open(&db_path)
        .with_context(|| format!("Failed to create {}", db_path.display()))?;
    info!("Initialized state database at {}", db_path.display());
    println!(
        "{} Database initialized: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    Ok(db_path)
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let dir = expand_path(
        args.get_one::<String>("PATH")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONFIG_DIR),
    );
    init_state_db(&dir, args.get_flag("force"))?;
    Ok(())
}

/// The seen-set currently waiting in the database, read without consuming it.
pub fn read_pending_seen(path: &Path) -> Result<Option<SeenSet>> {
    if !SqliteQueue::exists(path) {
        return Ok(None);
    }
    let queue = SqliteQueue::open(path)
        .with_context(|| format!("Failed to open state database {}", path.display()))?;
    match queue.peek()? {
        Some(body) => Ok(Some(SeenSet::from_json(&body)?)),
        None => Ok(None),
    }
}

pub fn handle_state(args: &ArgMatches) -> Result<()> {
    let path = expand_path(
        args.get_one::<String>("db")
            .map(String::as_str)
            .unwrap_or(DEFAULT_STATE_DB),
    );

    let Some(seen) = read_pending_seen(&path)? else {
        println!("{} No reported links recorded in {}", "→".blue(), path.display());
        return Ok(());
    };

    println!(
        "{} {} reported link(s) in {}",
        "✓".green().bold(),
        seen.len().to_string().cyan(),
        path.display()
    );
    for (fingerprint, date) in seen.iter() {
        println!("  {}  {}", fingerprint.bright_white(), date);
    }
    Ok(())
}

pub fn format_sites(specs: &[SiteSpec]) -> String {
    let mut out = String::new();
    for (index, spec) in specs.iter().enumerate() {
        out.push_str(&format!("{:>3}. {}\n", index + 1, spec.url.bright_white()));
        out.push_str(&format!("     selector: {}\n", spec.selector));
        if spec.terms.is_empty() {
            out.push_str("     terms: (none, nothing will match)\n");
        } else {
            out.push_str(&format!("     terms: {}\n", spec.terms.join(", ")));
        }
    }
    out
}

pub fn handle_sites(args: &ArgMatches) -> Result<()> {
    let path = expand_path(
        args.get_one::<String>("sites")
            .map(String::as_str)
            .unwrap_or(DEFAULT_SITES_FILE),
    );
    let specs = load_site_specs(&path)
        .with_context(|| format!("Failed to load sites from {}", path.display()))?;

    println!(
        "{} {} valid site(s) in {}",
        "✓".green().bold(),
        specs.len().to_string().cyan(),
        path.display()
    );
    print!("{}", format_sites(&specs));
    Ok(())
}
