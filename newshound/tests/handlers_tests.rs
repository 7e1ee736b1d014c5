use newshound::commands::command_argument_builder;
use newshound::handlers::*;
use newshound_core::{RunSummary, SeenSet, SqliteQueue, StateStore};
use newshound_scanner::{FailurePolicy, SiteFailure, SiteSpec};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn sites_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"url": "https://news.example.com/", "elementSelector": "h4 a", "terms": ["carnaval"]}}]"#
    )
    .unwrap();
    file
}

fn run_matches(extra: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["newshound", "run"];
    argv.extend_from_slice(extra);
    let matches = command_argument_builder().try_get_matches_from(argv).unwrap();
    matches.subcommand_matches("run").unwrap().clone()
}

// ============================================================================
// Argument Tests
// ============================================================================

#[test]
fn test_expand_path_leaves_plain_paths_alone() {
    assert_eq!(expand_path("/tmp/state.db").to_str(), Some("/tmp/state.db"));
    assert_eq!(expand_path("input.json").to_str(), Some("input.json"));
}

#[test]
fn test_expand_path_expands_home() {
    if std::env::var("HOME").is_err() {
        return;
    }
    let expanded = expand_path("~/newshound/state.db");
    assert!(!expanded.starts_with("~"));
    assert!(expanded.ends_with("newshound/state.db"));
}

#[test]
fn test_build_run_config_reads_every_flag() {
    let sites = sites_file();
    let sites_path = sites.path().to_str().unwrap();
    let args = run_matches(&[
        "--sites",
        sites_path,
        "--db",
        "/tmp/newshound-test.db",
        "--from",
        "watcher@example.com",
        "--to",
        "me@example.com",
        "--subject",
        "Fresh links",
        "--smtp-host",
        "smtp.example.com",
        "--smtp-port",
        "465",
        "--ttl-days",
        "7",
        "--fingerprint-len",
        "16",
        "-t",
        "3",
        "--timeout",
        "0",
        "--insecure",
        "--keep-going",
    ]);

    let config = build_run_config(&args).unwrap();

    assert_eq!(config.sites.len(), 1);
    assert_eq!(config.sites[0].selector, "h4 a");
    assert_eq!(config.state_db.to_str(), Some("/tmp/newshound-test.db"));
    assert_eq!(config.envelope.from, "watcher@example.com");
    assert_eq!(config.envelope.to, "me@example.com");
    assert_eq!(config.envelope.subject, "Fresh links");
    assert_eq!(config.smtp.host, "smtp.example.com");
    assert_eq!(config.smtp.port, 465);
    assert_eq!(config.ttl_days, 7);
    assert_eq!(config.fingerprint_len, 16);
    assert_eq!(config.scraper.max_in_flight, 3);
    assert_eq!(config.scraper.timeout_secs, 0);
    assert!(config.scraper.accept_invalid_certs);
    assert_eq!(config.scraper.failure_policy, FailurePolicy::Continue);
    assert!(!config.dry_run);
}

#[test]
fn test_build_run_config_defaults() {
    let sites = sites_file();
    let args = run_matches(&[
        "--sites",
        sites.path().to_str().unwrap(),
        "--from",
        "a@example.com",
        "--to",
        "b@example.com",
        "--smtp-host",
        "smtp.example.com",
    ]);

    let config = build_run_config(&args).unwrap();

    assert_eq!(config.ttl_days, 30);
    assert_eq!(config.fingerprint_len, 10);
    assert_eq!(config.smtp.port, 587);
    assert_eq!(config.envelope.subject, "New links found");
    assert_eq!(config.scraper.max_in_flight, 8);
    assert_eq!(config.scraper.timeout_secs, 30);
    assert_eq!(config.scraper.failure_policy, FailurePolicy::Abort);
}

#[test]
fn test_dry_run_needs_no_email_settings() {
    let sites = sites_file();
    let args = run_matches(&["--sites", sites.path().to_str().unwrap(), "--dry-run"]);

    let config = build_run_config(&args).unwrap();
    assert!(config.dry_run);
    assert!(config.envelope.from.is_empty());
}

#[test]
fn test_run_without_recipient_is_rejected() {
    let result = command_argument_builder().try_get_matches_from([
        "newshound",
        "run",
        "--from",
        "a@example.com",
        "--smtp-host",
        "smtp.example.com",
    ]);
    if std::env::var("EMAIL_TO").is_ok() {
        return;
    }
    assert!(result.is_err());
}

#[test]
fn test_negative_ttl_is_rejected() {
    let result =
        command_argument_builder().try_get_matches_from(["newshound", "run", "--dry-run", "--ttl-days=-1"]);
    assert!(result.is_err());
}

#[test]
fn test_bad_fingerprint_length_fails_run_options() {
    let sites = sites_file();
    let args = run_matches(&[
        "--sites",
        sites.path().to_str().unwrap(),
        "--dry-run",
        "--fingerprint-len",
        "65",
    ]);

    let config = build_run_config(&args).unwrap();
    let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert!(config.run_options(today).is_err());
}

#[test]
fn test_missing_sites_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");
    let args = run_matches(&["--sites", missing.to_str().unwrap(), "--dry-run"]);

    let err = build_run_config(&args).unwrap_err();
    assert!(format!("{:#}", err).contains("nope.json"));
}

// ============================================================================
// Output Tests
// ============================================================================

#[test]
fn test_format_summary_lists_new_links_and_failures() {
    colored::control::set_override(false);

    let mut summary = RunSummary {
        sites_visited: 2,
        scraped: 3,
        expired: 1,
        persisted_entries: 4,
        notified: true,
        ..RunSummary::default()
    };
    summary
        .new_results
        .insert("https://news.example.com/1".into(), "Carnaval event".into());
    summary.failures.push(SiteFailure {
        url: "https://down.example.com/".into(),
        reason: "HTTP 503".into(),
    });

    let out = format_summary(&summary);

    assert!(out.contains("RUN COMPLETE"));
    assert!(out.contains("Sites scraped: 2"));
    assert!(out.contains("New links: 1"));
    assert!(out.contains("Digest emailed"));
    assert!(out.contains("Remembered links: 4"));
    assert!(out.contains("https://down.example.com/: HTTP 503"));
    assert!(out.contains("Carnaval event"));
    assert!(out.contains("https://news.example.com/1"));
}

#[test]
fn test_format_summary_dry_run() {
    colored::control::set_override(false);

    let summary = RunSummary {
        dry_run: true,
        ..RunSummary::default()
    };
    let out = format_summary(&summary);

    assert!(out.contains("DRY RUN COMPLETE"));
    assert!(out.contains("No email sent"));
    assert!(!out.contains("Remembered links"));
}

#[test]
fn test_format_sites() {
    let specs = vec![
        SiteSpec::new("https://a.example.com/", "h4 a", &["carnaval", "festival"]),
        SiteSpec::new("https://b.example.com/", "a", &[]),
    ];
    colored::control::set_override(false);
    let out = format_sites(&specs);

    assert!(out.contains("1. https://a.example.com/"));
    assert!(out.contains("terms: carnaval, festival"));
    assert!(out.contains("2. https://b.example.com/"));
    assert!(out.contains("nothing will match"));
}

// ============================================================================
// State Database Tests
// ============================================================================

#[test]
fn test_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("newshound");

    let db_path = init_state_db(&config_dir, false).unwrap();

    assert_eq!(db_path, config_dir.join(STATE_DB_FILE));
    assert!(db_path.exists());
    assert!(read_pending_seen(&db_path).unwrap().is_none());
}

#[test]
fn test_init_keeps_existing_database_without_force() {
    let dir = TempDir::new().unwrap();
    let db_path = init_state_db(dir.path(), false).unwrap();

    let mut seen = SeenSet::new();
    seen.insert_raw("abcdef0123", "2024-01-01");
    StateStore::new(SqliteQueue::open(&db_path).unwrap())
        .save_seen(&seen)
        .unwrap();

    init_state_db(dir.path(), false).unwrap();
    assert_eq!(read_pending_seen(&db_path).unwrap(), Some(seen));
}

#[test]
fn test_init_force_replaces_database() {
    let dir = TempDir::new().unwrap();
    let db_path = init_state_db(dir.path(), false).unwrap();

    let mut seen = SeenSet::new();
    seen.insert_raw("abcdef0123", "2024-01-01");
    StateStore::new(SqliteQueue::open(&db_path).unwrap())
        .save_seen(&seen)
        .unwrap();

    init_state_db(dir.path(), true).unwrap();
    assert!(read_pending_seen(&db_path).unwrap().is_none());
}

#[test]
fn test_read_pending_seen_missing_database() {
    let dir = TempDir::new().unwrap();
    let result = read_pending_seen(&dir.path().join("absent.db")).unwrap();
    assert!(result.is_none());
}
