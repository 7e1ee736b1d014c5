use crate::error::DedupError;
use crate::fingerprint::Fingerprinter;
use crate::seen::{SeenSet, parse_date};
use chrono::NaiveDate;
use newshound_scanner::ScrapeResult;
use tracing::debug;

pub const DEFAULT_TTL_DAYS: i64 = 30;

/// Keep only the entries reported at most `ttl_days` days before `now`.
///
/// Entries dated after `now` are kept. Any unparsable date fails the whole
/// prune.
pub fn prune_expired(seen: &SeenSet, now: NaiveDate, ttl_days: i64) -> Result<SeenSet, DedupError> {
    let mut kept = SeenSet::new();
    for (fingerprint, value) in seen.iter() {
        let date = parse_date(value).ok_or_else(|| DedupError::InvalidDate {
            fingerprint: fingerprint.to_string(),
            value: value.to_string(),
        })?;

        let age = (now - date).num_days();
        if age <= ttl_days {
            kept.insert_raw(fingerprint, value);
        } else {
            debug!("Expiring {} (last reported {}, {} days ago)", fingerprint, value, age);
        }
    }
    Ok(kept)
}

/// Drop every fresh link whose fingerprint is already in `seen`.
pub fn remove_seen(fresh: &ScrapeResult, seen: &SeenSet, fingerprinter: &Fingerprinter) -> ScrapeResult {
    if seen.is_empty() {
        return fresh.clone();
    }

    fresh
        .iter()
        .filter(|(url, _)| {
            let fingerprint = fingerprinter.fingerprint(url);
            let known = seen.contains(&fingerprint);
            if known {
                debug!("Already reported: {} ({})", url, fingerprint);
            }
            !known
        })
        .map(|(url, text)| (url.clone(), text.clone()))
        .collect()
}

/// The seen-set to persist after reporting `sent`: everything still in
/// `pruned` plus each sent link stamped with `today`.
pub fn merge_seen(
    pruned: &SeenSet,
    sent: &ScrapeResult,
    today: NaiveDate,
    fingerprinter: &Fingerprinter,
) -> SeenSet {
    let mut merged = pruned.clone();
    for url in sent.keys() {
        merged.insert(fingerprinter.fingerprint(url), today);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_prune_boundary_is_inclusive() {
        let mut seen = SeenSet::new();
        seen.insert("edge", date(2024, 1, 1));
        seen.insert("over", date(2023, 12, 31));

        let pruned = prune_expired(&seen, date(2024, 1, 31), 30).unwrap();

        assert!(pruned.contains("edge"));
        assert!(!pruned.contains("over"));
    }

    #[test]
    fn test_prune_keeps_future_dates() {
        let mut seen = SeenSet::new();
        seen.insert("tomorrow", date(2024, 1, 2));

        let pruned = prune_expired(&seen, date(2024, 1, 1), 30).unwrap();
        assert!(pruned.contains("tomorrow"));
    }

    #[test]
    fn test_prune_zero_ttl_keeps_only_today() {
        let mut seen = SeenSet::new();
        seen.insert("today", date(2024, 5, 10));
        seen.insert("yesterday", date(2024, 5, 9));

        let pruned = prune_expired(&seen, date(2024, 5, 10), 0).unwrap();
        assert_eq!(pruned.len(), 1);
        assert!(pruned.contains("today"));
    }

    #[test]
    fn test_prune_rejects_bad_date() {
        let mut seen = SeenSet::new();
        seen.insert_raw("bad", "last tuesday");

        let err = prune_expired(&seen, date(2024, 1, 1), 30).unwrap_err();
        assert_eq!(
            err,
            DedupError::InvalidDate {
                fingerprint: "bad".to_string(),
                value: "last tuesday".to_string(),
            }
        );
    }

    #[test]
    fn test_remove_seen_with_empty_seen_is_identity() {
        let mut fresh = ScrapeResult::new();
        fresh.insert("http://a/1".into(), "one".into());
        fresh.insert("http://a/2".into(), "two".into());

        let out = remove_seen(&fresh, &SeenSet::new(), &Fingerprinter::default());
        assert_eq!(out, fresh);
    }

    #[test]
    fn test_merge_stamps_sent_links_with_today() {
        let fp = Fingerprinter::default();
        let mut pruned = SeenSet::new();
        pruned.insert("older", date(2024, 1, 1));

        let mut sent = ScrapeResult::new();
        sent.insert("http://a/9".into(), "nine".into());

        let merged = merge_seen(&pruned, &sent, date(2024, 1, 20), &fp);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("older"), Some("2024-01-01"));
        assert_eq!(merged.get(&fp.fingerprint("http://a/9")), Some("2024-01-20"));
    }

    #[test]
    fn test_merge_refreshes_colliding_entry() {
        let fp = Fingerprinter::default();
        let key = fp.fingerprint("http://a/1");
        let mut pruned = SeenSet::new();
        pruned.insert(key.clone(), date(2024, 1, 1));

        let mut sent = ScrapeResult::new();
        sent.insert("http://a/1".into(), "one".into());

        let merged = merge_seen(&pruned, &sent, date(2024, 1, 20), &fp);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get(&key), Some("2024-01-20"));
    }
}
