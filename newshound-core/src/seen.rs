use crate::error::StoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical on-disk date format for seen-set entries.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fingerprints of links already reported, each with the date it was last
/// reported.
///
/// Dates are kept as the raw strings read from the store so that a malformed
/// one is caught when the set is pruned rather than silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenSet {
    entries: BTreeMap<String, String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(body: &str) -> Result<Self, StoreError> {
        serde_json::from_str(body).map_err(StoreError::Decode)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(StoreError::Encode)
    }

    pub fn insert(&mut self, fingerprint: impl Into<String>, date: NaiveDate) {
        self.entries
            .insert(fingerprint.into(), date.format(DATE_FORMAT).to_string());
    }

    /// Insert a raw date string as read from elsewhere, unvalidated.
    pub fn insert_raw(&mut self, fingerprint: impl Into<String>, date: impl Into<String>) {
        self.entries.insert(fingerprint.into(), date.into());
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn get(&self, fingerprint: &str) -> Option<&str> {
        self.entries.get(fingerprint).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for SeenSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}
