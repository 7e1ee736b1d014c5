use crate::error::FingerprintError;
use sha2::{Digest, Sha256};

/// Hex characters in a full SHA-256 digest.
pub const MAX_FINGERPRINT_LEN: usize = 64;

/// Ten hex characters: distinct links may collide, which is accepted at the
/// volume of links one run reports.
pub const DEFAULT_FINGERPRINT_LEN: usize = 10;

/// Truncated SHA-256 hex digest of `url`.
pub fn fingerprint(url: &str, length: usize) -> Result<String, FingerprintError> {
    Ok(Fingerprinter::new(length)?.fingerprint(url))
}

/// Fingerprints links at a length validated once up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprinter {
    length: usize,
}

impl Fingerprinter {
    pub fn new(length: usize) -> Result<Self, FingerprintError> {
        if length == 0 || length > MAX_FINGERPRINT_LEN {
            return Err(FingerprintError::InvalidLength {
                length,
                max: MAX_FINGERPRINT_LEN,
            });
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn fingerprint(&self, url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let mut digest = format!("{:x}", hasher.finalize());
        digest.truncate(self.length);
        digest
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self {
            length: DEFAULT_FINGERPRINT_LEN,
        }
    }
}
