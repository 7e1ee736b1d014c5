use newshound_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("fingerprint length must be between 1 and {max}, got {length}")]
    InvalidLength { length: usize, max: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DedupError {
    #[error("seen-set entry {fingerprint} has unparsable date '{value}'")]
    InvalidDate { fingerprint: String, value: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("state database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("could not decode stored seen-set: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("could not encode seen-set: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("no received record holds receipt {0}")]
    UnknownReceipt(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("refusing to send an empty digest")]
    Empty,

    #[error("no mail transport configured")]
    NoTransport,

    #[error("invalid address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read site list {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse site list {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("site list {0} is empty")]
    Empty(String),

    #[error("site #{index} is invalid: {source}")]
    InvalidSite {
        index: usize,
        #[source]
        source: ScanError,
    },

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

/// A failed run, tagged with the stage that failed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("scrape: {0}")]
    Fetch(#[from] ScanError),

    #[error("seen-set: {0}")]
    State(#[from] DedupError),

    #[error("state store: {0}")]
    Store(#[from] StoreError),

    #[error("notification: {0}")]
    Transport(#[from] NotifyError),

    /// The run failed and putting the loaded seen-set back failed too.
    #[error("{cause}; restoring the previous seen-set also failed: {restore}")]
    Restore {
        cause: Box<PipelineError>,
        #[source]
        restore: StoreError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Fetch(_) => "scrape",
            PipelineError::State(_) => "seen-set",
            PipelineError::Store(_) => "store",
            PipelineError::Transport(_) => "notify",
            PipelineError::Restore { cause, .. } => cause.stage(),
        }
    }
}
