pub mod config;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod notify;
pub mod pipeline;
pub mod queue;
pub mod seen;
pub mod store;

pub use error::{ConfigError, DedupError, FingerprintError, NotifyError, PipelineError, StoreError};
pub use fingerprint::{Fingerprinter, fingerprint};
pub use pipeline::{RunOptions, RunSummary, execute_run};
pub use queue::SqliteQueue;
pub use seen::SeenSet;
pub use store::{QueueClient, ReceivedRecord, StateStore};
