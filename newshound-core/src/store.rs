use crate::error::StoreError;
use crate::seen::SeenSet;
use tracing::{debug, info};

/// A record handed out by [`QueueClient::receive_one`], deletable through its
/// receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedRecord {
    pub receipt: String,
    pub body: String,
}

/// The receive-once/replace-once queue the seen-set lives in.
pub trait QueueClient {
    /// Body of the oldest record, left in place.
    fn peek(&self) -> Result<Option<String>, StoreError>;
    fn receive_one(&self) -> Result<Option<ReceivedRecord>, StoreError>;
    fn delete_received(&self, receipt: &str) -> Result<(), StoreError>;
    fn send_one(&self, body: &str) -> Result<(), StoreError>;
}

/// Treats a queue as a single persistent seen-set variable.
///
/// There is one writer per run, so reading consumes the record and writing
/// produces its replacement; no versioning is involved.
pub struct StateStore<Q> {
    queue: Q,
}

impl<Q: QueueClient> StateStore<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Take the pending seen-set out of the queue, or an empty one if none is
    /// pending. The record is decoded before it is deleted, so a record that
    /// fails to decode stays in the queue.
    pub fn load_seen(&self) -> Result<SeenSet, StoreError> {
        let Some(record) = self.queue.receive_one()? else {
            info!("No pending seen-set, starting empty");
            return Ok(SeenSet::new());
        };

        let seen = SeenSet::from_json(&record.body)?;
        self.queue.delete_received(&record.receipt)?;
        info!("Loaded seen-set with {} entries", seen.len());
        Ok(seen)
    }

    /// Read the pending seen-set without consuming it.
    pub fn peek_seen(&self) -> Result<SeenSet, StoreError> {
        match self.queue.peek()? {
            Some(body) => SeenSet::from_json(&body),
            None => Ok(SeenSet::new()),
        }
    }

    pub fn save_seen(&self, next: &SeenSet) -> Result<(), StoreError> {
        let body = next.to_json()?;
        self.queue.send_one(&body)?;
        debug!("Stored seen-set ({} bytes)", body.len());
        info!("Saved seen-set with {} entries", next.len());
        Ok(())
    }
}
