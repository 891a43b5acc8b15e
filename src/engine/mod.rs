mod conflict;
mod mutations;
mod queries;

pub use conflict::has_conflict;
pub(crate) use conflict::parse_timestamp;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::model::Appointment;
use crate::storage::AppointmentStore;

/// The appointment service. Validates input, runs the conflict check against
/// a fresh snapshot of the store, and writes the whole collection back.
pub struct Engine {
    store: Arc<dyn AppointmentStore>,
    /// Serializes load → conflict-check → replace for every mutation. Two
    /// concurrent creates for the same slot must never both pass the check.
    /// Reads don't take it.
    write_lock: Mutex<()>,
}

impl Engine {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the collection. An unreadable store reads as empty, but
    /// the condition is logged — never silently masked.
    pub(super) async fn snapshot_or_empty(&self) -> Vec<Appointment> {
        match self.store.load().await {
            Ok(appointments) => appointments,
            Err(e) => {
                tracing::error!("failed to load appointment store, treating as empty: {e}");
                Vec::new()
            }
        }
    }
}
