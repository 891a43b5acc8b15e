use chrono::{DateTime, Utc};

use crate::model::Appointment;

use super::Engine;

impl Engine {
    /// List appointments, optionally restricted to those intersecting
    /// `[range_start, range_end]` (inclusive bounds; a missing bound leaves
    /// that side unbounded). Reads run against the latest durable snapshot
    /// and never take the mutation lock.
    pub async fn list(
        &self,
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
    ) -> Vec<Appointment> {
        let appointments = self.snapshot_or_empty().await;
        if range_start.is_none() && range_end.is_none() {
            return appointments;
        }
        appointments
            .into_iter()
            .filter(|a| {
                if let Some(from) = range_start
                    && a.end < from
                {
                    return false;
                }
                if let Some(until) = range_end
                    && a.start > until
                {
                    return false;
                }
                true
            })
            .collect()
    }
}
