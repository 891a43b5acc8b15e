use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::error::CoreError;
use crate::model::{Appointment, AppointmentPayload, Slot};

/// Parse and validate the candidate times out of a payload.
pub(crate) fn parse_slot(payload: &AppointmentPayload) -> Result<Slot, CoreError> {
    let start = payload.start.as_deref().map(str::trim).unwrap_or("");
    let end = payload.end.as_deref().map(str::trim).unwrap_or("");
    if start.is_empty() || end.is_empty() {
        return Err(CoreError::Validation(
            "appointment must include a start and end time",
        ));
    }
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    if end <= start {
        return Err(CoreError::Validation(
            "appointment end time must be after the start time",
        ));
    }
    Ok(Slot::new(start, end))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| CoreError::Validation("appointment times must be valid RFC 3339 timestamps"))
}

/// Pure, stateless overlap check over the snapshot passed in — it never
/// re-reads storage, so correctness depends on the caller holding the
/// mutation lock around snapshot + check + write.
///
/// `e` conflicts with the candidate iff `e.end > start && e.start < end`
/// (half-open), unless `e.id == exclude`. Returns the first conflicting id.
pub fn has_conflict(
    existing: &[Appointment],
    candidate: &Slot,
    exclude: Option<Ulid>,
) -> Option<Ulid> {
    existing
        .iter()
        .filter(|a| exclude != Some(a.id))
        .find(|a| a.slot().overlaps(candidate))
        .map(|a| a.id)
}
