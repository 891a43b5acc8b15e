use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Label applied when a booking arrives with a blank summary.
pub const DEFAULT_SUMMARY: &str = "Consultation";

/// Half-open time range `[start, end)` — the slot an appointment occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "Slot start must be before end");
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A single booked appointment on the calendar.
///
/// Serialized in camelCase — the same shape lives in `appointments.json`
/// and crosses the HTTP boundary unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Ulid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub customer_notes: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn slot(&self) -> Slot {
        Slot::new(self.start, self.end)
    }
}

/// Raw booking input as it arrives over the wire. Everything is optional —
/// validation happens in the engine, not during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentPayload {
    pub start: Option<String>,
    pub end: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_notes: Option<String>,
}

/// Text fields after trimming, with the summary fallback applied.
#[derive(Debug, Clone)]
pub struct SanitizedFields {
    pub summary: String,
    pub description: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_notes: String,
}

fn trimmed(field: &Option<String>) -> String {
    field.as_deref().unwrap_or("").trim().to_string()
}

impl AppointmentPayload {
    /// Trim every text field. A blank summary falls back to [`DEFAULT_SUMMARY`].
    pub fn sanitized(&self) -> SanitizedFields {
        let mut summary = trimmed(&self.summary);
        if summary.is_empty() {
            summary = DEFAULT_SUMMARY.to_string();
        }
        SanitizedFields {
            summary,
            description: trimmed(&self.description),
            customer_name: trimmed(&self.customer_name),
            customer_email: trimmed(&self.customer_email),
            customer_phone: trimmed(&self.customer_phone),
            customer_notes: trimmed(&self.customer_notes),
        }
    }
}

/// The administrator credential singleton, as stored in `admin.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCredential {
    pub password_hash: String,
    pub updated_at: DateTime<Utc>,
}
