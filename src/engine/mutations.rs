use chrono::Utc;
use ulid::Ulid;

use crate::error::CoreError;
use crate::model::{Appointment, AppointmentPayload};

use super::Engine;
use super::conflict::{has_conflict, parse_slot};

impl Engine {
    /// Book a new appointment. Deliberately open to unauthenticated callers —
    /// this is the public booking flow.
    pub async fn create(&self, payload: &AppointmentPayload) -> Result<Appointment, CoreError> {
        let slot = parse_slot(payload)?;
        let fields = payload.sanitized();

        let _guard = self.write_lock.lock().await;
        let mut appointments = self.snapshot_or_empty().await;
        if let Some(conflicting) = has_conflict(&appointments, &slot, None) {
            metrics::counter!(crate::observability::CONFLICTS_TOTAL).increment(1);
            return Err(CoreError::SlotUnavailable(conflicting));
        }

        let appointment = Appointment {
            id: Ulid::new(),
            start: slot.start,
            end: slot.end,
            summary: fields.summary,
            description: fields.description,
            customer_name: fields.customer_name,
            customer_email: fields.customer_email,
            customer_phone: fields.customer_phone,
            customer_notes: fields.customer_notes,
            created_at: Utc::now(),
            updated_at: None,
        };
        appointments.push(appointment.clone());
        self.store.replace_all(&appointments).await?;
        metrics::counter!(crate::observability::APPOINTMENTS_CREATED_TOTAL).increment(1);
        Ok(appointment)
    }

    /// Replace the payload-carried fields of an existing appointment,
    /// preserving `id` and `created_at`. The conflict check excludes the
    /// appointment itself, so rescheduling onto its own slot always succeeds.
    pub async fn update(
        &self,
        id: Ulid,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, CoreError> {
        let slot = parse_slot(payload)?;
        let fields = payload.sanitized();

        let _guard = self.write_lock.lock().await;
        let mut appointments = self.snapshot_or_empty().await;
        let index = appointments
            .iter()
            .position(|a| a.id == id)
            .ok_or(CoreError::NotFound(id))?;
        if let Some(conflicting) = has_conflict(&appointments, &slot, Some(id)) {
            metrics::counter!(crate::observability::CONFLICTS_TOTAL).increment(1);
            return Err(CoreError::SlotUnavailable(conflicting));
        }

        let updated = Appointment {
            id,
            start: slot.start,
            end: slot.end,
            summary: fields.summary,
            description: fields.description,
            customer_name: fields.customer_name,
            customer_email: fields.customer_email,
            customer_phone: fields.customer_phone,
            customer_notes: fields.customer_notes,
            created_at: appointments[index].created_at,
            updated_at: Some(Utc::now()),
        };
        appointments[index] = updated.clone();
        self.store.replace_all(&appointments).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: Ulid) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock().await;
        let mut appointments = self.snapshot_or_empty().await;
        let before = appointments.len();
        appointments.retain(|a| a.id != id);
        if appointments.len() == before {
            return Err(CoreError::NotFound(id));
        }
        self.store.replace_all(&appointments).await
    }
}
