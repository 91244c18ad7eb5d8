use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Slot;

/// Surrogate key assigned by the store on commit. Monotonic, never reused.
pub type AppointmentId = i64;

/// A committed booking. Appointments are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    /// Trimmed customer name
    pub name: String,
    /// Digits only, e.g. "0501234567"
    pub phone: String,
    pub date: NaiveDate,
    pub slot: Slot,
    pub created_at: DateTime<Utc>,
}

/// A validated booking that has not been committed yet.
/// The id is assigned by the store inside the reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub name: String,
    pub phone: String,
    pub date: NaiveDate,
    pub slot: Slot,
    pub created_at: DateTime<Utc>,
}

impl NewAppointment {
    pub fn new(name: String, phone: String, date: NaiveDate, slot: Slot) -> Self {
        Self {
            name,
            phone,
            date,
            slot,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn commit(self, id: AppointmentId) -> Appointment {
        Appointment {
            id,
            name: self.name,
            phone: self.phone,
            date: self.date,
            slot: self.slot,
            created_at: self.created_at,
        }
    }
}
