mod memory;
mod repository;

pub use memory::*;
pub use repository::*;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Appointment, AppointmentId, NewAppointment, Slot};

/// SQL migration for the appointments table and id counter
pub const MIGRATION_001_APPOINTMENTS: &str = include_str!("migrations/001_appointments.sql");

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("slot {slot} on {date} is already booked")]
    Conflict { date: NaiveDate, slot: Slot },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence port for committed appointments.
///
/// `reserve` is the only write. Implementations must make the
/// "is (date, slot) free?" check and the insert a single atomic unit,
/// and must leave nothing behind when they fail.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Commit a new appointment, assigning its id, or fail with
    /// [`StoreError::Conflict`] if the (date, slot) pair is taken.
    async fn reserve(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    async fn find_by_date_slot(&self, date: NaiveDate, slot: Slot) -> Result<Option<Appointment>>;

    /// Slots already taken on `date`, in no particular order.
    async fn booked_slots(&self, date: NaiveDate) -> Result<Vec<Slot>>;

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>>;

    /// Appointments ordered by (date, slot), optionally bounded by inclusive dates.
    async fn list(
        &self,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>>;

    /// Cheap round-trip to prove the backend is reachable.
    async fn ping(&self) -> Result<()>;
}
