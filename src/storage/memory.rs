use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::domain::{Appointment, AppointmentId, NewAppointment, Slot};

use super::{AppointmentStore, StoreError};

#[derive(Default)]
struct MemoryState {
    last_id: AppointmentId,
    by_slot: BTreeMap<(NaiveDate, Slot), Appointment>,
}

/// In-process store. Reservations are serialized by a single async mutex;
/// ids follow the same rules as [`Repository`](super::Repository).
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn reserve(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let mut state = self.state.lock().await;
        let key = (appointment.date, appointment.slot);

        if state.by_slot.contains_key(&key) {
            return Err(StoreError::Conflict {
                date: appointment.date,
                slot: appointment.slot,
            });
        }

        state.last_id += 1;
        let committed = appointment.commit(state.last_id);
        state.by_slot.insert(key, committed.clone());
        Ok(committed)
    }

    async fn find_by_date_slot(&self, date: NaiveDate, slot: Slot) -> Result<Option<Appointment>> {
        let state = self.state.lock().await;
        Ok(state.by_slot.get(&(date, slot)).cloned())
    }

    async fn booked_slots(&self, date: NaiveDate) -> Result<Vec<Slot>> {
        let state = self.state.lock().await;
        Ok(state
            .by_slot
            .keys()
            .filter(|(d, _)| *d == date)
            .map(|(_, slot)| *slot)
            .collect())
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        let state = self.state.lock().await;
        Ok(state.by_slot.values().find(|a| a.id == id).cloned())
    }

    async fn list(
        &self,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>> {
        let state = self.state.lock().await;
        Ok(state
            .by_slot
            .values()
            .filter(|a| from_date.is_none_or(|from| a.date >= from))
            .filter(|a| to_date.is_none_or(|to| a.date <= to))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
