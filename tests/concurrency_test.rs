mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use common::{date, memory_ledger, test_config, test_ledger};
use slotbook::application::{AppointmentLedger, BookingError};
use slotbook::domain::{Appointment, AppointmentId, NewAppointment, Slot};
use slotbook::storage::{AppointmentStore, StoreError};
use tokio::task::JoinSet;

const RACERS: usize = 16;

/// Fire RACERS bookings for the same slot at once and count outcomes.
async fn race_same_slot(ledger: Arc<AppointmentLedger>) -> Result<(usize, usize)> {
    let mut tasks = JoinSet::new();
    for i in 0..RACERS {
        let ledger = Arc::clone(&ledger);
        tasks.spawn(async move {
            ledger
                .try_book(&format!("Customer {i}"), "0501234567", "2024-01-02", "16:00")
                .await
        });
    }

    let mut booked = 0;
    let mut conflicts = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(_) => booked += 1,
            Err(BookingError::SlotConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    Ok((booked, conflicts))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_sqlite_exactly_one_wins() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let ledger = Arc::new(ledger);

    let (booked, conflicts) = race_same_slot(Arc::clone(&ledger)).await?;
    assert_eq!(booked, 1);
    assert_eq!(conflicts, RACERS - 1);

    let stored = ledger.list_appointments(None, None).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].slot.to_string(), "16:00");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_memory_exactly_one_wins() -> Result<()> {
    let ledger = Arc::new(memory_ledger());

    let (booked, conflicts) = race_same_slot(Arc::clone(&ledger)).await?;
    assert_eq!(booked, 1);
    assert_eq!(conflicts, RACERS - 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_for_distinct_slots_all_succeed() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let ledger = Arc::new(ledger);
    let slots: Vec<String> = ledger
        .config()
        .catalog
        .slots()
        .iter()
        .map(Slot::to_string)
        .collect();

    let mut tasks = JoinSet::new();
    for slot in slots.clone() {
        let ledger = Arc::clone(&ledger);
        tasks.spawn(async move {
            ledger
                .try_book("Dana", "0501234567", "2024-01-03", &slot)
                .await
        });
    }

    let mut ids = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        ids.push(joined??.id);
    }
    ids.sort();
    let expected: Vec<i64> = (1..=slots.len() as i64).collect();
    assert_eq!(ids, expected);
    assert!(ledger.available_slots("2024-01-03").await?.is_empty());
    Ok(())
}

/// A store whose every call outlives any reasonable timeout.
struct StalledStore;

#[async_trait]
impl AppointmentStore for StalledStore {
    async fn reserve(&self, _appointment: NewAppointment) -> Result<Appointment, StoreError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(StoreError::Backend(anyhow::anyhow!("unreachable")))
    }

    async fn find_by_date_slot(&self, _date: NaiveDate, _slot: Slot) -> Result<Option<Appointment>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    async fn booked_slots(&self, _date: NaiveDate) -> Result<Vec<Slot>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }

    async fn get(&self, _id: AppointmentId) -> Result<Option<Appointment>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    async fn list(
        &self,
        _from_date: Option<NaiveDate>,
        _to_date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }

    async fn ping(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

/// A store whose backend is broken.
struct FailingStore;

#[async_trait]
impl AppointmentStore for FailingStore {
    async fn reserve(&self, _appointment: NewAppointment) -> Result<Appointment, StoreError> {
        Err(StoreError::Backend(anyhow::anyhow!("disk full")))
    }

    async fn find_by_date_slot(&self, _date: NaiveDate, _slot: Slot) -> Result<Option<Appointment>> {
        anyhow::bail!("disk full")
    }

    async fn booked_slots(&self, _date: NaiveDate) -> Result<Vec<Slot>> {
        anyhow::bail!("disk full")
    }

    async fn get(&self, _id: AppointmentId) -> Result<Option<Appointment>> {
        anyhow::bail!("disk full")
    }

    async fn list(
        &self,
        _from_date: Option<NaiveDate>,
        _to_date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>> {
        anyhow::bail!("disk full")
    }

    async fn ping(&self) -> Result<()> {
        anyhow::bail!("disk full")
    }
}

fn ledger_over(store: impl AppointmentStore + 'static) -> AppointmentLedger {
    let config = test_config().with_storage_timeout(Duration::from_millis(50));
    AppointmentLedger::new(Arc::new(store), config)
        .with_clock(slotbook::domain::FixedClock(date(common::TODAY)))
}

#[tokio::test]
async fn test_storage_timeout_is_storage_failure() -> Result<()> {
    let ledger = ledger_over(StalledStore);

    let err = ledger
        .try_book("Dana", "0501234567", "2024-01-02", "15:00")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::StorageFailure(_)));
    assert!(err.is_retryable());
    assert_eq!(err.status_code(), 500);

    assert!(matches!(
        ledger.available_slots("2024-01-02").await,
        Err(BookingError::StorageFailure(_))
    ));
    assert!(ledger.health_check().await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_backend_errors_are_storage_failures() -> Result<()> {
    let ledger = ledger_over(FailingStore);

    let err = ledger
        .try_book("Dana", "0501234567", "2024-01-02", "15:00")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::StorageFailure(_)));

    assert!(matches!(
        ledger.list_appointments(None, None).await,
        Err(BookingError::StorageFailure(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_validation_runs_before_storage() -> Result<()> {
    // A broken store must not mask input errors
    let ledger = ledger_over(FailingStore);

    let err = ledger
        .try_book("Dana", "0501234567", "2024-01-02", "15:10")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidSlot(_)));
    Ok(())
}
