use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::domain::{
    Appointment, AppointmentId, Clock, NewAppointment, Slot, SystemClock, normalize_phone,
    parse_slot, validate_date, validate_name,
};
use crate::storage::{AppointmentStore, MemoryStore, Repository, StoreError};

use super::{BookingError, BookingRequest, LedgerConfig};

/// The authority over committed appointments.
/// This is the primary interface for any client (CLI, HTTP handler, tests).
pub struct AppointmentLedger {
    store: Arc<dyn AppointmentStore>,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
}

impl AppointmentLedger {
    /// Create a ledger over the given store, using the system clock.
    pub fn new(store: Arc<dyn AppointmentStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to decide what "today" is.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// A ledger that keeps appointments in process memory.
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, config: LedgerConfig) -> Result<Self, BookingError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url, config.storage_timeout).await?;
        Ok(Self::new(Arc::new(repo), config))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, config: LedgerConfig) -> Result<Self, BookingError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect_with_timeout(&db_url, config.storage_timeout).await?;
        Ok(Self::new(Arc::new(repo), config))
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// First and last dates that can currently be booked.
    pub fn booking_window(&self) -> (NaiveDate, NaiveDate) {
        self.config.window.bounds(self.today())
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, BookingError> {
        match tokio::time::timeout(self.config.storage_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("{} failed: {:#}", operation, e);
                Err(BookingError::StorageFailure(e))
            }
            Err(_) => {
                error!(
                    "{} timed out after {:?}",
                    operation, self.config.storage_timeout
                );
                Err(BookingError::StorageFailure(anyhow::anyhow!(
                    "{} timed out after {:?}",
                    operation,
                    self.config.storage_timeout
                )))
            }
        }
    }

    // ========================
    // Booking
    // ========================

    /// Check every field of a booking against the rules in force today.
    pub fn validate(
        &self,
        name: &str,
        phone: &str,
        date: &str,
        slot: &str,
    ) -> Result<NewAppointment, BookingError> {
        let name = validate_name(name)?;
        let phone = normalize_phone(phone)?;
        let date = validate_date(date, &self.config.window, self.today())?;
        let slot = parse_slot(slot, &self.config.catalog)?;
        Ok(NewAppointment::new(name, phone, date, slot))
    }

    /// Validate and atomically commit a booking.
    ///
    /// At most one appointment ever exists per (date, slot). When the slot is
    /// taken the error carries the slots still free that day.
    ///
    /// A `StorageFailure` from a timeout does not prove nothing was written:
    /// the deadline can pass while the commit itself is in flight. Callers
    /// that retry should first look the slot up with
    /// [`find_appointment`](Self::find_appointment).
    pub async fn try_book(
        &self,
        name: &str,
        phone: &str,
        date: &str,
        slot: &str,
    ) -> Result<Appointment, BookingError> {
        let new_appointment = self.validate(name, phone, date, slot).inspect_err(|e| {
            warn!("Rejected booking for {} {}: {}", date, slot, e);
        })?;
        let (date, slot) = (new_appointment.date, new_appointment.slot);

        let reserved =
            tokio::time::timeout(self.config.storage_timeout, self.store.reserve(new_appointment))
                .await;

        match reserved {
            Ok(Ok(appointment)) => {
                info!(
                    appointment_id = appointment.id,
                    %date,
                    %slot,
                    "Appointment booked for {}",
                    appointment.name
                );
                Ok(appointment)
            }
            Ok(Err(StoreError::Conflict { date, slot })) => {
                warn!(%date, %slot, "Time slot already booked");
                let available = match self.available_slots_on(date).await {
                    Ok(slots) => slots,
                    Err(e) => {
                        debug!("Could not re-offer slots after conflict: {}", e);
                        Vec::new()
                    }
                };
                Err(BookingError::SlotConflict {
                    date,
                    slot,
                    available,
                })
            }
            Ok(Err(StoreError::Backend(e))) => {
                error!("Error creating appointment: {:#}", e);
                Err(BookingError::StorageFailure(e))
            }
            Err(_) => {
                error!(
                    "Reservation of {} {} timed out after {:?}",
                    date, slot, self.config.storage_timeout
                );
                Err(BookingError::StorageFailure(anyhow::anyhow!(
                    "reservation timed out after {:?}",
                    self.config.storage_timeout
                )))
            }
        }
    }

    /// Book from an inbound request record.
    pub async fn book(&self, request: &BookingRequest) -> Result<Appointment, BookingError> {
        self.try_book(&request.name, &request.phone, &request.date, &request.slot)
            .await
    }

    // ========================
    // Availability
    // ========================

    /// Catalog slots not yet booked on `date`, in catalog order.
    ///
    /// This is a snapshot: a listed slot may be taken a moment later.
    /// Only `try_book` decides.
    pub async fn available_slots(&self, date: &str) -> Result<Vec<Slot>, BookingError> {
        let date = validate_date(date, &self.config.window, self.today())?;
        self.available_slots_on(date).await
    }

    /// Same as [`available_slots`](Self::available_slots) for an already parsed date.
    pub async fn available_slots_on(&self, date: NaiveDate) -> Result<Vec<Slot>, BookingError> {
        if !self.config.window.is_valid_date(date, self.today()) {
            let (min, max) = self.booking_window();
            return Err(BookingError::InvalidDate(format!(
                "{} is outside the booking window {} to {}",
                date, min, max
            )));
        }

        let booked = self
            .bounded("Fetching booked slots", self.store.booked_slots(date))
            .await?;
        let available = self.config.catalog.available(&booked);
        debug!(
            %date,
            booked = booked.len(),
            available = available.len(),
            "Computed availability"
        );
        Ok(available)
    }

    // ========================
    // Queries
    // ========================

    pub async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, BookingError> {
        self.bounded("Fetching appointment", self.store.get(id)).await
    }

    pub async fn find_appointment(
        &self,
        date: NaiveDate,
        slot: Slot,
    ) -> Result<Option<Appointment>, BookingError> {
        self.bounded(
            "Fetching appointment by slot",
            self.store.find_by_date_slot(date, slot),
        )
        .await
    }

    /// Appointments ordered by date then slot, within optional inclusive bounds.
    pub async fn list_appointments(
        &self,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.bounded("Listing appointments", self.store.list(from_date, to_date))
            .await
    }

    /// Succeeds when the store answers within the timeout.
    pub async fn health_check(&self) -> Result<(), BookingError> {
        self.bounded("Health check", self.store.ping()).await
    }
}
