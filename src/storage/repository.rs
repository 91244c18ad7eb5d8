use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::domain::{Appointment, AppointmentId, NewAppointment, Slot};

use super::{AppointmentStore, MIGRATION_001_APPOINTMENTS, StoreError};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a statement may wait on SQLite's lock, or a caller on the pool,
/// when callers give up after `timeout`. Kept below `timeout` so a contended
/// reservation fails inside the database instead of being cancelled mid-commit.
pub fn lock_wait_for(timeout: Duration) -> Duration {
    timeout * 3 / 4
}

/// SQLite-backed appointment store.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with_timeout(database_url, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Connect for callers that give up after `timeout`. Lock and pool waits
    /// are bounded by [`lock_wait_for`].
    pub async fn connect_with_timeout(database_url: &str, timeout: Duration) -> Result<Self> {
        let lock_wait = lock_wait_for(timeout);
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .busy_timeout(lock_wait);

        let pool = SqlitePoolOptions::new()
            .acquire_timeout(lock_wait)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_APPOINTMENTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str, timeout: Duration) -> Result<Self> {
        let repo = Self::connect_with_timeout(database_url, timeout).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    fn row_to_appointment(row: &SqliteRow) -> Result<Appointment> {
        let date_str: String = row.get("date");
        let slot_str: String = row.get("slot");
        let created_at_str: String = row.get("created_at");

        Ok(Appointment {
            id: row.get("id"),
            name: row.get("name"),
            phone: row.get("phone"),
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .with_context(|| format!("Invalid stored date: {}", date_str))?,
            slot: Slot::parse(&slot_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid stored slot: {}", slot_str))?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait]
impl AppointmentStore for Repository {
    async fn reserve(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let date = appointment.date.to_string();
        let slot = appointment.slot.to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin reservation")?;

        // The counter update is the first statement so the transaction holds the
        // write lock before it reads. Concurrent reservations wait on the busy
        // timeout here rather than failing their upgrade after the check.
        let id: AppointmentId = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'appointment_id'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("Failed to allocate appointment id")?
        .get("value");

        let existing = sqlx::query("SELECT id FROM appointments WHERE date = ? AND slot = ?")
            .bind(&date)
            .bind(&slot)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to check slot")?;

        if existing.is_some() {
            tx.rollback()
                .await
                .context("Failed to roll back reservation")?;
            return Err(StoreError::Conflict {
                date: appointment.date,
                slot: appointment.slot,
            });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO appointments (id, name, phone, date, slot, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&appointment.name)
        .bind(&appointment.phone)
        .bind(&date)
        .bind(&slot)
        .bind(appointment.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await;

        // Dropping `tx` on any early return rolls the reservation back.
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict {
                    date: appointment.date,
                    slot: appointment.slot,
                });
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context("Failed to save appointment")
                    .into());
            }
        }

        tx.commit().await.context("Failed to commit appointment")?;
        Ok(appointment.commit(id))
    }

    async fn find_by_date_slot(&self, date: NaiveDate, slot: Slot) -> Result<Option<Appointment>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, phone, date, slot, created_at
            FROM appointments
            WHERE date = ? AND slot = ?
            "#,
        )
        .bind(date.to_string())
        .bind(slot.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch appointment by slot")?;

        row.as_ref().map(Self::row_to_appointment).transpose()
    }

    async fn booked_slots(&self, date: NaiveDate) -> Result<Vec<Slot>> {
        let rows = sqlx::query("SELECT slot FROM appointments WHERE date = ?")
            .bind(date.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch booked slots")?;

        rows.iter()
            .map(|row| {
                let slot_str: String = row.get("slot");
                Slot::parse(&slot_str)
                    .ok_or_else(|| anyhow::anyhow!("Invalid stored slot: {}", slot_str))
            })
            .collect()
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, phone, date, slot, created_at
            FROM appointments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch appointment")?;

        row.as_ref().map(Self::row_to_appointment).transpose()
    }

    async fn list(
        &self,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>> {
        let mut query = String::from(
            "SELECT id, name, phone, date, slot, created_at FROM appointments WHERE 1=1",
        );

        let from_str = from_date.map(|d| d.to_string());
        let to_str = to_date.map(|d| d.to_string());

        if from_str.is_some() {
            query.push_str(" AND date >= ?");
        }
        if to_str.is_some() {
            query.push_str(" AND date <= ?");
        }
        query.push_str(" ORDER BY date, slot");

        let mut sql_query = sqlx::query(&query);
        if let Some(ref from) = from_str {
            sql_query = sql_query.bind(from);
        }
        if let Some(ref to) = to_str {
            sql_query = sql_query.bind(to);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list appointments")?;

        rows.iter().map(Self::row_to_appointment).collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database is not reachable")?;
        Ok(())
    }
}
