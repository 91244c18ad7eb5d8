use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::AppointmentLedger;
use crate::domain::Appointment;

/// Snapshot of committed appointments for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub appointments: Vec<Appointment>,
}

/// Exporter for writing the ledger out as CSV or JSON
pub struct Exporter<'a> {
    ledger: &'a AppointmentLedger,
    from_date: Option<NaiveDate>,
    to_date: Option<NaiveDate>,
}

impl<'a> Exporter<'a> {
    pub fn new(ledger: &'a AppointmentLedger) -> Self {
        Self {
            ledger,
            from_date: None,
            to_date: None,
        }
    }

    /// Restrict the export to an inclusive date range.
    pub fn with_range(mut self, from_date: Option<NaiveDate>, to_date: Option<NaiveDate>) -> Self {
        self.from_date = from_date;
        self.to_date = to_date;
        self
    }

    async fn appointments(&self) -> Result<Vec<Appointment>> {
        Ok(self
            .ledger
            .list_appointments(self.from_date, self.to_date)
            .await?)
    }

    /// Export appointments to CSV format
    pub async fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let appointments = self.appointments().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "name", "phone", "date", "slot", "created_at"])?;

        for appointment in &appointments {
            csv_writer.write_record([
                appointment.id.to_string(),
                appointment.name.clone(),
                appointment.phone.clone(),
                appointment.date.to_string(),
                appointment.slot.to_string(),
                appointment.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(appointments.len())
    }

    /// Export appointments as a pretty-printed JSON snapshot
    pub async fn export_json<W: Write>(&self, mut writer: W) -> Result<AppointmentSnapshot> {
        let snapshot = AppointmentSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            appointments: self.appointments().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
