use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::time::Duration;

use crate::application::{
    AppointmentLedger, BookingError, ErrorResponse, LedgerConfig, slot_views,
};
use crate::domain::{Appointment, FixedClock, SlotCatalog, parse_date};

/// Slotbook - fixed-slot appointment booking
#[derive(Parser)]
#[command(name = "slotbook")]
#[command(about = "Book fixed daily time slots without double-booking")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "slotbook.db", global = true)]
    pub database: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Booking window length in days (overrides SLOTBOOK_WINDOW_DAYS)
    #[arg(long, global = true)]
    pub window_days: Option<u32>,

    /// Comma-separated slot list, e.g. "15:00,15:30" (overrides SLOTBOOK_SLOTS)
    #[arg(long, global = true)]
    pub slots: Option<String>,

    /// Storage timeout in milliseconds (overrides SLOTBOOK_STORAGE_TIMEOUT_MS)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub today: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Book an appointment
    Book {
        /// Customer name (at least 2 characters)
        #[arg(short, long)]
        name: String,

        /// Mobile phone number, e.g. 050-123-4567
        #[arg(short, long)]
        phone: String,

        /// Date (ISO 8601 format: YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Time slot (HH:MM)
        #[arg(short, long)]
        slot: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show free slots for a date
    Available {
        /// Date (ISO 8601 format: YYYY-MM-DD)
        date: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// List booked appointments
    List {
        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show a single appointment
    Show {
        /// Appointment ID
        id: i64,
    },

    /// Show the slot catalog and the current booking window
    Catalog,

    /// Export appointments to CSV or JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,
    },

    /// Check that the database is reachable
    Health,
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn config(&self) -> Result<LedgerConfig> {
        let mut config = LedgerConfig::from_env();

        if let Some(days) = self.window_days {
            config = config.with_window_days(days);
        }
        if let Some(slots) = &self.slots {
            let catalog = SlotCatalog::parse_list(slots)
                .map_err(|e| anyhow::anyhow!("Invalid --slots '{}': {}", slots, e))?;
            config = config.with_catalog(catalog);
        }
        if let Some(ms) = self.timeout_ms {
            if ms == 0 {
                anyhow::bail!("--timeout-ms must be positive");
            }
            config = config.with_storage_timeout(Duration::from_millis(ms));
        }

        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config()?;
        let today = self.today.as_deref();

        match self.command {
            Commands::Init => {
                AppointmentLedger::init(&self.database, config).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Book {
                name,
                phone,
                date,
                slot,
                format,
            } => {
                let ledger = open_ledger(&self.database, today, config).await?;
                run_book_command(&ledger, &name, &phone, &date, &slot, &format).await?;
            }

            Commands::Available { date, format } => {
                let ledger = open_ledger(&self.database, today, config).await?;
                let slots = ledger.available_slots(&date).await?;
                if format == "json" {
                    println!("{}", serde_json::to_string_pretty(&slot_views(&slots))?);
                } else if slots.is_empty() {
                    println!("No free slots on {}.", date);
                } else {
                    println!("Free slots on {}:", date);
                    for slot in slots {
                        println!("  {}", slot);
                    }
                }
            }

            Commands::List {
                from_date,
                to_date,
                format,
            } => {
                let ledger = open_ledger(&self.database, today, config).await?;
                let (from, to) = parse_date_range(from_date, to_date)?;
                let appointments = ledger.list_appointments(from, to).await?;
                print_appointments(&appointments, &format)?;
            }

            Commands::Show { id } => {
                let ledger = open_ledger(&self.database, today, config).await?;
                match ledger.get_appointment(id).await? {
                    Some(appointment) => print_appointment(&appointment),
                    None => anyhow::bail!("Appointment not found: {}", id),
                }
            }

            Commands::Catalog => {
                let ledger = open_ledger(&self.database, today, config).await?;
                let (min, max) = ledger.booking_window();
                println!("Slots:          {}", ledger.config().catalog);
                println!("Booking window: {} to {}", min, max);
            }

            Commands::Export {
                output,
                format,
                from_date,
                to_date,
            } => {
                let ledger = open_ledger(&self.database, today, config).await?;
                let (from, to) = parse_date_range(from_date, to_date)?;
                run_export_command(&ledger, output.as_deref(), &format, from, to).await?;
            }

            Commands::Health => {
                let ledger = open_ledger(&self.database, today, config).await?;
                ledger.health_check().await?;
                println!("healthy");
            }
        }

        Ok(())
    }
}

async fn open_ledger(
    database: &str,
    today: Option<&str>,
    config: LedgerConfig,
) -> Result<AppointmentLedger> {
    let ledger = AppointmentLedger::connect(database, config)
        .await
        .with_context(|| format!("Failed to open database '{}'", database))?;

    match today {
        Some(today) => {
            let date = parse_date(today).context("Invalid --today")?;
            Ok(ledger.with_clock(FixedClock(date)))
        }
        None => Ok(ledger),
    }
}

async fn run_book_command(
    ledger: &AppointmentLedger,
    name: &str,
    phone: &str,
    date: &str,
    slot: &str,
    format: &str,
) -> Result<()> {
    match ledger.try_book(name, phone, date, slot).await {
        Ok(appointment) => {
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&appointment)?);
            } else {
                println!(
                    "Booked appointment #{}: {} {} for {} ({})",
                    appointment.id,
                    appointment.date,
                    appointment.slot,
                    appointment.name,
                    appointment.phone
                );
            }
            Ok(())
        }
        Err(err) => {
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&err))?);
            } else if let BookingError::SlotConflict { available, .. } = &err {
                if available.is_empty() {
                    eprintln!("No other slots are free that day.");
                } else {
                    let free: Vec<String> = available.iter().map(|s| s.to_string()).collect();
                    eprintln!("Still free that day: {}", free.join(", "));
                }
            }
            Err(err.into())
        }
    }
}

async fn run_export_command(
    ledger: &AppointmentLedger,
    output: Option<&str>,
    format: &str,
    from_date: Option<NaiveDate>,
    to_date: Option<NaiveDate>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(ledger).with_range(from_date, to_date);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = match format {
        "csv" => exporter.export_csv(writer).await?,
        "json" => exporter.export_json(writer).await?.appointments.len(),
        _ => anyhow::bail!("Invalid export format '{}'. Valid formats: csv, json", format),
    };

    if output.is_some() {
        eprintln!("Exported {} appointments", count);
    }

    Ok(())
}

fn print_appointments(appointments: &[Appointment], format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(appointments)?);
        return Ok(());
    }

    if appointments.is_empty() {
        println!("No appointments found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<12} {:<6} {:<24} {:<12}",
        "ID", "DATE", "SLOT", "NAME", "PHONE"
    );
    println!("{}", "-".repeat(64));
    for appointment in appointments {
        println!(
            "{:<6} {:<12} {:<6} {:<24} {:<12}",
            appointment.id,
            appointment.date,
            appointment.slot,
            truncate(&appointment.name, 24),
            appointment.phone
        );
    }
    Ok(())
}

fn print_appointment(appointment: &Appointment) {
    println!("Appointment #{}", appointment.id);
    println!("  Name:     {}", appointment.name);
    println!("  Phone:    {}", appointment.phone);
    println!("  Date:     {}", appointment.date);
    println!("  Slot:     {}", appointment.slot);
    println!(
        "  Created:  {}",
        appointment.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn parse_date_range(
    from: Option<String>,
    to: Option<String>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let from = from
        .map(|s| parse_date(&s))
        .transpose()
        .context("Invalid --from-date")?;
    let to = to
        .map(|s| parse_date(&s))
        .transpose()
        .context("Invalid --to-date")?;
    Ok((from, to))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
