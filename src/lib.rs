pub mod application;
pub mod cli;
pub mod domain;
pub mod io;
pub mod storage;

pub use application::{AppointmentLedger, BookingError, LedgerConfig};
pub use domain::*;
