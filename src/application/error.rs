use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Slot, ValidationError};

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time slot: {0}")]
    InvalidSlot(String),

    #[error("Time slot {slot} on {date} is already booked")]
    SlotConflict {
        date: NaiveDate,
        slot: Slot,
        /// Slots still free on that date, if they could be read.
        available: Vec<Slot>,
    },

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] anyhow::Error),
}

impl BookingError {
    /// HTTP status a web layer would answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            BookingError::StorageFailure(_) => 500,
            _ => 400,
        }
    }

    /// Only backend failures may succeed on a plain retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::StorageFailure(_))
    }
}

impl From<ValidationError> for BookingError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidName(msg) => BookingError::InvalidName(msg),
            ValidationError::InvalidPhone(msg) => BookingError::InvalidPhone(msg),
            ValidationError::InvalidDate(msg) => BookingError::InvalidDate(msg),
            ValidationError::InvalidSlot(msg) => BookingError::InvalidSlot(msg),
        }
    }
}
