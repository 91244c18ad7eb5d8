use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::{BookingWindow, Slot, SlotCatalog};

/// Israeli mobile numbers: "05" followed by eight digits.
static MOBILE_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^05\d{8}$").expect("mobile phone pattern is valid"));

pub const MIN_NAME_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidName(String),
    InvalidPhone(String),
    InvalidDate(String),
    InvalidSlot(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidName(msg) => write!(f, "invalid name: {}", msg),
            ValidationError::InvalidPhone(msg) => write!(f, "invalid phone: {}", msg),
            ValidationError::InvalidDate(msg) => write!(f, "invalid date: {}", msg),
            ValidationError::InvalidSlot(msg) => write!(f, "invalid slot: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trim and require at least two characters.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::InvalidName(format!(
            "name must be at least {} characters long",
            MIN_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Strip everything but digits and check the mobile pattern.
/// Example: "050-123-4567" -> "0501234567"
pub fn normalize_phone(phone: &str) -> Result<String, ValidationError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if !MOBILE_PHONE.is_match(&digits) {
        return Err(ValidationError::InvalidPhone(format!(
            "'{}' must start with 05 and have 10 digits",
            phone
        )));
    }
    Ok(digits)
}

/// Parse an ISO-8601 calendar date in its canonical `YYYY-MM-DD` form.
/// Unpadded fields ("2024-1-2") and signed years ("+2024-01-02") are rejected.
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .filter(|date| date.format("%Y-%m-%d").to_string() == trimmed)
        .ok_or_else(|| {
            ValidationError::InvalidDate(format!("'{}' is not a YYYY-MM-DD date", input))
        })
}

/// Parse a date and check it against the booking window.
pub fn validate_date(
    input: &str,
    window: &BookingWindow,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    let date = parse_date(input)?;
    if !window.is_valid_date(date, today) {
        let (min, max) = window.bounds(today);
        return Err(ValidationError::InvalidDate(format!(
            "{} is outside the booking window {} to {}",
            date, min, max
        )));
    }
    Ok(date)
}

/// Parse an `HH:MM` string and require catalog membership.
pub fn parse_slot(input: &str, catalog: &SlotCatalog) -> Result<Slot, ValidationError> {
    match Slot::parse(input) {
        Some(slot) if catalog.is_valid_slot(slot) => Ok(slot),
        _ => Err(ValidationError::InvalidSlot(format!(
            "'{}' is not one of {}",
            input, catalog
        ))),
    }
}
