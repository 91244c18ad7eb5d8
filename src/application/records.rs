use serde::{Deserialize, Serialize};

use crate::domain::Slot;

use super::BookingError;

/// Inbound booking request, fields exactly as a client sends them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub name: String,
    pub phone: String,
    /// ISO-8601 date, e.g. "2024-01-02"
    pub date: String,
    /// "HH:MM"
    pub slot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

/// One entry of an availability answer: `{"slot": "15:00"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub slot: Slot,
}

impl From<Slot> for SlotView {
    fn from(slot: Slot) -> Self {
        Self { slot }
    }
}

pub fn slot_views(slots: &[Slot]) -> Vec<SlotView> {
    slots.iter().copied().map(SlotView::from).collect()
}

/// Error body with the status a web layer would send it with.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Vec<SlotView>>,
}

impl From<&BookingError> for ErrorResponse {
    fn from(err: &BookingError) -> Self {
        let available = match err {
            BookingError::SlotConflict { available, .. } => Some(slot_views(available)),
            _ => None,
        };
        // Storage details stay in the logs
        let error = match err {
            BookingError::StorageFailure(_) => "Could not complete the request".to_string(),
            other => other.to_string(),
        };
        Self {
            status: err.status_code(),
            error,
            available,
        }
    }
}
