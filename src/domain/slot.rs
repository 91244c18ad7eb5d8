use std::fmt;

use chrono::{Days, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A bookable time of day, always rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(NaiveTime);

impl Slot {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Slot)
    }

    /// Parse a strict `HH:MM` string. "9:00", "15:00:00" and " 15:00" are rejected
    /// so that catalog membership is an exact match on the canonical form.
    pub fn parse(input: &str) -> Option<Self> {
        let time = NaiveTime::parse_from_str(input, "%H:%M").ok()?;
        let slot = Slot(time);
        (slot.to_string() == input).then_some(slot)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Slot::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid slot '{}', expected HH:MM", s)))
    }
}

/// Errors raised while assembling a slot catalog from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Empty,
    Duplicate(Slot),
    InvalidSlot(String),
    InvalidStep,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "slot catalog must contain at least one slot"),
            CatalogError::Duplicate(slot) => write!(f, "slot {} listed more than once", slot),
            CatalogError::InvalidSlot(raw) => write!(f, "invalid slot '{}', expected HH:MM", raw),
            CatalogError::InvalidStep => write!(f, "slot step must be a positive number of minutes"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// The fixed, ascending list of bookable times for every day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCatalog {
    slots: Vec<Slot>,
}

impl SlotCatalog {
    pub fn new(mut slots: Vec<Slot>) -> Result<Self, CatalogError> {
        if slots.is_empty() {
            return Err(CatalogError::Empty);
        }
        slots.sort();
        if let Some(pair) = slots.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CatalogError::Duplicate(pair[0]));
        }
        Ok(Self { slots })
    }

    /// 15:00 through 17:30 in half-hour steps.
    pub fn standard() -> Self {
        let slots = [(15, 0), (15, 30), (16, 0), (16, 30), (17, 0), (17, 30)]
            .into_iter()
            .filter_map(|(h, m)| Slot::new(h, m))
            .collect();
        Self { slots }
    }

    /// Every `step_minutes` from `first` up to and including `last`.
    pub fn every(first: Slot, last: Slot, step_minutes: u32) -> Result<Self, CatalogError> {
        if step_minutes == 0 {
            return Err(CatalogError::InvalidStep);
        }
        let end = last.minutes_since_midnight();
        let slots = (first.minutes_since_midnight()..=end)
            .step_by(step_minutes as usize)
            .filter_map(|m| Slot::new(m / 60, m % 60))
            .collect();
        Self::new(slots)
    }

    /// Parse a comma-separated list such as `15:00,15:30,16:00`.
    pub fn parse_list(input: &str) -> Result<Self, CatalogError> {
        let slots = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Slot::parse(s).ok_or_else(|| CatalogError::InvalidSlot(s.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(slots)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn is_valid_slot(&self, slot: Slot) -> bool {
        self.slots.binary_search(&slot).is_ok()
    }

    /// Catalog order minus the given booked slots.
    pub fn available(&self, booked: &[Slot]) -> Vec<Slot> {
        self.slots
            .iter()
            .copied()
            .filter(|slot| !booked.contains(slot))
            .collect()
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for SlotCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.slots.iter().map(Slot::to_string).collect();
        write!(f, "{}", joined.join(","))
    }
}

/// Inclusive range `[today, today + days]` in which bookings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub days: u32,
}

impl BookingWindow {
    pub const DEFAULT_DAYS: u32 = 7;

    pub fn new(days: u32) -> Self {
        Self { days }
    }

    /// First and last bookable dates relative to `today`.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let max = today
            .checked_add_days(Days::new(u64::from(self.days)))
            .unwrap_or(NaiveDate::MAX);
        (today, max)
    }

    pub fn is_valid_date(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let (min, max) = self.bounds(today);
        min <= date && date <= max
    }
}

impl Default for BookingWindow {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(s: &str) -> Slot {
        Slot::parse(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_slot_parse_is_strict() {
        assert_eq!(slot("15:00").to_string(), "15:00");
        assert!(Slot::parse("9:00").is_none());
        assert!(Slot::parse("15:00:00").is_none());
        assert!(Slot::parse(" 15:00").is_none());
        assert!(Slot::parse("24:00").is_none());
        assert!(Slot::parse("15:5").is_none());
    }

    #[test]
    fn test_standard_catalog() {
        let catalog = SlotCatalog::standard();
        let rendered: Vec<String> = catalog.slots().iter().map(Slot::to_string).collect();
        assert_eq!(
            rendered,
            vec!["15:00", "15:30", "16:00", "16:30", "17:00", "17:30"]
        );
    }

    #[test]
    fn test_membership_is_exact() {
        let catalog = SlotCatalog::standard();
        assert!(catalog.is_valid_slot(slot("15:30")));
        assert!(!catalog.is_valid_slot(slot("15:15")));
        assert!(!catalog.is_valid_slot(slot("18:00")));
    }

    #[test]
    fn test_every_is_inclusive() {
        let catalog = SlotCatalog::every(slot("15:00"), slot("18:00"), 30).unwrap();
        assert_eq!(catalog.slots().len(), 7);
        assert_eq!(catalog.slots().last(), Some(&slot("18:00")));
        assert_eq!(
            SlotCatalog::every(slot("15:00"), slot("18:00"), 0),
            Err(CatalogError::InvalidStep)
        );
    }

    #[test]
    fn test_new_sorts_and_rejects_duplicates() {
        let catalog = SlotCatalog::new(vec![slot("16:00"), slot("15:00")]).unwrap();
        assert_eq!(catalog.slots(), &[slot("15:00"), slot("16:00")]);

        assert_eq!(
            SlotCatalog::new(vec![slot("15:00"), slot("15:00")]),
            Err(CatalogError::Duplicate(slot("15:00")))
        );
        assert_eq!(SlotCatalog::new(vec![]), Err(CatalogError::Empty));
    }

    #[test]
    fn test_parse_list() {
        let catalog = SlotCatalog::parse_list("15:00, 15:30 ,16:00").unwrap();
        assert_eq!(catalog.to_string(), "15:00,15:30,16:00");
        assert!(matches!(
            SlotCatalog::parse_list("15:00,3pm"),
            Err(CatalogError::InvalidSlot(_))
        ));
    }

    #[test]
    fn test_available_preserves_order() {
        let catalog = SlotCatalog::standard();
        let available = catalog.available(&[slot("17:00"), slot("15:00")]);
        let rendered: Vec<String> = available.iter().map(Slot::to_string).collect();
        assert_eq!(rendered, vec!["15:30", "16:00", "16:30", "17:30"]);
    }

    #[test]
    fn test_window_boundaries() {
        let window = BookingWindow::new(7);
        let today = date("2024-01-01");

        assert!(window.is_valid_date(date("2024-01-01"), today));
        assert!(window.is_valid_date(date("2024-01-08"), today));
        assert!(!window.is_valid_date(date("2024-01-09"), today));
        assert!(!window.is_valid_date(date("2023-12-31"), today));
    }

    #[test]
    fn test_zero_day_window_allows_only_today() {
        let window = BookingWindow::new(0);
        let today = date("2024-01-01");
        assert_eq!(window.bounds(today), (today, today));
        assert!(!window.is_valid_date(date("2024-01-02"), today));
    }

    #[test]
    fn test_slot_serde() {
        let json = serde_json::to_string(&slot("16:30")).unwrap();
        assert_eq!(json, "\"16:30\"");
        let parsed: Slot = serde_json::from_str("\"17:00\"").unwrap();
        assert_eq!(parsed, slot("17:00"));
        assert!(serde_json::from_str::<Slot>("\"5pm\"").is_err());
    }
}
