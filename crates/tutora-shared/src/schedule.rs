//! Wall-clock arithmetic for recurring availability and concrete bookings.
//!
//! Times are plain minutes since midnight with no time zone; dates are
//! calendar dates. Weekdays are numbered 0 (Sunday) through 6 (Saturday).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{MAX_BOOKING_MINUTES, MINUTES_PER_DAY, MIN_BOOKING_MINUTES};
use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// TimeOfDay
// ---------------------------------------------------------------------------

/// A time of day with minute precision, written `HH:MM`.
///
/// Accepts a one- or two-digit hour (`9:05`, `09:05`) and always renders
/// two digits, so rendered values sort lexically in time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }

    /// `self + minutes`, or `None` if that reaches or passes midnight.
    pub fn checked_add_minutes(&self, minutes: u32) -> Option<Self> {
        let end = u32::from(self.0) + minutes;
        if end < u32::from(MINUTES_PER_DAY) {
            Some(Self(end as u16))
        } else {
            None
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::new("time", "Time must be in HH:MM format");

        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse `value` as a time of day, reporting errors against `field`.
pub fn parse_time(field: &str, value: &str) -> Result<TimeOfDay, ValidationError> {
    value.parse().map_err(|_: ValidationError| {
        ValidationError::new(field, format!("{field} must be in HH:MM format"))
    })
}

// ---------------------------------------------------------------------------
// Dates and weekdays
// ---------------------------------------------------------------------------

/// Weekday of `date`, 0 = Sunday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn is_valid_weekday(day: i64) -> bool {
    (0..=6).contains(&day)
}

/// A recurring slot must start before it ends.
pub fn validate_slot_bounds(start: TimeOfDay, end: TimeOfDay) -> Result<(), ValidationError> {
    if start < end {
        Ok(())
    } else {
        Err(ValidationError::new(
            "endTime",
            "End time must be after start time",
        ))
    }
}

/// Parse an ISO-8601 calendar date (`2025-03-14`) or an RFC 3339 timestamp
/// (`2025-03-14T10:00:00Z`). Only the calendar date as written is kept.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .map_err(|_| ValidationError::new("date", "Valid date is required"))
}

// ---------------------------------------------------------------------------
// BookingWindow
// ---------------------------------------------------------------------------

/// The concrete interval a booking occupies: `[start, end)` on `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub duration: u32,
}

impl BookingWindow {
    /// Build the window for a lesson of `duration` minutes.
    ///
    /// Rejects durations outside 15..=480 minutes and lessons that would run
    /// into the next day.
    pub fn new(date: NaiveDate, start: TimeOfDay, duration: u32) -> Result<Self, ValidationError> {
        if !(MIN_BOOKING_MINUTES..=MAX_BOOKING_MINUTES).contains(&duration) {
            return Err(ValidationError::new(
                "duration",
                format!(
                    "Duration must be between {MIN_BOOKING_MINUTES} and {MAX_BOOKING_MINUTES} minutes"
                ),
            ));
        }
        let end = start.checked_add_minutes(duration).ok_or_else(|| {
            ValidationError::new("duration", "Booking cannot extend past midnight")
        })?;
        Ok(Self {
            date,
            start,
            end,
            duration,
        })
    }

    pub fn weekday(&self) -> u8 {
        weekday_index(self.date)
    }

    /// Strictly after `today`; any booking on today or earlier is in the past.
    pub fn is_after(&self, today: NaiveDate) -> bool {
        self.date > today
    }

    /// Half-open overlap on the same date.
    pub fn overlaps(&self, other: &BookingWindow) -> bool {
        self.date == other.date && self.start < other.end && self.end > other.start
    }

    /// Whether `[start, end]` of a recurring slot contains this window.
    pub fn fits_within(&self, slot_start: TimeOfDay, slot_end: TimeOfDay) -> bool {
        slot_start <= self.start && slot_end >= self.end
    }
}
