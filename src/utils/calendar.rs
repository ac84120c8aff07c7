use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use derive_more::{Display, Error};

/// Decides which calendar day an instant belongs to.
///
/// Attendance rows are keyed by (user, date); every operation derives "today"
/// from the instant it was handed, through this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarPolicy {
    offset: FixedOffset,
}

#[derive(Debug, Display, Error)]
#[display(fmt = "invalid UTC offset '{}', expected UTC, Z, +HH:MM or -HH:MM", value)]
pub struct InvalidOffset {
    value: String,
}

impl CalendarPolicy {
    pub fn utc() -> Self {
        Self::with_offset(Utc.fix())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar date of `instant` in this policy's zone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }
}

impl Default for CalendarPolicy {
    fn default() -> Self {
        Self::utc()
    }
}

impl FromStr for CalendarPolicy {
    type Err = InvalidOffset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || InvalidOffset {
            value: s.to_string(),
        };

        if raw.eq_ignore_ascii_case("utc") || raw == "Z" || raw == "z" {
            return Ok(Self::utc());
        }

        let (sign, rest) = match raw.as_bytes().first() {
            Some(b'+') => (1, &raw[1..]),
            Some(b'-') => (-1, &raw[1..]),
            _ => return Err(invalid()),
        };

        // accepts HH:MM, HHMM and HH
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) || !matches!(digits.len(), 2 | 4) {
            return Err(invalid());
        }
        if rest.contains(':') && (rest.len() != 5 || rest.as_bytes()[2] != b':') {
            return Err(invalid());
        }

        let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
        let minutes: i32 = if digits.len() == 4 {
            digits[2..].parse().map_err(|_| invalid())?
        } else {
            0
        };
        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self::with_offset)
            .ok_or_else(invalid)
    }
}
