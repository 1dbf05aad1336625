use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = 24 * MINUTES_PER_HOUR;

/// A clock time stored as minutes since midnight and serialized as `HH:MM`.
///
/// Parsed values always lie within a single day. Arithmetic does not wrap: a sum past 23:59 stays
/// an extended clock value (`24:10`) so that "ends after" comparisons remain correct, while a
/// result before midnight saturates at `00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    minutes: u32,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { minutes: 0 };

    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, String> {
        if hour > 23 || minute > 59 {
            return Err(format!("{hour:02}:{minute:02} is not a valid time of day"));
        }
        Ok(Self {
            minutes: hour * MINUTES_PER_HOUR + minute,
        })
    }

    /// Accepts `HH:MM` and `H:MM`.
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        let invalid = || format!("'{trimmed}' must be HH:MM");

        let mut split = trimmed.split(':');
        let (Some(hour_str), Some(minute_str), None) = (split.next(), split.next(), split.next())
        else {
            return Err(invalid());
        };
        if hour_str.is_empty() || hour_str.len() > 2 || minute_str.len() != 2 {
            return Err(invalid());
        }
        let hour = hour_str.parse::<u32>().map_err(|_| invalid())?;
        let minute = minute_str.parse::<u32>().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).map_err(|_| invalid())
    }

    pub fn minutes_since_midnight(self) -> u32 {
        self.minutes
    }

    pub fn hour(self) -> u32 {
        self.minutes / MINUTES_PER_HOUR
    }

    pub fn minute(self) -> u32 {
        self.minutes % MINUTES_PER_HOUR
    }

    /// False for extended clock values produced by overflowing arithmetic.
    pub fn is_within_day(self) -> bool {
        self.minutes < MINUTES_PER_DAY
    }

    pub fn plus_minutes(self, minutes: i64) -> Self {
        let total = (self.minutes as i64).saturating_add(minutes).max(0);
        Self {
            minutes: u32::try_from(total).unwrap_or(u32::MAX),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

pub fn add_minutes(time: TimeOfDay, minutes: i64) -> TimeOfDay {
    time.plus_minutes(minutes)
}

pub fn compare(a: TimeOfDay, b: TimeOfDay) -> Ordering {
    a.cmp(&b)
}

/// Signed difference `end - start` in minutes.
pub fn minutes_between(start: TimeOfDay, end: TimeOfDay) -> i64 {
    end.minutes as i64 - start.minutes as i64
}
