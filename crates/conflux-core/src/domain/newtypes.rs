//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the values embedded in a conflict file name.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// DeviceId
// ============================================================================

/// Short identifier of the device that produced a conflict copy
///
/// The synchronization tool writes the first block of the device ID
/// (seven uppercase characters), but the value is treated as an opaque
/// alphanumeric token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new DeviceId, validating that it is a non-empty ASCII alphanumeric token
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidDeviceId(id));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

// ============================================================================
// ConflictTimestamp
// ============================================================================

/// Point in time embedded in a conflict file name
///
/// Encoded as `YYYYMMDD-HHMMSS`, or just `YYYYMMDD` when the writer only
/// recorded the date. The encoding sorts lexically in chronological order.
/// Ordering compares the instant first; a date-only value sorts before a
/// full timestamp at midnight of the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConflictTimestamp {
    at: NaiveDateTime,
    has_time: bool,
}

impl ConflictTimestamp {
    /// Parses the `YYYYMMDD` date token and optional `HHMMSS` time token
    pub fn parse(date: &str, time: Option<&str>) -> Result<Self, DomainError> {
        let invalid = || match time {
            Some(t) => DomainError::InvalidTimestamp(format!("{date}-{t}")),
            None => DomainError::InvalidTimestamp(date.to_string()),
        };

        if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let day = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| invalid())?;

        let (clock, has_time) = match time {
            Some(t) => {
                if t.len() != 6 || !t.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                (NaiveTime::parse_from_str(t, "%H%M%S").map_err(|_| invalid())?, true)
            }
            None => (NaiveTime::MIN, false),
        };

        Ok(Self {
            at: day.and_time(clock),
            has_time,
        })
    }

    /// Returns the instant as a naive (zone-less) date-time
    #[must_use]
    pub fn at(&self) -> NaiveDateTime {
        self.at
    }

    /// Whether the name carried a clock time in addition to the date
    #[must_use]
    pub fn has_time(&self) -> bool {
        self.has_time
    }

    /// The date as `YYYY-MM-DD`, used when naming kept copies
    #[must_use]
    pub fn date_label(&self) -> String {
        self.at.format("%Y-%m-%d").to_string()
    }

    /// The token exactly as it appears in a conflict file name
    #[must_use]
    pub fn token(&self) -> String {
        if self.has_time {
            self.at.format("%Y%m%d-%H%M%S").to_string()
        } else {
            self.at.format("%Y%m%d").to_string()
        }
    }
}

impl Display for ConflictTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

impl FromStr for ConflictTimestamp {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((date, time)) => Self::parse(date, Some(time)),
            None => Self::parse(s, None),
        }
    }
}

impl TryFrom<String> for ConflictTimestamp {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConflictTimestamp> for String {
    fn from(ts: ConflictTimestamp) -> Self {
        ts.token()
    }
}
