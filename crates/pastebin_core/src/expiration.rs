//! Symbolic expiration choices and their resolution to absolute timestamps.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Retention window picked by the submitter.
///
/// Unknown or missing values resolve to [`ExpirationChoice::OneWeek`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpirationChoice {
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "1day")]
    OneDay,
    #[default]
    #[serde(rename = "1week")]
    OneWeek,
    /// Paste is kept until deleted or swept by an operator.
    #[serde(rename = "never")]
    Never,
}

impl ExpirationChoice {
    /// Parse a wire value, falling back to one week for anything unrecognized.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Self::default();
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "5min" => Self::FiveMinutes,
            "1hour" => Self::OneHour,
            "1day" => Self::OneDay,
            "1week" => Self::OneWeek,
            "never" => Self::Never,
            _ => Self::default(),
        }
    }

    /// Length of the retention window, or `None` for pastes that never expire.
    pub fn window(self) -> Option<Duration> {
        match self {
            Self::FiveMinutes => Some(Duration::minutes(5)),
            Self::OneHour => Some(Duration::hours(1)),
            Self::OneDay => Some(Duration::days(1)),
            Self::OneWeek => Some(Duration::weeks(1)),
            Self::Never => None,
        }
    }

    /// Absolute expiry for a paste created at `now`.
    pub fn resolve(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window().map(|window| now + window)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FiveMinutes => "5min",
            Self::OneHour => "1hour",
            Self::OneDay => "1day",
            Self::OneWeek => "1week",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for ExpirationChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a record with `expires_at` is past its window at `now`.
///
/// The boundary instant itself still counts as live.
pub fn is_expired_at(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|expiry| expiry < now)
}
