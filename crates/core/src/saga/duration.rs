//! ISO-8601 retry delay parsing.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("duration is empty")]
    Empty,

    #[error("invalid ISO-8601 duration: {0}")]
    Invalid(String),

    #[error("duration must be greater than zero: {0}")]
    Zero(String),
}

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$").unwrap()
});

/// Retry delay between assignment attempts.
///
/// Keeps the string it was parsed from so it round-trips unchanged through
/// persistence and the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentDelay {
    raw: String,
    duration: Duration,
}

impl AssignmentDelay {
    /// Parse `PnDTnHnMnS` (e.g. `PT60S`, `PT60M`, `P1DT2H`, `PT1.5S`).
    pub fn parse(input: &str) -> Result<Self, DurationError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(DurationError::Empty);
        }

        let upper = raw.to_ascii_uppercase();
        let caps = ISO_DURATION
            .captures(&upper)
            .ok_or_else(|| DurationError::Invalid(raw.to_string()))?;

        // "P" and "PT" alone match the pattern but carry no unit.
        if (1..=4).all(|i| caps.get(i).is_none()) {
            return Err(DurationError::Invalid(raw.to_string()));
        }

        let whole = |i: usize| -> Result<u64, DurationError> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u64>())
                .transpose()
                .map(|v| v.unwrap_or(0))
                .map_err(|_| DurationError::Invalid(raw.to_string()))
        };

        let days = whole(1)?;
        let hours = whole(2)?;
        let minutes = whole(3)?;
        let seconds = caps
            .get(4)
            .map(|m| m.as_str().parse::<f64>())
            .transpose()
            .map_err(|_| DurationError::Invalid(raw.to_string()))?
            .unwrap_or(0.0);

        let whole_secs = days
            .checked_mul(86_400)
            .and_then(|d| hours.checked_mul(3_600).and_then(|h| d.checked_add(h)))
            .and_then(|dh| minutes.checked_mul(60).and_then(|m| dh.checked_add(m)))
            .ok_or_else(|| DurationError::Invalid(raw.to_string()))?;

        let duration = Duration::from_secs(whole_secs)
            .checked_add(
                Duration::try_from_secs_f64(seconds)
                    .map_err(|_| DurationError::Invalid(raw.to_string()))?,
            )
            .ok_or_else(|| DurationError::Invalid(raw.to_string()))?;

        if duration.is_zero() {
            return Err(DurationError::Zero(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            duration,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The delay as a chrono duration, for deadline arithmetic.
    pub fn to_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.duration).unwrap_or(chrono::Duration::MAX)
    }
}

impl std::fmt::Display for AssignmentDelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for AssignmentDelay {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AssignmentDelay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for AssignmentDelay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
