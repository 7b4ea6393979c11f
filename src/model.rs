/// Core data types for the ENSO monitoring service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O and no external collaborators — only types and the
/// service-wide error enum.

use chrono::NaiveDate;
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Climatic phase derived from the smoothed Niño 3.4 anomaly.
///
/// `ElNino` is the warm phase, `LaNina` the cold phase. `Neutral` covers
/// everything in between, including months where the smoothed anomaly is
/// undefined (the tail of the series).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ElNino,
    Neutral,
    LaNina,
}

impl Phase {
    /// CSV spelling used by the published dataset ("elnino", "neutral",
    /// "lanina").
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::ElNino => "elnino",
            Phase::Neutral => "neutral",
            Phase::LaNina => "lanina",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// A single monthly reading from the NOAA CPC detrended Niño 3.4 table.
///
/// `date` is the first day of the observation month. `total` is the raw
/// ERSST.v5 sea-surface temperature, `climate_adjustment` the 30-year base
/// period adjustment, and `anomaly` the Oceanic Niño Index value the phase
/// classification operates on. `total` and `climate_adjustment` are carried
/// through to the published table untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub total: f64,
    pub climate_adjustment: f64,
    pub anomaly: f64,
}

/// An `Observation` enriched with the four derived phase columns.
///
/// `trimester_average` is `None` for the last `window - 1` months of the
/// series, where the forward-looking window runs off the end of the data.
/// Those months always classify `Neutral`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledObservation {
    pub date: NaiveDate,
    pub total: f64,
    pub climate_adjustment: f64,
    pub anomaly: f64,
    pub trimester_average: Option<f64>,
    pub trimester_average_rounded: Option<f64>,
    pub trimester_phase: Phase,
    pub event_phase: Phase,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while fetching, labeling, or publishing the series.
#[derive(Debug, PartialEq)]
pub enum EnsoError {
    /// Non-2xx HTTP response from NOAA or HDX.
    HttpError(u16),
    /// A response body or input row could not be parsed.
    ParseError(String),
    /// The series violates the labeler's preconditions
    /// (non-increasing dates, duplicate months, non-finite anomaly).
    InvalidSeries(String),
    /// The configuration file is missing or malformed.
    ConfigError(String),
    /// The HDX action API accepted the request but reported failure.
    PublishError(String),
    /// Local filesystem failure while writing the resource file.
    IoError(String),
}

impl fmt::Display for EnsoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnsoError::HttpError(code) => write!(f, "HTTP error: {}", code),
            EnsoError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            EnsoError::InvalidSeries(msg) => write!(f, "Invalid series: {}", msg),
            EnsoError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            EnsoError::PublishError(msg) => write!(f, "Publish error: {}", msg),
            EnsoError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for EnsoError {}

impl From<std::io::Error> for EnsoError {
    fn from(err: std::io::Error) -> Self {
        EnsoError::IoError(err.to_string())
    }
}

impl From<csv::Error> for EnsoError {
    fn from(err: csv::Error) -> Self {
        EnsoError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_csv_spelling() {
        assert_eq!(Phase::ElNino.to_string(), "elnino");
        assert_eq!(Phase::Neutral.to_string(), "neutral");
        assert_eq!(Phase::LaNina.to_string(), "lanina");
    }

    #[test]
    fn test_error_display_includes_detail() {
        let err = EnsoError::InvalidSeries("dates not increasing at row 3".to_string());
        assert!(err.to_string().contains("dates not increasing at row 3"));

        let err = EnsoError::HttpError(503);
        assert_eq!(err.to_string(), "HTTP error: 503");
    }
}
