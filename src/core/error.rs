//! Error types for ridership-map
//!
//! Provides the library error enum plus fuzzy matching for route selections.

use std::fmt;

use strsim::{jaro_winkler, normalized_levenshtein};

/// Minimum combined similarity for a route id to be offered as a correction
const MIN_SUGGESTION_SCORE: f64 = 0.65;

/// Suggest the closest known route id for a selection that matched nothing.
///
/// Returns `None` when the input is already a known id or nothing is close enough.
pub fn suggest_correction(input: &str, candidates: &[String]) -> Option<String> {
    let input_lower = input.trim().to_lowercase();
    if candidates
        .iter()
        .any(|candidate| candidate.to_lowercase() == input_lower)
    {
        return None;
    }

    let mut best_match = None;
    let mut best_score = 0.0f64;

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();

        // Jaro-Winkler weighs shared prefixes, which route numbers tend to have
        let jw_score = jaro_winkler(&input_lower, &candidate_lower);
        let lev_score = normalized_levenshtein(&input_lower, &candidate_lower);
        let score = (jw_score * 0.7) + (lev_score * 0.3);

        if score >= MIN_SUGGESTION_SCORE && score > best_score {
            best_score = score;
            best_match = Some(candidate.clone());
        }
    }

    best_match
}

/// Main error type for ridership-map operations
#[derive(Debug)]
pub enum Error {
    /// Selected route id does not exist in the dataset
    RouteNotFound {
        route: String,
        suggestion: Option<String>,
    },

    /// A required column is absent from the ridership header
    MissingColumn(String),

    /// A cell could not be parsed into the expected type
    InvalidRecord {
        row: usize,
        column: String,
        value: String,
    },

    /// Station reference data is malformed
    InvalidStation(String),

    /// Directions credential is not configured
    MissingCredential(String),

    /// The directions service answered with an error status
    DirectionsFailed { status: u16, message: String },

    /// HTTP-specific error
    HttpError(String),

    /// Network connectivity issues
    NetworkError(String),

    /// File I/O error
    IoError(std::io::Error),

    /// CSV parsing error
    CsvError(csv::Error),

    /// GeoJSON parsing error
    GeoJsonError(String),

    /// JSON (de)serialization error
    JsonError(serde_json::Error),
}

impl Error {
    /// Whether the pipeline may continue without the step that produced this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MissingCredential(_)
                | Error::DirectionsFailed { .. }
                | Error::HttpError(_)
                | Error::NetworkError(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RouteNotFound { route, suggestion } => match suggestion {
                Some(suggestion) => write!(
                    f,
                    "Route '{route}' not found in dataset. Did you mean '{suggestion}'?"
                ),
                None => write!(f, "Route '{route}' not found in dataset"),
            },
            Error::MissingColumn(column) => {
                write!(f, "Required column '{column}' missing from ridership header")
            }
            Error::InvalidRecord { row, column, value } => {
                write!(f, "Invalid value '{value}' in column '{column}' at row {row}")
            }
            Error::InvalidStation(msg) => {
                write!(f, "Invalid station data: {msg}")
            }
            Error::MissingCredential(var) => {
                write!(
                    f,
                    "Directions API key is not set in environment variable {var}"
                )
            }
            Error::DirectionsFailed { status, message } => {
                write!(f, "Directions request failed ({status}): {message}")
            }
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {msg}")
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
            Error::CsvError(err) => {
                write!(f, "CSV error: {err}")
            }
            Error::GeoJsonError(msg) => {
                write!(f, "GeoJSON error: {msg}")
            }
            Error::JsonError(err) => {
                write!(f, "JSON error: {err}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            Error::CsvError(err) => Some(err),
            Error::JsonError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::CsvError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<geojson::Error> for Error {
    fn from(err: geojson::Error) -> Self {
        Error::GeoJsonError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

/// Convenience result type for ridership-map operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> Vec<String> {
        vec!["1001".to_string(), "58-1".to_string(), "83-1".to_string()]
    }

    #[test]
    fn test_suggest_correction_close_route() {
        assert_eq!(suggest_correction("58-2", &routes()), Some("58-1".to_string()));
    }

    #[test]
    fn test_suggest_correction_exact_match() {
        assert_eq!(suggest_correction("1001", &routes()), None);
        assert_eq!(suggest_correction(" 83-1 ", &routes()), None);
    }

    #[test]
    fn test_suggest_correction_no_match() {
        assert_eq!(suggest_correction("totally-unrelated-line", &routes()), None);
        assert_eq!(suggest_correction("anything", &[]), None);
    }

    #[test]
    fn test_route_not_found_display() {
        let err = Error::RouteNotFound {
            route: "58-2".to_string(),
            suggestion: Some("58-1".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Route '58-2' not found in dataset. Did you mean '58-1'?"
        );
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::MissingCredential("ORS_API_KEY".to_string()).is_recoverable());
        assert!(Error::NetworkError("timeout".to_string()).is_recoverable());
        assert!(!Error::MissingColumn("정류장명".to_string()).is_recoverable());
    }
}
