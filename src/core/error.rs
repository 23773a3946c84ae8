//! Error types for the isocost library
//!
//! Provides a single error enum for geometry, cost-model and exploration
//! failures, plus fuzzy suggestions for misspelled variant names.

use std::fmt;

use strsim::{jaro_winkler, normalized_levenshtein};

use crate::core::place::Place;

/// Minimum blended similarity for a name to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Find the closest candidate to a misspelled variant name
///
/// Blends Jaro-Winkler (70%) with normalized Levenshtein (30%). Jaro-Winkler
/// rewards shared prefixes, which is how most of these names get mistyped
/// ("haversin", "eucl"); Levenshtein catches dropped letters in the middle.
pub fn suggest_correction(input: &str, candidates: &[&str]) -> Option<String> {
    let input_lower = input.to_lowercase();
    let mut best_match = None;
    let mut best_score = 0.0f64;

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();
        if candidate_lower == input_lower {
            // Exact match, nothing to suggest
            return None;
        }

        let jw_score = jaro_winkler(&input_lower, &candidate_lower);
        let lev_score = normalized_levenshtein(&input_lower, &candidate_lower);
        let mut score = (jw_score * 0.7) + (lev_score * 0.3);

        // Hyphenated names ("two-of-them") are often typed as one of their parts
        if candidate_lower.contains('-') {
            for part in candidate_lower.split('-') {
                if part.len() >= 3 && jaro_winkler(&input_lower, part) > 0.9 {
                    score += 0.1;
                }
            }
        }

        if score >= SUGGESTION_THRESHOLD && score > best_score {
            best_score = score;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Main error type for isocost operations
#[derive(Debug)]
pub enum Error {
    /// Latitude or longitude is not finite or outside the legal range
    InvalidPlace { lat: f64, long: f64 },

    /// Malformed bounding box or out-of-range box mutation
    InvalidGeometry(String),

    /// Destination weight is not a finite positive number
    InvalidWeight(f64),

    /// Invalid configuration or parameters
    InvalidConfig(String),

    /// A cost lookup found no entry; the matrix was not filled first
    MatrixIncomplete { origin: Place, destination: Place },

    /// The requested query is not supported by this destination kind
    Unsupported(String),

    /// An aggregating destination set has no children
    EmptyDestinationSet(String),

    /// Unknown calculator, discretizer or aggregation name
    UnknownVariant {
        kind: &'static str,
        name: String,
        suggestion: Option<String>,
    },

    /// A background cost worker panicked or was cancelled
    WorkerFailed(String),

    /// Input could not be parsed
    ParseError(String),

    /// File I/O error
    IoError(std::io::Error),
}

impl Error {
    /// Build an `UnknownVariant` error, attaching the closest known name
    pub fn unknown_variant(kind: &'static str, name: &str, known: &[&str]) -> Self {
        Error::UnknownVariant {
            kind,
            name: name.to_string(),
            suggestion: suggest_correction(name, known),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPlace { lat, long } => {
                write!(f, "Invalid place: lat={lat}, long={long} (expected finite lat in [-90, 90] and long in [-180, 180])")
            }
            Error::InvalidGeometry(msg) => {
                write!(f, "Invalid geometry: {msg}")
            }
            Error::InvalidWeight(weight) => {
                write!(f, "Invalid weight {weight}: weights must be finite and positive")
            }
            Error::InvalidConfig(msg) => {
                write!(f, "Invalid configuration: {msg}")
            }
            Error::MatrixIncomplete { origin, destination } => {
                write!(f, "Cost matrix incomplete: no entry for {origin} -> {destination}, it should be filled first")
            }
            Error::Unsupported(msg) => {
                write!(f, "Unsupported query: {msg}")
            }
            Error::EmptyDestinationSet(name) => {
                if name.is_empty() {
                    write!(f, "Destination set has no destinations")
                } else {
                    write!(f, "Destination set '{name}' has no destinations")
                }
            }
            Error::UnknownVariant { kind, name, suggestion } => match suggestion {
                Some(s) => write!(f, "Unknown {kind} '{name}'. Did you mean '{s}'?"),
                None => write!(f, "Unknown {kind} '{name}'"),
            },
            Error::WorkerFailed(msg) => {
                write!(f, "Cost worker failed: {msg}")
            }
            Error::ParseError(msg) => {
                write!(f, "Parse error: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::IoError(err.into())
        } else {
            Error::ParseError(err.to_string())
        }
    }
}

/// Convenience result type for isocost operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    const CALCULATORS: &[&str] = &["taxicab", "eight-directions", "euclidean", "lat-corrected", "haversine"];

    #[test]
    fn test_suggest_correction_typos() {
        assert_eq!(suggest_correction("haversin", CALCULATORS), Some("haversine".to_string()));
        assert_eq!(suggest_correction("eucledian", CALCULATORS), Some("euclidean".to_string()));
        assert_eq!(suggest_correction("taxicb", CALCULATORS), Some("taxicab".to_string()));
    }

    #[test]
    fn test_suggest_correction_exact_and_case() {
        assert_eq!(suggest_correction("haversine", CALCULATORS), None);
        assert_eq!(suggest_correction("HAVERSINE", CALCULATORS), None);
    }

    #[test]
    fn test_suggest_correction_no_match() {
        assert_eq!(suggest_correction("zzzzzz", CALCULATORS), None);
    }

    #[test]
    fn test_unknown_variant_display() {
        let err = Error::unknown_variant("calculator", "haversin", CALCULATORS);
        assert_eq!(err.to_string(), "Unknown calculator 'haversin'. Did you mean 'haversine'?");
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("missing"));
    }
}
