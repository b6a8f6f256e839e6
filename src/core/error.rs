//! Error types for the market analyzer

use thiserror::Error;

use super::option::OptionType;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Provider returned nothing usable (primary and fallback both failed)
    #[error("No data: {0}")]
    NoData(String),

    #[error("Missing {option_type} strike {strike} in chain")]
    MissingStrike { strike: f64, option_type: OptionType },

    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or provider failure, including unexpected response shapes
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

impl AnalyzerError {
    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoData(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn insufficient(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }

    /// Whether the failure means the instrument has no usable data,
    /// as opposed to a problem with the data that did arrive.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NoData(_) | Self::Upstream(_))
    }
}

impl From<reqwest::Error> for AnalyzerError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

impl From<serde_json::Error> for AnalyzerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<csv::Error> for AnalyzerError {
    fn from(e: csv::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(AnalyzerError::no_data("empty chain").is_unavailable());
        assert!(AnalyzerError::upstream("503").is_unavailable());
        assert!(!AnalyzerError::insufficient(20, 3).is_unavailable());
        assert!(!AnalyzerError::MissingStrike {
            strike: 90.0,
            option_type: OptionType::Put
        }
        .is_unavailable());
    }

    #[test]
    fn test_messages() {
        let err = AnalyzerError::MissingStrike {
            strike: 110.0,
            option_type: OptionType::Call,
        };
        assert_eq!(err.to_string(), "Missing call strike 110 in chain");

        let err = AnalyzerError::insufficient(200, 150);
        assert_eq!(err.to_string(), "Insufficient data: need 200 points, have 150");
    }
}
