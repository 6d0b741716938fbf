//! Error types for trackflow-attribution

use thiserror::Error;

/// Error type for attribution operations
#[derive(Debug, Error)]
pub enum TrackflowError {
    /// No touchpoints to attribute; callers skip persistence
    #[error("No touchpoints to attribute")]
    EmptySequence,

    /// Configured model name is not one of the five known models
    #[error("Unknown attribution model: {0}")]
    UnknownModel(String),

    /// Model parameters failed validation
    #[error("Invalid attribution config: {0}")]
    InvalidConfig(String),

    /// Touchpoint ID already recorded for the subject; touchpoints are immutable
    #[error("Touchpoint {touchpoint_id} already recorded for {subject_id}")]
    DuplicateTouchpoint {
        subject_id: String,
        touchpoint_id: String,
    },

    /// Touchpoint store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TrackflowError {
    /// Whether this error only reports that there was nothing to do
    pub fn is_empty_sequence(&self) -> bool {
        matches!(self, Self::EmptySequence)
    }
}

impl From<serde_json::Error> for TrackflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias for attribution operations
pub type Result<T> = std::result::Result<T, TrackflowError>;
