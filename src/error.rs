//! Error handling for the image chooser
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Structural catalog problems surface as `Config`; individual submitted form
//! values are never errors (they are normalized by the resolver instead).

use thiserror::Error;

/// Main error type for catalog loading and option resolution
#[derive(Error, Debug)]
pub enum ImageChooserError {
    /// IO errors (reading or writing the catalog document)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structurally invalid catalog (missing tiers, empty image list, no default entitlement)
    #[error("Configuration error: {0}")]
    Config(String),

    /// State errors (lock poisoning)
    #[error("State error: {0}")]
    State(String),
}

/// Result type alias for image chooser operations
pub type Result<T> = std::result::Result<T, ImageChooserError>;

impl ImageChooserError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// True for structural catalog errors
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
