//! Error handling for Stemsep
//!
//! Parameter and input errors abort a pipeline call; stage failures inside
//! best-effort enhancement/denoise stages are caught at the stage boundary
//! and never surface here.

use thiserror::Error;

/// Result type alias for Stemsep operations
pub type Result<T> = std::result::Result<T, StemsepError>;

/// Main error type for Stemsep operations
#[derive(Error, Debug)]
pub enum StemsepError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Separation Errors
    #[error("Input cannot be separated: {reason}")]
    UnseparableInput { reason: String },

    #[error("Separation model unavailable: {detail}")]
    ModelUnavailable { detail: String },

    // Parameter Errors
    #[error("Invalid parameter {param}={value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    // Processing Errors
    #[error("Stage '{stage}' failed: {reason}")]
    StageFailure { stage: &'static str, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StemsepError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            StemsepError::FileNotFound { .. } => "FILE_NOT_FOUND",
            StemsepError::InvalidAudio { .. } => "INVALID_AUDIO",
            StemsepError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            StemsepError::EmptyAudio => "EMPTY_AUDIO",
            StemsepError::UnseparableInput { .. } => "UNSEPARABLE_INPUT",
            StemsepError::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
            StemsepError::InvalidParameter { .. } => "INVALID_PARAMETER",
            StemsepError::StageFailure { .. } => "STAGE_FAILURE",
            StemsepError::Io(_) => "IO_ERROR",
            StemsepError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by the caller
    ///
    /// Recoverable here means a retry with different inputs or parameters can
    /// succeed (e.g. switching to the mid/side backend after
    /// `ModelUnavailable`). Retry policy itself belongs to the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StemsepError::FileNotFound { .. } => true,
            StemsepError::InvalidAudio { .. } => true,
            StemsepError::UnsupportedFormat { .. } => true,
            StemsepError::UnseparableInput { .. } => true,
            StemsepError::ModelUnavailable { .. } => true,
            StemsepError::InvalidParameter { .. } => true,
            StemsepError::StageFailure { .. } => true,
            _ => false,
        }
    }
}
