//! Error handling for ftmix
//!
//! Every error carries a stable code and recovery suggestions so the
//! presentation layer can report problems without parsing messages.

use thiserror::Error;

/// Result type alias for ftmix operations
pub type Result<T> = std::result::Result<T, MixError>;

/// Main error type for ftmix operations
#[derive(Error, Debug)]
pub enum MixError {
    // Input Errors
    #[error("Could not decode image: {reason}")]
    Decode {
        reason: String,
        #[source]
        source: Option<image::ImageError>,
    },

    #[error("Invalid input slot: '{slot}' (expected 1-4)")]
    InvalidSlot { slot: String },

    #[error("Invalid output key: '{key}' (expected output_1 or output_2)")]
    InvalidOutputKey { key: String },

    #[error("Unknown view kind: '{kind}'")]
    UnknownViewKind { kind: String },

    #[error("Invalid mix request: {reason}")]
    InvalidRequest { reason: String },

    // Processing Errors
    #[error("Mix produced no result: no slot contributed")]
    EmptyMixResult,

    #[error("Composition failed: {reason}")]
    CompositionFailure { reason: String },

    #[error("Could not encode image: {reason}")]
    Encode { reason: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MixError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MixError::Decode { .. } => "DECODE_ERROR",
            MixError::InvalidSlot { .. } => "INVALID_SLOT",
            MixError::InvalidOutputKey { .. } => "INVALID_OUTPUT_KEY",
            MixError::UnknownViewKind { .. } => "UNKNOWN_VIEW_KIND",
            MixError::InvalidRequest { .. } => "INVALID_REQUEST",
            MixError::EmptyMixResult => "EMPTY_MIX_RESULT",
            MixError::CompositionFailure { .. } => "COMPOSITION_FAILURE",
            MixError::Encode { .. } => "ENCODE_ERROR",
            MixError::Config { .. } => "CONFIG_ERROR",
            MixError::Io(_) => "IO_ERROR",
            MixError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can fix this error by changing its input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MixError::Decode { .. }
                | MixError::InvalidSlot { .. }
                | MixError::InvalidOutputKey { .. }
                | MixError::UnknownViewKind { .. }
                | MixError::InvalidRequest { .. }
                | MixError::EmptyMixResult
                | MixError::Config { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            MixError::Decode { .. } => vec![
                "Check that the upload is a PNG or JPEG image",
                "The file may be truncated - try uploading it again",
            ],
            MixError::InvalidSlot { .. } => vec!["Input slots are numbered 1 to 4"],
            MixError::InvalidOutputKey { .. } => {
                vec!["Outputs are output_1 and output_2 (target_output 1 or 2)"]
            }
            MixError::UnknownViewKind { .. } => {
                vec!["Supported views: original, magnitude, phase, real, imaginary"]
            }
            MixError::EmptyMixResult => vec![
                "Upload at least one image",
                "Raise the weight of at least one slot above zero",
            ],
            MixError::CompositionFailure { .. } => vec![
                "Try a different mask or mixing mode",
                "Re-upload the input images",
            ],
            MixError::Config { .. } => vec![
                "Progress checkpoints must increase and stay below 100",
                "Delete the config file to fall back to defaults",
            ],
            _ => vec![],
        }
    }
}
