use crate::raster::DecodeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VrtError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Browser failed to launch after {attempts} attempts: {last_error}")]
    LaunchExhausted { attempts: u32, last_error: String },

    #[error("Duplicate capture id \"{id}\"")]
    DuplicateCaptureId { id: String },

    #[error("Page server error: {0}")]
    Server(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VrtError {
    pub fn browser(message: impl Into<String>) -> Self {
        VrtError::Browser(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        VrtError::Config(message.into())
    }

    pub fn duplicate_capture_id(id: impl Into<String>) -> Self {
        VrtError::DuplicateCaptureId { id: id.into() }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            VrtError::Io(e) => ErrorPayload::new(
                ErrorCategory::Filesystem,
                e.to_string(),
                "Check that the screenshot and report directories are writable.",
            ),
            VrtError::Image(e) => ErrorPayload::new(
                ErrorCategory::Image,
                e.to_string(),
                "Delete the offending PNG and re-run with --update.",
            ),
            VrtError::Decode(e) => ErrorPayload::new(
                ErrorCategory::Image,
                e.to_string(),
                "Delete the offending PNG and re-run with --update.",
            ),
            VrtError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Browser,
                e.to_string(),
                "The page returned unexpected data for a capture element; check the capture markup.",
            ),
            VrtError::Browser(msg) => ErrorPayload::new(
                ErrorCategory::Browser,
                msg.to_string(),
                "Run with RUST_LOG=debug for protocol details; make sure the page loads in a normal browser.",
            ),
            VrtError::LaunchExhausted { .. } => ErrorPayload::new(
                ErrorCategory::Browser,
                self.to_string(),
                "Install Chrome/Chromium or set browser.executable in vrt.toml.",
            ),
            VrtError::DuplicateCaptureId { id } => ErrorPayload::new(
                ErrorCategory::Capture,
                format!("Duplicate filename: \"{id}.png\""),
                "Please look for duplicate capture IDs.",
            ),
            VrtError::Server(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("address in use") || lower.contains("addrinuse") {
                    ErrorPayload::new(
                        ErrorCategory::Server,
                        msg.to_string(),
                        "Another process holds the listen address; stop it or change `listen` in vrt.toml.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Server,
                        msg.to_string(),
                        "Check `listen` and `page_dir` in vrt.toml.",
                    )
                }
            }
            VrtError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check vrt.toml (or the file named by VRT_CONFIG).",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, VrtError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Filesystem,
    Image,
    Browser,
    Server,
    Capture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
