// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Atende conversation engine.

use thiserror::Error;

/// The primary error type used across all Atende adapter traits and core operations.
///
/// "Nothing matched" outcomes (no identifier in a text, no quick reply for a
/// message) are not errors and are expressed as `Option::None` by the APIs
/// that produce them.
#[derive(Debug, Error)]
pub enum AtendeError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (follow-up file I/O, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, send failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The session for a device exists but is not currently able to send.
    #[error("session `{session}` is not ready to send")]
    NotReady { session: String },

    /// Media attached to a message could not be downloaded.
    #[error("media download failed: {message}")]
    MediaDownload {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The OCR engine failed to process an image.
    #[error("ocr error: {message}")]
    Ocr {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provisioning upstream failed (network, HTTP status, empty answer).
    #[error("provisioning error: {message}")]
    Provisioning {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A catalog write was rejected because a value is malformed.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A catalog write collides with an existing entry in the same scope.
    #[error("{kind} `{key}` already exists in this scope")]
    Conflict { kind: String, key: String },

    /// A catalog row addressed by id does not exist.
    #[error("{kind} #{id} not found")]
    NotFound { kind: String, id: u64 },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AtendeError {
    /// Shorthand for a [`AtendeError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for failures of the extraction or provisioning
    /// infrastructure, which degrade to a fallback message instead of
    /// propagating to the transport.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Ocr { .. }
                | Self::MediaDownload { .. }
                | Self::Provisioning { .. }
                | Self::Timeout { .. }
        )
    }

    /// Returns `true` for errors raised by the administrative write path.
    pub fn is_admin_rejection(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Conflict { .. })
    }
}
