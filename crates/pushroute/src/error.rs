//! Error types for pushroute.
//!
//! Every failure in the deep-link mechanism is terminal at the point of
//! detection: callers log it and carry on. The variants below exist so that
//! the log line says exactly what went wrong.

use std::path::PathBuf;
use thiserror::Error;

use crate::intent::Slot;

/// The main error type for pushroute operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Message Errors ===
    /// The inbound message carries no target identifier.
    #[error("message has no '{field}' field")]
    MissingTarget {
        /// Name of the data field that was looked up.
        field: String,
    },

    /// The inbound message carries a target identifier that cannot be used.
    #[error("message field '{field}' is malformed: {reason}")]
    MalformedTarget {
        /// Name of the data field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    // === Intent Errors ===
    /// A staged intent could not be decoded.
    #[error("corrupt intent in {slot} slot: {message}")]
    CorruptIntent {
        /// Slot that held the record.
        slot: Slot,
        /// Description of what went wrong.
        message: String,
    },

    /// A staged intent was written by a newer schema.
    #[error("intent in {slot} slot has unsupported schema version {version}")]
    UnsupportedSchema {
        /// Slot that held the record.
        slot: Slot,
        /// Version found in the record.
        version: u32,
    },

    // === Navigation Errors ===
    /// The navigation tree rejected a navigate call.
    #[error("navigation to '{screen}' failed: {message}")]
    Navigation {
        /// Destination screen name.
        screen: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The navigation tree went away before it ever became ready.
    #[error("navigation tree dropped before becoming ready")]
    NavigatorUnavailable,

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for pushroute operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a malformed target error.
    #[must_use]
    pub fn malformed_target(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTarget {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a corrupt intent error.
    #[must_use]
    pub fn corrupt_intent(slot: Slot, message: impl Into<String>) -> Self {
        Self::CorruptIntent {
            slot,
            message: message.into(),
        }
    }

    /// Create a navigation error.
    #[must_use]
    pub fn navigation(screen: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            screen: screen.into(),
            message: message.into(),
        }
    }

    /// Check if this error means a staged record could not be decoded.
    #[must_use]
    pub fn is_corrupt_intent(&self) -> bool {
        matches!(
            self,
            Self::CorruptIntent { .. } | Self::UnsupportedSchema { .. }
        )
    }
}
