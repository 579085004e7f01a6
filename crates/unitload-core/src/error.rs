//! Error types for the loader.
//!
//! Every variant is fatal for the session that raised it. Nothing here is
//! retried; the caller decides how to surface the failure.

/// Loader errors.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Manifest absent, unreadable, empty or malformed.
    #[error("failed loading manifest {location}: {reason}")]
    Manifest {
        location: String,
        status: Option<u16>,
        reason: String,
    },

    /// A unit fetch failed or returned an empty body.
    #[error("failed loading unit {identifier}: {cause}")]
    Fetch {
        identifier: String,
        status: Option<u16>,
        cause: String,
    },

    /// The execution environment failed to insert or settle a unit.
    #[error("failed inserting unit {identifier}: {reason}")]
    Insertion { identifier: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl LoaderError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,
            Self::Manifest { .. } => 2,
            Self::Fetch { .. } => 3,
            Self::Insertion { .. } => 4,
        }
    }

    /// HTTP status attached to the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Manifest { status, .. } | Self::Fetch { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn manifest(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Manifest {
            location: location.into(),
            status: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn insertion(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Insertion {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
