//! Unified error handling for drawdrive
//!
//! Every pipeline step reports failures through [`DrawDriveError`]. The
//! `Sync` variant carries a [`SyncFailureKind`] so callers can match on the
//! kind of cloud failure instead of inspecting messages.

use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum DrawDriveError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Cloud save/list/load failures
    #[error("Sync error ({kind}): {message}")]
    Sync {
        message: String,
        kind: SyncFailureKind,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Filesystem errors
    #[error("Filesystem error: {message} (path: {path})")]
    Filesystem {
        message: String,
        path: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Document encoding/decoding errors
    #[error("Document error: {message}")]
    Document {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        value: Option<String>,
    },
}

/// Kinds of cloud failure surfaced by the save/list/load pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFailureKind {
    /// The HTTP client could not be constructed.
    ClientLibraryUnavailable,
    /// The API key is missing or was rejected by the API.
    ClientLibraryInitFailed,
    /// The user cancelled consent or the OAuth provider rejected the request.
    AuthenticationFailed,
    /// Folder search or create was rejected.
    FolderOperationFailed,
    /// File create returned a failure.
    UploadFailed,
    /// Listing or fetching file content failed.
    DownloadFailed,
    /// A load was attempted before any token was obtained.
    NotAuthenticated,
}

impl fmt::Display for SyncFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SyncFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncFailureKind::ClientLibraryUnavailable => "client_library_unavailable",
            SyncFailureKind::ClientLibraryInitFailed => "client_library_init_failed",
            SyncFailureKind::AuthenticationFailed => "authentication_failed",
            SyncFailureKind::FolderOperationFailed => "folder_operation_failed",
            SyncFailureKind::UploadFailed => "upload_failed",
            SyncFailureKind::DownloadFailed => "download_failed",
            SyncFailureKind::NotAuthenticated => "not_authenticated",
        }
    }
}

impl DrawDriveError {
    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            DrawDriveError::Config { .. } => ErrorCategory::Config,
            DrawDriveError::Sync { kind, .. } => match kind {
                SyncFailureKind::AuthenticationFailed | SyncFailureKind::NotAuthenticated => {
                    ErrorCategory::Auth
                }
                _ => ErrorCategory::Sync,
            },
            DrawDriveError::Filesystem { .. } => ErrorCategory::Filesystem,
            DrawDriveError::Document { .. } => ErrorCategory::Document,
            DrawDriveError::Validation { .. } => ErrorCategory::Validation,
        }
    }

    /// Check if the user can simply re-run the action.
    ///
    /// No failure is fatal to the process; this only separates failures a
    /// second attempt may fix from ones that need a configuration change.
    pub fn is_recoverable(&self) -> bool {
        match self {
            DrawDriveError::Config { .. } => false,
            DrawDriveError::Sync { kind, .. } => !matches!(
                kind,
                SyncFailureKind::ClientLibraryUnavailable | SyncFailureKind::ClientLibraryInitFailed
            ),
            DrawDriveError::Filesystem { .. } => false,
            DrawDriveError::Document { .. } => false,
            DrawDriveError::Validation { .. } => true,
        }
    }

    /// Returns the cloud failure kind, if any.
    pub fn sync_kind(&self) -> Option<SyncFailureKind> {
        if let DrawDriveError::Sync { kind, .. } = self {
            Some(*kind)
        } else {
            None
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            DrawDriveError::Config { message, .. } => {
                format!("Configuration problem: {}", message)
            }
            DrawDriveError::Sync { message, kind, .. } => match kind {
                SyncFailureKind::ClientLibraryUnavailable => {
                    format!("Drive client is unavailable: {}", message)
                }
                SyncFailureKind::ClientLibraryInitFailed => {
                    format!("Drive client could not be initialized: {}", message)
                }
                SyncFailureKind::AuthenticationFailed => {
                    format!("Google Drive sign-in failed: {}", message)
                }
                SyncFailureKind::FolderOperationFailed => {
                    format!("Could not prepare the drawings folder: {}", message)
                }
                SyncFailureKind::UploadFailed => format!("Upload failed: {}", message),
                SyncFailureKind::DownloadFailed => format!("Download failed: {}", message),
                SyncFailureKind::NotAuthenticated => {
                    format!("Sign in to Google Drive first: {}", message)
                }
            },
            DrawDriveError::Filesystem { message, .. } => {
                format!("File system problem: {}", message)
            }
            DrawDriveError::Document { message, .. } => {
                format!("Drawing could not be read: {}", message)
            }
            DrawDriveError::Validation { message, .. } => {
                format!("Input validation failed: {}", message)
            }
        }
    }

    /// Get technical details for logging
    pub fn technical_details(&self) -> String {
        match self {
            DrawDriveError::Sync { kind, source, .. } => {
                let mut details = format!("Sync error - Kind: {}", kind);
                if let Some(src) = source {
                    details.push_str(&format!(", Source: {}", src));
                }
                details
            }
            DrawDriveError::Config { source, .. } | DrawDriveError::Document { source, .. } => {
                if let Some(src) = source {
                    format!("{} - Source: {}", self.category().display_name(), src)
                } else {
                    format!("{} - No source", self.category().display_name())
                }
            }
            _ => format!("Error details: {}", self),
        }
    }
}

impl From<io::Error> for DrawDriveError {
    fn from(err: io::Error) -> Self {
        DrawDriveError::Filesystem {
            message: format!("I/O error: {err}"),
            path: "<io>".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<config::ConfigError> for DrawDriveError {
    fn from(err: config::ConfigError) -> Self {
        DrawDriveError::Config {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Sync,
    Auth,
    Filesystem,
    Document,
    Validation,
}

impl ErrorCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            ErrorCategory::Config => "Configuration",
            ErrorCategory::Sync => "Synchronization",
            ErrorCategory::Auth => "Authentication",
            ErrorCategory::Filesystem => "Filesystem",
            ErrorCategory::Document => "Document",
            ErrorCategory::Validation => "Validation",
        }
    }
}

/// Result type alias for convenience
pub type DrawDriveResult<T> = Result<T, DrawDriveError>;

/// Convenience functions for creating common errors
pub mod errors {
    use super::*;

    pub fn config_error(message: impl Into<String>) -> DrawDriveError {
        DrawDriveError::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn sync_error(kind: SyncFailureKind, message: impl Into<String>) -> DrawDriveError {
        DrawDriveError::Sync {
            message: message.into(),
            kind,
            source: None,
        }
    }

    pub fn sync_error_with_source(
        kind: SyncFailureKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> DrawDriveError {
        DrawDriveError::Sync {
            message: message.into(),
            kind,
            source: Some(Box::new(source)),
        }
    }

    pub fn filesystem_error(
        message: impl Into<String>,
        path: impl Into<String>,
        source: io::Error,
    ) -> DrawDriveError {
        DrawDriveError::Filesystem {
            message: message.into(),
            path: path.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn document_error(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> DrawDriveError {
        DrawDriveError::Document {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn validation_error(
        message: impl Into<String>,
        field: Option<String>,
        value: Option<String>,
    ) -> DrawDriveError {
        DrawDriveError::Validation {
            message: message.into(),
            field,
            value,
        }
    }
}
