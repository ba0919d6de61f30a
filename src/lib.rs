//! drawdrive
//!
//! Save whiteboard drawings to Google Drive, list them, and load them back.

pub mod commands;
pub mod config;
pub mod error;
pub mod sync;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::DriveSettings;
pub use error::{DrawDriveError, DrawDriveResult, SyncFailureKind};
pub use sync::{CloudSync, Document, RemoteFile, SaveOutcome, Session};
