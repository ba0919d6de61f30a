use crate::error::{errors, DrawDriveError, DrawDriveResult, SyncFailureKind};
use tracing::error;

use super::google_drive_service::ApiError;
use super::oauth_client::AuthError;

pub type SyncResult<T> = DrawDriveResult<T>;

/// Helper namespace that turns step failures into [`DrawDriveError`]s.
///
/// Each helper logs the full diagnostic once and keeps a single readable
/// message for the caller.
pub struct SyncError;

impl SyncError {
    pub fn client_unavailable(err: reqwest::Error) -> DrawDriveError {
        error!(error = ?err, "Drive HTTP client could not be built");
        errors::sync_error_with_source(
            SyncFailureKind::ClientLibraryUnavailable,
            format!("HTTP client could not be created: {err}"),
            err,
        )
    }

    pub fn missing_api_key() -> DrawDriveError {
        error!("Drive API key is not configured");
        errors::sync_error(
            SyncFailureKind::ClientLibraryInitFailed,
            "API key is not configured (set DRAWDRIVE_API_KEY)",
        )
    }

    pub fn client_init(err: ApiError) -> DrawDriveError {
        Self::api(
            SyncFailureKind::ClientLibraryInitFailed,
            "Drive API rejected the client configuration",
            err,
        )
    }

    pub fn authentication(err: AuthError) -> DrawDriveError {
        error!(error = ?err, "Google Drive authentication failed");
        let message = match &err {
            AuthError::AccessDenied => "Authorization was cancelled".to_string(),
            other => other.to_string(),
        };
        errors::sync_error_with_source(SyncFailureKind::AuthenticationFailed, message, err)
    }

    pub fn folder(err: ApiError) -> DrawDriveError {
        Self::api(
            SyncFailureKind::FolderOperationFailed,
            "Failed to find or create the drawings folder",
            err,
        )
    }

    pub fn upload(err: ApiError) -> DrawDriveError {
        Self::api(SyncFailureKind::UploadFailed, "Failed to upload drawing", err)
    }

    pub fn listing(err: ApiError) -> DrawDriveError {
        Self::api(
            SyncFailureKind::FolderOperationFailed,
            "Failed to list drawings",
            err,
        )
    }

    pub fn download(err: ApiError) -> DrawDriveError {
        Self::api(SyncFailureKind::DownloadFailed, "Failed to download drawing", err)
    }

    pub fn invalid_content(err: serde_json::Error) -> DrawDriveError {
        error!(error = %err, "Downloaded drawing is not valid JSON");
        errors::sync_error_with_source(
            SyncFailureKind::DownloadFailed,
            format!("Downloaded file is not valid JSON: {err}"),
            err,
        )
    }

    pub fn authentication_required() -> DrawDriveError {
        errors::sync_error(
            SyncFailureKind::NotAuthenticated,
            "No access token in this session; list or save first",
        )
    }

    fn api(kind: SyncFailureKind, context: &str, err: ApiError) -> DrawDriveError {
        error!(%kind, status = ?err.status(), error = %err, "{}", context);
        errors::sync_error_with_source(kind, format!("{context}: {}", err.summary()), err)
    }
}
