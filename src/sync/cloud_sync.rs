//! Save, list and load drawings in Google Drive.
//!
//! Every operation is a straight sequence of requests: initialize the
//! client once, authenticate, resolve the drawings folder, then upload,
//! list or download. A failing step aborts the operation and nothing is
//! rolled back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument};

use super::document::Document;
use super::error::{SyncError, SyncResult};
use super::file_naming::next_file_name;
use super::google_drive_service::{GoogleDriveService, RemoteFile};
use super::oauth_client::{token_source_from_settings, DevicePrompt, TokenSource};
use super::session::{AccessToken, Session};
use crate::config::DriveSettings;
use crate::error::errors;

/// Maximum number of drawings returned by [`CloudSync::list`].
pub const LIST_PAGE_SIZE: u32 = 20;
pub const DOCUMENT_MIME_TYPE: &str = "application/json";

/// Result of a save as reported to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveOutcome {
    pub fn saved(file_name: impl Into<String>) -> Self {
        Self {
            success: true,
            file_name: Some(file_name.into()),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            file_name: None,
            error: Some(message.into()),
        }
    }
}

/// The cloud save/load pipeline.
pub struct CloudSync {
    settings: DriveSettings,
    token_source: Arc<dyn TokenSource>,
    drive: OnceCell<GoogleDriveService>,
}

impl CloudSync {
    pub fn new(settings: DriveSettings, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            settings,
            token_source,
            drive: OnceCell::new(),
        }
    }

    /// Build a pipeline whose token source is chosen from `settings`.
    pub fn from_settings(settings: DriveSettings, prompt: Option<DevicePrompt>) -> Self {
        let token_source = token_source_from_settings(&settings, prompt);
        Self::new(settings, token_source)
    }

    pub fn settings(&self) -> &DriveSettings {
        &self.settings
    }

    /// Initialize the Drive client on first use; later calls reuse it.
    async fn drive(&self) -> SyncResult<&GoogleDriveService> {
        self.drive.get_or_try_init(|| self.initialize_drive()).await
    }

    async fn initialize_drive(&self) -> SyncResult<GoogleDriveService> {
        info!("Loading Google Drive client");

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("drawdrive/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SyncError::client_unavailable)?;

        let api_key = self.settings.api_key().ok_or_else(SyncError::missing_api_key)?;

        let service = GoogleDriveService::new(
            http_client,
            &self.settings.api_base,
            Some(api_key.to_string()),
        );
        service
            .load_discovery_document()
            .await
            .map_err(SyncError::client_init)?;

        info!(
            project = self.settings.project_id.as_deref().unwrap_or("<unset>"),
            bucket = self.settings.storage_bucket.as_deref().unwrap_or("<unset>"),
            "Google Drive client initialized"
        );
        Ok(service)
    }

    /// Obtain a fresh token and store it in the session.
    async fn authenticate(&self, session: &mut Session) -> SyncResult<AccessToken> {
        info!("Requesting Google Drive access token");
        let token = self
            .token_source
            .request_token()
            .await
            .map_err(SyncError::authentication)?;

        debug!(obtained_at = %token.obtained_at(), "Access token obtained");
        session.replace_token(token.clone());
        Ok(token)
    }

    async fn resolve_folder(
        &self,
        drive: &GoogleDriveService,
        token: &AccessToken,
    ) -> SyncResult<String> {
        drive
            .create_or_find_folder(token, &self.settings.folder_name)
            .await
            .map_err(SyncError::folder)
    }

    /// Save a drawing as a new file and report the outcome.
    ///
    /// Failures are logged and folded into [`SaveOutcome::failed`].
    pub async fn save(&self, session: &mut Session, document: &Document) -> SaveOutcome {
        match self.save_document(session, document).await {
            Ok(file) => SaveOutcome::saved(file.name),
            Err(err) => {
                error!(details = %err.technical_details(), "Saving drawing to Google Drive failed");
                SaveOutcome::failed(err.user_message())
            }
        }
    }

    /// Save a drawing as a new file, returning the created file.
    #[instrument(skip_all, fields(elements = document.elements.len()))]
    pub async fn save_document(
        &self,
        session: &mut Session,
        document: &Document,
    ) -> SyncResult<RemoteFile> {
        let content = document.to_envelope_bytes(&self.settings.app_url)?;
        let drive = self.drive().await?;
        let token = self.authenticate(session).await?;
        let folder_id = self.resolve_folder(drive, &token).await?;

        let file_name = next_file_name();
        let file = drive
            .upload_file_content(&token, &file_name, content, DOCUMENT_MIME_TYPE, &folder_id)
            .await
            .map_err(SyncError::upload)?;

        info!(file = %file.name, id = %file.id, "Drawing saved to Google Drive");
        Ok(file)
    }

    /// List the most recently modified drawings, newest first.
    ///
    /// Always re-authenticates; a token left in the session is replaced.
    #[instrument(skip_all)]
    pub async fn list(&self, session: &mut Session) -> SyncResult<Vec<RemoteFile>> {
        let drive = self.drive().await?;
        let token = self.authenticate(session).await?;
        let folder_id = self.resolve_folder(drive, &token).await?;

        let mut files = drive
            .list_folder_files(&token, &folder_id, LIST_PAGE_SIZE)
            .await
            .map_err(SyncError::listing)?;

        // Option orders None first, so undated entries sink to the end.
        files.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
        files.truncate(LIST_PAGE_SIZE as usize);
        Ok(files)
    }

    /// Download a drawing and return its JSON unchanged.
    ///
    /// Uses the token already in `session`; fails with `NotAuthenticated`
    /// without touching the network if there is none.
    #[instrument(skip(self, session))]
    pub async fn load(&self, session: &Session, file_id: &str) -> SyncResult<Value> {
        let token = session
            .token()
            .ok_or_else(SyncError::authentication_required)?;

        if file_id.trim().is_empty() {
            return Err(errors::validation_error(
                "File id must not be empty",
                Some("file_id".to_string()),
                None,
            ));
        }

        let drive = self.drive().await?;
        let content = drive
            .download_file_content(token, file_id)
            .await
            .map_err(SyncError::download)?;

        let value: Value = serde_json::from_slice(&content).map_err(SyncError::invalid_content)?;
        info!("Drawing loaded from Google Drive");
        Ok(value)
    }
}
