// Google Drive Service - bearer-token HTTP calls against the Drive v3 REST API
// Every call takes the token explicitly; the service itself holds no session state.

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::session::AccessToken;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const FILE_FIELDS: &str = "id,name,mimeType,createdTime,modifiedTime";
const LIST_FIELDS: &str = "files(id,name,mimeType,createdTime,modifiedTime)";

/// Failure returned by every Drive call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The API answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
    /// A request URL could not be built from the configured base.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// One-line description suitable for a user-facing message.
    ///
    /// Google error bodies look like `{"error":{"code":403,"message":"..."}}`;
    /// the inner message is preferred over the raw body.
    pub fn summary(&self) -> String {
        match self {
            ApiError::Status { status, body } => {
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|value| {
                        value
                            .pointer("/error/message")
                            .and_then(|m| m.as_str())
                            .map(str::to_string)
                    });
                match detail {
                    Some(message) => format!("HTTP {}: {}", status.as_u16(), message),
                    None => format!("HTTP {}", status),
                }
            }
            ApiError::Transport(err) => format!("network error: {err}"),
            ApiError::Decode(message) => format!("unexpected response: {message}"),
            ApiError::InvalidUrl(message) => format!("invalid request URL: {message}"),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A file stored in Drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub created_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
}

/// Google Drive API response structures
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileResponse {
    id: String,
    #[serde(default)]
    name: String,
    created_time: Option<String>,
    modified_time: Option<String>,
}

fn parse_rfc3339(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|dt| {
        DateTime::parse_from_rfc3339(&dt)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

impl From<DriveFileResponse> for RemoteFile {
    fn from(response: DriveFileResponse) -> Self {
        Self {
            id: response.id,
            name: response.name,
            created_time: parse_rfc3339(response.created_time),
            modified_time: parse_rfc3339(response.modified_time),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileListResponse {
    files: Option<Vec<DriveFileResponse>>,
}

/// Quote a value for use inside a Drive `q` string literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

async fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status, body })
}

async fn decode_json<T: serde::de::DeserializeOwned>(response: Response) -> ApiResult<T> {
    response
        .json()
        .await
        .map_err(|err| ApiError::Decode(err.to_string()))
}

/// Google Drive Service using bearer tokens and HTTP requests
#[derive(Debug, Clone)]
pub struct GoogleDriveService {
    http_client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl GoogleDriveService {
    pub fn new(http_client: reqwest::Client, api_base: &str, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    /// URL of a single file; the id is percent-encoded as one path segment.
    fn file_url(&self, file_id: &str) -> ApiResult<Url> {
        let mut url = Url::parse(&self.files_url())
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.api_base.clone()))?
            .push(file_id);
        Ok(url)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/drive/v3/files", self.api_base)
    }

    fn discovery_url(&self) -> String {
        format!("{}/discovery/v1/apis/drive/v3/rest", self.api_base)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key.as_str())]),
            None => request,
        }
    }

    fn authorized(&self, request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        self.with_key(request).bearer_auth(token.secret())
    }

    /// Fetch the Drive discovery document, which validates the API key.
    pub async fn load_discovery_document(&self) -> ApiResult<()> {
        debug!("Fetching Drive discovery document");

        let response = self
            .with_key(self.http_client.get(self.discovery_url()))
            .send()
            .await
            .map_err(ApiError::Transport)?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Find a non-trashed folder by exact name.
    pub async fn find_folder(
        &self,
        token: &AccessToken,
        folder_name: &str,
    ) -> ApiResult<Option<String>> {
        debug!("Searching for folder: {}", folder_name);

        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            escape_query_value(folder_name),
            FOLDER_MIME_TYPE
        );

        let response = self
            .authorized(self.http_client.get(self.files_url()), token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("spaces", "drive"),
            ])
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let list_response: DriveFileListResponse =
            decode_json(ensure_success(response).await?).await?;

        let folder_id = list_response
            .files
            .and_then(|files| files.into_iter().next())
            .map(|folder| folder.id);

        match &folder_id {
            Some(id) => debug!("Found folder: {} (ID: {})", folder_name, id),
            None => debug!("Folder not found: {}", folder_name),
        }
        Ok(folder_id)
    }

    /// Create a folder in the Drive root.
    pub async fn create_folder(&self, token: &AccessToken, folder_name: &str) -> ApiResult<String> {
        info!("Creating new folder: {}", folder_name);

        let folder_metadata = serde_json::json!({
            "name": folder_name,
            "mimeType": FOLDER_MIME_TYPE
        });

        let response = self
            .authorized(self.http_client.post(self.files_url()), token)
            .query(&[("fields", "id,name")])
            .json(&folder_metadata)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let file_response: DriveFileResponse = decode_json(ensure_success(response).await?).await?;

        info!(
            "Successfully created folder: {} (ID: {})",
            folder_name, file_response.id
        );
        Ok(file_response.id)
    }

    /// Create or find folder
    ///
    /// Lookup and creation are separate requests, so two concurrent callers
    /// can both create the folder.
    pub async fn create_or_find_folder(
        &self,
        token: &AccessToken,
        folder_name: &str,
    ) -> ApiResult<String> {
        if let Some(folder_id) = self.find_folder(token, folder_name).await? {
            info!("Found existing folder: {} (ID: {})", folder_name, folder_id);
            return Ok(folder_id);
        }
        self.create_folder(token, folder_name).await
    }

    /// Upload content as a new file inside `folder_id`.
    pub async fn upload_file_content(
        &self,
        token: &AccessToken,
        file_name: &str,
        content: Vec<u8>,
        mime_type: &str,
        folder_id: &str,
    ) -> ApiResult<RemoteFile> {
        info!("Uploading file: {} ({} bytes)", file_name, content.len());

        let metadata = serde_json::json!({
            "name": file_name,
            "mimeType": mime_type,
            "parents": [folder_id]
        });

        let metadata_part = Part::text(metadata.to_string())
            .mime_str("application/json")
            .map_err(ApiError::Transport)?;

        let file_part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(ApiError::Transport)?;

        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .authorized(self.http_client.post(self.upload_url()), token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let file_response: DriveFileResponse = decode_json(ensure_success(response).await?).await?;
        let mut remote_file = RemoteFile::from(file_response);
        if remote_file.name.is_empty() {
            remote_file.name = file_name.to_string();
        }

        info!(
            "Successfully uploaded file: {} (ID: {})",
            remote_file.name, remote_file.id
        );
        Ok(remote_file)
    }

    /// List the newest non-trashed children of a folder, first page only.
    pub async fn list_folder_files(
        &self,
        token: &AccessToken,
        folder_id: &str,
        page_size: u32,
    ) -> ApiResult<Vec<RemoteFile>> {
        info!("Listing files in folder: {}", folder_id);

        let query = format!(
            "'{}' in parents and trashed=false",
            escape_query_value(folder_id)
        );
        let page_size = page_size.to_string();

        let response = self
            .authorized(self.http_client.get(self.files_url()), token)
            .query(&[
                ("q", query.as_str()),
                ("orderBy", "modifiedTime desc"),
                ("pageSize", page_size.as_str()),
                ("fields", LIST_FIELDS),
            ])
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let list_response: DriveFileListResponse =
            decode_json(ensure_success(response).await?).await?;

        let files: Vec<RemoteFile> = list_response
            .files
            .unwrap_or_default()
            .into_iter()
            .map(RemoteFile::from)
            .collect();

        info!("Found {} files in folder {}", files.len(), folder_id);
        Ok(files)
    }

    /// Download file content
    pub async fn download_file_content(
        &self,
        token: &AccessToken,
        file_id: &str,
    ) -> ApiResult<Vec<u8>> {
        info!("Downloading file content: {}", file_id);

        let url = self.file_url(file_id)?;
        let response = self
            .authorized(self.http_client.get(url), token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let bytes = ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(ApiError::Transport)?;

        info!(
            "Successfully downloaded file content: {} bytes",
            bytes.len()
        );
        Ok(bytes.to_vec())
    }
}
