pub mod cloud_sync;
pub mod document;
pub mod error;
pub mod file_naming;
pub mod google_drive_service;
pub mod oauth_client;
pub mod session;

pub use cloud_sync::{CloudSync, SaveOutcome, LIST_PAGE_SIZE};
pub use document::{AppState, Document, Envelope};
pub use google_drive_service::{ApiError, GoogleDriveService, RemoteFile};
pub use oauth_client::{
    AuthError, DeviceCodeResponse, DeviceFlowTokenSource, StaticTokenSource, TokenSource,
};
pub use session::{AccessToken, Session};
