//! End-to-end tests of the save/list/load pipeline against a mocked Drive API.

use async_trait::async_trait;
use drawdrive::config::DriveSettings;
use drawdrive::sync::file_naming::is_drawing_file_name;
use drawdrive::sync::{
    AccessToken, AuthError, CloudSync, Document, Session, StaticTokenSource, TokenSource,
    LIST_PAGE_SIZE,
};
use drawdrive::SyncFailureKind;
use mockito::{Matcher, Mock, ServerGuard};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;

const FOLDER_QUERY: &str =
    "name='Excalidraw' and mimeType='application/vnd.google-apps.folder' and trashed=false";
const NAME_PATTERN: &str = r#""name":"excalidraw-\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}-\d{3}Z\.excalidraw""#;

/// Matches a request path whether or not the query string is included.
fn path(p: &str) -> Matcher {
    Matcher::Regex(format!(r"^{}(\?.*)?$", p))
}

fn settings_for(server: &ServerGuard) -> DriveSettings {
    DriveSettings {
        api_key: Some(SecretString::new("test-key".to_string())),
        api_base: server.url(),
        oauth_base: server.url(),
        ..DriveSettings::default()
    }
}

fn sync_for(server: &ServerGuard, token: &str) -> CloudSync {
    CloudSync::new(settings_for(server), Arc::new(StaticTokenSource::new(token)))
}

fn rectangle_document() -> Document {
    Document::new(vec![json!({
        "id": "rect-1",
        "type": "rectangle",
        "x": 100,
        "y": 80,
        "width": 200,
        "height": 120,
        "strokeWidth": 1,
        "version": 1
    })])
}

async fn mock_discovery(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", path("/discovery/v1/apis/drive/v3/rest"))
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"kind":"discovery#restDescription","name":"drive","version":"v3"}"#)
        .create_async()
        .await
}

async fn mock_folder_search(server: &mut ServerGuard, body: &str) -> Mock {
    server
        .mock("GET", path("/drive/v3/files"))
        .match_query(Matcher::UrlEncoded("q".into(), FOLDER_QUERY.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

async fn mock_existing_folder(server: &mut ServerGuard) -> Mock {
    mock_folder_search(server, r#"{"files":[{"id":"folder-1","name":"Excalidraw"}]}"#).await
}

async fn mock_upload(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", path("/upload/drive/v3/files"))
        .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Regex(NAME_PATTERN.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"file-1","mimeType":"application/json"}"#)
        .create_async()
        .await
}

struct CancelledConsent;

#[async_trait]
impl TokenSource for CancelledConsent {
    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        Err(AuthError::AccessDenied)
    }
}

#[tokio::test]
async fn save_returns_timestamped_file_name() {
    let mut server = mockito::Server::new_async().await;
    let discovery = mock_discovery(&mut server).await;
    let folder = mock_existing_folder(&mut server).await;
    let upload = mock_upload(&mut server).await;

    let sync = sync_for(&server, "test-token");
    let mut session = Session::new();
    let outcome = sync.save(&mut session, &rectangle_document()).await;

    assert!(outcome.success, "unexpected failure: {:?}", outcome.error);
    let file_name = outcome.file_name.clone().unwrap();
    assert!(is_drawing_file_name(&file_name), "bad name {file_name}");
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({ "success": true, "fileName": file_name })
    );
    assert!(session.is_authenticated());

    discovery.assert_async().await;
    folder.assert_async().await;
    upload.assert_async().await;
}

#[tokio::test]
async fn repeated_saves_create_distinct_files_and_initialize_once() {
    let mut server = mockito::Server::new_async().await;
    let discovery = mock_discovery(&mut server).await;
    let _folder = mock_existing_folder(&mut server).await;
    let upload = server
        .mock("POST", path("/upload/drive/v3/files"))
        .match_body(Matcher::Regex(NAME_PATTERN.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"file-1"}"#)
        .expect(2)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let mut session = Session::new();
    let document = rectangle_document();

    let first = sync.save_document(&mut session, &document).await.unwrap();
    let second = sync.save_document(&mut session, &document).await.unwrap();

    assert_ne!(first.name, second.name);
    discovery.assert_async().await;
    upload.assert_async().await;
}

#[tokio::test]
async fn missing_folder_is_created_before_upload() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let _search = mock_folder_search(&mut server, r#"{"files":[]}"#).await;
    let create = server
        .mock("POST", path("/drive/v3/files"))
        .match_body(Matcher::PartialJson(json!({
            "name": "Excalidraw",
            "mimeType": "application/vnd.google-apps.folder"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"folder-new","name":"Excalidraw"}"#)
        .create_async()
        .await;
    let upload = server
        .mock("POST", path("/upload/drive/v3/files"))
        .match_body(Matcher::Regex("folder-new".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"file-1"}"#)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let outcome = sync.save(&mut Session::new(), &rectangle_document()).await;

    assert!(outcome.success);
    create.assert_async().await;
    upload.assert_async().await;
}

#[tokio::test]
async fn folder_create_failure_aborts_before_upload() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let _search = mock_folder_search(&mut server, r#"{"files":[]}"#).await;
    let _create = server
        .mock("POST", path("/drive/v3/files"))
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":403,"message":"Insufficient permissions"}}"#)
        .create_async()
        .await;
    let upload = server
        .mock("POST", path("/upload/drive/v3/files"))
        .expect(0)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let err = sync
        .save_document(&mut Session::new(), &rectangle_document())
        .await
        .unwrap_err();

    assert_eq!(err.sync_kind(), Some(SyncFailureKind::FolderOperationFailed));
    assert!(err.to_string().contains("Insufficient permissions"));
    upload.assert_async().await;
}

#[tokio::test]
async fn upload_failure_is_reported_in_outcome() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let _folder = mock_existing_folder(&mut server).await;
    let _upload = server
        .mock("POST", path("/upload/drive/v3/files"))
        .with_status(507)
        .with_body(r#"{"error":{"code":507,"message":"Storage quota exceeded"}}"#)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let mut session = Session::new();
    let err = sync
        .save_document(&mut session, &rectangle_document())
        .await
        .unwrap_err();
    assert_eq!(err.sync_kind(), Some(SyncFailureKind::UploadFailed));

    let outcome = sync.save(&mut session, &rectangle_document()).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("Storage quota exceeded"));
}

#[tokio::test]
async fn cancelled_consent_fails_authentication() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let search = server
        .mock("GET", path("/drive/v3/files"))
        .expect(0)
        .create_async()
        .await;

    let sync = CloudSync::new(settings_for(&server), Arc::new(CancelledConsent));
    let mut session = Session::new();
    let err = sync.list(&mut session).await.unwrap_err();

    assert_eq!(err.sync_kind(), Some(SyncFailureKind::AuthenticationFailed));
    assert!(!session.is_authenticated());
    search.assert_async().await;
}

#[tokio::test]
async fn rejected_api_key_fails_client_initialization() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = server
        .mock("GET", path("/discovery/v1/apis/drive/v3/rest"))
        .with_status(400)
        .with_body(r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let err = sync.list(&mut Session::new()).await.unwrap_err();

    assert_eq!(err.sync_kind(), Some(SyncFailureKind::ClientLibraryInitFailed));
    assert!(err.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn list_is_capped_and_newest_first() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let _folder = mock_existing_folder(&mut server).await;

    // More entries than one page, deliberately out of order.
    let files: Vec<Value> = (0..25)
        .map(|i| {
            let minute = (i * 7) % 25;
            json!({
                "id": format!("file-{i}"),
                "name": format!("excalidraw-2024-05-01T10-{minute:02}-00-000Z.excalidraw"),
                "createdTime": "2024-05-01T09:00:00.000Z",
                "modifiedTime": format!("2024-05-01T10:{minute:02}:00.000Z")
            })
        })
        .collect();
    let listing = server
        .mock("GET", path("/drive/v3/files"))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "'folder-1' in parents and trashed=false".into()),
            Matcher::UrlEncoded("orderBy".into(), "modifiedTime desc".into()),
            Matcher::UrlEncoded("pageSize".into(), LIST_PAGE_SIZE.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "files": files }).to_string())
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let listed = sync.list(&mut Session::new()).await.unwrap();

    assert_eq!(listed.len(), LIST_PAGE_SIZE as usize);
    assert!(listed
        .windows(2)
        .all(|pair| pair[0].modified_time >= pair[1].modified_time));
    assert_eq!(
        listed[0].modified_time.map(|t| t.to_rfc3339()),
        Some("2024-05-01T10:24:00+00:00".to_string())
    );
    listing.assert_async().await;
}

#[tokio::test]
async fn list_replaces_the_cached_token() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let search = server
        .mock("GET", path("/drive/v3/files"))
        .match_query(Matcher::UrlEncoded("q".into(), FOLDER_QUERY.into()))
        .match_header("authorization", "Bearer fresh-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"files":[{"id":"folder-1","name":"Excalidraw"}]}"#)
        .create_async()
        .await;
    let _listing = server
        .mock("GET", path("/drive/v3/files"))
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "'folder-1' in parents and trashed=false".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"files":[]}"#)
        .create_async()
        .await;

    let sync = sync_for(&server, "fresh-token");
    let mut session = Session::with_token(AccessToken::new("stale-token"));
    let listed = sync.list(&mut session).await.unwrap();

    assert!(listed.is_empty());
    assert_eq!(session.token().map(AccessToken::secret), Some("fresh-token"));
    search.assert_async().await;
}

#[tokio::test]
async fn load_without_token_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let any_request = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let err = sync.load(&Session::new(), "file-1").await.unwrap_err();

    assert_eq!(err.sync_kind(), Some(SyncFailureKind::NotAuthenticated));
    any_request.assert_async().await;
}

#[tokio::test]
async fn load_returns_the_saved_envelope() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let _folder = mock_existing_folder(&mut server).await;
    let upload = server
        .mock("POST", path("/upload/drive/v3/files"))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""type": "excalidraw""#.to_string()),
            Matcher::Regex(r#""id": "rect-1""#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"file-1"}"#)
        .create_async()
        .await;

    let document = rectangle_document();
    let stored = document.to_envelope_bytes("https://excalidraw.com").unwrap();
    let download = server
        .mock("GET", path("/drive/v3/files/file-1"))
        .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body(stored.clone())
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let mut session = Session::new();
    let saved = sync.save_document(&mut session, &document).await.unwrap();
    let loaded = sync.load(&session, &saved.id).await.unwrap();

    let expected: Value = serde_json::from_slice(&stored).unwrap();
    assert_eq!(loaded, expected);
    assert_eq!(Document::from_envelope(loaded).unwrap(), document);
    upload.assert_async().await;
    download.assert_async().await;
}

#[tokio::test]
async fn load_returns_foreign_json_verbatim() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let _download = server
        .mock("GET", path("/drive/v3/files/file-9"))
        .with_status(200)
        .with_body(r#"{"type":"something-else","shapes":[1,2,3]}"#)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let session = Session::with_token(AccessToken::new("test-token"));
    let loaded = sync.load(&session, "file-9").await.unwrap();

    assert_eq!(loaded, json!({ "type": "something-else", "shapes": [1, 2, 3] }));
}

#[tokio::test]
async fn download_failures_are_reported() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let _missing = server
        .mock("GET", path("/drive/v3/files/gone"))
        .with_status(404)
        .with_body(r#"{"error":{"code":404,"message":"File not found: gone."}}"#)
        .create_async()
        .await;
    let _garbage = server
        .mock("GET", path("/drive/v3/files/garbled"))
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let session = Session::with_token(AccessToken::new("test-token"));

    let err = sync.load(&session, "gone").await.unwrap_err();
    assert_eq!(err.sync_kind(), Some(SyncFailureKind::DownloadFailed));
    assert!(err.to_string().contains("File not found"));

    let err = sync.load(&session, "garbled").await.unwrap_err();
    assert_eq!(err.sync_kind(), Some(SyncFailureKind::DownloadFailed));
    assert!(err.to_string().contains("not valid JSON"));
}

#[tokio::test]
async fn list_after_save_includes_the_saved_file() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let _folder = mock_existing_folder(&mut server).await;
    let _upload = server
        .mock("POST", path("/upload/drive/v3/files"))
        .match_body(Matcher::Regex(NAME_PATTERN.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"file-42"}"#)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let mut session = Session::new();
    let saved = sync
        .save_document(&mut session, &rectangle_document())
        .await
        .unwrap();

    let listing = server
        .mock("GET", path("/drive/v3/files"))
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "'folder-1' in parents and trashed=false".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "files": [{
                "id": saved.id,
                "name": saved.name,
                "createdTime": "2024-05-01T10:00:00.000Z",
                "modifiedTime": "2024-05-01T10:00:00.000Z"
            }]})
            .to_string(),
        )
        .create_async()
        .await;

    let listed = sync.list(&mut session).await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "file-42");
    assert_eq!(listed[0].name, saved.name);
    assert!(is_drawing_file_name(&listed[0].name));
    listing.assert_async().await;
}

#[tokio::test]
async fn upload_failure_keeps_a_freshly_created_folder() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let search = mock_folder_search(&mut server, r#"{"files":[]}"#).await;
    let create = server
        .mock("POST", path("/drive/v3/files"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"folder-new","name":"Excalidraw"}"#)
        .create_async()
        .await;
    let upload = server
        .mock("POST", path("/upload/drive/v3/files"))
        .with_status(500)
        .with_body(r#"{"error":{"code":500,"message":"Backend Error"}}"#)
        .create_async()
        .await;
    let deletes = server
        .mock("DELETE", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let patches = server
        .mock("PATCH", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let err = sync
        .save_document(&mut Session::new(), &rectangle_document())
        .await
        .unwrap_err();

    assert_eq!(err.sync_kind(), Some(SyncFailureKind::UploadFailed));
    search.assert_async().await;
    create.assert_async().await;
    upload.assert_async().await;
    deletes.assert_async().await;
    patches.assert_async().await;
}

#[tokio::test]
async fn rejected_listing_is_a_folder_failure() {
    let mut server = mockito::Server::new_async().await;
    let _discovery = mock_discovery(&mut server).await;
    let _folder = mock_existing_folder(&mut server).await;
    let _listing = server
        .mock("GET", path("/drive/v3/files"))
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "'folder-1' in parents and trashed=false".into(),
        ))
        .with_status(403)
        .with_body(r#"{"error":{"code":403,"message":"Rate Limit Exceeded"}}"#)
        .create_async()
        .await;

    let sync = sync_for(&server, "test-token");
    let err = sync.list(&mut Session::new()).await.unwrap_err();

    assert_eq!(err.sync_kind(), Some(SyncFailureKind::FolderOperationFailed));
    assert!(err.to_string().contains("Rate Limit Exceeded"));
}
