//! OAuth token acquisition
//!
//! [`TokenSource`] is the seam the pipeline authenticates through. A
//! terminal front end uses [`DeviceFlowTokenSource`] (RFC 8628); scripted
//! runs and tests use [`StaticTokenSource`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::session::AccessToken;
use crate::config::{DriveSettings, DRIVE_FILE_SCOPE};

const DEVICE_CODE_PATH: &str = "/o/oauth2/device/code";
const TOKEN_PATH: &str = "/o/oauth2/token";
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Extra delay requested by the server via `slow_down`.
const SLOW_DOWN_STEP_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("OAuth client id is not configured (set DRAWDRIVE_CLIENT_ID)")]
    MissingClientId,
    #[error("User denied authorization")]
    AccessDenied,
    #[error("Device code expired, please restart authorization")]
    Expired,
    #[error("OAuth provider rejected the request: {0}")]
    Rejected(String),
    #[error("OAuth request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Produces a fresh access token for each authenticating operation.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn request_token(&self) -> Result<AccessToken, AuthError>;
}

/// OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    pub scope: Option<String>,
}

/// Device code response from the OAuth 2.0 Device Flow (RFC 8628)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    #[serde(alias = "verification_uri")]
    pub verification_url: String,
    #[serde(default, alias = "verification_uri_complete")]
    pub verification_url_complete: Option<String>,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// Callback that shows the user where to approve the request.
pub type DevicePrompt = Arc<dyn Fn(&DeviceCodeResponse) + Send + Sync>;

/// Interactive consent through the device authorization grant.
#[derive(Clone)]
pub struct DeviceFlowTokenSource {
    http_client: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    oauth_base: String,
    scopes: Vec<String>,
    prompt: DevicePrompt,
}

impl DeviceFlowTokenSource {
    pub fn from_settings(settings: &DriveSettings) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            client_id: settings.client_id.clone(),
            client_secret: settings
                .client_secret()
                .map(|secret| SecretString::new(secret.to_string())),
            oauth_base: settings.oauth_base.trim_end_matches('/').to_string(),
            scopes: vec![DRIVE_FILE_SCOPE.to_string()],
            prompt: Arc::new(|device: &DeviceCodeResponse| {
                info!(
                    url = %device.verification_url,
                    code = %device.user_code,
                    "Visit the URL and enter the code to authorize Google Drive access"
                );
            }),
        }
    }

    /// Replace how the verification URL and user code are shown.
    pub fn with_prompt(mut self, prompt: DevicePrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Request device and user codes.
    pub async fn start_device_flow(&self) -> Result<DeviceCodeResponse, AuthError> {
        let client_id = self.client_id.as_deref().ok_or(AuthError::MissingClientId)?;
        let scope = self.scopes.join(" ");

        info!("Starting device flow authorization");
        debug!(client_id, scope = %scope, "Requesting device code");

        let response = self
            .http_client
            .post(format!("{}{}", self.oauth_base, DEVICE_CODE_PATH))
            .form(&[("client_id", client_id), ("scope", scope.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, body = %error_text, "Device flow initialization failed");
            return Err(AuthError::Rejected(format!("{status}: {error_text}")));
        }

        let device: DeviceCodeResponse = response.json().await?;
        debug!(user_code = %device.user_code, "Device code obtained");
        Ok(device)
    }

    /// Poll the token endpoint once.
    ///
    /// `Ok(None)` means the user has not finished yet; the second tuple
    /// element asks the caller to slow down.
    pub async fn poll_for_token(
        &self,
        device_code: &str,
    ) -> Result<(Option<OAuthTokenResponse>, bool), AuthError> {
        let client_id = self.client_id.as_deref().ok_or(AuthError::MissingClientId)?;

        let mut params = vec![
            ("client_id", client_id.to_string()),
            ("device_code", device_code.to_string()),
            ("grant_type", DEVICE_GRANT_TYPE.to_string()),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.expose_secret().clone()));
        }

        let response = self
            .http_client
            .post(format!("{}{}", self.oauth_base, TOKEN_PATH))
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            let token: OAuthTokenResponse = response.json().await?;
            return Ok((Some(token), false));
        }

        let status = response.status();
        let error_body: serde_json::Value = response.json().await.unwrap_or_default();
        match error_body.get("error").and_then(|e| e.as_str()) {
            Some("authorization_pending") => {
                debug!("Authorization still pending");
                Ok((None, false))
            }
            Some("slow_down") => {
                debug!("Polling too fast, slowing down");
                Ok((None, true))
            }
            Some("access_denied") => Err(AuthError::AccessDenied),
            Some("expired_token") => Err(AuthError::Expired),
            Some(other) => Err(AuthError::Rejected(other.to_string())),
            None => Err(AuthError::Rejected(format!(
                "token endpoint returned {status}"
            ))),
        }
    }
}

#[async_trait]
impl TokenSource for DeviceFlowTokenSource {
    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        let device = self.start_device_flow().await?;
        (self.prompt)(&device);

        let mut interval = std::time::Duration::from_secs(device.interval);
        // An expiry too far out to represent means the code never times out locally.
        let deadline =
            Instant::now().checked_add(std::time::Duration::from_secs(device.expires_in));

        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(AuthError::Expired);
            }

            tokio::time::sleep(interval).await;

            match self.poll_for_token(&device.device_code).await? {
                (Some(token), _) => {
                    info!("Device flow authorization completed");
                    return Ok(AccessToken::new(token.access_token));
                }
                (None, true) => {
                    interval = interval
                        .saturating_add(std::time::Duration::from_secs(SLOW_DOWN_STEP_SECS));
                }
                (None, false) => {}
            }
        }
    }
}

/// Hands out a pre-issued bearer token.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: SecretString,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken::new(self.token.expose_secret().clone()))
    }
}

/// Pick the token source the settings call for.
///
/// A configured access token wins; otherwise interactive device flow.
pub fn token_source_from_settings(
    settings: &DriveSettings,
    prompt: Option<DevicePrompt>,
) -> Arc<dyn TokenSource> {
    if let Some(token) = &settings.access_token {
        debug!("Using pre-issued access token from configuration");
        return Arc::new(StaticTokenSource::new(token.expose_secret().clone()));
    }

    let source = DeviceFlowTokenSource::from_settings(settings);
    match prompt {
        Some(prompt) => Arc::new(source.with_prompt(prompt)),
        None => Arc::new(source),
    }
}
