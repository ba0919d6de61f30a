//! Drive settings
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then `DRAWDRIVE_*` environment variables. Credentials are allowed to be
//! missing here; the pipeline reports them at first use.

use crate::error::{errors, DrawDriveResult};
use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

pub const ENV_PREFIX: &str = "DRAWDRIVE";
pub const CONFIG_FILE_NAME: &str = "drawdrive.toml";

pub const DEFAULT_FOLDER_NAME: &str = "Excalidraw";
pub const DEFAULT_APP_URL: &str = "https://excalidraw.com";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
pub const DEFAULT_OAUTH_BASE: &str = "https://accounts.google.com";

/// Read/write access limited to files created by this application.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Everything the cloud pipeline needs to talk to Drive.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveSettings {
    /// Cloud project the API key and OAuth client belong to.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Storage account name, reported in diagnostics only.
    #[serde(default)]
    pub storage_bucket: Option<String>,
    pub folder_name: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<SecretString>,
    /// Pre-issued bearer token; skips interactive consent when present.
    #[serde(default)]
    pub access_token: Option<SecretString>,
    /// Written into the `source` field of every saved envelope.
    pub app_url: String,
    pub api_base: String,
    pub oauth_base: String,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            storage_bucket: None,
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            api_key: None,
            client_id: None,
            client_secret: None,
            access_token: None,
            app_url: DEFAULT_APP_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            oauth_base: DEFAULT_OAUTH_BASE.to_string(),
        }
    }
}

impl DriveSettings {
    /// Load settings from `config_file` (or `./drawdrive.toml` if present)
    /// and the environment.
    ///
    /// An explicitly named file must exist; the default one is optional.
    pub fn load(config_file: Option<&Path>) -> DrawDriveResult<Self> {
        let (file, required) = match config_file {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE_NAME), false),
        };

        let settings: DriveSettings = Config::builder()
            .set_default("folder_name", DEFAULT_FOLDER_NAME)?
            .set_default("app_url", DEFAULT_APP_URL)?
            .set_default("api_base", DEFAULT_API_BASE)?
            .set_default("oauth_base", DEFAULT_OAUTH_BASE)?
            .add_source(File::from(file).required(required))
            .add_source(Environment::with_prefix(ENV_PREFIX).ignore_empty(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        tracing::debug!(
            folder = %settings.folder_name,
            project = settings.project_id.as_deref().unwrap_or("<unset>"),
            api_key_set = settings.api_key.is_some(),
            client_id_set = settings.client_id.is_some(),
            "Drive settings loaded"
        );
        Ok(settings)
    }

    /// Check the values that would otherwise only fail deep inside a request.
    pub fn validate(&self) -> DrawDriveResult<()> {
        if self.folder_name.trim().is_empty() {
            return Err(errors::validation_error(
                "Drive folder name must not be empty",
                Some("folder_name".to_string()),
                None,
            ));
        }

        for (field, value) in [("api_base", &self.api_base), ("oauth_base", &self.oauth_base)] {
            Url::parse(value).map_err(|err| {
                errors::validation_error(
                    format!("Invalid URL for {field}: {err}"),
                    Some(field.to_string()),
                    Some(value.clone()),
                )
            })?;
        }

        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret().as_str())
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret
            .as_ref()
            .map(|secret| secret.expose_secret().as_str())
    }
}
