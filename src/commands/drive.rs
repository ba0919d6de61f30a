use super::parser::Commands;
use crate::config::DriveSettings;
use crate::error::{errors, DrawDriveError, DrawDriveResult};
use crate::sync::oauth_client::{DeviceCodeResponse, DevicePrompt};
use crate::sync::{CloudSync, Document, RemoteFile, Session};
use console::Term;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runs one front-end action against a single session.
pub struct DriveCommand {
    sync: CloudSync,
    session: Session,
    term: Term,
}

impl DriveCommand {
    pub fn new(settings: DriveSettings) -> Self {
        Self::with_sync(CloudSync::from_settings(settings, Some(device_prompt())))
    }

    pub fn with_sync(sync: CloudSync) -> Self {
        Self {
            sync,
            session: Session::new(),
            term: Term::stdout(),
        }
    }

    /// Dispatch a parsed command; returns the process exit code.
    pub async fn execute(&mut self, command: &Commands) -> DrawDriveResult<u8> {
        match command {
            Commands::Save { path, json } => self.execute_save(path, *json).await,
            Commands::List { json } => self.execute_list(*json).await,
            Commands::Open { file_id, output } => {
                self.execute_open(file_id.as_deref(), output.as_deref())
                    .await
            }
        }
    }

    /// Upload a local drawing file
    pub async fn execute_save(&mut self, path: &Path, json: bool) -> DrawDriveResult<u8> {
        let bytes = std::fs::read(path).map_err(|err| {
            errors::filesystem_error("Failed to read drawing", path.display().to_string(), err)
        })?;
        let document = Document::from_slice(&bytes)?;
        info!(path = %path.display(), elements = document.elements.len(), "Saving drawing");

        let outcome = self.sync.save(&mut self.session, &document).await;

        if json {
            let rendered = serde_json::to_string_pretty(&outcome)
                .map_err(|err| errors::document_error("Failed to render outcome", err))?;
            self.term.write_line(&rendered)?;
        } else if let Some(file_name) = &outcome.file_name {
            self.term
                .write_line(&format!("✅ Saved to Google Drive as {}", file_name))?;
        } else {
            self.term.write_line(&format!(
                "❌ {}",
                outcome.error.as_deref().unwrap_or("Save failed")
            ))?;
        }

        Ok(if outcome.success { 0 } else { 1 })
    }

    /// Print the newest drawings
    pub async fn execute_list(&mut self, json: bool) -> DrawDriveResult<u8> {
        let files = self.sync.list(&mut self.session).await?;

        if json {
            let rendered = serde_json::to_string_pretty(&files)
                .map_err(|err| errors::document_error("Failed to render listing", err))?;
            self.term.write_line(&rendered)?;
            return Ok(0);
        }

        if files.is_empty() {
            self.term.write_line(&format!(
                "ℹ️  No drawings in folder '{}'",
                self.sync.settings().folder_name
            ))?;
            return Ok(0);
        }

        for file in &files {
            self.term.write_line(&format_listing_line(file))?;
        }
        Ok(0)
    }

    /// List, pick a drawing and download it
    pub async fn execute_open(
        &mut self,
        file_id: Option<&str>,
        output: Option<&Path>,
    ) -> DrawDriveResult<u8> {
        // Listing authenticates the session, as the open dialog does.
        let files = self.sync.list(&mut self.session).await?;

        let file_id = match file_id {
            Some(id) => id.to_string(),
            None => files.first().map(|file| file.id.clone()).ok_or_else(|| {
                errors::validation_error(
                    format!(
                        "No drawings in folder '{}'",
                        self.sync.settings().folder_name
                    ),
                    Some("file_id".to_string()),
                    None,
                )
            })?,
        };

        let drawing = self.sync.load(&self.session, &file_id).await?;
        let rendered = serde_json::to_string_pretty(&drawing)
            .map_err(|err| errors::document_error("Failed to render drawing", err))?;

        match output {
            Some(path) => {
                std::fs::write(path, rendered).map_err(|err| {
                    errors::filesystem_error(
                        "Failed to write drawing",
                        path.display().to_string(),
                        err,
                    )
                })?;
                info!(path = %path.display(), "Drawing written");
            }
            None => self.term.write_line(&rendered)?,
        }
        Ok(0)
    }
}

/// Next step to suggest after a failed command.
pub fn failure_hint(err: &DrawDriveError) -> &'static str {
    if err.is_recoverable() {
        "Run the command again to retry."
    } else {
        "Check drawdrive.toml or the DRAWDRIVE_* environment variables."
    }
}

fn format_listing_line(file: &RemoteFile) -> String {
    let modified = file
        .modified_time
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{:<16}  {}  {}", modified, file.id, file.name)
}

/// Shows device-flow instructions on stderr so stdout stays clean.
fn device_prompt() -> DevicePrompt {
    Arc::new(|device: &DeviceCodeResponse| {
        let term = Term::stderr();
        let url = device
            .verification_url_complete
            .as_deref()
            .unwrap_or(&device.verification_url);
        let lines = [
            String::new(),
            "🔐 Google Drive authorization required".to_string(),
            format!("   Visit: {}", url),
            format!("   Code:  {}", device.user_code),
            format!("   Expires in {} min", device.expires_in / 60),
            String::new(),
        ];
        for line in lines {
            // Nothing to do if stderr is gone; the poll continues regardless.
            let _ = term.write_line(&line);
        }
    })
}
