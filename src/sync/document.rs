//! Drawing documents and the JSON envelope they are stored in.
//!
//! Elements and attachments are opaque JSON owned by the whiteboard engine;
//! this module only wraps and unwraps them.

use crate::error::{errors, DrawDriveResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Format tag written into every envelope.
pub const ENVELOPE_TYPE: &str = "excalidraw";
/// Schema version written into every envelope.
pub const ENVELOPE_VERSION: u32 = 2;
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

/// Display settings persisted alongside the elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default = "default_background")]
    pub view_background_color: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            view_background_color: default_background(),
        }
    }
}

/// A whiteboard scene as handed over by the engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Drawable elements in z-order.
    pub elements: Vec<Value>,
    pub app_state: AppState,
    /// Binary attachments (images) keyed by file id.
    pub files: Map<String, Value>,
}

/// Stored form of a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub elements: Vec<Value>,
    #[serde(default)]
    pub app_state: AppState,
    #[serde(default)]
    pub files: Map<String, Value>,
}

impl Envelope {
    pub fn new(document: &Document, source: impl Into<String>) -> Self {
        Self {
            kind: ENVELOPE_TYPE.to_string(),
            version: ENVELOPE_VERSION,
            source: source.into(),
            elements: document.elements.clone(),
            app_state: document.app_state.clone(),
            files: document.files.clone(),
        }
    }

    /// Pretty-printed JSON, the exact bytes that get uploaded.
    pub fn to_pretty_bytes(&self) -> DrawDriveResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|err| {
            errors::document_error(format!("Failed to serialize drawing: {err}"), err)
        })
    }
}

impl Document {
    pub fn new(elements: Vec<Value>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    /// Serialize into the stored envelope format.
    pub fn to_envelope_bytes(&self, source: &str) -> DrawDriveResult<Vec<u8>> {
        Envelope::new(self, source).to_pretty_bytes()
    }

    /// Rebuild a document from an envelope value, e.g. a local `.excalidraw` file.
    pub fn from_envelope(value: Value) -> DrawDriveResult<Self> {
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|err| errors::document_error(format!("Not a drawing envelope: {err}"), err))?;

        if envelope.kind != ENVELOPE_TYPE {
            return Err(errors::validation_error(
                format!("Unsupported document type '{}'", envelope.kind),
                Some("type".to_string()),
                Some(envelope.kind),
            ));
        }
        if envelope.version > ENVELOPE_VERSION {
            warn!(
                version = envelope.version,
                "Drawing was written by a newer schema version; fields may be dropped"
            );
        }

        Ok(Self {
            elements: envelope.elements,
            app_state: envelope.app_state,
            files: envelope.files,
        })
    }

    pub fn from_slice(bytes: &[u8]) -> DrawDriveResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|err| errors::document_error(format!("Invalid JSON: {err}"), err))?;
        Self::from_envelope(value)
    }
}
