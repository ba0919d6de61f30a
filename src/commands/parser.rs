//! Command-line parsing
//!
//! Uses clap derive to define the `drawdrive` interface.

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// drawdrive - keep whiteboard drawings in Google Drive
#[derive(Parser, Debug, Clone)]
#[command(
    name = "drawdrive",
    about = "Save, list and open whiteboard drawings stored in Google Drive",
    version
)]
pub struct Cli {
    /// Settings file (defaults to ./drawdrive.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `drawdrive=trace` (overrides RUST_LOG)
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Upload a drawing file as a new file in the Drive folder
    Save {
        /// `.excalidraw` file to upload
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the most recent drawings in the Drive folder
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a drawing (the most recent one when no id is given)
    Open {
        /// Drive file id as shown by `list`
        #[arg(value_name = "FILE_ID")]
        file_id: Option<String>,

        /// Write the drawing here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse the process arguments (clap prints errors and exits)
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse a custom argv (used by tests)
    pub fn try_parse_args_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(iter)
    }
}
