//! Command-line front end
//!
//! Parses arguments and drives the cloud pipeline the way the whiteboard's
//! save and open dialogs do.

pub mod drive;
pub mod parser;

pub use drive::{failure_hint, DriveCommand};
pub use parser::{Cli, Commands};
