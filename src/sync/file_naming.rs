//! Collision-resistant names for uploaded drawings.
//!
//! Names embed a millisecond UTC timestamp. Timestamps issued by this
//! process strictly increase, so two saves never share a name even when
//! they land in the same millisecond.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub const FILE_PREFIX: &str = "excalidraw-";
pub const FILE_EXTENSION: &str = ".excalidraw";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";
/// `d` stands for any ASCII digit.
const TIMESTAMP_PATTERN: &str = "dddd-dd-ddTdd-dd-dd-dddZ";

static LAST_ISSUED_MILLIS: AtomicI64 = AtomicI64::new(0);

fn next_timestamp_millis() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ISSUED_MILLIS.load(Ordering::Acquire);
    loop {
        let candidate = now.max(last + 1);
        match LAST_ISSUED_MILLIS.compare_exchange_weak(
            last,
            candidate,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// Name for the next uploaded drawing, e.g.
/// `excalidraw-2024-05-01T09-30-12-345Z.excalidraw`.
pub fn next_file_name() -> String {
    let millis = next_timestamp_millis();
    let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_else(Utc::now);
    file_name_for(timestamp)
}

pub fn file_name_for(timestamp: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        FILE_PREFIX,
        timestamp.format(TIMESTAMP_FORMAT),
        FILE_EXTENSION
    )
}

/// Whether `name` looks like a drawing this crate uploaded.
pub fn is_drawing_file_name(name: &str) -> bool {
    let Some(stamp) = name
        .strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(FILE_EXTENSION))
    else {
        return false;
    };

    stamp.len() == TIMESTAMP_PATTERN.len()
        && stamp
            .chars()
            .zip(TIMESTAMP_PATTERN.chars())
            .all(|(c, p)| if p == 'd' { c.is_ascii_digit() } else { c == p })
}
