//! Append-only session transcript.
//!
//! The transcript records every raw byte seen on any channel plus forwarded
//! user input, independent of banner filtering and exec/shell mode. Writes
//! are synchronous relative to chunk arrival; there is a single writer.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use log::warn;

/// Append-only transcript file. Absent sink is a no-op at the call sites.
pub struct Transcript {
    file: File,
}

impl Transcript {
    /// Open (or create) the transcript file in append mode and write the
    /// session header.
    ///
    /// Failure is non-fatal for the caller: it returns `None` after logging
    /// a warning, and the session proceeds without a transcript.
    pub fn open(path: &Path) -> Option<Self> {
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Could not create log file {}: {}", path.display(), e);
                return None;
            }
        };

        let mut transcript = Self { file };
        transcript.append_str(&format!(
            "\n=== SSH Portal Session Started: {} ===\n",
            Utc::now().to_rfc3339()
        ));
        Some(transcript)
    }

    /// Append raw bytes. Write failures are swallowed; a transcript must
    /// never take down the session.
    pub fn append(&mut self, bytes: &[u8]) {
        if let Err(e) = self.file.write_all(bytes) {
            warn!("transcript write failed: {}", e);
        }
    }

    /// Append a text fragment.
    pub fn append_str(&mut self, text: &str) {
        self.append(text.as_bytes());
    }

    /// Flush buffered bytes to disk. Called during session teardown.
    pub fn close(&mut self) {
        let _ = self.file.flush();
    }
}

/// Append to an optional transcript. Keeps call sites terse.
pub fn log_raw(transcript: &mut Option<Transcript>, bytes: &[u8]) {
    if let Some(t) = transcript.as_mut() {
        t.append(bytes);
    }
}
