//! JSONL interaction log.
//!
//! Every turn is appended as one JSON object to `session_<id>.jsonl` in the
//! log directory. The file is opened, appended and closed on each call so a
//! record is on disk before the next prompt is shown.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use shoply_core::{LogEntry, TokenUsage};

use crate::error::ChatError;

/// Append-only writer for per-session interaction logs.
pub struct InteractionLogger {
    dir: PathBuf,
    // Serializes appends so concurrent sessions never interleave a line.
    write_lock: Mutex<()>,
}

impl InteractionLogger {
    /// Create a logger writing into `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for a session.
    ///
    /// Alphanumerics (including non-ASCII letters) and `-` are kept; every
    /// other character is percent-encoded byte by byte, `_` and `%`
    /// included. Distinct ids map to distinct files and no id can escape the
    /// log directory.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("session_{}.jsonl", encode_session_id(session_id)))
    }

    /// Append one turn to the session's log file.
    pub fn record(
        &self,
        session_id: &str,
        user_input: &str,
        bot_response: &str,
        usage: TokenUsage,
    ) -> Result<(), ChatError> {
        self.write_entry(session_id, &LogEntry::now(user_input, bot_response, usage))
    }

    pub fn write_entry(&self, session_id: &str, entry: &LogEntry) -> Result<(), ChatError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(session_id);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        tracing::trace!(path = %path.display(), "Interaction logged");
        Ok(())
    }
}

fn encode_session_id(session_id: &str) -> String {
    let mut out = String::with_capacity(session_id.len());
    let mut buf = [0u8; 4];
    for c in session_id.chars() {
        if c.is_alphanumeric() || c == '-' {
            out.push(c);
        } else {
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}
