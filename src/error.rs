//! Engine error taxonomy
//!
//! Every fallible engine operation returns [`EngineError`]. The variants map
//! one-to-one onto the effects the controller applies:
//!
//! - `NotInitialized`: empty state, no retry
//! - `Transport`: the operation fails and the scan session is closed
//! - `ShortRecord` / `EmptyHash` / `ParseFailure`: protocol errors, never skipped
//! - `StaleGeneration`: an out-of-order completion, dropped silently
//! - `InvalidStart`: no session is created
//! - `WatcherFailure`: auto-reload is disabled

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no repository is open")]
    NotInitialized,

    #[error("cannot resolve starting revision '{0}'")]
    InvalidStart(String),

    #[error("{command} failed: {stderr}")]
    Transport { command: String, stderr: String },

    #[error("log record has {0} lines, expected at least 8")]
    ShortRecord(usize),

    #[error("log record has an empty hash")]
    EmptyHash,

    #[error("cannot parse producer output: {0}")]
    ParseFailure(String),

    #[error("result for generation {started} arrived after generation {current}")]
    StaleGeneration { started: u64, current: u64 },

    #[error("cannot watch {path:?}: {reason}")]
    WatcherFailure { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn transport(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        EngineError::Transport {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Errors that never reach the status line.
    pub fn is_silent(&self) -> bool {
        matches!(self, EngineError::StaleGeneration { .. })
    }
}
