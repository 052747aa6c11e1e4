//! Error types for the muxpit crate.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using muxpit's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in muxpit operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to spawn a PTY process.
    #[error("failed to spawn PTY: {0}")]
    PtySpawn(#[from] std::io::Error),

    /// Anyhow error from portable-pty.
    #[error("PTY error: {0}")]
    Pty(#[from] anyhow::Error),

    /// Failed to create PTY pair.
    #[error("failed to create PTY: {0}")]
    PtyCreate(String),

    /// PTY resize failed.
    #[error("failed to resize PTY: {0}")]
    Resize(String),

    /// The reactor has stopped and no longer accepts events.
    #[error("supervisor is not running")]
    QueueClosed,

    /// Copying to the clipboard failed.
    #[error("clipboard copy failed: {0}")]
    Clipboard(#[source] std::io::Error),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bad or conflicting command-line flags.
    #[error("{0}")]
    Usage(String),

    /// Any other I/O failure (log file, runtime, signal handlers).
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// The display surface could not be set up or written to.
    #[error("screen error: {0}")]
    Screen(std::io::Error),
}
