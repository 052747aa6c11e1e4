//! Copying selected text out of the supervisor.
//!
//! Inside Apple's Terminal the text is piped into `pbcopy`. Everywhere else
//! an OSC-52 sequence is written to stdout and the outer terminal (or tmux,
//! see [`enable_tmux_clipboard`]) picks it up.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use base64::{engine::general_purpose, Engine as _};

use crate::error::{Error, Result};

/// `TERM_PROGRAM` value reported by Apple's Terminal.
pub const APPLE_TERMINAL: &str = "Apple_Terminal";

/// Destination for copied text.
pub trait ClipboardSink: Send {
    /// Place `text` on the clipboard.
    ///
    /// # Errors
    /// Returns an error if the clipboard mechanism fails.
    fn copy(&mut self, text: &str) -> Result<()>;
}

/// How the system clipboard is reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemClipboard {
    /// Pipe into `pbcopy`.
    Pbcopy,
    /// Emit OSC-52 on stdout.
    Osc52,
}

impl SystemClipboard {
    /// Pick the mechanism from `TERM_PROGRAM`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::for_term_program(std::env::var("TERM_PROGRAM").ok().as_deref())
    }

    /// Pick the mechanism for a given `TERM_PROGRAM` value.
    #[must_use]
    pub fn for_term_program(term_program: Option<&str>) -> Self {
        if term_program == Some(APPLE_TERMINAL) {
            Self::Pbcopy
        } else {
            Self::Osc52
        }
    }
}

impl ClipboardSink for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        match self {
            Self::Pbcopy => pbcopy(text),
            Self::Osc52 => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(osc52_sequence(text).as_bytes())
                    .and_then(|()| stdout.flush())
                    .map_err(Error::Clipboard)
            }
        }
    }
}

/// `ESC ] 52 ; c ; <base64> BEL` for `text`.
#[must_use]
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", general_purpose::STANDARD.encode(text))
}

fn pbcopy(text: &str) -> Result<()> {
    let mut child = Command::new("pbcopy")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(Error::Clipboard)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).map_err(Error::Clipboard)?;
    }
    let status = child.wait().map_err(Error::Clipboard)?;
    if !status.success() {
        tracing::warn!("pbcopy exited with {}", status);
    }
    Ok(())
}

/// Let OSC-52 sequences through the surrounding tmux pane, if any.
///
/// Failures are logged and otherwise ignored.
pub fn enable_tmux_clipboard() {
    if std::env::var_os("TMUX").is_none() {
        return;
    }
    match Command::new("tmux")
        .args(["set-option", "-p", "set-clipboard", "on"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => tracing::debug!("tmux clipboard passthrough enabled"),
        Ok(status) => tracing::warn!("tmux set-clipboard exited with {}", status),
        Err(e) => tracing::warn!("failed to run tmux: {}", e),
    }
}
