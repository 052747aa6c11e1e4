//! # Muxpit
//!
//! A terminal-resident process supervisor built on Ratatui.
//!
//! Muxpit runs a fixed set of commands, each in its own PTY, and shows them
//! behind one screen: a sidebar lists every process with its state, and the
//! selected one fills the rest of the terminal. Processes can be killed,
//! restarted, focused for interactive input, scrolled back and copied from.
//!
//! ## Architecture
//!
//! - **Reactor**: a single consumer owns the registry and UI state and
//!   handles one [`Event`] at a time. Everything else (input polling, PTY
//!   readers, exit watchers, signal handlers) only enqueues events.
//! - **Virtual terminals**: the [`terminal::VirtualTerminal`] trait is the
//!   seam between the reactor and a process; [`pty::PtyTerminal`] backs it
//!   with `portable-pty` and `vt100`.
//! - **Fault isolation**: a failing process only ever kills its own pane,
//!   and a failing event handler is logged and skipped.
//!
//! ## Example
//!
//! ```no_run
//! use muxpit::{ProcessRequest, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> muxpit::Result<()> {
//!     let supervisor = Supervisor::new()?;
//!
//!     supervisor.add_process(
//!         ProcessRequest::new("server", vec!["cargo".into(), "run".into()]).title("server"),
//!     )?;
//!     supervisor.add_process(
//!         ProcessRequest::new("logs", vec!["tail".into(), "-f".into(), "app.log".into()])
//!             .autostart(false),
//!     )?;
//!
//!     supervisor.run().await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod clipboard;
pub mod config;
mod error;
pub mod event;
pub mod input;
pub mod logging;
pub mod pane;
pub mod pty;
pub mod reactor;
pub mod registry;
pub mod supervisor;
pub mod terminal;
pub mod ui;
pub mod widget;

#[cfg(test)]
mod testing;

// Re-export public API
pub use clipboard::{ClipboardSink, SystemClipboard};
pub use config::{Config, ConfigError, Format, ResolvedCommand};
pub use error::{Error, Result};
pub use event::{Event, EventReceiver, EventSender, ProcessRequest};
pub use pane::{Pane, PaneSpec, PaneState};
pub use pty::{PtyFactory, PtyTerminal};
pub use reactor::{Flow, Interrupt, Reactor};
pub use registry::ProcessRegistry;
pub use supervisor::Supervisor;
pub use terminal::{CellPos, TerminalFactory, TerminalId, TerminalSize, VirtualTerminal};
