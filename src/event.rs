//! Events consumed by the reactor and the handle used to produce them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::config::ResolvedCommand;
use crate::terminal::TerminalId;

/// Everything the reactor reacts to.
#[derive(Clone, Debug)]
pub enum Event {
    /// Stop the reactor.
    Shutdown,

    /// Add a pane, or restart a dead one with the same key.
    AddOrWakeProcess(ProcessRequest),

    /// Raw input from the display surface (keys, mouse, resize).
    Input(crossterm::event::Event),

    /// A terminal has new content to show.
    Redraw(TerminalId),

    /// A terminal's process has exited.
    Closed {
        /// Terminal whose process exited.
        terminal: TerminalId,
        /// Generation the exited process was started with.
        generation: u64,
    },
}

/// Request to supervise a process under a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Unique key.
    pub key: String,
    /// Program and arguments.
    pub argv: Vec<String>,
    /// Extra environment variables.
    pub env: BTreeMap<String, String>,
    /// Sidebar icon.
    pub icon: String,
    /// Sidebar title.
    pub title: String,
    /// Working directory.
    pub cwd: Option<PathBuf>,
    /// Operator may kill and restart it.
    pub killable: bool,
    /// Start immediately.
    pub autostart: bool,
}

impl ProcessRequest {
    /// Request with defaults: no icon, title = key, killable, autostart.
    #[must_use]
    pub fn new(key: impl Into<String>, argv: Vec<String>) -> Self {
        let key = key.into();
        Self {
            title: key.clone(),
            key,
            argv,
            env: BTreeMap::new(),
            icon: String::new(),
            cwd: None,
            killable: true,
            autostart: true,
        }
    }

    /// Set the sidebar title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the sidebar icon.
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set whether the operator may kill and restart it.
    #[must_use]
    pub fn killable(mut self, killable: bool) -> Self {
        self.killable = killable;
        self
    }

    /// Set whether it starts immediately.
    #[must_use]
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }
}

impl From<ResolvedCommand> for ProcessRequest {
    fn from(command: ResolvedCommand) -> Self {
        Self {
            key: command.name,
            argv: command.argv,
            env: command.env,
            icon: String::new(),
            title: command.title,
            cwd: Some(command.cwd),
            killable: command.killable,
            autostart: command.autostart,
        }
    }
}

/// Receiving end of the event queue; owned by the reactor.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Cloneable producer handle for the event queue.
///
/// Producers only ever enqueue; they never touch reactor state.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    /// Create the single ordered event queue.
    #[must_use]
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue an event. Returns `false` once the reactor has gone away.
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Enqueue a request to add or wake a process.
    pub fn add_process(&self, request: ProcessRequest) -> bool {
        self.send(Event::AddOrWakeProcess(request))
    }

    /// Enqueue a shutdown request.
    pub fn shutdown(&self) -> bool {
        self.send(Event::Shutdown)
    }

    /// True once the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
