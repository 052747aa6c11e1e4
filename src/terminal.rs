//! The virtual terminal seam.
//!
//! Every pane owns exactly one [`VirtualTerminal`]. The terminal owns the
//! pseudo-terminal of its child process, parses its output, and keeps
//! scrollback and selection state. It reports back only by enqueueing
//! [`Event::Redraw`](crate::Event::Redraw) and
//! [`Event::Closed`](crate::Event::Closed) through the [`EventSender`] it
//! was created with.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ratatui::{buffer::Buffer, layout::Rect};

use crate::error::Result;
use crate::event::EventSender;

/// Identity of a virtual terminal, unique for the supervisor's lifetime.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TerminalId(pub u64);

impl std::fmt::Display for TerminalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal dimensions in rows and columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TerminalSize {
    /// Number of rows.
    pub rows: u16,
    /// Number of columns.
    pub cols: u16,
}

impl TerminalSize {
    /// Create a new terminal size.
    #[must_use]
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

/// A cell position inside a terminal's visible screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CellPos {
    /// Row, from the top of the visible screen.
    pub row: u16,
    /// Column.
    pub col: u16,
}

impl CellPos {
    /// Create a new position.
    #[must_use]
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

/// What to run inside a terminal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Launch {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    /// Variables added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
}

/// A terminal emulator bound to at most one child process at a time.
pub trait VirtualTerminal: Send {
    /// This terminal's identity.
    fn id(&self) -> TerminalId;

    /// Incremented on every [`start`](Self::start); exit notifications carry it.
    fn generation(&self) -> u64;

    /// Spawn `launch` attached to this terminal.
    ///
    /// # Errors
    /// Returns an error if the pseudo-terminal or the process cannot be created.
    fn start(&mut self, launch: &Launch) -> Result<()>;

    /// Ask the running process to terminate. The exit itself is reported
    /// asynchronously as a closed event.
    fn close(&mut self);

    /// Drop all screen content and scrollback.
    fn clear(&mut self);

    /// Print a line of text generated by the supervisor, not the process.
    fn write_notice(&mut self, text: &str);

    /// Change the visible size.
    fn resize(&mut self, size: TerminalSize);

    /// Send raw bytes to the process.
    fn send_input(&mut self, bytes: &[u8]);

    /// Move the view `lines` further into scrollback.
    fn scroll_up(&mut self, lines: usize);

    /// Move the view `lines` back towards the live screen.
    fn scroll_down(&mut self, lines: usize);

    /// Jump back to the live screen.
    fn scroll_reset(&mut self);

    /// True when the view is not at the live screen.
    fn is_scrolling(&self) -> bool;

    /// Begin a selection at `pos`.
    fn select_start(&mut self, pos: CellPos);

    /// Extend the current selection to `pos`.
    fn select_end(&mut self, pos: CellPos);

    /// True when a non-empty selection exists.
    fn has_selection(&self) -> bool;

    /// Drop the current selection.
    fn clear_selection(&mut self);

    /// Text covered by the current selection.
    fn selected_text(&self) -> Option<String>;

    /// Cursor position, or `None` when the cursor should not be shown.
    fn cursor(&self) -> Option<CellPos>;

    /// Draw the visible screen into `area` of `buf`.
    fn render(&self, area: Rect, buf: &mut Buffer);
}

/// Creates terminals for new panes.
pub trait TerminalFactory: Send {
    /// Create an idle terminal that reports through `events`.
    fn create(&mut self, id: TerminalId, size: TerminalSize, events: EventSender)
        -> Box<dyn VirtualTerminal>;
}
