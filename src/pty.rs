//! PTY-backed virtual terminal.

use std::io::{Read, Write};
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, MasterPty, PtySize};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::event::{Event, EventSender};
use crate::terminal::{
    CellPos, Launch, TerminalFactory, TerminalId, TerminalSize, VirtualTerminal,
};
use crate::widget::TerminalWidget;

/// Default scrollback buffer size in lines.
pub const DEFAULT_SCROLLBACK: usize = 10_000;

/// How long an exit report waits for the rest of the output to be parsed.
///
/// Output stays open past this when a background child inherited the PTY.
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Creates [`PtyTerminal`]s.
#[derive(Clone, Debug)]
pub struct PtyFactory {
    scrollback: usize,
}

impl PtyFactory {
    /// Create a factory with the default scrollback size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scrollback: DEFAULT_SCROLLBACK,
        }
    }

    /// Set the scrollback buffer size.
    #[must_use]
    pub fn scrollback(mut self, lines: usize) -> Self {
        self.scrollback = lines;
        self
    }
}

impl Default for PtyFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalFactory for PtyFactory {
    fn create(
        &mut self,
        id: TerminalId,
        size: TerminalSize,
        events: EventSender,
    ) -> Box<dyn VirtualTerminal> {
        Box::new(PtyTerminal::new(id, size, self.scrollback, events))
    }
}

/// An ordered pair of selection endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Selection {
    anchor: CellPos,
    head: CellPos,
}

impl Selection {
    fn ordered(self) -> (CellPos, CellPos) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }
}

/// A running child attached to the terminal.
struct SpawnedPty {
    /// PTY master for resize operations.
    pty_master: Box<dyn MasterPty + Send>,
    /// Channel to the writer task.
    input_tx: mpsc::Sender<Vec<u8>>,
    /// Kills the child without owning it.
    killer: Box<dyn ChildKiller + Send + Sync>,
    /// Handle to the reader task.
    #[allow(dead_code)]
    reader_handle: JoinHandle<()>,
    /// Handle to the writer task.
    #[allow(dead_code)]
    writer_handle: JoinHandle<()>,
    /// Handle to the process monitor task.
    #[allow(dead_code)]
    monitor_handle: JoinHandle<()>,
}

/// Virtual terminal backed by a native pseudo-terminal and a `vt100` parser.
///
/// Spawning requires a tokio runtime: the PTY is pumped by blocking tasks.
pub struct PtyTerminal {
    id: TerminalId,
    events: EventSender,
    size: TerminalSize,
    scrollback: usize,
    generation: u64,
    parser: Arc<RwLock<vt100::Parser>>,
    process: Option<SpawnedPty>,
    selection: Option<Selection>,
}

impl PtyTerminal {
    /// Create an idle terminal.
    #[must_use]
    pub fn new(id: TerminalId, size: TerminalSize, scrollback: usize, events: EventSender) -> Self {
        let parser = vt100::Parser::new(size.rows, size.cols, scrollback);
        Self {
            id,
            events,
            size,
            scrollback,
            generation: 0,
            parser: Arc::new(RwLock::new(parser)),
            process: None,
            selection: None,
        }
    }

    fn parser(&self) -> RwLockReadGuard<'_, vt100::Parser> {
        self.parser.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn parser_mut(&self) -> RwLockWriteGuard<'_, vt100::Parser> {
        self.parser.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VirtualTerminal for PtyTerminal {
    fn id(&self) -> TerminalId {
        self.id
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn start(&mut self, launch: &Launch) -> Result<()> {
        self.generation += 1;
        self.process = None;
        let spawned = spawn_pty(
            self.id,
            self.generation,
            launch,
            self.size,
            Arc::clone(&self.parser),
            self.events.clone(),
        )?;
        self.process = Some(spawned);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(process) = &mut self.process {
            if let Err(e) = process.killer.kill() {
                tracing::warn!("failed to kill process in terminal {}: {}", self.id, e);
            }
        }
    }

    fn clear(&mut self) {
        *self.parser_mut() = vt100::Parser::new(self.size.rows, self.size.cols, self.scrollback);
        self.selection = None;
    }

    fn write_notice(&mut self, text: &str) {
        let mut bytes = text.replace('\n', "\r\n").into_bytes();
        bytes.extend_from_slice(b"\r\n");
        self.parser_mut().process(&bytes);
    }

    fn resize(&mut self, size: TerminalSize) {
        if size == self.size {
            return;
        }
        self.size = size;
        self.selection = None;
        self.parser_mut().set_size(size.rows, size.cols);
        if let Some(process) = &self.process {
            if let Err(e) = resize_pty(process.pty_master.as_ref(), size) {
                tracing::debug!("resize of terminal {} failed: {}", self.id, e);
            }
        }
    }

    fn send_input(&mut self, bytes: &[u8]) {
        let Some(process) = &self.process else {
            return;
        };
        if let Err(e) = process.input_tx.try_send(bytes.to_vec()) {
            tracing::debug!("dropping input for terminal {}: {}", self.id, e);
        }
    }

    fn scroll_up(&mut self, lines: usize) {
        let mut parser = self.parser_mut();
        let current = parser.screen().scrollback();
        parser.set_scrollback(current.saturating_add(lines));
    }

    fn scroll_down(&mut self, lines: usize) {
        let mut parser = self.parser_mut();
        let current = parser.screen().scrollback();
        parser.set_scrollback(current.saturating_sub(lines));
    }

    fn scroll_reset(&mut self) {
        self.parser_mut().set_scrollback(0);
    }

    fn is_scrolling(&self) -> bool {
        self.parser().screen().scrollback() > 0
    }

    fn select_start(&mut self, pos: CellPos) {
        self.selection = Some(Selection {
            anchor: pos,
            head: pos,
        });
    }

    fn select_end(&mut self, pos: CellPos) {
        match &mut self.selection {
            Some(selection) => selection.head = pos,
            None => self.select_start(pos),
        }
    }

    fn has_selection(&self) -> bool {
        self.selection.is_some_and(|s| s.anchor != s.head)
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn selected_text(&self) -> Option<String> {
        let selection = self.selection.filter(|s| s.anchor != s.head)?;
        let (start, end) = selection.ordered();
        let text = self.parser().screen().contents_between(
            start.row,
            start.col,
            end.row,
            end.col.saturating_add(1),
        );
        (!text.is_empty()).then_some(text)
    }

    fn cursor(&self) -> Option<CellPos> {
        let parser = self.parser();
        let screen = parser.screen();
        if screen.hide_cursor() || screen.scrollback() > 0 {
            return None;
        }
        let (row, col) = screen.cursor_position();
        Some(CellPos::new(row, col))
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let parser = self.parser();
        TerminalWidget::new(parser.screen())
            .selection(self.selection.map(Selection::ordered))
            .render(area, buf);
    }
}

/// Spawns a process in a new PTY that feeds `parser`.
///
/// # Errors
/// Returns an error if PTY creation or process spawning fails.
fn spawn_pty(
    id: TerminalId,
    generation: u64,
    launch: &Launch,
    size: TerminalSize,
    parser: Arc<RwLock<vt100::Parser>>,
    events: EventSender,
) -> Result<SpawnedPty> {
    let Some((program, args)) = launch.argv.split_first() else {
        return Err(Error::PtySpawn(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command",
        )));
    };

    let pty_system = native_pty_system();

    // Create PTY pair
    let pty_pair = pty_system
        .openpty(PtySize {
            rows: size.rows,
            cols: size.cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| Error::PtyCreate(e.to_string()))?;

    let mut cmd = CommandBuilder::new(program);
    cmd.args(args);
    if let Some(cwd) = &launch.cwd {
        cmd.cwd(cwd);
    }
    cmd.env("TERM", "xterm-256color");
    for (key, value) in &launch.env {
        cmd.env(key, value);
    }

    let child = pty_pair.slave.spawn_command(cmd)?;
    // The reader only sees EOF once every slave handle is gone.
    drop(pty_pair.slave);

    let killer = child.clone_killer();
    let (input_tx, input_rx) = mpsc::channel::<Vec<u8>>(256);
    // Disconnects when the reader finishes.
    let (drained_tx, drained_rx) = std_mpsc::channel::<()>();

    let reader_handle = spawn_reader_task(
        id,
        pty_pair.master.try_clone_reader()?,
        parser,
        events.clone(),
        drained_tx,
    );
    let writer_handle = spawn_writer_task(pty_pair.master.take_writer()?, input_rx);
    let monitor_handle = spawn_monitor_task(id, generation, child, drained_rx, events);

    tracing::info!(terminal = %id, generation, program = %program, "process started");

    Ok(SpawnedPty {
        pty_master: pty_pair.master,
        input_tx,
        killer,
        reader_handle,
        writer_handle,
        monitor_handle,
    })
}

/// Resize a PTY.
///
/// # Errors
/// Returns an error if the resize operation fails.
fn resize_pty(pty_master: &dyn MasterPty, size: TerminalSize) -> Result<()> {
    pty_master
        .resize(PtySize {
            rows: size.rows,
            cols: size.cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| Error::Resize(e.to_string()))
}

/// Spawns the task that reads PTY output.
fn spawn_reader_task(
    id: TerminalId,
    mut reader: Box<dyn Read + Send>,
    parser: Arc<RwLock<vt100::Parser>>,
    events: EventSender,
    drained: std_mpsc::Sender<()>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let _drained = drained;
        let mut buf = [0u8; 4096];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    parser
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .process(&buf[..n]);

                    if !events.send(Event::Redraw(id)) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("PTY read error for terminal {}: {}", id, e);
                    break;
                }
            }
        }

        tracing::debug!("Reader task for terminal {} finished", id);
    })
}

/// Spawns the task that writes to PTY.
fn spawn_writer_task(
    mut writer: Box<dyn Write + Send>,
    mut input_rx: mpsc::Receiver<Vec<u8>>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while let Some(data) = input_rx.blocking_recv() {
            if let Err(e) = writer.write_all(&data) {
                tracing::debug!("PTY write error: {}", e);
                break;
            }
            if let Err(e) = writer.flush() {
                tracing::debug!("PTY flush error: {}", e);
                break;
            }
        }

        tracing::debug!("Writer task finished");
    })
}

/// Spawns the task that reports process exit.
///
/// The report is sent once the reader has parsed everything the process
/// wrote, so anything written after it lands below the output.
fn spawn_monitor_task(
    id: TerminalId,
    generation: u64,
    mut child: Box<dyn portable_pty::Child + Send + Sync>,
    drained: std_mpsc::Receiver<()>,
    events: EventSender,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        match child.wait() {
            Ok(status) => {
                tracing::info!(
                    terminal = %id,
                    generation,
                    code = status.exit_code(),
                    "process exited"
                );
            }
            Err(e) => {
                tracing::warn!(terminal = %id, generation, "waiting for process failed: {}", e);
            }
        }
        if let Err(RecvTimeoutError::Timeout) = drained.recv_timeout(OUTPUT_DRAIN_TIMEOUT) {
            tracing::debug!(terminal = %id, generation, "output still open after exit");
        }
        events.send(Event::Closed {
            terminal: id,
            generation,
        });

        tracing::debug!("Monitor task for terminal {} finished", id);
    })
}
