//! The event reactor.
//!
//! A [`Reactor`] is the only owner of the process registry and the UI state.
//! Producers (input poller, signal handlers, virtual terminals, callers of
//! [`EventSender::add_process`]) only enqueue [`Event`]s; the reactor takes
//! them one at a time, applies each to its state and renders the result.
//!
//! Handling of a single event is a fault boundary: errors and panics are
//! logged and the loop moves on to the next event.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use crossterm::event::{
    Event as InputEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::{
    backend::Backend,
    buffer::Buffer,
    layout::{Position, Rect},
    widgets::{Clear, Widget},
    Frame, Terminal,
};
use tokio::sync::watch;

use crate::clipboard::{ClipboardSink, SystemClipboard};
use crate::error::{Error, Result};
use crate::event::{Event, EventReceiver, EventSender, ProcessRequest};
use crate::input::key_to_bytes;
use crate::pane::{Pane, PaneSpec};
use crate::registry::ProcessRegistry;
use crate::terminal::{CellPos, TerminalFactory, TerminalId};
use crate::ui::{sidebar_rows, Geometry, Region, SidebarRow, UiState, WHEEL_LINES};
use crate::widget::{hotkey_hints, HintContext, Hotkey, HotkeysWidget, SidebarWidget};

/// Delivers the interrupt requested by Ctrl-C.
pub trait Interrupt: Send {
    /// Ask the supervisor to shut down.
    fn interrupt(&self);
}

/// Without a signal-based interrupt, Ctrl-C enqueues a shutdown.
impl Interrupt for EventSender {
    fn interrupt(&self) {
        if !self.shutdown() {
            tracing::debug!("interrupt after reactor stopped");
        }
    }
}

/// Whether the reactor keeps going after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Wait for the next event.
    Continue,
    /// Leave the loop.
    Stop,
}

/// How much of the screen an event invalidated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Repaint {
    None,
    /// Only the selected pane's terminal content.
    Terminal,
    Full,
    /// Clear the physical screen, then render everything.
    Resync,
}

/// Serialized consumer of all events; sole writer of registry and UI state.
pub struct Reactor<B: Backend> {
    registry: ProcessRegistry,
    ui: UiState,
    terminal: Terminal<B>,
    factory: Box<dyn TerminalFactory>,
    events: EventSender,
    clipboard: Box<dyn ClipboardSink>,
    interrupt: Box<dyn Interrupt>,
    next_terminal: u64,
    /// Screen contents after the last render, base for narrow redraws.
    last_frame: Buffer,
}

impl<B: Backend> Reactor<B> {
    /// Create a reactor drawing to `terminal` and creating virtual terminals
    /// with `factory`. `events` is handed to every virtual terminal so it can
    /// report back.
    ///
    /// # Errors
    /// Returns an error if the screen size cannot be queried.
    pub fn new(
        terminal: Terminal<B>,
        factory: Box<dyn TerminalFactory>,
        events: EventSender,
    ) -> Result<Self> {
        let size = terminal.size().map_err(Error::Screen)?;
        let geometry = Geometry::new(size.width, size.height);
        Ok(Self {
            registry: ProcessRegistry::new(),
            ui: UiState::new(geometry),
            terminal,
            factory,
            interrupt: Box::new(events.clone()),
            events,
            clipboard: Box::new(SystemClipboard::from_env()),
            next_terminal: 0,
            last_frame: Buffer::empty(geometry.area()),
        })
    }

    /// Use `clipboard` for copied text.
    #[must_use]
    pub fn clipboard(mut self, clipboard: Box<dyn ClipboardSink>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Use `interrupt` for Ctrl-C.
    #[must_use]
    pub fn interrupt(mut self, interrupt: Box<dyn Interrupt>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The panes, in display order.
    #[must_use]
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Selection and focus.
    #[must_use]
    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Consume events until a shutdown event arrives, the queue closes or
    /// `cancel` fires. Running panes are killed on the way out.
    ///
    /// # Errors
    /// Returns an error if the initial render fails.
    pub async fn run(
        mut self,
        mut events: EventReceiver,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<()> {
        let result = self.draw();
        if result.is_ok() && !*cancel.borrow_and_update() {
            loop {
                let event = tokio::select! {
                    _ = cancel.changed() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                if self.process(event) == Flow::Stop {
                    break;
                }
            }
        }

        tracing::info!("reactor stopping");
        self.kill_all();
        result
    }

    /// Apply one event and render. Failures are logged, never returned.
    pub fn process(&mut self, event: Event) -> Flow {
        tracing::trace!(?event, "dispatching");
        match catch_unwind(AssertUnwindSafe(|| self.dispatch(event))) {
            Ok(Ok(flow)) => flow,
            Ok(Err(e)) => {
                tracing::error!("event handling failed: {}", e);
                Flow::Continue
            }
            Err(payload) => {
                tracing::error!("event handling panicked: {}", panic_message(&*payload));
                Flow::Continue
            }
        }
    }

    fn dispatch(&mut self, event: Event) -> Result<Flow> {
        let repaint = match event {
            Event::Shutdown => return Ok(Flow::Stop),
            Event::AddOrWakeProcess(request) => self.add_or_wake(&request),
            Event::Input(input) => self.handle_input(input)?,
            Event::Redraw(terminal) => self.redraw(terminal),
            Event::Closed {
                terminal,
                generation,
            } => self.closed(terminal, generation),
        };

        match repaint {
            Repaint::None => {}
            Repaint::Terminal => self.draw_terminal()?,
            Repaint::Full => self.draw()?,
            Repaint::Resync => {
                self.terminal.clear().map_err(Error::Screen)?;
                self.draw()?;
            }
        }
        Ok(Flow::Continue)
    }

    fn add_or_wake(&mut self, request: &ProcessRequest) -> Repaint {
        if let Some(pane) = self.registry.find_mut(&request.key) {
            if pane.is_dead() && request.autostart {
                tracing::info!(key = %request.key, "waking process");
                start_pane(pane);
            } else {
                tracing::debug!(key = %request.key, "process already registered");
            }
        } else {
            self.next_terminal += 1;
            let terminal = self.factory.create(
                TerminalId(self.next_terminal),
                self.ui.geometry().content_size(),
                self.events.clone(),
            );
            let mut pane = Pane::new(PaneSpec::from(request), terminal);
            if request.autostart {
                start_pane(&mut pane);
            } else {
                pane.mark_dead(&format!(
                    "{} has auto-start disabled, press enter to start.",
                    request.key
                ));
            }
            if let Err(pane) = self.registry.push(pane) {
                tracing::warn!(key = %pane.key(), "duplicate pane rejected");
            }
        }

        self.restructure();
        Repaint::Full
    }

    fn closed(&mut self, terminal: TerminalId, generation: u64) -> Repaint {
        let Some(pane) = self
            .registry
            .position_of_terminal(terminal)
            .and_then(|index| self.registry.get_mut(index))
        else {
            tracing::debug!(%terminal, "exit of unknown terminal");
            return Repaint::Full;
        };

        if !pane.mark_exited(generation) {
            tracing::debug!(%terminal, generation, "stale or repeated exit ignored");
            return Repaint::Full;
        }
        tracing::info!(key = %pane.key(), "process exited");
        if self.ui.selected() == Some(pane.key()) {
            self.leave_focus();
        }

        self.restructure();
        Repaint::Full
    }

    fn redraw(&self, terminal: TerminalId) -> Repaint {
        match self.selected() {
            Some(pane) if pane.terminal_id() == terminal => Repaint::Terminal,
            _ => Repaint::None,
        }
    }

    fn handle_input(&mut self, input: InputEvent) -> Result<Repaint> {
        match input {
            InputEvent::Key(key) => self.handle_key(key),
            InputEvent::Mouse(mouse) => self.handle_mouse(mouse),
            InputEvent::Resize(width, height) => Ok(self.resize(width, height)),
            _ => Ok(Repaint::None),
        }
    }

    fn resize(&mut self, width: u16, height: u16) -> Repaint {
        self.ui.set_geometry(Geometry::new(width, height));
        let size = self.ui.geometry().content_size();
        for pane in self.registry.iter_mut() {
            pane.terminal_mut().resize(size);
        }
        Repaint::Resync
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<Repaint> {
        if key.kind == KeyEventKind::Release {
            return Ok(Repaint::None);
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let focused = self.ui.is_focused();
        let page = self.ui.geometry().page_size();

        match key.code {
            KeyCode::Char('c') if ctrl && !focused => {
                self.ui.select_first(&self.registry);
                self.interrupt.interrupt();
                return Ok(Repaint::Full);
            }
            KeyCode::Char('z') if ctrl && focused => {
                self.leave_focus();
                return Ok(Repaint::Full);
            }
            KeyCode::Char('u') if ctrl => return Ok(self.with_selected(|p| p.scroll_up(page))),
            KeyCode::Char('d') if ctrl => return Ok(self.with_selected(|p| p.scroll_down(page))),
            KeyCode::Enter => {
                if let Some(repaint) = self.enter()? {
                    return Ok(repaint);
                }
            }
            KeyCode::Char('j') | KeyCode::Down if !focused && !ctrl => {
                self.ui.move_selection(&self.registry, 1);
                return Ok(Repaint::Full);
            }
            KeyCode::Char('k') | KeyCode::Up if !focused && !ctrl => {
                self.ui.move_selection(&self.registry, -1);
                return Ok(Repaint::Full);
            }
            KeyCode::Char('x') if !focused && !ctrl => {
                self.kill_selected();
                return Ok(Repaint::Full);
            }
            _ => {}
        }

        if focused {
            if let Some(pane) = self.selected_mut().filter(|p| !p.is_scrolling()) {
                let bytes = key_to_bytes(key);
                if !bytes.is_empty() {
                    pane.terminal_mut().send_input(&bytes);
                }
            }
        }
        Ok(Repaint::None)
    }

    /// Enter is overloaded; `None` means it falls through to the pane.
    fn enter(&mut self) -> Result<Option<Repaint>> {
        let focused = self.ui.is_focused();
        let Some(pane) = self
            .ui
            .selected_index(&self.registry)
            .and_then(|index| self.registry.get_mut(index))
        else {
            return Ok(None);
        };

        if pane.terminal().has_selection() {
            let text = pane.terminal().selected_text();
            pane.terminal_mut().clear_selection();
            if let Some(text) = text {
                self.clipboard.copy(&text)?;
            }
            return Ok(Some(Repaint::Full));
        }
        if pane.is_scrolling() && (focused || !pane.is_killable()) {
            pane.scroll_reset();
            return Ok(Some(Repaint::Full));
        }
        if focused || !pane.is_killable() {
            return Ok(None);
        }

        if pane.is_dead() {
            tracing::info!(key = %pane.key(), "restarting process");
            start_pane(pane);
            self.restructure();
        } else {
            self.ui.focus();
        }
        Ok(Some(Repaint::Full))
    }

    fn kill_selected(&mut self) {
        if let Some(pane) = self.selected_mut() {
            if pane.is_killable() && !pane.is_dead() {
                tracing::info!(key = %pane.key(), "killing process");
                pane.kill();
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<Repaint> {
        match mouse.kind {
            MouseEventKind::ScrollUp => Ok(self.with_selected(|p| p.scroll_up(WHEEL_LINES))),
            MouseEventKind::ScrollDown => Ok(self.with_selected(|p| p.scroll_down(WHEEL_LINES))),
            MouseEventKind::Up(_) => self.finish_drag(),
            MouseEventKind::Down(MouseButton::Left) => Ok(self.press(mouse, false)),
            MouseEventKind::Drag(MouseButton::Left) => Ok(self.press(mouse, true)),
            _ => Ok(Repaint::None),
        }
    }

    fn press(&mut self, mouse: MouseEvent, drag: bool) -> Repaint {
        let geometry = self.ui.geometry();
        match geometry.region(mouse.column) {
            Region::Sidebar => {
                if self.ui.is_dragging() {
                    return Repaint::None;
                }
                let hints = current_hints(&self.registry, &self.ui);
                if mouse.row >= geometry.sidebar_list_rows(hints.len()) {
                    return Repaint::None;
                }
                let rows = sidebar_rows(&self.registry);
                let Some(SidebarRow::Pane(index)) = rows.get(usize::from(mouse.row)).copied()
                else {
                    return Repaint::None;
                };
                let Some(pane) = self.registry.get(index) else {
                    return Repaint::None;
                };
                let key = pane.key().to_string();
                self.leave_focus();
                self.ui.select(key);
                Repaint::Full
            }
            Region::Border => Repaint::None,
            Region::Content => {
                let Some(pos) = geometry.content_cell(mouse.column, mouse.row) else {
                    return Repaint::None;
                };
                let double = !drag && self.ui.register_click(pos, Instant::now());
                let extend = drag && self.ui.is_dragging();
                let last_col = geometry.content_size().cols.saturating_sub(1);

                let Some(pane) = self.selected_mut() else {
                    return Repaint::None;
                };
                let terminal = pane.terminal_mut();
                if double {
                    terminal.select_start(CellPos::new(pos.row, 0));
                    terminal.select_end(CellPos::new(pos.row, last_col));
                } else if extend {
                    terminal.select_end(pos);
                } else {
                    terminal.select_start(pos);
                }

                if !double {
                    self.ui.start_dragging();
                }
                Repaint::Full
            }
        }
    }

    fn finish_drag(&mut self) -> Result<Repaint> {
        if !self.ui.is_dragging() {
            return Ok(Repaint::None);
        }
        self.ui.reset_dragging();

        let text = self.selected_mut().and_then(|pane| {
            let text = pane.terminal().selected_text();
            pane.terminal_mut().clear_selection();
            text
        });
        if let Some(text) = text {
            self.clipboard.copy(&text)?;
        }
        Ok(Repaint::Full)
    }

    /// Hand input back to the sidebar. The selected pane snaps back to its
    /// live screen and the cursor is hidden on the next render.
    fn leave_focus(&mut self) {
        self.ui.blur();
        if let Some(pane) = self.selected_mut() {
            pane.scroll_reset();
        }
    }

    fn selected(&self) -> Option<&Pane> {
        let index = self.ui.selected_index(&self.registry)?;
        self.registry.get(index)
    }

    fn selected_mut(&mut self) -> Option<&mut Pane> {
        let index = self.ui.selected_index(&self.registry)?;
        self.registry.get_mut(index)
    }

    fn with_selected(&mut self, f: impl FnOnce(&mut Pane)) -> Repaint {
        match self.selected_mut() {
            Some(pane) => {
                f(pane);
                Repaint::Full
            }
            None => Repaint::None,
        }
    }

    fn restructure(&mut self) {
        self.registry.sort();
        self.ui.ensure_selection(&self.registry);
    }

    fn kill_all(&mut self) {
        for pane in self.registry.iter_mut().filter(|p| !p.is_dead()) {
            pane.kill();
        }
    }

    /// Render everything.
    fn draw(&mut self) -> Result<()> {
        let registry = &self.registry;
        let ui = &self.ui;
        let frame = self
            .terminal
            .draw(|frame| render(frame, registry, ui))
            .map_err(Error::Screen)?;
        self.last_frame = frame.buffer.clone();
        Ok(())
    }

    /// Re-render only the selected pane's terminal on top of the last frame.
    fn draw_terminal(&mut self) -> Result<()> {
        if self.terminal.current_buffer_mut().area != self.last_frame.area {
            return self.draw();
        }
        let Some(pane) = self
            .ui
            .selected_index(&self.registry)
            .and_then(|index| self.registry.get(index))
        else {
            return Ok(());
        };
        let area = self.ui.geometry().content_area();

        let buffer = self.terminal.current_buffer_mut();
        buffer.clone_from(&self.last_frame);
        Clear.render(area, buffer);
        pane.terminal().render(area, buffer);
        self.last_frame.clone_from(buffer);
        let cursor = cursor_position(pane, area, self.ui.is_focused());

        self.terminal.flush().map_err(Error::Screen)?;
        self.terminal.swap_buffers();
        match cursor {
            Some(position) => {
                self.terminal
                    .set_cursor_position(position)
                    .map_err(Error::Screen)?;
                self.terminal.show_cursor().map_err(Error::Screen)?;
            }
            None => self.terminal.hide_cursor().map_err(Error::Screen)?,
        }
        self.terminal.backend_mut().flush().map_err(Error::Screen)
    }
}

/// Draw the whole UI from registry and UI state.
fn render(frame: &mut Frame, registry: &ProcessRegistry, ui: &UiState) {
    let geometry = ui.geometry();
    let selected_index = ui.selected_index(registry);
    let selected = selected_index.and_then(|index| registry.get(index));

    let sidebar = geometry.sidebar_area();
    let hints = current_hints(registry, ui);
    frame.render_widget(
        SidebarWidget::new(registry)
            .selected(selected_index)
            .focused(ui.is_focused())
            .visible_rows(geometry.sidebar_list_rows(hints.len())),
        sidebar,
    );

    let hints_area = Rect {
        width: sidebar.width.saturating_sub(1),
        ..sidebar
    };
    frame.render_widget(HotkeysWidget::new(&hints), hints_area);

    if let Some(pane) = selected {
        let area = geometry.content_area();
        pane.terminal().render(area, frame.buffer_mut());
        if let Some(position) = cursor_position(pane, area, ui.is_focused()) {
            frame.set_cursor_position(position);
        }
    }
}

/// Hotkey hints for the current selection and focus.
fn current_hints(registry: &ProcessRegistry, ui: &UiState) -> Vec<Hotkey> {
    let selected = ui
        .selected_index(registry)
        .and_then(|index| registry.get(index));
    hotkey_hints(selected.map(hint_context), ui.is_focused())
}

fn hint_context(pane: &Pane) -> HintContext {
    HintContext {
        killable: pane.is_killable(),
        dead: pane.is_dead(),
        scrolling: pane.is_scrolling(),
        has_selection: pane.terminal().has_selection(),
    }
}

/// Screen position of the pane's cursor, shown only in focus mode.
fn cursor_position(pane: &Pane, area: Rect, focused: bool) -> Option<Position> {
    if !focused {
        return None;
    }
    let cursor = pane.terminal().cursor()?;
    (cursor.col < area.width && cursor.row < area.height)
        .then(|| Position::new(area.x + cursor.col, area.y + cursor.row))
}

/// Start a pane, reporting a failure inside its own terminal.
fn start_pane(pane: &mut Pane) {
    if let Err(e) = pane.start() {
        tracing::warn!(key = %pane.key(), "failed to start process: {}", e);
        pane.terminal_mut()
            .write_notice(&format!("[failed to start: {e}]"));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
