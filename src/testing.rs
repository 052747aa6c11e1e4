//! In-memory virtual terminal used by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use ratatui::{buffer::Buffer, layout::Rect, text::Line, widgets::Widget};

use crate::clipboard::ClipboardSink;
use crate::error::{Error, Result};
use crate::event::EventSender;
use crate::terminal::{
    CellPos, Launch, TerminalFactory, TerminalId, TerminalSize, VirtualTerminal,
};

/// Program name that makes [`FakeTerminal::start`] fail.
pub(crate) const FAILING_PROGRAM: &str = "definitely-not-a-program";

/// Program name that makes [`FakeTerminal::start`] panic.
pub(crate) const PANICKING_PROGRAM: &str = "panic";

/// Everything a fake terminal has been asked to do.
#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub starts: Vec<Launch>,
    pub closes: usize,
    pub clears: usize,
    pub notices: Vec<String>,
    pub input: Vec<u8>,
    pub size: TerminalSize,
    pub scrollback: usize,
    pub selection: Option<(CellPos, CellPos)>,
    pub generation: u64,
}

pub(crate) struct FakeTerminal {
    id: TerminalId,
    state: Arc<Mutex<FakeState>>,
}

impl FakeTerminal {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

impl VirtualTerminal for FakeTerminal {
    fn id(&self) -> TerminalId {
        self.id
    }

    fn generation(&self) -> u64 {
        self.state().generation
    }

    fn start(&mut self, launch: &Launch) -> Result<()> {
        assert!(
            launch.argv.first().map(String::as_str) != Some(PANICKING_PROGRAM),
            "fake terminal asked to panic"
        );
        let mut state = self.state();
        state.generation += 1;
        state.starts.push(launch.clone());
        if launch.argv.first().map(String::as_str) == Some(FAILING_PROGRAM) {
            return Err(Error::PtySpawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such program",
            )));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.state().closes += 1;
    }

    fn clear(&mut self) {
        let mut state = self.state();
        state.clears += 1;
        state.notices.clear();
        state.selection = None;
    }

    fn write_notice(&mut self, text: &str) {
        self.state().notices.push(text.to_string());
    }

    fn resize(&mut self, size: TerminalSize) {
        self.state().size = size;
    }

    fn send_input(&mut self, bytes: &[u8]) {
        self.state().input.extend_from_slice(bytes);
    }

    fn scroll_up(&mut self, lines: usize) {
        self.state().scrollback += lines;
    }

    fn scroll_down(&mut self, lines: usize) {
        let mut state = self.state();
        state.scrollback = state.scrollback.saturating_sub(lines);
    }

    fn scroll_reset(&mut self) {
        self.state().scrollback = 0;
    }

    fn is_scrolling(&self) -> bool {
        self.state().scrollback > 0
    }

    fn select_start(&mut self, pos: CellPos) {
        self.state().selection = Some((pos, pos));
    }

    fn select_end(&mut self, pos: CellPos) {
        let mut state = self.state();
        let anchor = state.selection.map_or(pos, |(anchor, _)| anchor);
        state.selection = Some((anchor, pos));
    }

    fn has_selection(&self) -> bool {
        self.state().selection.is_some_and(|(a, b)| a != b)
    }

    fn clear_selection(&mut self) {
        self.state().selection = None;
    }

    fn selected_text(&self) -> Option<String> {
        let (a, b) = self.state().selection?;
        (a != b).then(|| format!("{}:{}-{}:{}", a.row, a.col, b.row, b.col))
    }

    fn cursor(&self) -> Option<CellPos> {
        Some(CellPos::new(0, 0))
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let state = self.state();
        for (i, notice) in state.notices.iter().enumerate() {
            let Ok(offset) = u16::try_from(i) else { break };
            if offset >= area.height {
                break;
            }
            let row = Rect::new(area.x, area.y + offset, area.width, 1);
            Line::raw(notice.trim()).render(row, buf);
        }
    }
}

/// Hands out fake terminals and keeps a handle on each one's state.
#[derive(Clone, Default)]
pub(crate) struct FakeFactory {
    terminals: Arc<Mutex<HashMap<TerminalId, Arc<Mutex<FakeState>>>>>,
}

impl FakeFactory {
    pub fn state(&self, id: TerminalId) -> Arc<Mutex<FakeState>> {
        Arc::clone(&self.terminals.lock().unwrap()[&id])
    }

    pub fn terminals_created(&self) -> usize {
        self.terminals.lock().unwrap().len()
    }

    pub fn terminal(&self, id: u64) -> Box<dyn VirtualTerminal> {
        self.clone().create(
            TerminalId(id),
            TerminalSize::new(24, 80),
            EventSender::channel().0,
        )
    }
}

impl TerminalFactory for FakeFactory {
    fn create(
        &mut self,
        id: TerminalId,
        size: TerminalSize,
        _events: EventSender,
    ) -> Box<dyn VirtualTerminal> {
        let state = Arc::new(Mutex::new(FakeState {
            size,
            ..FakeState::default()
        }));
        self.terminals.lock().unwrap().insert(id, Arc::clone(&state));
        Box::new(FakeTerminal { id, state })
    }
}

/// Clipboard that remembers everything copied to it.
#[derive(Clone, Default)]
pub(crate) struct RecordingClipboard {
    copied: Arc<Mutex<Vec<String>>>,
}

impl RecordingClipboard {
    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().unwrap().clone()
    }
}

impl ClipboardSink for RecordingClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
