//! UI state: selection, focus, screen geometry and mouse tracking.
//!
//! Everything here is plain data owned by the reactor. Rendering reads it,
//! only event handlers write it.

use std::time::{Duration, Instant};

use ratatui::layout::Rect;

use crate::registry::ProcessRegistry;
use crate::terminal::{CellPos, TerminalSize};

/// Width of the sidebar, including its right border.
pub const SIDEBAR_WIDTH: u16 = 20;

/// First column of the content region.
pub const CONTENT_X: u16 = SIDEBAR_WIDTH + 1;

/// Lines scrolled per mouse wheel notch.
pub const WHEEL_LINES: usize = 3;

/// Two presses on the same cell within this window select the whole line.
pub const DOUBLE_CLICK: Duration = Duration::from_millis(500);

/// Screen dimensions and the regions derived from them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    /// Screen width in columns.
    pub width: u16,
    /// Screen height in rows.
    pub height: u16,
}

/// Horizontal screen region under a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    /// The process list.
    Sidebar,
    /// The sidebar border and the gap after it.
    Border,
    /// The selected pane's terminal.
    Content,
}

impl Geometry {
    /// Geometry for a `width` x `height` screen.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// The whole screen.
    #[must_use]
    pub fn area(self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Area of the sidebar, border included.
    #[must_use]
    pub fn sidebar_area(self) -> Rect {
        Rect::new(0, 0, SIDEBAR_WIDTH.min(self.width), self.height)
    }

    /// Sidebar rows left for the process list above `hint_rows` hotkey hints.
    #[must_use]
    pub fn sidebar_list_rows(self, hint_rows: usize) -> u16 {
        self.height
            .saturating_sub(u16::try_from(hint_rows).unwrap_or(u16::MAX))
    }

    /// Area terminals are drawn into.
    #[must_use]
    pub fn content_area(self) -> Rect {
        let x = CONTENT_X.min(self.width);
        Rect::new(x, 0, self.width - x, self.height)
    }

    /// Size every virtual terminal is kept at.
    #[must_use]
    pub fn content_size(self) -> TerminalSize {
        let area = self.content_area();
        TerminalSize::new(area.height, area.width)
    }

    /// Lines moved by a half-page scroll.
    #[must_use]
    pub fn page_size(self) -> usize {
        usize::from(self.height / 2 + 1)
    }

    /// Region under screen column `x`.
    #[must_use]
    pub fn region(self, x: u16) -> Region {
        if x < SIDEBAR_WIDTH - 1 {
            Region::Sidebar
        } else if x < CONTENT_X {
            Region::Border
        } else {
            Region::Content
        }
    }

    /// Terminal cell under a screen position inside the content region.
    #[must_use]
    pub fn content_cell(self, x: u16, y: u16) -> Option<CellPos> {
        let area = self.content_area();
        (x >= area.x && x < area.right() && y < area.bottom())
            .then(|| CellPos::new(y - area.y, x - area.x))
    }
}

/// One row of the sidebar list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SidebarRow {
    /// The pane at this display index.
    Pane(usize),
    /// Line between the last alive and the first dead pane.
    Separator,
}

/// Rows of the sidebar list, top to bottom.
///
/// Both the renderer and click handling go through this, so a click always
/// lands on the entry drawn under it.
#[must_use]
pub fn sidebar_rows(registry: &ProcessRegistry) -> Vec<SidebarRow> {
    let mut rows = Vec::with_capacity(registry.len() + 1);
    let mut previous_dead = None;
    for (index, pane) in registry.iter().enumerate() {
        let dead = pane.is_dead();
        if previous_dead == Some(false) && dead {
            rows.push(SidebarRow::Separator);
        }
        rows.push(SidebarRow::Pane(index));
        previous_dead = Some(dead);
    }
    rows
}

/// Selection, focus, geometry and drag state.
#[derive(Clone, Debug, Default)]
pub struct UiState {
    selected: Option<String>,
    focused: bool,
    geometry: Geometry,
    dragging: bool,
    last_click: Option<(CellPos, Instant)>,
}

impl UiState {
    /// State for a screen of the given geometry.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            ..Self::default()
        }
    }

    /// Key of the selected pane.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Display index of the selected pane.
    #[must_use]
    pub fn selected_index(&self, registry: &ProcessRegistry) -> Option<usize> {
        registry.position(self.selected.as_deref()?)
    }

    /// Whether input goes to the selected pane's terminal.
    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Current screen geometry.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Replace the screen geometry.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    /// Select the pane with `key`.
    pub fn select(&mut self, key: impl Into<String>) {
        self.selected = Some(key.into());
    }

    /// Select the first pane in display order, if any.
    pub fn select_first(&mut self, registry: &ProcessRegistry) {
        if let Some(pane) = registry.get(0) {
            self.selected = Some(pane.key().to_string());
        }
    }

    /// Move the selection by `offset` entries, clamped to the list.
    pub fn move_selection(&mut self, registry: &ProcessRegistry, offset: isize) {
        if registry.is_empty() {
            return;
        }
        let current = self.selected_index(registry).unwrap_or(0);
        let last = registry.len() - 1;
        let target = current.saturating_add_signed(offset).min(last);
        if let Some(pane) = registry.get(target) {
            self.selected = Some(pane.key().to_string());
        }
    }

    /// Make sure the selection references an existing pane whenever there
    /// is one.
    pub fn ensure_selection(&mut self, registry: &ProcessRegistry) {
        if self.selected_index(registry).is_none() {
            self.selected = None;
            self.select_first(registry);
        }
    }

    /// Enter focus mode.
    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Leave focus mode.
    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// True while a mouse selection drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Mark a mouse selection drag as started.
    pub fn start_dragging(&mut self) {
        self.dragging = true;
    }

    /// Forget any drag in progress.
    pub fn reset_dragging(&mut self) {
        self.dragging = false;
    }

    /// Record a primary press on `pos`. Returns `true` when it completes a
    /// double click.
    pub fn register_click(&mut self, pos: CellPos, now: Instant) -> bool {
        let double = !self.dragging
            && self
                .last_click
                .is_some_and(|(last, at)| last == pos && now.duration_since(at) <= DOUBLE_CLICK);
        self.last_click = if double { None } else { Some((pos, now)) };
        double
    }
}
