//! Ratatui widgets for the sidebar, hotkey hints and terminal content.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::registry::ProcessRegistry;
use crate::terminal::CellPos;
use crate::ui::{sidebar_rows, SidebarRow};

/// Highlight of the selected entry while the sidebar has the input.
pub const SELECTED_COLOR: Color = Color::Rgb(255, 165, 0);

/// Highlight of the selected entry while its terminal has the input.
pub const FOCUSED_COLOR: Color = Color::Cyan;

const SEPARATOR: &str = "──────────────────────";

/// Widget for rendering a virtual terminal's visible screen.
pub struct TerminalWidget<'a> {
    screen: &'a vt100::Screen,
    selection: Option<(CellPos, CellPos)>,
}

impl<'a> TerminalWidget<'a> {
    /// Create a widget over a parsed screen.
    #[must_use]
    pub fn new(screen: &'a vt100::Screen) -> Self {
        Self {
            screen,
            selection: None,
        }
    }

    /// Highlight the cells from `start` to `end` inclusive, in reading order.
    #[must_use]
    pub fn selection(mut self, selection: Option<(CellPos, CellPos)>) -> Self {
        self.selection = selection;
        self
    }

    fn is_selected(&self, pos: CellPos) -> bool {
        self.selection
            .is_some_and(|(start, end)| start <= pos && pos <= end)
    }
}

impl Widget for TerminalWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = area.intersection(buf.area);

        for row in 0..area.height {
            for col in 0..area.width {
                let Some(cell) = self.screen.cell(row, col) else {
                    continue;
                };
                if cell.is_wide_continuation() {
                    continue;
                }

                let mut fg = convert_color(cell.fgcolor());
                let mut bg = convert_color(cell.bgcolor());
                if cell.inverse() {
                    std::mem::swap(&mut fg, &mut bg);
                }

                let mut style = Style::default().fg(fg).bg(bg);
                if cell.bold() {
                    style = style.add_modifier(Modifier::BOLD);
                }
                if cell.italic() {
                    style = style.add_modifier(Modifier::ITALIC);
                }
                if cell.underline() {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                if self.is_selected(CellPos::new(row, col)) {
                    style = style.add_modifier(Modifier::REVERSED);
                }

                let contents = cell.contents();
                let buf_cell = &mut buf[(area.x + col, area.y + row)];
                buf_cell.set_symbol(if contents.is_empty() { " " } else { contents.as_str() });
                buf_cell.set_style(style);
            }
        }
    }
}

/// The process list on the left of the screen.
pub struct SidebarWidget<'a> {
    registry: &'a ProcessRegistry,
    selected: Option<usize>,
    focused: bool,
    visible_rows: u16,
    border_style: Style,
}

impl<'a> SidebarWidget<'a> {
    /// Create a sidebar listing `registry` in display order.
    #[must_use]
    pub fn new(registry: &'a ProcessRegistry) -> Self {
        Self {
            registry,
            selected: None,
            focused: false,
            visible_rows: u16::MAX,
            border_style: Style::default().fg(Color::DarkGray),
        }
    }

    /// Set the highlighted entry.
    #[must_use]
    pub fn selected(mut self, index: Option<usize>) -> Self {
        self.selected = index;
        self
    }

    /// Set whether the selected pane has the input.
    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Draw at most `rows` list rows; the rest of the sidebar stays free.
    #[must_use]
    pub fn visible_rows(mut self, rows: u16) -> Self {
        self.visible_rows = rows;
        self
    }

    fn entry_style(&self, index: usize, dead: bool) -> Style {
        if self.selected == Some(index) {
            let color = if self.focused {
                FOCUSED_COLOR
            } else {
                SELECTED_COLOR
            };
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else if dead {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        }
    }
}

impl Widget for SidebarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(self.border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = sidebar_rows(self.registry);
        let bottom = inner.y + inner.height.min(self.visible_rows);
        for (y, row) in (inner.y..bottom).zip(rows) {
            let line_area = Rect::new(inner.x, y, inner.width, 1);
            let line = match row {
                SidebarRow::Separator => Line::styled(SEPARATOR, self.border_style),
                SidebarRow::Pane(index) => {
                    let Some(pane) = self.registry.get(index) else {
                        continue;
                    };
                    Line::styled(
                        format!(" {} {}", pane.icon(), pane.title()),
                        self.entry_style(index, pane.is_dead()),
                    )
                }
            };
            line.render(line_area, buf);
        }
    }
}

/// A key and what it does right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hotkey {
    /// Key name as shown.
    pub key: &'static str,
    /// Action label.
    pub label: &'static str,
}

/// State of the selected pane that hotkey hints depend on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HintContext {
    /// Selected pane may be killed and restarted.
    pub killable: bool,
    /// Selected pane's process is gone.
    pub dead: bool,
    /// Selected pane is scrolled back.
    pub scrolling: bool,
    /// Selected pane has a text selection.
    pub has_selection: bool,
}

/// Hotkeys that currently do something.
///
/// Later rules replace the action bound to the same key. Hints are ordered
/// by key length, then by key.
#[must_use]
pub fn hotkey_hints(selected: Option<HintContext>, focused: bool) -> Vec<Hotkey> {
    let mut hints: Vec<Hotkey> = Vec::new();
    let mut bind = |key: &'static str, label: &'static str| {
        match hints.iter_mut().find(|h| h.key == key) {
            Some(hint) => hint.label = label,
            None => hints.push(Hotkey { key, label }),
        }
    };

    if let Some(pane) = selected {
        if pane.killable && !pane.dead && !focused {
            bind("x", "kill");
            bind("enter", "focus");
        }
        if pane.killable && pane.dead && !focused {
            bind("enter", "start");
        }
    }
    if focused {
        bind("ctrl-z", "sidebar");
    } else {
        bind("j/k/↓/↑", "up/down");
    }
    if let Some(pane) = selected {
        if pane.scrolling && (focused || !pane.killable) {
            bind("enter", "reset");
        }
        if pane.has_selection {
            bind("enter", "copy");
        }
    }
    bind("ctrl-u/d", "scroll");

    hints.sort_by(|a, b| {
        a.key
            .chars()
            .count()
            .cmp(&b.key.chars().count())
            .then_with(|| a.key.cmp(b.key))
    });
    hints
}

/// Hotkey hints, one per line, anchored to the bottom of the area.
pub struct HotkeysWidget<'a> {
    hints: &'a [Hotkey],
}

impl<'a> HotkeysWidget<'a> {
    /// Create the widget.
    #[must_use]
    pub fn new(hints: &'a [Hotkey]) -> Self {
        Self { hints }
    }
}

impl Widget for HotkeysWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let count = u16::try_from(self.hints.len())
            .unwrap_or(u16::MAX)
            .min(area.height);
        let top = area.bottom() - count;

        for (y, hint) in (top..area.bottom()).zip(self.hints) {
            let row = Rect::new(area.x, y, area.width, 1);
            Line::from(Span::styled(
                format!(" {}", hint.key),
                Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
            ))
            .render(row, buf);
            Line::from(format!("{}  ", hint.label))
                .alignment(Alignment::Right)
                .render(row, buf);
        }
    }
}

/// Convert a vt100 color to a ratatui color.
fn convert_color(color: vt100::Color) -> Color {
    match color {
        vt100::Color::Default => Color::Reset,
        vt100::Color::Idx(idx) => Color::Indexed(idx),
        vt100::Color::Rgb(r, g, b) => Color::Rgb(r, g, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::{Pane, PaneSpec};
    use crate::testing::FakeFactory;
    use pretty_assertions::assert_eq;

    fn row_text(buf: &Buffer, y: u16) -> String {
        (buf.area.x..buf.area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect::<String>()
    }

    fn keys(hints: &[Hotkey]) -> Vec<(&str, &str)> {
        hints.iter().map(|h| (h.key, h.label)).collect()
    }

    #[test]
    fn hints_for_alive_killable_pane() {
        let ctx = HintContext {
            killable: true,
            ..HintContext::default()
        };
        assert_eq!(
            keys(&hotkey_hints(Some(ctx), false)),
            vec![
                ("x", "kill"),
                ("enter", "focus"),
                ("j/k/↓/↑", "up/down"),
                ("ctrl-u/d", "scroll"),
            ]
        );
    }

    #[test]
    fn hints_for_dead_pane_and_focus_mode() {
        let dead = HintContext {
            killable: true,
            dead: true,
            ..HintContext::default()
        };
        assert_eq!(
            keys(&hotkey_hints(Some(dead), false)),
            vec![("enter", "start"), ("j/k/↓/↑", "up/down"), ("ctrl-u/d", "scroll")]
        );

        let focused = HintContext {
            killable: true,
            scrolling: true,
            ..HintContext::default()
        };
        assert_eq!(
            keys(&hotkey_hints(Some(focused), true)),
            vec![("enter", "reset"), ("ctrl-z", "sidebar"), ("ctrl-u/d", "scroll")]
        );
    }

    #[test]
    fn selection_overrides_enter() {
        let ctx = HintContext {
            killable: false,
            scrolling: true,
            has_selection: true,
            ..HintContext::default()
        };
        assert_eq!(
            keys(&hotkey_hints(Some(ctx), false)),
            vec![("enter", "copy"), ("j/k/↓/↑", "up/down"), ("ctrl-u/d", "scroll")]
        );
        assert_eq!(
            keys(&hotkey_hints(None, false)),
            vec![("j/k/↓/↑", "up/down"), ("ctrl-u/d", "scroll")]
        );
    }

    #[test]
    fn sidebar_lists_panes_with_separator() {
        let factory = FakeFactory::default();
        let mut registry = ProcessRegistry::new();
        for (i, (title, dead)) in [("web", false), ("db", true)].into_iter().enumerate() {
            let mut pane = Pane::new(
                PaneSpec {
                    key: title.to_string(),
                    icon: "→".to_string(),
                    title: title.to_string(),
                    argv: vec!["true".to_string()],
                    env: Default::default(),
                    cwd: None,
                    killable: true,
                },
                factory.terminal(i as u64),
            );
            if dead {
                pane.mark_dead("gone");
            } else {
                pane.start().unwrap();
            }
            registry.push(pane).unwrap();
        }

        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 4));
        SidebarWidget::new(&registry)
            .selected(Some(0))
            .render(buf.area, &mut buf);

        assert_eq!(row_text(&buf, 0), " → web             │");
        assert_eq!(row_text(&buf, 1), "───────────────────│");
        assert_eq!(row_text(&buf, 2), " → db              │");
        assert_eq!(row_text(&buf, 3), "                   │");
        assert_eq!(buf[(1, 0)].fg, SELECTED_COLOR);
        assert!(buf[(1, 0)].modifier.contains(Modifier::BOLD));
        assert_eq!(buf[(1, 2)].fg, Color::DarkGray);

        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 4));
        SidebarWidget::new(&registry)
            .visible_rows(2)
            .render(buf.area, &mut buf);
        assert_eq!(row_text(&buf, 1), "───────────────────│");
        assert_eq!(row_text(&buf, 2), "                   │");
    }

    #[test]
    fn hotkeys_sit_at_the_bottom() {
        let hints = vec![
            Hotkey {
                key: "x",
                label: "kill",
            },
            Hotkey {
                key: "ctrl-u/d",
                label: "scroll",
            },
        ];
        let mut buf = Buffer::empty(Rect::new(0, 0, 19, 4));
        HotkeysWidget::new(&hints).render(buf.area, &mut buf);

        assert_eq!(row_text(&buf, 1), "                   ");
        assert_eq!(row_text(&buf, 2), " x           kill  ");
        assert_eq!(row_text(&buf, 3), " ctrl-u/d  scroll  ");
    }

    #[test]
    fn terminal_content_and_selection() {
        let mut parser = vt100::Parser::new(2, 10, 0);
        parser.process(b"hello\r\n\x1b[1mworld");

        let mut buf = Buffer::empty(Rect::new(0, 0, 14, 2));
        TerminalWidget::new(parser.screen())
            .selection(Some((CellPos::new(0, 1), CellPos::new(0, 3))))
            .render(Rect::new(4, 0, 10, 2), &mut buf);

        assert_eq!(row_text(&buf, 0), "    hello     ");
        assert_eq!(row_text(&buf, 1), "    world     ");
        assert!(!buf[(4, 0)].modifier.contains(Modifier::REVERSED));
        assert!(buf[(5, 0)].modifier.contains(Modifier::REVERSED));
        assert!(buf[(7, 0)].modifier.contains(Modifier::REVERSED));
        assert!(!buf[(8, 0)].modifier.contains(Modifier::REVERSED));
        assert!(buf[(4, 1)].modifier.contains(Modifier::BOLD));
    }
}
