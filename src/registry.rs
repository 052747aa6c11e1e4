//! Ordered collection of panes.

use std::cmp::Ordering;

use crate::pane::Pane;
use crate::terminal::TerminalId;

/// Panes in display order, unique by key.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    panes: Vec<Pane>,
}

impl ProcessRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of panes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.panes.len()
    }

    /// True when no pane has been added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    /// Pane at a display position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Pane> {
        self.panes.get(index)
    }

    /// Mutable pane at a display position.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Pane> {
        self.panes.get_mut(index)
    }

    /// Display position of the pane with `key`.
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.panes.iter().position(|p| p.key() == key)
    }

    /// Pane with `key`.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Pane> {
        self.panes.iter().find(|p| p.key() == key)
    }

    /// Mutable pane with `key`.
    pub fn find_mut(&mut self, key: &str) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|p| p.key() == key)
    }

    /// Display position of the pane owning `terminal`.
    #[must_use]
    pub fn position_of_terminal(&self, terminal: TerminalId) -> Option<usize> {
        self.panes.iter().position(|p| p.terminal_id() == terminal)
    }

    /// Append a pane. Keys must be unique; a duplicate is handed back.
    ///
    /// # Errors
    /// Returns the pane unchanged if its key is already registered.
    pub fn push(&mut self, pane: Pane) -> Result<(), Box<Pane>> {
        if self.find(pane.key()).is_some() {
            return Err(Box::new(pane));
        }
        self.panes.push(pane);
        Ok(())
    }

    /// Iterate in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Pane> {
        self.panes.iter()
    }

    /// Iterate mutably in display order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pane> {
        self.panes.iter_mut()
    }

    /// Recompute display order.
    pub fn sort(&mut self) {
        self.panes.sort_by(display_order);
    }
}

/// Killable before non-killable, then alive before dead, then shorter
/// titles first. The sort is stable, so equal panes keep insertion order.
#[must_use]
pub fn display_order(a: &Pane, b: &Pane) -> Ordering {
    a.is_killable()
        .cmp(&b.is_killable())
        .reverse()
        .then_with(|| a.is_dead().cmp(&b.is_dead()))
        .then_with(|| a.title().chars().count().cmp(&b.title().chars().count()))
}
