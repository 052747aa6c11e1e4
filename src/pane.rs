//! Pane types: one supervised process, its terminal and lifecycle.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::event::ProcessRequest;
use crate::terminal::{Launch, TerminalId, VirtualTerminal};

/// Notice shown in a pane whose process exited.
pub const EXITED_NOTICE: &str = "\n[process exited]";

/// Lifecycle of a pane's process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaneState {
    /// Created, never started.
    Unstarted,
    /// Process is running.
    Running,
    /// Process exited, was killed, failed to start, or was never auto-started.
    Dead,
}

/// Static description of a pane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaneSpec {
    /// Unique, immutable key.
    pub key: String,
    /// Sidebar icon.
    pub icon: String,
    /// Sidebar title.
    pub title: String,
    /// Program and arguments.
    pub argv: Vec<String>,
    /// Extra environment variables.
    pub env: BTreeMap<String, String>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
    /// Operator may kill and restart it.
    pub killable: bool,
}

impl From<&ProcessRequest> for PaneSpec {
    fn from(request: &ProcessRequest) -> Self {
        Self {
            key: request.key.clone(),
            icon: request.icon.clone(),
            title: request.title.clone(),
            argv: request.argv.clone(),
            env: request.env.clone(),
            cwd: request.cwd.clone(),
            killable: request.killable,
        }
    }
}

/// One supervised process and the terminal it runs in.
pub struct Pane {
    spec: PaneSpec,
    state: PaneState,
    terminal: Box<dyn VirtualTerminal>,
}

impl Pane {
    /// Create an unstarted pane that exclusively owns `terminal`.
    #[must_use]
    pub fn new(spec: PaneSpec, terminal: Box<dyn VirtualTerminal>) -> Self {
        Self {
            spec,
            state: PaneState::Unstarted,
            terminal,
        }
    }

    /// The pane's key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.spec.key
    }

    /// Sidebar title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.spec.title
    }

    /// Sidebar icon.
    #[must_use]
    pub fn icon(&self) -> &str {
        &self.spec.icon
    }

    /// Static description.
    #[must_use]
    pub fn spec(&self) -> &PaneSpec {
        &self.spec
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PaneState {
        self.state
    }

    /// Whether the operator may kill and restart it.
    #[must_use]
    pub fn is_killable(&self) -> bool {
        self.spec.killable
    }

    /// Whether the process is known to be gone.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == PaneState::Dead
    }

    /// The terminal's identity.
    #[must_use]
    pub fn terminal_id(&self) -> TerminalId {
        self.terminal.id()
    }

    /// Read access to the terminal.
    #[must_use]
    pub fn terminal(&self) -> &dyn VirtualTerminal {
        self.terminal.as_ref()
    }

    /// Write access to the terminal.
    pub fn terminal_mut(&mut self) -> &mut dyn VirtualTerminal {
        self.terminal.as_mut()
    }

    /// Clear the terminal and spawn the process.
    ///
    /// On failure the pane is left dead and the error returned.
    ///
    /// # Errors
    /// Returns an error if the process cannot be spawned.
    pub fn start(&mut self) -> Result<()> {
        let launch = Launch {
            argv: self.spec.argv.clone(),
            env: self.spec.env.clone(),
            cwd: self.spec.cwd.clone(),
        };

        self.terminal.clear();
        match self.terminal.start(&launch) {
            Ok(()) => {
                self.state = PaneState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = PaneState::Dead;
                Err(e)
            }
        }
    }

    /// Ask the process to terminate. The pane becomes dead only when the
    /// terminal reports the exit.
    pub fn kill(&mut self) {
        self.terminal.close();
    }

    /// Show `notice` and mark the pane dead without running anything.
    pub fn mark_dead(&mut self, notice: &str) {
        self.terminal.write_notice(notice);
        self.state = PaneState::Dead;
    }

    /// Record that the process started as `generation` exited.
    ///
    /// Returns `false` when the notification is stale or the pane is already
    /// dead, in which case nothing changes.
    pub fn mark_exited(&mut self, generation: u64) -> bool {
        if self.is_dead() || generation != self.terminal.generation() {
            return false;
        }
        self.mark_dead(EXITED_NOTICE);
        true
    }

    /// Scroll the terminal view up.
    pub fn scroll_up(&mut self, lines: usize) {
        self.terminal.scroll_up(lines);
    }

    /// Scroll the terminal view down.
    pub fn scroll_down(&mut self, lines: usize) {
        self.terminal.scroll_down(lines);
    }

    /// Return the terminal view to the live screen.
    pub fn scroll_reset(&mut self) {
        self.terminal.scroll_reset();
    }

    /// True when scrolled away from the live screen.
    #[must_use]
    pub fn is_scrolling(&self) -> bool {
        self.terminal.is_scrolling()
    }
}

impl std::fmt::Debug for Pane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pane")
            .field("key", &self.spec.key)
            .field("state", &self.state)
            .field("terminal", &self.terminal.id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFactory, FAILING_PROGRAM};
    use pretty_assertions::assert_eq;

    fn spec(argv: &[&str]) -> PaneSpec {
        PaneSpec {
            key: "web".to_string(),
            icon: String::new(),
            title: "Web".to_string(),
            argv: argv.iter().map(ToString::to_string).collect(),
            env: BTreeMap::from([("PORT".to_string(), "3000".to_string())]),
            cwd: Some(PathBuf::from("/srv")),
            killable: true,
        }
    }

    #[test]
    fn start_clears_and_launches() {
        let factory = FakeFactory::default();
        let mut pane = Pane::new(spec(&["npm", "start"]), factory.terminal(1));
        assert_eq!(pane.state(), PaneState::Unstarted);
        assert!(!pane.is_dead());

        pane.start().unwrap();
        assert_eq!(pane.state(), PaneState::Running);

        let state = factory.state(TerminalId(1));
        let state = state.lock().unwrap();
        assert_eq!(state.clears, 1);
        assert_eq!(
            state.starts,
            vec![Launch {
                argv: vec!["npm".to_string(), "start".to_string()],
                env: BTreeMap::from([("PORT".to_string(), "3000".to_string())]),
                cwd: Some(PathBuf::from("/srv")),
            }]
        );
    }

    #[test]
    fn failed_start_leaves_pane_dead() {
        let factory = FakeFactory::default();
        let mut pane = Pane::new(spec(&[FAILING_PROGRAM]), factory.terminal(1));
        assert!(pane.start().is_err());
        assert_eq!(pane.state(), PaneState::Dead);
    }

    #[test]
    fn kill_waits_for_exit_notification() {
        let factory = FakeFactory::default();
        let mut pane = Pane::new(spec(&["sleep", "60"]), factory.terminal(1));
        pane.start().unwrap();

        pane.kill();
        assert_eq!(pane.state(), PaneState::Running);
        assert_eq!(factory.state(TerminalId(1)).lock().unwrap().closes, 1);

        assert!(pane.mark_exited(1));
        assert!(pane.is_dead());
        assert!(!pane.mark_exited(1));
        assert_eq!(
            factory.state(TerminalId(1)).lock().unwrap().notices,
            vec![EXITED_NOTICE.to_string()]
        );
    }

    #[test]
    fn stale_exit_is_ignored_after_restart() {
        let factory = FakeFactory::default();
        let mut pane = Pane::new(spec(&["sleep", "60"]), factory.terminal(1));
        pane.start().unwrap();
        assert!(pane.mark_exited(1));

        pane.start().unwrap();
        assert!(!pane.mark_exited(1));
        assert_eq!(pane.state(), PaneState::Running);
    }
}
