//! The supervisor: owns the screen and wires producers to the reactor.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    cursor::Show,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::clipboard::{enable_tmux_clipboard, SystemClipboard};
use crate::error::{Error, Result};
use crate::event::{Event, EventReceiver, EventSender, ProcessRequest};
use crate::pty::PtyFactory;
use crate::reactor::{Interrupt, Reactor};

/// How long the input poller blocks before checking for shutdown.
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Raw mode, alternate screen and mouse capture for as long as it lives.
struct ScreenGuard;

impl ScreenGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        // Undoes raw mode if the rest fails.
        let guard = Self;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(guard)
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!("failed to leave raw mode: {}", e);
        }
        if let Err(e) = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen, Show) {
            tracing::warn!("failed to restore screen: {}", e);
        }
    }
}

/// Delivers Ctrl-C as a real SIGINT to this process.
///
/// Raw mode stops the terminal from doing it, and the signal listener turns
/// it into the same cancellation an external `kill -INT` would.
#[derive(Clone, Copy, Debug, Default)]
pub struct SigintInterrupt;

impl Interrupt for SigintInterrupt {
    fn interrupt(&self) {
        if let Err(e) = signal_hook::low_level::raise(signal_hook::consts::SIGINT) {
            tracing::warn!("failed to raise SIGINT: {}", e);
        }
    }
}

/// A terminal-resident process supervisor.
///
/// Creating one takes over the terminal; it is handed back when
/// [`run`](Self::run) returns or the supervisor is dropped.
pub struct Supervisor {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    events: EventSender,
    receiver: EventReceiver,
    screen: ScreenGuard,
}

impl Supervisor {
    /// Take over the terminal.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be put into raw mode or the
    /// alternate screen.
    pub fn new() -> Result<Self> {
        let screen = ScreenGuard::enter().map_err(Error::Screen)?;
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout())).map_err(Error::Screen)?;
        enable_tmux_clipboard();

        let (events, receiver) = EventSender::channel();
        Ok(Self {
            terminal,
            events,
            receiver,
            screen,
        })
    }

    /// A handle for enqueueing events from elsewhere.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        self.events.clone()
    }

    /// Supervise a process. Takes effect once [`run`](Self::run) is going.
    ///
    /// # Errors
    /// Returns [`Error::QueueClosed`] if the reactor has stopped.
    pub fn add_process(&self, request: ProcessRequest) -> Result<()> {
        if self.events.add_process(request) {
            Ok(())
        } else {
            Err(Error::QueueClosed)
        }
    }

    /// Ask the reactor to stop.
    ///
    /// # Errors
    /// Returns [`Error::QueueClosed`] if the reactor has already stopped.
    pub fn exit(&self) -> Result<()> {
        if self.events.shutdown() {
            Ok(())
        } else {
            Err(Error::QueueClosed)
        }
    }

    /// Run until shutdown, SIGINT/SIGTERM or Ctrl-C, then restore the screen.
    ///
    /// # Errors
    /// Returns an error if signal handlers cannot be installed or the screen
    /// cannot be drawn.
    pub async fn run(self) -> Result<()> {
        let Self {
            terminal,
            events,
            receiver,
            screen,
        } = self;

        let (cancel_tx, cancel) = watch::channel(false);
        listen_for_signals(cancel_tx).map_err(Error::Io)?;
        let _poller = spawn_input_poller(events.clone());

        let reactor = Reactor::new(terminal, Box::new(PtyFactory::new()), events)?
            .clipboard(Box::new(SystemClipboard::from_env()))
            .interrupt(Box::new(SigintInterrupt));
        let result = reactor.run(receiver, cancel).await;

        drop(screen);
        tracing::info!("supervisor stopped");
        result
    }
}

/// Turn SIGINT and SIGTERM into cancellation.
///
/// Registration happens before this returns, so a signal raised right after
/// is not lost.
#[cfg(unix)]
fn listen_for_signals(cancel: watch::Sender<bool>) -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => tracing::info!("received SIGINT"),
            _ = terminate.recv() => tracing::info!("received SIGTERM"),
        }
        let _ = cancel.send(true);
    });
    Ok(())
}

#[cfg(not(unix))]
fn listen_for_signals(cancel: watch::Sender<bool>) -> io::Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl-C");
            let _ = cancel.send(true);
        }
    });
    Ok(())
}

/// Spawns the task that forwards raw input to the reactor.
fn spawn_input_poller(events: EventSender) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !events.is_closed() {
            match crossterm::event::poll(INPUT_POLL_INTERVAL) {
                Ok(false) => {}
                Ok(true) => match crossterm::event::read() {
                    Ok(event) => {
                        if !events.send(Event::Input(event)) {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("failed to read input: {}", e);
                        break;
                    }
                },
                Err(e) => {
                    tracing::warn!("failed to poll input: {}", e);
                    break;
                }
            }
        }

        tracing::debug!("Input poller finished");
    })
}
