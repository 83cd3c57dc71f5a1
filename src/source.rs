//! Signal source abstraction and the simulated-input backend.
//!
//! A [`SignalSource`] produces a lazy, infinite stream of debounced
//! [`EdgeEvent`]s, hiding whether they come from real hardware
//! ([`GpioButton`](crate::gpio::GpioButton)) or from an operator at a
//! keyboard ([`SimulatedButton`]). The dispatcher never branches on the
//! backing mode.

use crate::event::{EdgeEvent, EdgeKind};
use std::io::{BufRead, BufReader, Stdin, Stdout, Write};
use std::time::Instant;

/// Which physical transition(s) a wait call should return on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Block until the button transitions to pressed.
    Press,

    /// Block until the button transitions to released.
    Release,

    /// Block until the next transition of either kind.
    Either,
}

impl WaitMode {
    /// Returns true if an edge of this kind satisfies the wait.
    #[inline]
    pub fn accepts(self, kind: EdgeKind) -> bool {
        match self {
            WaitMode::Press => kind == EdgeKind::Pressed,
            WaitMode::Release => kind == EdgeKind::Released,
            WaitMode::Either => true,
        }
    }
}

/// Errors produced while waiting for an edge.
#[derive(Debug)]
pub enum SourceError {
    /// The simulated trigger input was closed (end of input).
    Disconnected,

    /// Reading the trigger input failed.
    Io(std::io::Error),
}

impl core::fmt::Display for SourceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SourceError::Disconnected => write!(f, "trigger input closed"),
            SourceError::Io(err) => write!(f, "trigger input read failed: {}", err),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Disconnected => None,
            SourceError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err)
    }
}

/// Trait for abstracting the physical or simulated button.
///
/// Implementations own debouncing: one physical transition must never yield
/// two events. The stream is non-restartable and conceptually infinite; an
/// error is terminal.
pub trait SignalSource {
    /// Blocks until the next qualifying transition, then returns exactly one
    /// event.
    ///
    /// Transitions that do not satisfy `mode` are consumed and ignored.
    fn wait_for_edge(&mut self, mode: WaitMode) -> Result<EdgeEvent, SourceError>;
}

/// Simulated button driven by operator input instead of hardware.
///
/// Each wait is satisfied by one line on the trigger input (the operator
/// confirming "ready"), producing exactly one event of the expected kind.
/// With [`WaitMode::Either`] the produced kind alternates, starting with a
/// press, mirroring how a real button behaves.
///
/// # Type Parameters
/// * `R` - Trigger input (stdin in production, a cursor in tests)
/// * `W` - Prompt output
pub struct SimulatedButton<R: BufRead, W: Write> {
    input: R,
    output: W,
    state: EdgeKind,
    started: Instant,
}

impl SimulatedButton<BufReader<Stdin>, Stdout> {
    /// Creates a simulated button reading triggers from standard input.
    pub fn from_stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> SimulatedButton<R, W> {
    /// Creates a simulated button over an arbitrary trigger input and prompt
    /// output.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            state: EdgeKind::Released,
            started: Instant::now(),
        }
    }

    fn prompt(&mut self, kind: EdgeKind) -> Result<(), SourceError> {
        let verb = match kind {
            EdgeKind::Pressed => "press",
            EdgeKind::Released => "release",
        };
        writeln!(self.output, "[simulated] hit enter to {} the button", verb)?;
        self.output.flush()?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> SignalSource for SimulatedButton<R, W> {
    fn wait_for_edge(&mut self, mode: WaitMode) -> Result<EdgeEvent, SourceError> {
        let kind = match mode {
            WaitMode::Press => EdgeKind::Pressed,
            WaitMode::Release => EdgeKind::Released,
            WaitMode::Either => self.state.opposite(),
        };

        self.prompt(kind)?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(SourceError::Disconnected);
        }

        self.state = kind;
        Ok(EdgeEvent::new(kind, self.started.elapsed()))
    }
}
