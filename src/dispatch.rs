//! Event dispatcher with state management and publish policy.
//!
//! Provides [`EventDispatcher`] which converts edge events from a
//! [`SignalSource`] into outbound messages on a [`PublishSink`], handling
//! polarity, payload selection and optional interval gating. Also defines the
//! [`PublishSink`] trait for transport abstraction.

use crate::clock::Clock;
use crate::event::DispatchConfig;
use crate::source::{SignalSource, SourceError};
use log::info;
use std::convert::Infallible;

/// Trait for abstracting the outbound message transport.
///
/// Implement this for your transport (MQTT, a test recorder, etc.). The call
/// is synchronous and best-effort: there is no batching, no acknowledgement
/// tracking and no retry above this seam.
pub trait PublishSink {
    /// Publishes one payload to the given topic on the given broker host.
    fn publish(&mut self, topic: &str, payload: &str, hostname: &str)
    -> Result<(), TransportError>;
}

/// Errors raised by a publish call.
///
/// Always terminal: the dispatcher neither catches nor retries transport
/// failures. The system assumes a reachable broker and treats connectivity
/// loss as an operational incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The broker connection failed or was lost mid-publish.
    Connection(String),

    /// The client rejected the publish request.
    Rejected(String),
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransportError::Connection(reason) => {
                write!(f, "broker connection failed: {}", reason)
            }
            TransportError::Rejected(reason) => {
                write!(f, "publish rejected: {}", reason)
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// The current state of an event dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Waiting for the next qualifying edge.
    Idle,

    /// Resolving a payload and publishing it.
    Dispatching,
}

/// Errors that terminate the dispatch loop.
#[derive(Debug)]
pub enum DispatchError {
    /// The signal source failed or its input closed.
    Source(SourceError),

    /// A publish call failed.
    Transport(TransportError),
}

impl core::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DispatchError::Source(err) => write!(f, "signal source failed: {}", err),
            DispatchError::Transport(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Source(err) => Some(err),
            DispatchError::Transport(err) => Some(err),
        }
    }
}

impl From<SourceError> for DispatchError {
    fn from(err: SourceError) -> Self {
        DispatchError::Source(err)
    }
}

impl From<TransportError> for DispatchError {
    fn from(err: TransportError) -> Self {
        DispatchError::Transport(err)
    }
}

/// Converts edge events into outbound messages.
///
/// Owns the signal source and the publish sink and drives them strictly
/// sequentially: one edge is fully processed (payload resolved, published,
/// optionally interval-gated) before the next wait begins. Which edges are
/// waited for and which payload each resolves to is fixed by the
/// [`DispatchConfig`] at construction; the dispatcher itself is stateless
/// beyond the idle/dispatching distinction.
///
/// With a fixed mapping this is the classic wait-publish-sleep loop; with a
/// per-edge mapping it waits on either transition and publishes the payload
/// mapped to the kind that fired.
///
/// # Type Parameters
/// * `'c` - Lifetime of the clock reference
/// * `S` - Signal source implementation type
/// * `P` - Publish sink implementation type
/// * `C` - Clock implementation type
pub struct EventDispatcher<'c, S: SignalSource, P: PublishSink, C: Clock> {
    source: S,
    sink: P,
    clock: &'c C,
    config: DispatchConfig,
    state: DispatcherState,
}

impl<'c, S: SignalSource, P: PublishSink, C: Clock> EventDispatcher<'c, S, P, C> {
    /// Creates an idle dispatcher.
    pub fn new(source: S, sink: P, clock: &'c C, config: DispatchConfig) -> Self {
        Self {
            source,
            sink,
            clock,
            config,
            state: DispatcherState::Idle,
        }
    }

    /// Returns the current state of the dispatcher.
    pub fn get_state(&self) -> DispatcherState {
        self.state
    }

    /// Returns the dispatch configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Waits for the next qualifying edge and publishes its payload.
    ///
    /// Blocks on the source, resolves the payload for the edge kind that
    /// fired, publishes it, then sleeps for the configured interval if one is
    /// set. Edges occurring during that sleep are missed by design: the
    /// interval is a rate limiter, not a debounce.
    ///
    /// # Returns
    /// * `Ok(())` - One edge processed, dispatcher back to idle
    /// * `Err(DispatchError)` - Source or transport failure; terminal
    pub fn dispatch_next(&mut self) -> Result<(), DispatchError> {
        let event = self.source.wait_for_edge(self.config.wait_mode())?;
        self.state = DispatcherState::Dispatching;

        let payload = self.config.mapping.payload_for(event.kind);
        info!(
            "registered {} at {:.3}s, publishing to {}",
            event.kind,
            event.at.as_secs_f64(),
            self.config.topic
        );
        self.sink
            .publish(&self.config.topic, payload, &self.config.hostname)?;

        if let Some(interval) = self.config.interval {
            self.clock.sleep(interval);
        }

        self.state = DispatcherState::Idle;
        Ok(())
    }

    /// Runs the dispatch loop until a terminal failure.
    ///
    /// Normal operation never returns; the `Infallible` success type records
    /// that the only way out is an error.
    pub fn run(&mut self) -> Result<Infallible, DispatchError> {
        loop {
            self.dispatch_next()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EdgeEvent, EdgeKind, MessageMapping};
    use crate::source::WaitMode;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    // Mock clock with controllable virtual time. Sleeping advances it.
    struct MockClock {
        now: Cell<Duration>,
    }

    impl MockClock {
        fn new() -> Self {
            Self {
                now: Cell::new(Duration::ZERO),
            }
        }
    }

    impl Clock for MockClock {
        fn sleep(&self, duration: Duration) {
            self.now.set(self.now.get() + duration);
        }
    }

    // Scripted source replaying a fixed physical transition sequence against
    // the mock clock. An edge timestamped before the current virtual time
    // occurred while the dispatcher was asleep and is missed, exactly like a
    // real edge firing during the post-publish sleep.
    struct ScriptedSource<'a> {
        events: VecDeque<EdgeEvent>,
        clock: &'a MockClock,
    }

    impl<'a> ScriptedSource<'a> {
        fn new(clock: &'a MockClock, script: &[(u64, EdgeKind)]) -> Self {
            Self {
                events: script
                    .iter()
                    .map(|&(secs, kind)| EdgeEvent::new(kind, Duration::from_secs(secs)))
                    .collect(),
                clock,
            }
        }
    }

    impl SignalSource for ScriptedSource<'_> {
        fn wait_for_edge(&mut self, mode: WaitMode) -> Result<EdgeEvent, SourceError> {
            while let Some(event) = self.events.pop_front() {
                if event.at < self.clock.now.get() {
                    continue; // fired while the dispatcher was not waiting
                }
                if !mode.accepts(event.kind) {
                    continue; // wrong edge for a blocking single-kind wait
                }
                self.clock.now.set(event.at);
                return Ok(event);
            }
            Err(SourceError::Disconnected)
        }
    }

    type Call = (String, String, String);

    // Recording sink; the shared handle survives the dispatcher taking
    // ownership of the sink itself.
    struct RecordingSink {
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl RecordingSink {
        fn new() -> (Self, Rc<RefCell<Vec<Call>>>) {
            let calls = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    calls: Rc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl PublishSink for RecordingSink {
        fn publish(
            &mut self,
            topic: &str,
            payload: &str,
            hostname: &str,
        ) -> Result<(), TransportError> {
            self.calls
                .borrow_mut()
                .push((topic.into(), payload.into(), hostname.into()));
            Ok(())
        }
    }

    // Sink that always fails, counting attempts.
    struct FailingSink {
        attempts: Rc<Cell<usize>>,
    }

    impl FailingSink {
        fn new() -> (Self, Rc<Cell<usize>>) {
            let attempts = Rc::new(Cell::new(0));
            (
                Self {
                    attempts: Rc::clone(&attempts),
                },
                attempts,
            )
        }
    }

    impl PublishSink for FailingSink {
        fn publish(&mut self, _: &str, _: &str, _: &str) -> Result<(), TransportError> {
            self.attempts.set(self.attempts.get() + 1);
            Err(TransportError::Connection("connection refused".into()))
        }
    }

    fn fixed_config(payload: &str, inverted: bool, interval_secs: Option<u64>) -> DispatchConfig {
        DispatchConfig::new(
            "/home/button",
            "broker.local",
            MessageMapping::fixed(payload),
            inverted,
            interval_secs.map(Duration::from_secs),
        )
        .unwrap()
    }

    fn per_edge_config(inverted: bool) -> DispatchConfig {
        DispatchConfig::new(
            "/home/button",
            "broker.local",
            MessageMapping::per_edge("PRESSED", "RELEASED"),
            inverted,
            None,
        )
        .unwrap()
    }

    #[test]
    fn single_press_publishes_exactly_one_message() {
        let clock = MockClock::new();
        let source = ScriptedSource::new(&clock, &[(0, EdgeKind::Pressed)]);
        let (sink, calls) = RecordingSink::new();
        let mut dispatcher =
            EventDispatcher::new(source, sink, &clock, fixed_config("PRESSED", false, None));

        dispatcher.dispatch_next().unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![(
                "/home/button".to_string(),
                "PRESSED".to_string(),
                "broker.local".to_string()
            )]
        );
    }

    #[test]
    fn fixed_mapping_ignores_the_inactive_edge() {
        let clock = MockClock::new();
        // A release fires first; the non-inverted fixed variant must skip it.
        let source = ScriptedSource::new(
            &clock,
            &[(0, EdgeKind::Released), (1, EdgeKind::Pressed)],
        );
        let (sink, calls) = RecordingSink::new();
        let mut dispatcher =
            EventDispatcher::new(source, sink, &clock, fixed_config("PING", false, None));

        let err = dispatcher.run().unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Source(SourceError::Disconnected)
        ));
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(calls.borrow()[0].1, "PING");
    }

    #[test]
    fn inverted_fixed_mapping_triggers_on_release() {
        let clock = MockClock::new();
        let source = ScriptedSource::new(
            &clock,
            &[(0, EdgeKind::Pressed), (1, EdgeKind::Released)],
        );
        let (sink, calls) = RecordingSink::new();
        let mut dispatcher =
            EventDispatcher::new(source, sink, &clock, fixed_config("PING", true, None));

        let _ = dispatcher.run();

        // The press is consumed and ignored; only the release publishes.
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn per_edge_mapping_publishes_both_payloads() {
        let clock = MockClock::new();
        let source = ScriptedSource::new(
            &clock,
            &[(0, EdgeKind::Pressed), (1, EdgeKind::Released)],
        );
        let (sink, calls) = RecordingSink::new();
        let mut dispatcher = EventDispatcher::new(source, sink, &clock, per_edge_config(false));

        let _ = dispatcher.run();

        let payloads: Vec<String> = calls.borrow().iter().map(|c| c.1.clone()).collect();
        assert_eq!(payloads, vec!["PRESSED", "RELEASED"]);
    }

    #[test]
    fn inverted_per_edge_mapping_swaps_payloads() {
        let clock = MockClock::new();
        let source = ScriptedSource::new(
            &clock,
            &[(0, EdgeKind::Pressed), (1, EdgeKind::Released)],
        );
        let (sink, calls) = RecordingSink::new();
        let mut dispatcher = EventDispatcher::new(source, sink, &clock, per_edge_config(true));

        let _ = dispatcher.run();

        // A physical press carries the payload configured for release.
        let payloads: Vec<String> = calls.borrow().iter().map(|c| c.1.clone()).collect();
        assert_eq!(payloads, vec!["RELEASED", "PRESSED"]);
    }

    #[test]
    fn interval_gating_misses_edges_during_sleep() {
        let clock = MockClock::new();
        // Presses at 0s, 10s and 40s with a 30s interval: the 10s edge fires
        // inside the post-publish sleep and must be missed.
        let source = ScriptedSource::new(
            &clock,
            &[
                (0, EdgeKind::Pressed),
                (1, EdgeKind::Released),
                (10, EdgeKind::Pressed),
                (11, EdgeKind::Released),
                (40, EdgeKind::Pressed),
            ],
        );
        let (sink, calls) = RecordingSink::new();
        let mut dispatcher =
            EventDispatcher::new(source, sink, &clock, fixed_config("PING", false, Some(30)));

        let _ = dispatcher.run();

        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn edge_at_exact_interval_boundary_publishes() {
        let clock = MockClock::new();
        let source = ScriptedSource::new(
            &clock,
            &[(0, EdgeKind::Pressed), (30, EdgeKind::Pressed)],
        );
        let (sink, calls) = RecordingSink::new();
        let mut dispatcher =
            EventDispatcher::new(source, sink, &clock, fixed_config("PING", false, Some(30)));

        let _ = dispatcher.run();

        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn transport_error_terminates_without_another_wait() {
        let clock = MockClock::new();
        // Two qualifying edges are scripted; a loop that survived the failed
        // publish would attempt a second one.
        let source = ScriptedSource::new(
            &clock,
            &[(0, EdgeKind::Pressed), (1, EdgeKind::Pressed)],
        );
        let (sink, attempts) = FailingSink::new();
        let mut dispatcher =
            EventDispatcher::new(source, sink, &clock, fixed_config("PING", false, None));

        let err = dispatcher.run().unwrap_err();

        assert!(matches!(err, DispatchError::Transport(_)));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn replaying_a_sequence_is_deterministic() {
        let script = [
            (0, EdgeKind::Pressed),
            (2, EdgeKind::Released),
            (5, EdgeKind::Pressed),
            (9, EdgeKind::Released),
        ];

        let run_once = || {
            let clock = MockClock::new();
            let source = ScriptedSource::new(&clock, &script);
            let (sink, calls) = RecordingSink::new();
            let mut dispatcher = EventDispatcher::new(source, sink, &clock, per_edge_config(false));
            let _ = dispatcher.run();
            calls.borrow().clone()
        };

        assert_eq!(run_once(), run_once());
    }

    #[test]
    fn dispatcher_returns_to_idle_after_each_edge() {
        let clock = MockClock::new();
        let source = ScriptedSource::new(&clock, &[(0, EdgeKind::Pressed)]);
        let (sink, _calls) = RecordingSink::new();
        let mut dispatcher =
            EventDispatcher::new(source, sink, &clock, fixed_config("PING", false, None));

        assert_eq!(dispatcher.get_state(), DispatcherState::Idle);
        dispatcher.dispatch_next().unwrap();
        assert_eq!(dispatcher.get_state(), DispatcherState::Idle);
    }

    #[test]
    fn exhausted_source_stops_the_loop() {
        let clock = MockClock::new();
        let source = ScriptedSource::new(&clock, &[]);
        let (sink, calls) = RecordingSink::new();
        let mut dispatcher =
            EventDispatcher::new(source, sink, &clock, fixed_config("PING", false, None));

        let err = dispatcher.run().unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Source(SourceError::Disconnected)
        ));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn failed_source_acquisition_never_reaches_the_sink() {
        let clock = MockClock::new();
        let (sink, calls) = RecordingSink::new();

        // Mirrors the binary's composition order: the source is acquired
        // first, and a dispatcher only exists if acquisition succeeded.
        let source: Result<ScriptedSource<'_>, SourceError> = Err(SourceError::Disconnected);
        let dispatcher = source.map(|source| {
            EventDispatcher::new(source, sink, &clock, fixed_config("PING", false, None))
        });

        assert!(dispatcher.is_err());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn error_messages_format_correctly_for_display() {
        let transport = DispatchError::Transport(TransportError::Connection("refused".into()));
        assert!(format!("{}", transport).contains("refused"));

        let source = DispatchError::Source(SourceError::Disconnected);
        let text = format!("{}", source);
        assert!(text.contains("signal source"));
        assert!(text.contains("closed"));
    }
}
