//! Core types for edge events and dispatch configuration.

use std::time::Duration;

/// The logical kind of a button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The button transitioned to pressed (circuit closed).
    Pressed,

    /// The button transitioned to released (circuit open).
    Released,
}

impl EdgeKind {
    /// Returns the opposite transition kind.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            EdgeKind::Pressed => EdgeKind::Released,
            EdgeKind::Released => EdgeKind::Pressed,
        }
    }
}

impl core::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EdgeKind::Pressed => write!(f, "pressed"),
            EdgeKind::Released => write!(f, "released"),
        }
    }
}

/// A single debounced button transition.
///
/// Produced exactly once per logical transition by a
/// [`SignalSource`](crate::source::SignalSource). `at` is the offset since
/// the source was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Which transition occurred.
    pub kind: EdgeKind,

    /// When it occurred, relative to source construction.
    pub at: Duration,
}

impl EdgeEvent {
    /// Creates a new edge event.
    #[inline]
    pub fn new(kind: EdgeKind, at: Duration) -> Self {
        Self { kind, at }
    }
}

/// Mapping from edge kind to outbound message payload.
///
/// Fixed at configuration time and read-only thereafter. Resolution is total:
/// every [`EdgeKind`] the dispatcher can react to has a payload by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageMapping {
    /// One payload, published for the active edge only.
    Fixed(String),

    /// Distinct payloads for press and release.
    PerEdge {
        /// Payload published on a press.
        pressed: String,
        /// Payload published on a release.
        released: String,
    },
}

impl MessageMapping {
    /// Creates a fixed single-payload mapping.
    pub fn fixed(payload: impl Into<String>) -> Self {
        MessageMapping::Fixed(payload.into())
    }

    /// Creates a per-edge mapping with distinct press and release payloads.
    pub fn per_edge(pressed: impl Into<String>, released: impl Into<String>) -> Self {
        MessageMapping::PerEdge {
            pressed: pressed.into(),
            released: released.into(),
        }
    }

    /// Resolves the payload for an edge kind.
    pub fn payload_for(&self, kind: EdgeKind) -> &str {
        match self {
            MessageMapping::Fixed(payload) => payload,
            MessageMapping::PerEdge { pressed, released } => match kind {
                EdgeKind::Pressed => pressed,
                EdgeKind::Released => released,
            },
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// An interval was configured together with a per-edge mapping.
    ///
    /// Interval gating only applies to the single-payload variant; the
    /// dual-edge variant publishes on every transition.
    IntervalWithPerEdgeMapping,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::IntervalWithPerEdgeMapping => {
                write!(
                    f,
                    "a repeat interval requires a single fixed message (per-edge \
                     payloads publish on every transition)"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Immutable dispatch configuration.
///
/// Constructed once from process entry parameters and owned by the
/// [`EventDispatcher`](crate::dispatch::EventDispatcher) for its lifetime.
///
/// Polarity inversion is applied here, exactly once: a per-edge mapping has
/// its payloads swapped at construction, so a physical press publishes the
/// payload logically associated with a release and vice versa. For a fixed
/// mapping, inversion instead selects which physical edge is the active
/// trigger (see [`DispatchConfig::wait_mode`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// MQTT topic to publish to.
    pub topic: String,

    /// Hostname of the MQTT broker.
    pub hostname: String,

    /// Whether button polarity is inverted (closed circuit == released).
    pub inverted: bool,

    /// Optional rate limit: sleep this long after each publish.
    pub interval: Option<Duration>,

    /// Edge-to-payload mapping, with inversion already applied.
    pub mapping: MessageMapping,
}

impl DispatchConfig {
    /// Creates a validated configuration.
    ///
    /// # Returns
    /// * `Ok(config)` - Valid configuration, inversion applied to the mapping
    /// * `Err(ConfigError)` - `interval` was combined with a per-edge mapping
    pub fn new(
        topic: impl Into<String>,
        hostname: impl Into<String>,
        mapping: MessageMapping,
        inverted: bool,
        interval: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let mapping = match mapping {
            MessageMapping::PerEdge { pressed, released } => {
                if interval.is_some() {
                    return Err(ConfigError::IntervalWithPerEdgeMapping);
                }
                if inverted {
                    // Swap once, here. Never re-inverted per event.
                    MessageMapping::PerEdge {
                        pressed: released,
                        released: pressed,
                    }
                } else {
                    MessageMapping::PerEdge { pressed, released }
                }
            }
            fixed => fixed,
        };

        Ok(Self {
            topic: topic.into(),
            hostname: hostname.into(),
            inverted,
            interval,
            mapping,
        })
    }

    /// Which edge(s) the dispatcher should wait for.
    ///
    /// A fixed mapping reacts to the active edge only (press, or release when
    /// inverted). A per-edge mapping reacts to both.
    pub fn wait_mode(&self) -> crate::source::WaitMode {
        use crate::source::WaitMode;

        match self.mapping {
            MessageMapping::Fixed(_) => {
                if self.inverted {
                    WaitMode::Release
                } else {
                    WaitMode::Press
                }
            }
            MessageMapping::PerEdge { .. } => WaitMode::Either,
        }
    }
}
