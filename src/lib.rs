#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`EdgeEvent`**: One debounced logical button transition with a timestamp
//! - **`EdgeKind`**: Whether a transition is a press or a release
//! - **`SignalSource`**: Trait producing edge events from hardware or a simulated stand-in
//! - **`GpioButton`** / **`SimulatedButton`**: The two source backends
//! - **`MessageMapping`**: Fixed single payload, or distinct payloads per edge kind
//! - **`DispatchConfig`**: Immutable policy (topic, host, polarity, optional interval, mapping)
//! - **`EventDispatcher`**: The state machine turning edges into publish calls
//! - **`PublishSink`**: Trait to implement for your outbound transport
//! - **`Clock`**: Trait to implement for your timing system
//!
//! The dispatcher is deliberately transport- and hardware-agnostic: wire up
//! [`GpioButton`] and [`MqttPublisher`] for a real deployment, or scripted
//! sources and recording sinks for tests.

pub mod clock;
pub mod dispatch;
pub mod event;
pub mod gpio;
pub mod mqtt;
pub mod source;

pub use clock::{Clock, SystemClock};
pub use dispatch::{DispatchError, DispatcherState, EventDispatcher, PublishSink, TransportError};
pub use event::{ConfigError, DispatchConfig, EdgeEvent, EdgeKind, MessageMapping};
pub use gpio::{GpioButton, HardwareUnavailable};
pub use mqtt::MqttPublisher;
pub use source::{SignalSource, SimulatedButton, SourceError, WaitMode};
