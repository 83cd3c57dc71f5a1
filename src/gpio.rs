//! Hardware-backed signal source for a button on a GPIO pin.

use crate::event::{EdgeEvent, EdgeKind};
use crate::source::{SignalSource, SourceError, WaitMode};
use log::{debug, info};
use rppal::gpio::{Gpio, InputPin, Level};
use std::time::{Duration, Instant};

/// Polling cadence while waiting for a level change.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a new level must hold before it counts as a transition.
const SETTLE_TIME: Duration = Duration::from_millis(20);

/// The GPIO pin could not be acquired.
///
/// Raised at construction time only: an invalid pin number, a pin already
/// claimed by another process, or missing permissions on the GPIO character
/// device. Fatal, never retried.
#[derive(Debug)]
pub struct HardwareUnavailable {
    pin: u8,
    source: rppal::gpio::Error,
}

impl core::fmt::Display for HardwareUnavailable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GPIO pin {} unavailable: {}", self.pin, self.source)
    }
}

impl std::error::Error for HardwareUnavailable {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Momentary button on a GPIO pin, wired to ground with the internal pull-up
/// enabled: a closed circuit reads low and means pressed.
///
/// Debouncing is done here and is opaque to callers: a candidate transition
/// must still read the same level after [`SETTLE_TIME`], otherwise it is
/// treated as contact bounce and discarded. One physical transition therefore
/// yields exactly one [`EdgeEvent`].
pub struct GpioButton {
    pin: InputPin,
    number: u8,
    last: Level,
    started: Instant,
}

impl GpioButton {
    /// Claims the given pin as a pull-up input.
    ///
    /// The pin handle is owned exclusively for the process lifetime.
    ///
    /// # Returns
    /// * `Ok(button)` - Pin acquired, initial level sampled
    /// * `Err(HardwareUnavailable)` - Acquisition failed; fatal
    pub fn new(pin_number: u8) -> Result<Self, HardwareUnavailable> {
        let wrap = |source| HardwareUnavailable {
            pin: pin_number,
            source,
        };

        let gpio = Gpio::new().map_err(wrap)?;
        let pin = gpio.get(pin_number).map_err(wrap)?.into_input_pullup();
        let last = pin.read();

        info!("GPIO pin {} claimed, initial level {:?}", pin_number, last);

        Ok(Self {
            pin,
            number: pin_number,
            last,
            started: Instant::now(),
        })
    }

    fn kind_for(level: Level) -> EdgeKind {
        // Pull-up wiring: pressed pulls the pin to ground.
        match level {
            Level::Low => EdgeKind::Pressed,
            Level::High => EdgeKind::Released,
        }
    }
}

impl SignalSource for GpioButton {
    fn wait_for_edge(&mut self, mode: WaitMode) -> Result<EdgeEvent, SourceError> {
        loop {
            std::thread::sleep(POLL_INTERVAL);

            let level = self.pin.read();
            if level == self.last {
                continue;
            }

            // Settle check: bounce reverts before the settle window ends.
            std::thread::sleep(SETTLE_TIME);
            if self.pin.read() != level {
                debug!("discarded bounce on GPIO pin {}", self.number);
                continue;
            }

            self.last = level;
            let kind = Self::kind_for(level);
            if mode.accepts(kind) {
                return Ok(EdgeEvent::new(kind, self.started.elapsed()));
            }
            debug!("ignored {} edge while waiting for {:?}", kind, mode);
        }
    }
}
