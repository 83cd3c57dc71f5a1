//! MQTT-backed publish sink.

use crate::dispatch::{PublishSink, TransportError};
use log::debug;
use rumqttc::{Client, Event, MqttOptions, Outgoing, QoS};
use std::time::Duration;

const MQTT_PORT: u16 = 1883;
const KEEP_ALIVE: Duration = Duration::from_secs(5);

/// Publishes each message over a fresh, short-lived broker connection.
///
/// One call is one self-contained connect-publish-disconnect exchange at
/// QoS 0: fire-and-forget, no persistent connection state, no retry. A
/// failure anywhere in the exchange is a [`TransportError`] and terminal for
/// the caller.
pub struct MqttPublisher {
    client_id: String,
}

impl MqttPublisher {
    /// Creates a publisher with a per-process unique client id.
    pub fn new() -> Self {
        Self {
            client_id: format!("mqtt-button-{}", std::process::id()),
        }
    }
}

impl Default for MqttPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishSink for MqttPublisher {
    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        hostname: &str,
    ) -> Result<(), TransportError> {
        let mut options = MqttOptions::new(&self.client_id, hostname, MQTT_PORT);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut connection) = Client::new(options, 10);

        // Requests are processed in order: connect, publish, disconnect.
        client
            .publish(topic, QoS::AtMostOnce, false, payload.to_owned())
            .map_err(|err| TransportError::Rejected(err.to_string()))?;
        client
            .disconnect()
            .map_err(|err| TransportError::Rejected(err.to_string()))?;

        // Drive the connection until the disconnect goes out, so the publish
        // is actually on the wire before this call returns.
        for notification in connection.iter() {
            match notification {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(event) => debug!("mqtt event: {:?}", event),
                Err(err) => return Err(TransportError::Connection(err.to_string())),
            }
        }

        Ok(())
    }
}
