// THEORY:
// The `mqtt` module is the one concrete `PubSubClient`: a thin wrapper over
// rumqttc's async client. The transport's event loop runs in its own tokio
// task and owns reconnect behavior; the engine never waits on the broker.
//
// `publish` uses the non-blocking `try_publish` so a slow or absent broker
// can never stall a source's scheduling loop. A full outgoing queue surfaces
// as `PublishError::TransportDown`, which the discovery layer logs and moves
// past.

use std::time::Duration;

use rumqttc::{AsyncClient, ClientError, Event, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::MqttConfig;
use crate::discovery::PubSubClient;
use crate::errors::PublishError;

const OUTGOING_QUEUE_CAPACITY: usize = 64;
const RECONNECT_PAUSE: Duration = Duration::from_secs(5);

/// A `PubSubClient` backed by an MQTT broker connection.
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Builds the client and spawns its event-loop task. The task keeps
    /// polling (and thereby reconnecting) until the process exits.
    pub fn connect(config: &MqttConfig, client_id: &str) -> (Self, JoinHandle<()>) {
        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(60));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, OUTGOING_QUEUE_CAPACITY);
        let host = config.host.clone();
        let port = config.port;
        let handle = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        debug!(%host, port, "connected to MQTT broker");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(%host, port, error = %e, "MQTT connection error; retrying");
                        tokio::time::sleep(RECONNECT_PAUSE).await;
                    }
                }
            }
        });

        (Self { client }, handle)
    }
}

impl PubSubClient for MqttPublisher {
    fn publish(&self, topic: &str, payload: &[u8], retained: bool) -> Result<(), PublishError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retained, payload)
            .map_err(|e| match e {
                ClientError::TryRequest(_) => PublishError::TransportDown,
                other => PublishError::Rejected(other.to_string()),
            })
    }
}
