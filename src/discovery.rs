// THEORY:
// The `discovery` module turns metric batches into the two message kinds an
// automation platform consumes: retained discovery-config messages that say
// "this sensor exists", and retained state messages that carry its current
// value.
//
// Key architectural principles:
// 1.  **Announce once**: a sensor's discovery config is published at most
//     once per process lifetime. The `announced` set is the only shared
//     mutable state between source loops, and it sits behind a Mutex
//     because "check then insert" must be atomic under concurrent runs.
// 2.  **State every run**: every successfully computed metric publishes a
//     retained state message, so consumers restarting later still see the
//     last known value via broker retention.
// 3.  **Publish failures are terminal for the message only**: a failed
//     discovery publish does not un-announce the sensor (avoiding republish
//     storms) and a failed state publish is not retried (retention carries
//     the previous value).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::DeviceConfig;
use crate::core_modules::metric::{slugify, MetricBatch, SensorIdentity};
use crate::core_modules::processor::ImageProcessor;
use crate::core_modules::region::RegionLabel;
use crate::errors::PublishError;

/// The pub/sub capability the discovery layer consumes. Implementations
/// must tolerate concurrent `publish` calls from independent source loops.
pub trait PubSubClient: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8], retained: bool) -> Result<(), PublishError>;
}

/// The JSON body of a discovery-config message.
#[derive(Serialize)]
struct DiscoveryConfig<'a> {
    name: String,
    unique_id: &'a str,
    state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    device: DeviceBlock<'a>,
}

#[derive(Serialize)]
struct DeviceBlock<'a> {
    identifiers: [&'a str; 1],
    name: String,
    model: &'a str,
    manufacturer: &'a str,
}

/// Publishes discovery and state messages for metric batches.
pub struct DiscoveryPublisher {
    client: Arc<dyn PubSubClient>,
    discovery_prefix: String,
    device: DeviceConfig,
    announced: Mutex<HashSet<SensorIdentity>>,
}

impl DiscoveryPublisher {
    pub fn new(client: Arc<dyn PubSubClient>, discovery_prefix: String, device: DeviceConfig) -> Self {
        Self {
            client,
            discovery_prefix,
            device,
            announced: Mutex::new(HashSet::new()),
        }
    }

    /// The per-source device identifier ("greenwatch_cam_left").
    pub fn device_id(&self, source_name: &str) -> String {
        format!("{}_{}", self.device.prefix, slugify(source_name))
    }

    /// The per-source device display name ("Greenwatch Cam Left").
    pub fn device_name(&self, source_name: &str) -> String {
        format!("{} {}", self.device.title, source_name)
    }

    fn config_topic(&self, device_id: &str, identity: &SensorIdentity) -> String {
        format!(
            "{}/sensor/{}/{}/config",
            self.discovery_prefix, device_id, identity
        )
    }

    fn state_topic(&self, device_id: &str, identity: &SensorIdentity) -> String {
        format!(
            "{}/sensor/{}/{}/state",
            self.discovery_prefix, device_id, identity
        )
    }

    /// Publishes the retained discovery config for one sensor, at most once
    /// per process lifetime. Returns whether a message was sent.
    fn announce(
        &self,
        source_name: &str,
        processor_name: &str,
        region: RegionLabel,
        metric_key: &str,
        display_name: &str,
        unit: Option<&str>,
        icon: Option<&str>,
    ) -> bool {
        let device_id = self.device_id(source_name);
        let identity = SensorIdentity::derive(&device_id, processor_name, region, metric_key);

        {
            let mut announced = self.announced.lock().expect("announced set poisoned");
            if !announced.insert(identity.clone()) {
                return false;
            }
        }

        let sensor_name = match region.slug() {
            None => format!("{} {}", source_name, display_name),
            Some(_) => format!("{} {} {}", source_name, region.display(), display_name),
        };
        let config = DiscoveryConfig {
            name: sensor_name,
            unique_id: identity.as_str(),
            state_topic: self.state_topic(&device_id, &identity),
            unit_of_measurement: unit,
            icon,
            device: DeviceBlock {
                identifiers: [device_id.as_str()],
                name: self.device_name(source_name),
                model: &self.device.model,
                manufacturer: &self.device.manufacturer,
            },
        };

        let topic = self.config_topic(&device_id, &identity);
        let payload = serde_json::to_vec(&config).expect("discovery config serializes");
        match self.client.publish(&topic, &payload, true) {
            Ok(()) => {
                info!(sensor = %identity, "announced sensor");
            }
            Err(e) => {
                // The identity stays announced; republishing on every run
                // would flood the broker without fixing the transport.
                error!(sensor = %identity, error = %e, "failed to publish discovery config");
            }
        }
        true
    }

    /// Announces every sensor one processor can emit for one source, before
    /// any image has been processed.
    pub fn announce_processor(&self, source_name: &str, processor: &dyn ImageProcessor) {
        let regions: Vec<RegionLabel> = if processor.quadrants() {
            RegionLabel::quadrants().to_vec()
        } else {
            vec![RegionLabel::Full]
        };
        for region in regions {
            for descriptor in processor.describe_sensors() {
                self.announce(
                    source_name,
                    processor.name(),
                    region,
                    descriptor.key,
                    descriptor.display_name,
                    descriptor.unit,
                    descriptor.icon,
                );
            }
        }
    }

    /// Publishes the state of every metric in a batch, lazily announcing any
    /// sensor that was not pre-registered.
    pub fn publish_batch(&self, source_name: &str, batch: &MetricBatch) {
        let device_id = self.device_id(source_name);
        for entry in &batch.entries {
            // Fallback path for sensors without an up-front descriptor; the
            // display name is derived from the metric key.
            self.announce(
                source_name,
                &entry.processor_name,
                entry.region,
                &entry.metric.key,
                &title_case(&entry.metric.key),
                entry.metric.unit.as_deref(),
                None,
            );

            let identity = SensorIdentity::derive(
                &device_id,
                &entry.processor_name,
                entry.region,
                &entry.metric.key,
            );
            let topic = self.state_topic(&device_id, &identity);
            let payload = entry.metric.format_value();
            match self.client.publish(&topic, payload.as_bytes(), true) {
                Ok(()) => {
                    debug!(sensor = %identity, value = %payload, "published state");
                }
                Err(e) => {
                    // Not retried; the broker retains the previous value.
                    error!(sensor = %identity, error = %e, "failed to publish state");
                }
            }
        }
    }
}

/// "green_pixels" -> "Green Pixels".
fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
