// THEORY:
// The `metric` module defines the data that flows out of processors and into
// the discovery layer. Three ideas live here:
//
// 1.  **Metric / MetricSet**: the plain numeric outputs of one processor run
//     over one region. Dumb data, no behavior beyond value formatting.
// 2.  **MetricBatch**: the ordered collection of every metric produced by one
//     pipeline run, each tagged with the (processor, region) pair that made
//     it. Order is preserved so publishes happen in a stable sequence.
// 3.  **SensorIdentity**: the deterministic id that names a metric on the
//     wire. It is a pure function of configuration (device, source,
//     processor, region, metric key) and never of runtime state, which is
//     what makes retained discovery messages idempotent across restarts.

use crate::core_modules::region::RegionLabel;

/// One named numeric output of a processor.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Stable key for this metric within its processor ("green_pixels").
    pub key: String,
    pub value: f64,
    /// Unit of measurement as shown to the automation platform.
    pub unit: Option<String>,
}

impl Metric {
    pub fn new(key: impl Into<String>, value: f64, unit: Option<&str>) -> Self {
        Self {
            key: key.into(),
            value,
            unit: unit.map(str::to_owned),
        }
    }

    /// Renders the value as the state payload: integers stay integral,
    /// everything else is rounded to two decimals.
    pub fn format_value(&self) -> String {
        if self.value.fract() == 0.0 && self.value.abs() < 1e15 {
            format!("{}", self.value as i64)
        } else {
            format!("{:.2}", self.value)
        }
    }
}

/// The ordered metrics produced by one `analyze` call over one region.
pub type MetricSet = Vec<Metric>;

/// Static description of one metric a processor can ever emit, used to
/// announce its sensor before the first successful run.
#[derive(Debug, Clone)]
pub struct SensorDescriptor {
    /// The metric key this descriptor announces.
    pub key: &'static str,
    /// Human-readable name fragment ("Green Pixels").
    pub display_name: &'static str,
    pub unit: Option<&'static str>,
    /// Material Design icon name for the automation platform.
    pub icon: Option<&'static str>,
}

/// One metric inside a batch, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub processor_name: String,
    pub region: RegionLabel,
    pub metric: Metric,
}

/// Every metric produced by one pipeline run, in emission order.
#[derive(Debug, Clone, Default)]
pub struct MetricBatch {
    pub entries: Vec<BatchEntry>,
}

impl MetricBatch {
    pub fn push(&mut self, processor_name: &str, region: RegionLabel, metrics: MetricSet) {
        for metric in metrics {
            self.entries.push(BatchEntry {
                processor_name: processor_name.to_owned(),
                region,
                metric,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Lowercases a display name and replaces spaces with underscores, giving the
/// form used inside topics and unique ids.
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// The deterministic on-wire identity of one sensor.
///
/// Equal inputs always produce equal identities, so the discovery layer can
/// treat "already announced" as a pure set-membership question.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorIdentity(String);

impl SensorIdentity {
    /// Derives the identity from configuration only.
    ///
    /// `device_id` already carries the source slug; the processor slug, the
    /// region slug (absent for the Full region) and the metric key are
    /// appended in that order.
    pub fn derive(
        device_id: &str,
        processor_name: &str,
        region: RegionLabel,
        metric_key: &str,
    ) -> Self {
        let mut id = String::with_capacity(device_id.len() + processor_name.len() + 32);
        id.push_str(device_id);
        id.push('_');
        id.push_str(&slugify(processor_name));
        if let Some(region_slug) = region.slug() {
            id.push('_');
            id.push_str(region_slug);
        }
        id.push('_');
        id.push_str(metric_key);
        SensorIdentity(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SensorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_stable_and_configuration_only() {
        let a = SensorIdentity::derive(
            "greenwatch_cam_left",
            "Green Pixels",
            RegionLabel::Full,
            "green_pixels",
        );
        let b = SensorIdentity::derive(
            "greenwatch_cam_left",
            "Green Pixels",
            RegionLabel::Full,
            "green_pixels",
        );
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "greenwatch_cam_left_green_pixels_green_pixels");
    }

    #[test]
    fn quadrant_identities_carry_the_region_slug() {
        let id = SensorIdentity::derive(
            "greenwatch_cam_left",
            "Green Pixels",
            RegionLabel::TopRight,
            "green_percentage",
        );
        assert_eq!(
            id.as_str(),
            "greenwatch_cam_left_green_pixels_top_right_green_percentage"
        );
    }

    #[test]
    fn value_formatting_keeps_counts_integral() {
        assert_eq!(Metric::new("n", 1200.0, None).format_value(), "1200");
        assert_eq!(Metric::new("p", 30.0, Some("%")).format_value(), "30");
        assert_eq!(Metric::new("p", 33.333, Some("%")).format_value(), "33.33");
    }

    #[test]
    fn batch_preserves_emission_order() {
        let mut batch = MetricBatch::default();
        batch.push(
            "Green Pixels",
            RegionLabel::Full,
            vec![
                Metric::new("green_pixels", 10.0, Some("pixels")),
                Metric::new("green_percentage", 25.0, Some("%")),
            ],
        );
        batch.push(
            "NDVI",
            RegionLabel::Full,
            vec![Metric::new("ndvi_mean", 0.5, None)],
        );
        let keys: Vec<_> = batch.entries.iter().map(|e| e.metric.key.as_str()).collect();
        assert_eq!(keys, ["green_pixels", "green_percentage", "ndvi_mean"]);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn slugify_matches_wire_form() {
        assert_eq!(slugify("Camera Left"), "camera_left");
        assert_eq!(slugify("Green Pixels"), "green_pixels");
    }
}
