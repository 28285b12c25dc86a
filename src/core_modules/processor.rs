// THEORY:
// The `processor` module defines the capability every metric computation unit
// must offer. A processor is an opaque, pure function over (buffer, region):
// it holds configuration, never runtime state, so the pipeline is free to run
// it over multiple regions independently and in any order.
//
// New processor kinds (NDVI, fisheye correction) are added by implementing
// this trait and registering a constructor in the registry; there is no
// dynamic discovery.

use crate::core_modules::metric::{MetricSet, SensorDescriptor};
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::region::Region;
use crate::errors::ProcessorError;

/// Capability interface for a pluggable image-metric computation unit.
pub trait ImageProcessor: Send + Sync {
    /// The configured, human-readable name of this processor instance.
    fn name(&self) -> &str;

    /// Whether this instance runs over the 4 quadrants instead of the whole
    /// image.
    fn quadrants(&self) -> bool;

    /// Computes this processor's metrics for one region of one image.
    ///
    /// Must be pure and side-effect free; a failure here is isolated to this
    /// (processor, region) pair by the pipeline.
    fn analyze(&self, buffer: &PixelBuffer, region: &Region) -> Result<MetricSet, ProcessorError>;

    /// The static list of metrics this processor can ever emit, used to
    /// announce its sensors before the first successful run.
    fn describe_sensors(&self) -> Vec<SensorDescriptor>;
}
