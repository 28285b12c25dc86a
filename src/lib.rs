// THEORY:
// This file is the main entry point for the `greenwatch` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API exposed to external consumers (and to the bundled binary).
//
// The primary goal is to export the `Coordinator` and its collaborators
// (`PipelineRunner`, `DiscoveryPublisher`, `Registry`, the config types) as
// the clean, high-level interface for the whole engine. The analysis
// building blocks live in `core_modules` and are re-exported selectively so
// new processors and sources can be written against the capability traits.

pub mod config;
pub mod coordinator;
pub mod core_modules;
pub mod discovery;
pub mod errors;
pub mod mqtt;
pub mod pipeline;
pub mod registry;

// Re-export key data structures for the public API.
pub use config::Config;
pub use coordinator::Coordinator;
pub use core_modules::metric::{Metric, MetricBatch, MetricSet, SensorDescriptor, SensorIdentity};
pub use core_modules::pixel_buffer::{decode, Fingerprint, ImageHandle, PixelBuffer};
pub use core_modules::processor::ImageProcessor;
pub use core_modules::region::{split_quadrants, Region, RegionLabel};
pub use core_modules::source::ImageSource;
pub use discovery::{DiscoveryPublisher, PubSubClient};
pub use pipeline::PipelineRunner;
pub use registry::Registry;
