// THEORY:
// The `pipeline` module turns one (source, new-image) event into one ordered
// batch of metrics. It encapsulates the fan-out stage of the engine: decode
// the image exactly once, then run every enabled processor over its region
// set (the whole image, or the 4 quadrants when that processor asked for
// them).
//
// Key architectural principles:
// 1.  **Decode once**: a decode failure short-circuits the entire run; no
//     processor ever sees half an image.
// 2.  **Partial-failure isolation**: a processor failing on one region is
//     logged and its metrics are simply absent from the batch. Other
//     processors and other regions in the same run are unaffected.
// 3.  **Stateless**: the runner holds the processor set and nothing else.
//     All scheduling and change-detection state lives in the coordinator.

use tracing::{debug, warn};

use crate::core_modules::metric::MetricBatch;
use crate::core_modules::pixel_buffer::{decode, ImageHandle};
use crate::core_modules::processor::ImageProcessor;
use crate::core_modules::region::{split_quadrants, Region};
use crate::errors::PipelineError;

/// Runs every enabled processor over one newly delivered image.
pub struct PipelineRunner {
    processors: Vec<Box<dyn ImageProcessor>>,
}

impl PipelineRunner {
    pub fn new(processors: Vec<Box<dyn ImageProcessor>>) -> Self {
        Self { processors }
    }

    pub fn processors(&self) -> &[Box<dyn ImageProcessor>] {
        &self.processors
    }

    /// Decodes the handle's image and collects metrics from every processor
    /// and region into one ordered batch.
    pub fn run(&self, handle: &ImageHandle) -> Result<MetricBatch, PipelineError> {
        let bytes = std::fs::read(&handle.path).map_err(|e| PipelineError::ReadFailed {
            path: handle.path.clone(),
            source: e,
        })?;
        let buffer = decode(&bytes).map_err(|e| PipelineError::DecodeFailed {
            path: handle.path.clone(),
            source: e,
        })?;

        let mut batch = MetricBatch::default();
        for processor in &self.processors {
            let regions: Vec<Region> = if processor.quadrants() {
                split_quadrants(&buffer).to_vec()
            } else {
                vec![Region::full(&buffer)]
            };

            for region in regions {
                match processor.analyze(&buffer, &region) {
                    Ok(metrics) => batch.push(processor.name(), region.label, metrics),
                    Err(e) => {
                        // Isolated: this (processor, region) pair drops out,
                        // the rest of the run proceeds.
                        warn!(source = %handle.source_name, processor = %processor.name(),
                              region = ?region.label, error = %e, "processor failed on region");
                    }
                }
            }
        }

        debug!(source = %handle.source_name, path = %handle.path.display(),
               metrics = batch.len(), "pipeline run complete");
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::green_pixels::GreenPixelCounter;
    use crate::core_modules::metric::{Metric, MetricSet, SensorDescriptor};
    use crate::core_modules::pixel_buffer::{Fingerprint, PixelBuffer};
    use crate::core_modules::region::RegionLabel;
    use crate::errors::ProcessorError;
    use std::io::Write;
    use std::time::SystemTime;
    use tempfile::TempDir;

    /// A processor that always fails, for isolation tests.
    struct AlwaysFails;

    impl ImageProcessor for AlwaysFails {
        fn name(&self) -> &str {
            "Broken"
        }
        fn quadrants(&self) -> bool {
            false
        }
        fn analyze(&self, _: &PixelBuffer, _: &Region) -> Result<MetricSet, ProcessorError> {
            Err(ProcessorError::ComputeFailed("synthetic failure".into()))
        }
        fn describe_sensors(&self) -> Vec<SensorDescriptor> {
            vec![SensorDescriptor {
                key: "never",
                display_name: "Never",
                unit: None,
                icon: None,
            }]
        }
    }

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32, green_count: usize) {
        let mut img = image::RgbaImage::from_pixel(width, height, image::Rgba([120, 120, 120, 255]));
        for (i, pixel) in img.pixels_mut().enumerate() {
            if i < green_count {
                *pixel = image::Rgba([10, 200, 10, 255]);
            }
        }
        img.save(dir.path().join(name)).unwrap();
    }

    fn handle_for(dir: &TempDir, name: &str) -> ImageHandle {
        let path = dir.path().join(name);
        ImageHandle {
            source_name: "Cam Left".into(),
            fingerprint: Fingerprint::of_file(&path).unwrap(),
            path,
            observed_at: SystemTime::now(),
        }
    }

    fn metric<'a>(
        batch: &'a MetricBatch,
        processor: &str,
        region: RegionLabel,
        key: &str,
    ) -> &'a Metric {
        &batch
            .entries
            .iter()
            .find(|e| e.processor_name == processor && e.region == region && e.metric.key == key)
            .unwrap()
            .metric
    }

    #[test]
    fn full_image_run_produces_one_entry_per_metric() {
        let dir = TempDir::new().unwrap();
        write_png(&dir, "img.png", 80, 50, 1000);

        let runner = PipelineRunner::new(vec![Box::new(GreenPixelCounter::new(
            "Green Pixels",
            false,
            0,
        ))]);
        let batch = runner.run(&handle_for(&dir, "img.png")).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(
            metric(&batch, "Green Pixels", RegionLabel::Full, "green_pixels").value,
            1000.0
        );
        assert_eq!(
            metric(&batch, "Green Pixels", RegionLabel::Full, "green_percentage").value,
            25.0
        );
    }

    #[test]
    fn quadrant_processor_emits_metrics_for_all_four_regions_and_no_full() {
        let dir = TempDir::new().unwrap();
        write_png(&dir, "img.png", 10, 10, 0);

        let runner = PipelineRunner::new(vec![Box::new(GreenPixelCounter::new(
            "Green Pixels",
            true,
            0,
        ))]);
        let batch = runner.run(&handle_for(&dir, "img.png")).unwrap();

        assert_eq!(batch.len(), 12);
        assert!(batch.entries.iter().all(|e| e.region != RegionLabel::Full));
        for label in RegionLabel::quadrants() {
            assert_eq!(
                metric(&batch, "Green Pixels", label, "total_pixels").value,
                25.0
            );
        }
    }

    #[test]
    fn processor_failure_is_isolated_from_other_processors() {
        let dir = TempDir::new().unwrap();
        write_png(&dir, "img.png", 4, 4, 16);

        let runner = PipelineRunner::new(vec![
            Box::new(AlwaysFails),
            Box::new(GreenPixelCounter::new("Green Pixels", false, 0)),
        ]);
        let batch = runner.run(&handle_for(&dir, "img.png")).unwrap();

        // The failing processor contributed nothing; the healthy one is complete.
        assert!(batch
            .entries
            .iter()
            .all(|e| e.processor_name == "Green Pixels"));
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn corrupt_image_short_circuits_before_any_processor_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.png");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"not a png at all")
            .unwrap();

        let runner = PipelineRunner::new(vec![Box::new(GreenPixelCounter::new(
            "Green Pixels",
            false,
            0,
        ))]);
        let err = runner.run(&handle_for(&dir, "corrupt.png")).unwrap_err();
        assert!(matches!(err, PipelineError::DecodeFailed { .. }));
    }
}
