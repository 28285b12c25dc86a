// THEORY:
// The `green_pixels` module is the first concrete processor: a per-region
// green-pixel counter for plant-health monitoring. A pixel counts as green
// when its green channel exceeds both the red and blue channels by a
// configurable margin. The default margin of 0 means "strictly greener than
// red and blue".
//
// The processor is deliberately stateless: every `analyze` call reads only
// its arguments, which is what lets the pipeline fan one image out over the
// 4 quadrants without any ordering constraints.

use crate::core_modules::metric::{Metric, MetricSet, SensorDescriptor};
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::processor::ImageProcessor;
use crate::core_modules::region::Region;
use crate::errors::ProcessorError;

/// Counts green pixels in a region and reports count, percentage and total.
pub struct GreenPixelCounter {
    name: String,
    quadrants: bool,
    /// How far the green channel must exceed red and blue to count.
    margin: u8,
}

impl GreenPixelCounter {
    pub fn new(name: impl Into<String>, quadrants: bool, margin: u8) -> Self {
        Self {
            name: name.into(),
            quadrants,
            margin,
        }
    }

    #[inline]
    fn is_green(&self, rgba: &[u8]) -> bool {
        let (r, g, b) = (rgba[0] as u16, rgba[1] as u16, rgba[2] as u16);
        g > r + self.margin as u16 && g > b + self.margin as u16
    }
}

impl ImageProcessor for GreenPixelCounter {
    fn name(&self) -> &str {
        &self.name
    }

    fn quadrants(&self) -> bool {
        self.quadrants
    }

    fn analyze(&self, buffer: &PixelBuffer, region: &Region) -> Result<MetricSet, ProcessorError> {
        if !region.fits(buffer) {
            return Err(ProcessorError::InvalidRegion {
                label: format!("{:?}", region.label),
                width: buffer.width,
                height: buffer.height,
            });
        }

        let mut green: u64 = 0;
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                if self.is_green(buffer.pixel(x, y)) {
                    green += 1;
                }
            }
        }

        let total = region.pixel_count();
        // Zero-size regions report 0%, not NaN.
        let percentage = if total == 0 {
            0.0
        } else {
            100.0 * green as f64 / total as f64
        };

        Ok(vec![
            Metric::new("green_pixels", green as f64, Some("pixels")),
            Metric::new("green_percentage", percentage, Some("%")),
            Metric::new("total_pixels", total as f64, Some("pixels")),
        ])
    }

    fn describe_sensors(&self) -> Vec<SensorDescriptor> {
        vec![
            SensorDescriptor {
                key: "green_pixels",
                display_name: "Green Pixels",
                unit: Some("pixels"),
                icon: Some("mdi:leaf"),
            },
            SensorDescriptor {
                key: "green_percentage",
                display_name: "Green Percentage",
                unit: Some("%"),
                icon: Some("mdi:percent"),
            },
            SensorDescriptor {
                key: "total_pixels",
                display_name: "Total Pixels",
                unit: Some("pixels"),
                icon: Some("mdi:image-size-select-actual"),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::region::RegionLabel;

    /// Builds a buffer where the first `green_count` pixels are pure green
    /// and the rest are gray.
    fn buffer_with_green(width: u32, height: u32, green_count: usize) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for i in 0..(width * height) as usize {
            if i < green_count {
                data.extend_from_slice(&[10, 200, 10, 255]);
            } else {
                data.extend_from_slice(&[120, 120, 120, 255]);
            }
        }
        PixelBuffer::new(width, height, data)
    }

    fn value(metrics: &MetricSet, key: &str) -> f64 {
        metrics.iter().find(|m| m.key == key).unwrap().value
    }

    #[test]
    fn counts_green_pixels_over_the_full_image() {
        let buf = buffer_with_green(80, 50, 1000);
        let counter = GreenPixelCounter::new("Green Pixels", false, 0);
        let metrics = counter.analyze(&buf, &Region::full(&buf)).unwrap();
        assert_eq!(value(&metrics, "green_pixels"), 1000.0);
        assert_eq!(value(&metrics, "green_percentage"), 25.0);
        assert_eq!(value(&metrics, "total_pixels"), 4000.0);
    }

    #[test]
    fn margin_excludes_weakly_green_pixels() {
        // g exceeds r and b by exactly 10.
        let mut data = Vec::new();
        data.extend_from_slice(&[100, 110, 100, 255]);
        let buf = PixelBuffer::new(1, 1, data);

        let strict = GreenPixelCounter::new("Green Pixels", false, 10);
        let metrics = strict.analyze(&buf, &Region::full(&buf)).unwrap();
        assert_eq!(value(&metrics, "green_pixels"), 0.0);

        let lenient = GreenPixelCounter::new("Green Pixels", false, 9);
        let metrics = lenient.analyze(&buf, &Region::full(&buf)).unwrap();
        assert_eq!(value(&metrics, "green_pixels"), 1.0);
    }

    #[test]
    fn bright_green_channel_does_not_overflow_margin_math() {
        let buf = PixelBuffer::new(1, 1, vec![0, 255, 0, 255]);
        let counter = GreenPixelCounter::new("Green Pixels", false, 255);
        let metrics = counter.analyze(&buf, &Region::full(&buf)).unwrap();
        // 255 > 0 + 255 is false; no panic, no wraparound.
        assert_eq!(value(&metrics, "green_pixels"), 0.0);
    }

    #[test]
    fn zero_size_region_reports_zero_percentage() {
        let buf = buffer_with_green(4, 4, 16);
        let counter = GreenPixelCounter::new("Green Pixels", false, 0);
        let empty = Region {
            label: RegionLabel::TopLeft,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
        let metrics = counter.analyze(&buf, &empty).unwrap();
        assert_eq!(value(&metrics, "green_percentage"), 0.0);
        assert_eq!(value(&metrics, "green_pixels"), 0.0);
    }

    #[test]
    fn out_of_bounds_region_is_rejected() {
        let buf = buffer_with_green(4, 4, 0);
        let counter = GreenPixelCounter::new("Green Pixels", false, 0);
        let bad = Region {
            label: RegionLabel::BottomRight,
            x: 2,
            y: 2,
            width: 4,
            height: 4,
        };
        assert!(matches!(
            counter.analyze(&buf, &bad),
            Err(ProcessorError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn quadrant_counts_sum_to_full_count() {
        use crate::core_modules::region::split_quadrants;
        let buf = buffer_with_green(9, 7, 20);
        let counter = GreenPixelCounter::new("Green Pixels", true, 0);
        let full = counter.analyze(&buf, &Region::full(&buf)).unwrap();
        let quad_sum: f64 = split_quadrants(&buf)
            .iter()
            .map(|q| value(&counter.analyze(&buf, q).unwrap(), "green_pixels"))
            .sum();
        assert_eq!(quad_sum, value(&full, "green_pixels"));
    }
}
