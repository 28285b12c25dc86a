// THEORY:
// The `region` module defines the unit of spatial scoping for processors.
// A processor never knows whether it is looking at a whole image or one
// corner of it; it only receives a `Region` and stays inside its bounds.
//
// Key architectural principles:
// 1.  **Whole-image or quadrants, never both**: a processor instance runs
//     either over the single Full region or over the 4 quadrant regions.
//     The splitter replaces the Full region rather than adding to it.
// 2.  **Exact partition**: the 4 quadrants cover every pixel exactly once.
//     Widths and heights are halved with floor division, and the leftover
//     row/column of an odd dimension goes to the bottom/right quadrants.
// 3.  **Stable labels**: region labels feed into sensor identities, so their
//     wire form (`top_left`, ...) must never change across releases.

use crate::core_modules::pixel_buffer::PixelBuffer;

/// Which part of the image a region covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionLabel {
    Full,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl RegionLabel {
    /// The label's wire form, used in sensor identities and display names.
    /// `Full` contributes no segment, matching the flat identity shape of
    /// whole-image sensors.
    pub fn slug(&self) -> Option<&'static str> {
        match self {
            RegionLabel::Full => None,
            RegionLabel::TopLeft => Some("top_left"),
            RegionLabel::TopRight => Some("top_right"),
            RegionLabel::BottomLeft => Some("bottom_left"),
            RegionLabel::BottomRight => Some("bottom_right"),
        }
    }

    /// A human-readable form for sensor display names ("Top Left", ...).
    pub fn display(&self) -> &'static str {
        match self {
            RegionLabel::Full => "",
            RegionLabel::TopLeft => "Top Left",
            RegionLabel::TopRight => "Top Right",
            RegionLabel::BottomLeft => "Bottom Left",
            RegionLabel::BottomRight => "Bottom Right",
        }
    }

    /// The four quadrant labels in their canonical order.
    pub fn quadrants() -> [RegionLabel; 4] {
        [
            RegionLabel::TopLeft,
            RegionLabel::TopRight,
            RegionLabel::BottomLeft,
            RegionLabel::BottomRight,
        ]
    }
}

/// A rectangular sub-area of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub label: RegionLabel,
    /// Left edge, inclusive.
    pub x: u32,
    /// Top edge, inclusive.
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// The Full region covering an entire buffer.
    pub fn full(buffer: &PixelBuffer) -> Self {
        Self {
            label: RegionLabel::Full,
            x: 0,
            y: 0,
            width: buffer.width,
            height: buffer.height,
        }
    }

    /// Number of pixels inside this region.
    pub fn pixel_count(&self) -> u64 {
        (self.width as u64) * (self.height as u64)
    }

    /// Whether this region lies entirely inside the given buffer.
    pub fn fits(&self, buffer: &PixelBuffer) -> bool {
        self.x.saturating_add(self.width) <= buffer.width
            && self.y.saturating_add(self.height) <= buffer.height
    }
}

/// Splits a buffer into its 4 quadrant regions.
///
/// Widths and heights are halved with floor division; for odd dimensions the
/// extra column goes to the right quadrants and the extra row to the bottom
/// quadrants. The result always partitions the buffer exactly.
pub fn split_quadrants(buffer: &PixelBuffer) -> [Region; 4] {
    let mid_w = buffer.width / 2;
    let mid_h = buffer.height / 2;
    [
        Region {
            label: RegionLabel::TopLeft,
            x: 0,
            y: 0,
            width: mid_w,
            height: mid_h,
        },
        Region {
            label: RegionLabel::TopRight,
            x: mid_w,
            y: 0,
            width: buffer.width - mid_w,
            height: mid_h,
        },
        Region {
            label: RegionLabel::BottomLeft,
            x: 0,
            y: mid_h,
            width: mid_w,
            height: buffer.height - mid_h,
        },
        Region {
            label: RegionLabel::BottomRight,
            x: mid_w,
            y: mid_h,
            width: buffer.width - mid_w,
            height: buffer.height - mid_h,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::new(width, height, vec![0u8; (width * height * 4) as usize])
    }

    #[test]
    fn quadrants_partition_even_dimensions() {
        let buf = buffer(100, 60);
        let quads = split_quadrants(&buf);
        let total: u64 = quads.iter().map(|q| q.pixel_count()).sum();
        assert_eq!(total, 100 * 60);
        for q in &quads {
            assert_eq!(q.width, 50);
            assert_eq!(q.height, 30);
            assert!(q.fits(&buf));
        }
    }

    #[test]
    fn odd_height_goes_to_bottom_quadrants() {
        // 100x101: bottom quadrants get height 51, top get 50, all widths 50.
        let buf = buffer(100, 101);
        let [tl, tr, bl, br] = split_quadrants(&buf);
        assert_eq!((tl.width, tl.height), (50, 50));
        assert_eq!((tr.width, tr.height), (50, 50));
        assert_eq!((bl.width, bl.height), (50, 51));
        assert_eq!((br.width, br.height), (50, 51));
    }

    #[test]
    fn odd_width_goes_to_right_quadrants() {
        let buf = buffer(7, 4);
        let [tl, tr, bl, br] = split_quadrants(&buf);
        assert_eq!(tl.width, 3);
        assert_eq!(tr.width, 4);
        assert_eq!(bl.width, 3);
        assert_eq!(br.width, 4);
    }

    #[test]
    fn quadrants_cover_every_pixel_exactly_once() {
        let buf = buffer(9, 5);
        let quads = split_quadrants(&buf);
        let mut covered = vec![0u8; (buf.width * buf.height) as usize];
        for q in &quads {
            for y in q.y..q.y + q.height {
                for x in q.x..q.x + q.width {
                    covered[(y * buf.width + x) as usize] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn full_region_matches_buffer() {
        let buf = buffer(12, 8);
        let full = Region::full(&buf);
        assert_eq!(full.label, RegionLabel::Full);
        assert_eq!(full.pixel_count(), 12 * 8);
        assert!(full.fits(&buf));
    }
}
