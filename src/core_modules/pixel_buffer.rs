// THEORY:
// The `pixel_buffer` module is the boundary between raw bytes on disk and the
// analysis layers above. It owns two ideas:
//
// 1.  **Uniform representation**: whatever container format an image arrived
//     in (JPEG, PNG, BMP, TIFF), every processor sees the same thing: a flat
//     RGBA buffer plus its dimensions. Processors never touch codecs.
// 2.  **Cheap change detection**: a `Fingerprint` summarizes an on-disk image
//     (modification time + size) so that "is this a new image" can be decided
//     without decoding anything. Two handles with equal fingerprints for the
//     same source are the same image and are never reprocessed.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::errors::DecodeError;

/// A decoded image as a flat RGBA8 buffer.
#[derive(Debug)]
pub struct PixelBuffer {
    /// The width of the image in pixels.
    pub width: u32,
    /// The height of the image in pixels.
    pub height: u32,
    /// Flattened RGBA pixel data, row-major, 4 bytes per pixel.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width as usize) * (height as usize) * 4);
        Self {
            width,
            height,
            data,
        }
    }

    /// Returns the RGBA bytes of the pixel at (x, y).
    /// Callers are expected to stay inside the buffer bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        &self.data[idx..idx + 4]
    }
}

/// Decodes raw image bytes into a `PixelBuffer`.
///
/// Format detection is by content, so the file extension only ever acts as a
/// pre-filter at the source layer.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    let dynamic = image::load_from_memory(bytes).map_err(|e| match e {
        image::ImageError::Unsupported(u) => DecodeError::UnsupportedFormat(u.to_string()),
        other => DecodeError::CorruptData(other.to_string()),
    })?;
    let rgba = dynamic.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(PixelBuffer::new(width, height, rgba.into_raw()))
}

/// A cheap, comparable signature of an on-disk image.
///
/// Derived from modification time and size only; the pixel data is never
/// read to compute it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    modified: SystemTime,
    size: u64,
}

impl Fingerprint {
    pub fn new(modified: SystemTime, size: u64) -> Self {
        Self { modified, size }
    }

    /// Reads a fingerprint from a file's metadata.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified()?,
            size: meta.len(),
        })
    }
}

/// A reference to one new image delivered by a source.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    /// The name of the source that delivered this image.
    pub source_name: String,
    /// The on-disk location of the image.
    pub path: PathBuf,
    /// The change-detection signature of the image at delivery time.
    pub fingerprint: Fingerprint,
    /// When the source observed this image.
    pub observed_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .expect("encoding a PNG in memory should not fail");
        bytes
    }

    #[test]
    fn decode_produces_rgba_buffer_with_matching_dimensions() {
        let buffer = decode(&png_bytes(8, 5)).expect("valid PNG should decode");
        assert_eq!(buffer.width, 8);
        assert_eq!(buffer.height, 5);
        assert_eq!(buffer.data.len(), 8 * 5 * 4);
        assert_eq!(buffer.pixel(0, 0), &[10, 200, 30, 255]);
    }

    #[test]
    fn decode_rejects_garbage_bytes() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::CorruptData(_) | DecodeError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn fingerprints_differ_when_size_or_mtime_differ() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let a = Fingerprint::new(t, 100);
        let b = Fingerprint::new(t, 101);
        let c = Fingerprint::new(t + Duration::from_secs(1), 100);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, Fingerprint::new(t, 100));
    }
}
