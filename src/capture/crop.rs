//! Pixel-space cropping of captured frames.
//!
//! The platform returns the whole visible viewport; the element's
//! crop rectangle is computed in CSS pixels by [`super::geometry`],
//! scaled here by the device pixel ratio, clamped to the frame
//! bounds and re-encoded.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;

use crate::error::{Error, Result};
use crate::page::CaptureFormat;

use super::geometry::{self, CropRect};

/// Crops one element out of a full-frame capture.
///
/// `frame` holds the encoded bytes exactly as the platform returned
/// them. Returns the cropped region re-encoded in `format`.
pub(crate) fn crop_frame(
    frame: &[u8],
    rect: &CropRect,
    device_pixel_ratio: f64,
    format: CaptureFormat,
) -> Result<Vec<u8>> {
    use image::GenericImageView;

    let device = geometry::to_device_pixels(rect, device_pixel_ratio);
    if device.width == 0 || device.height == 0 {
        return Err(Error::invalid_image("crop region has zero dimensions"));
    }

    let img = image::load_from_memory(frame)
        .map_err(|e| Error::invalid_image(format!("Failed to decode frame: {}", e)))?;

    // Clamp crop region to frame bounds
    let (img_width, img_height) = img.dimensions();
    let x = device.x.min(img_width.saturating_sub(1));
    let y = device.y.min(img_height.saturating_sub(1));
    let width = device.width.min(img_width.saturating_sub(x));
    let height = device.height.min(img_height.saturating_sub(y));

    let cropped = img.crop_imm(x, y, width, height);

    let mut output = Cursor::new(Vec::new());
    match format {
        CaptureFormat::Jpeg(quality) => {
            let encoder = JpegEncoder::new_with_quality(&mut output, quality);
            cropped
                .write_with_encoder(encoder)
                .map_err(|e| Error::invalid_image(format!("Failed to encode JPEG: {}", e)))?;
        }
        CaptureFormat::Png => {
            cropped
                .write_to(&mut output, image::ImageFormat::Png)
                .map_err(|e| Error::invalid_image(format!("Failed to encode PNG: {}", e)))?;
        }
    }

    Ok(output.into_inner())
}

// ============================================================================
// Tests
// ============================================================================
