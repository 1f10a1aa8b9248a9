//! Scroll-offset and crop-rectangle math.
//!
//! Pure functions shared by the coordinator and its tests. All inputs
//! and outputs are CSS pixels unless a function says otherwise.
//!
//! The two laws everything downstream relies on:
//!
//! - `target_scroll_offset` is never negative, whatever the element
//!   geometry or viewport height.
//! - `crop_rect` never places the element above the captured frame:
//!   its `y` is clamped to `0`.

use serde::{Deserialize, Serialize};

use crate::detect::DetectedElement;

// ============================================================================
// Types
// ============================================================================

/// Where the element sits inside a just-captured frame.
///
/// Viewport-relative CSS pixels. `x` carries the element's raw left
/// edge since vertical-only scrolling leaves it scroll-invariant;
/// it can be negative for elements hanging off the left of the page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge inside the frame.
    pub x: f64,
    /// Top edge inside the frame, clamped to `0`.
    pub y: f64,
    /// Element width.
    pub width: f64,
    /// Element height.
    pub height: f64,
}

impl CropRect {
    /// Returns the horizontal center inside the frame.
    #[inline]
    #[must_use]
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Returns the vertical center inside the frame.
    #[inline]
    #[must_use]
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// A crop region in device pixels, ready to apply to a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRect {
    /// Left edge in device pixels.
    pub x: u32,
    /// Top edge in device pixels.
    pub y: u32,
    /// Width in device pixels.
    pub width: u32,
    /// Height in device pixels.
    pub height: u32,
}

// ============================================================================
// Functions
// ============================================================================

/// Computes the scroll offset that centers the element vertically.
///
/// `max(0, page_y + height/2 - viewport_height/2)`: the element lands
/// mid-viewport when the page has enough scrollable range above it,
/// and the page stays at the top otherwise.
#[inline]
#[must_use]
pub fn target_scroll_offset(element: &DetectedElement, viewport_height: f64) -> f64 {
    (element.center_y() - viewport_height / 2.0).max(0.0)
}

/// Computes where the element sits in a frame captured at the given
/// scroll offset.
///
/// An approximation from scan-time geometry: an element that moved or
/// resized since the scan lands elsewhere, which callers tolerate.
#[inline]
#[must_use]
pub fn crop_rect(element: &DetectedElement, target_scroll_offset: f64) -> CropRect {
    CropRect {
        x: element.page_x,
        y: (element.page_y - target_scroll_offset).max(0.0),
        width: element.width,
        height: element.height,
    }
}

/// Converts a CSS-pixel crop rect into device pixels.
///
/// Negative origins clamp to zero; non-positive ratios fall back to
/// `1.0`. Frame-bounds clamping happens after decoding, against the
/// real frame dimensions.
#[must_use]
pub fn to_device_pixels(rect: &CropRect, device_pixel_ratio: f64) -> DeviceRect {
    let scale = if device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };

    DeviceRect {
        x: (rect.x.max(0.0) * scale).round() as u32,
        y: (rect.y.max(0.0) * scale).round() as u32,
        width: (rect.width.max(0.0) * scale).round() as u32,
        height: (rect.height.max(0.0) * scale).round() as u32,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::MarkerId;

    use proptest::prelude::*;

    fn element(width: f64, height: f64, page_x: f64, page_y: f64) -> DetectedElement {
        DetectedElement {
            width,
            height,
            page_x,
            page_y,
            device_pixel_ratio: 1.0,
            marker: MarkerId::new("0"),
        }
    }

    #[test]
    fn test_element_above_fold_needs_no_scroll() {
        // 300x250 at y=100 with a 600px viewport: center 225 is already
        // in the top half, so the page stays at the top
        let e = element(300.0, 250.0, 0.0, 100.0);
        assert_eq!(target_scroll_offset(&e, 600.0), 0.0);

        let rect = crop_rect(&e, 0.0);
        assert_eq!(rect.y, 100.0);
        assert_eq!(rect.center_y(), 225.0);
    }

    #[test]
    fn test_deep_element_is_centered() {
        // 728x90 at y=2000 with a 600px viewport: offset 1745 puts the
        // element's center exactly at mid-viewport
        let e = element(728.0, 90.0, 0.0, 2000.0);
        let offset = target_scroll_offset(&e, 600.0);
        assert_eq!(offset, 1745.0);

        let rect = crop_rect(&e, offset);
        assert_eq!(rect.y, 255.0);
        assert_eq!(rect.center_y(), 300.0);
        assert_eq!(rect.width, 728.0);
        assert_eq!(rect.height, 90.0);
    }

    #[test]
    fn test_crop_x_is_scroll_invariant() {
        let e = element(300.0, 250.0, 140.0, 5000.0);
        let offset = target_scroll_offset(&e, 600.0);
        let rect = crop_rect(&e, offset);
        assert_eq!(rect.x, 140.0);
        assert_eq!(rect.center_x(), 290.0);
    }

    #[test]
    fn test_crop_y_clamps_when_element_is_above_offset() {
        let e = element(300.0, 250.0, 0.0, 100.0);
        let rect = crop_rect(&e, 500.0);
        assert_eq!(rect.y, 0.0);
    }

    #[test]
    fn test_device_pixels_scale_and_round() {
        let rect = CropRect {
            x: 10.4,
            y: 255.0,
            width: 728.0,
            height: 90.0,
        };

        let device = to_device_pixels(&rect, 2.0);
        assert_eq!(device.x, 21);
        assert_eq!(device.y, 510);
        assert_eq!(device.width, 1456);
        assert_eq!(device.height, 180);
    }

    #[test]
    fn test_device_pixels_clamp_negative_origin() {
        let rect = CropRect {
            x: -15.0,
            y: 0.0,
            width: 300.0,
            height: 250.0,
        };

        let device = to_device_pixels(&rect, 1.0);
        assert_eq!(device.x, 0);
        assert_eq!(device.width, 300);
    }

    #[test]
    fn test_device_pixels_bad_ratio_falls_back() {
        let rect = CropRect {
            x: 5.0,
            y: 5.0,
            width: 10.0,
            height: 10.0,
        };

        assert_eq!(to_device_pixels(&rect, 0.0), to_device_pixels(&rect, 1.0));
        assert_eq!(to_device_pixels(&rect, -2.0), to_device_pixels(&rect, 1.0));
    }

    proptest! {
        #[test]
        fn prop_target_offset_is_never_negative(
            page_y in -100_000.0f64..100_000.0,
            height in 0.0f64..10_000.0,
            viewport in 0.0f64..10_000.0,
        ) {
            let e = element(300.0, height, 0.0, page_y);
            prop_assert!(target_scroll_offset(&e, viewport) >= 0.0);
        }

        #[test]
        fn prop_crop_y_is_never_negative(
            page_y in -100_000.0f64..100_000.0,
            height in 0.0f64..10_000.0,
            viewport in 0.0f64..10_000.0,
        ) {
            let e = element(300.0, height, 0.0, page_y);
            let offset = target_scroll_offset(&e, viewport);
            prop_assert!(crop_rect(&e, offset).y >= 0.0);
        }

        #[test]
        fn prop_crop_y_never_exceeds_page_y(
            page_y in 0.0f64..100_000.0,
            height in 0.0f64..10_000.0,
            viewport in 0.0f64..10_000.0,
        ) {
            // With a non-negative offset the element can only move up
            // in frame coordinates, never down
            let e = element(300.0, height, 0.0, page_y);
            let offset = target_scroll_offset(&e, viewport);
            prop_assert!(crop_rect(&e, offset).y <= page_y);
        }

        #[test]
        fn prop_crop_preserves_dimensions(
            width in 1.0f64..4_000.0,
            height in 1.0f64..4_000.0,
            page_y in 0.0f64..100_000.0,
            offset in 0.0f64..100_000.0,
        ) {
            let e = element(width, height, 0.0, page_y);
            let rect = crop_rect(&e, offset);
            prop_assert_eq!(rect.width, width);
            prop_assert_eq!(rect.height, height);
        }
    }
}
