//! Scroll control and viewport metrics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, PageCommand, ScrollBehavior};

use super::Page;

// ============================================================================
// Types
// ============================================================================

/// Current scroll offsets in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
    /// Horizontal offset from the left edge.
    pub x: f64,
    /// Vertical offset from the top edge.
    pub y: f64,
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    /// Inner width of the window.
    pub width: f64,
    /// Inner height of the window.
    pub height: f64,
}

/// Combined page metrics from a single agent round trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    /// Full scrollable document width.
    pub document_width: f64,
    /// Full scrollable document height.
    pub document_height: f64,
    /// Viewport width.
    pub viewport_width: f64,
    /// Viewport height.
    pub viewport_height: f64,
    /// Current horizontal scroll offset.
    pub scroll_x: f64,
    /// Current vertical scroll offset.
    pub scroll_y: f64,
    /// Device pixel ratio of the window.
    pub device_pixel_ratio: f64,
}

// ============================================================================
// Page - Scroll
// ============================================================================

impl Page {
    /// Scrolls the page to an absolute vertical offset without animation.
    ///
    /// The agent acknowledges once the scroll is issued; layout settle
    /// time is the caller's concern.
    ///
    /// # Arguments
    ///
    /// * `top` - Target Y offset in CSS pixels from the document top
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScrollFailed`] if the agent reports a failure.
    pub async fn scroll_to(&self, top: f64) -> Result<()> {
        self.scroll_to_with_behavior(top, ScrollBehavior::Instant)
            .await
    }

    /// Scrolls the page to an absolute vertical offset with the given
    /// animation behavior.
    ///
    /// Capture flows must use [`ScrollBehavior::Instant`]; smooth
    /// scrolling leaves the settle delay racing the animation.
    pub async fn scroll_to_with_behavior(
        &self,
        top: f64,
        behavior: ScrollBehavior,
    ) -> Result<()> {
        debug!(tab_id = %self.inner.tab_id, top = top, ?behavior, "Scrolling to");

        let response = self
            .send_command(Command::Page(PageCommand::ScrollTo { top, behavior }))
            .await?;

        if response.is_error() {
            return Err(Error::scroll_failed(response.error_message()));
        }

        Ok(())
    }

    /// Scrolls back to the top of the page.
    pub async fn scroll_to_top(&self) -> Result<()> {
        debug!(tab_id = %self.inner.tab_id, "Scrolling to top");
        self.scroll_to(0.0).await
    }

    /// Gets the current scroll position.
    pub async fn scroll_position(&self) -> Result<ScrollPosition> {
        let response = self
            .send_command(Command::Page(PageCommand::GetScrollPosition))
            .await?;

        if response.is_error() {
            return Err(Error::command_failed(
                "page.getScrollPosition",
                response.error_message(),
            ));
        }

        let position = ScrollPosition {
            x: response.get_f64("x"),
            y: response.get_f64("y"),
        };

        debug!(tab_id = %self.inner.tab_id, x = position.x, y = position.y, "Got scroll position");
        Ok(position)
    }

    /// Gets the viewport dimensions.
    pub async fn viewport_size(&self) -> Result<ViewportSize> {
        let response = self
            .send_command(Command::Page(PageCommand::GetViewportSize))
            .await?;

        if response.is_error() {
            return Err(Error::command_failed(
                "page.getViewportSize",
                response.error_message(),
            ));
        }

        let size = ViewportSize {
            width: response.get_f64("width"),
            height: response.get_f64("height"),
        };

        debug!(tab_id = %self.inner.tab_id, width = size.width, height = size.height, "Got viewport size");
        Ok(size)
    }

    /// Gets combined page metrics in one round trip.
    pub async fn metrics(&self) -> Result<PageMetrics> {
        let response = self
            .send_command(Command::Page(PageCommand::GetMetrics))
            .await?;

        if response.is_error() {
            return Err(Error::command_failed(
                "page.getMetrics",
                response.error_message(),
            ));
        }

        let metrics = PageMetrics {
            document_width: response.get_f64("documentWidth"),
            document_height: response.get_f64("documentHeight"),
            viewport_width: response.get_f64("viewportWidth"),
            viewport_height: response.get_f64("viewportHeight"),
            scroll_x: response.get_f64("scrollX"),
            scroll_y: response.get_f64("scrollY"),
            device_pixel_ratio: response.get_f64("devicePixelRatio"),
        };

        debug!(
            tab_id = %self.inner.tab_id,
            viewport_height = metrics.viewport_height,
            document_height = metrics.document_height,
            "Got page metrics"
        );
        Ok(metrics)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_position_serde() {
        let position = ScrollPosition { x: 0.0, y: 1745.0 };
        let json = serde_json::to_string(&position).expect("serialize");
        let back: ScrollPosition = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, position);
    }

    #[test]
    fn test_viewport_size_serde() {
        let size = ViewportSize {
            width: 1280.0,
            height: 600.0,
        };
        let json = serde_json::to_string(&size).expect("serialize");
        assert!(json.contains("600"));
    }
}
