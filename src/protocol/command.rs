//! Command definitions organized by module.
//!
//! Commands follow `module.methodName` format and are executed by the
//! page agent in the tab's content context, except for `capture.*`
//! which the agent forwards to the privileged extension background.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `page` | Scrolling, viewport metrics, page info |
//! | `detect` | Candidate scanning, marker lookup, highlighting |
//! | `capture` | Visible-viewport capture |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::MarkerId;

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Page module commands.
    Page(PageCommand),
    /// Detect module commands.
    Detect(DetectCommand),
    /// Capture module commands.
    Capture(CaptureCommand),
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page module commands for scrolling and viewport metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Scroll the page to an absolute vertical offset.
    ///
    /// The agent acknowledges once the scroll has been issued, not once
    /// layout has settled; the coordinator inserts its own settle delay.
    #[serde(rename = "page.scrollTo")]
    ScrollTo {
        /// Target Y offset in CSS pixels.
        top: f64,
        /// Scroll animation behavior.
        behavior: ScrollBehavior,
    },

    /// Get the current scroll position.
    #[serde(rename = "page.getScrollPosition")]
    GetScrollPosition,

    /// Get the viewport size in CSS pixels.
    #[serde(rename = "page.getViewportSize")]
    GetViewportSize,

    /// Get combined page metrics (document size, viewport, pixel ratio).
    #[serde(rename = "page.getMetrics")]
    GetMetrics,

    /// Get page identity (URL, title, domain).
    #[serde(rename = "page.getInfo")]
    GetInfo,
}

// ============================================================================
// ScrollBehavior
// ============================================================================

/// Scroll animation behavior.
///
/// Captures require [`ScrollBehavior::Instant`] so the settle delay is
/// deterministic; smooth scrolling exists only for interactive use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    /// Jump to the target offset without animation.
    #[default]
    Instant,
    /// Animated scrolling.
    Smooth,
}

// ============================================================================
// Detect Commands
// ============================================================================

/// Detect module commands for ad-candidate scanning and marking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum DetectCommand {
    /// Scan the page for candidate elements.
    ///
    /// The agent queries the given selectors, stamps each match with a
    /// marker attribute, and returns candidate records with geometry.
    /// Zero-area elements are filtered agent-side.
    #[serde(rename = "detect.scan")]
    Scan {
        /// CSS selectors to query, in priority order.
        selectors: Vec<String>,
    },

    /// Re-locate a previously marked element.
    ///
    /// Returns the element's current geometry, or a not-found result if
    /// the marker no longer resolves.
    #[serde(rename = "detect.locate")]
    Locate {
        /// Marker stamped during a prior scan.
        marker: MarkerId,
    },

    /// Draw highlight overlays on marked elements.
    #[serde(rename = "detect.highlight")]
    Highlight {
        /// Markers to highlight, in label order.
        markers: Vec<MarkerId>,
    },

    /// Remove all highlight overlays.
    #[serde(rename = "detect.clearHighlights")]
    ClearHighlights,
}

// ============================================================================
// Capture Commands
// ============================================================================

/// Capture module commands.
///
/// Routed through the agent to the privileged background context, since
/// only that context may call the visible-tab capture primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum CaptureCommand {
    /// Capture the currently visible viewport as an encoded image.
    ///
    /// The platform permits one in-flight capture per window; callers
    /// must serialize. The result carries base64 image data.
    #[serde(rename = "capture.visibleTab")]
    VisibleTab {
        /// Image format: `png` or `jpeg`.
        format: String,
        /// Encoding quality 0-100 (JPEG only).
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<u8>,
    },
}

// ============================================================================
// Tests
// ============================================================================
