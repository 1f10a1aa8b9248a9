//! Ad-element detection.
//!
//! A [`Detector`] drives the scan flow for one page: ask the agent to
//! query the classifier's selectors, classify the returned candidates,
//! and hand back [`DetectedElement`] records ready for the capture
//! coordinator. Geometry is frozen at scan time; the marker stamped on
//! each element is the only live link back to the DOM.
//!
//! # Example
//!
//! ```ignore
//! let detector = Detector::new(page.clone());
//! let elements = detector.scan().await?;
//! println!("{} ads detected", elements.len());
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod classifier;

pub use classifier::{AdClassifier, SignatureClassifier};

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::identifiers::MarkerId;
use crate::page::Page;

// ============================================================================
// Types
// ============================================================================

/// Axis-aligned element rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Rectangle width.
    pub width: f64,
    /// Rectangle height.
    pub height: f64,
}

/// One scanned candidate as reported by the page agent.
///
/// `rect` is page-absolute (scroll offsets folded in); `viewport_rect`
/// is what the viewport saw at scan time. Attribute fields default to
/// empty when the element does not carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdCandidate {
    /// Marker the agent stamped on the element.
    pub marker: MarkerId,
    /// Lowercase tag name.
    pub tag: String,
    /// Page-absolute bounding rectangle.
    pub rect: ElementRect,
    /// Viewport-relative bounding rectangle at scan time.
    pub viewport_rect: ElementRect,
    /// Source URL (iframes; `data-src` counts as a source too).
    #[serde(default)]
    pub src: String,
    /// `id` attribute.
    #[serde(default)]
    pub id: String,
    /// `class` attribute.
    #[serde(default)]
    pub class_name: String,
    /// Scan selector that matched this element, if the agent reports it.
    #[serde(default)]
    pub matched_selector: Option<String>,
    /// Whether the element was fully inside the viewport at scan time.
    #[serde(default)]
    pub in_viewport: bool,
    /// Device pixel ratio of the window at scan time.
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f64,
}

fn default_device_pixel_ratio() -> f64 {
    1.0
}

impl AdCandidate {
    /// Converts this candidate into the frozen detection record the
    /// capture coordinator consumes.
    #[must_use]
    pub fn to_detected(&self) -> DetectedElement {
        DetectedElement {
            width: self.rect.width,
            height: self.rect.height,
            page_x: self.rect.x,
            page_y: self.rect.y,
            device_pixel_ratio: self.device_pixel_ratio,
            marker: self.marker.clone(),
        }
    }
}

/// A detected ad element, frozen at scan time.
///
/// Coordinates are page-absolute CSS pixels. The record never mutates;
/// a page that changes after the scan makes it stale, which downstream
/// consumers tolerate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedElement {
    /// Element width.
    pub width: f64,
    /// Element height.
    pub height: f64,
    /// Page-absolute X of the left edge.
    pub page_x: f64,
    /// Page-absolute Y of the top edge.
    pub page_y: f64,
    /// Device pixel ratio at scan time.
    pub device_pixel_ratio: f64,
    /// Marker for re-locating the element.
    pub marker: MarkerId,
}

impl DetectedElement {
    /// Returns the page-absolute Y of the element's vertical center.
    #[inline]
    #[must_use]
    pub fn center_y(&self) -> f64 {
        self.page_y + self.height / 2.0
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Scans a page for ad elements through a pluggable classifier.
pub struct Detector {
    /// Page to scan.
    page: Page,
    /// Classification policy.
    classifier: Box<dyn AdClassifier>,
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

impl Detector {
    /// Creates a detector with the default [`SignatureClassifier`].
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self::with_classifier(page, Box::new(SignatureClassifier::new()))
    }

    /// Creates a detector with a custom classification policy.
    #[must_use]
    pub fn with_classifier(page: Page, classifier: Box<dyn AdClassifier>) -> Self {
        Self { page, classifier }
    }

    /// Scans the page and returns detection records in DOM order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandFailed`](crate::Error::CommandFailed) if
    /// the agent rejects the scan.
    pub async fn scan(&self) -> Result<Vec<DetectedElement>> {
        let candidates = self.scan_candidates().await?;
        Ok(candidates.iter().map(AdCandidate::to_detected).collect())
    }

    /// Scans the page and returns the full classified candidate records.
    pub async fn scan_candidates(&self) -> Result<Vec<AdCandidate>> {
        let selectors = self.classifier.selectors();
        let candidates = self.page.scan(&selectors).await?;
        let scanned = candidates.len();

        let ads = classify(self.classifier.as_ref(), candidates);

        debug!(scanned, detected = ads.len(), "Classification complete");
        Ok(ads)
    }

    /// Draws numbered highlight overlays on the given elements.
    pub async fn highlight(&self, elements: &[DetectedElement]) -> Result<()> {
        let markers: Vec<MarkerId> = elements.iter().map(|e| e.marker.clone()).collect();
        self.page.highlight(&markers).await
    }

    /// Removes all highlight overlays from the page.
    pub async fn clear_highlights(&self) -> Result<()> {
        self.page.clear_highlights().await
    }
}

/// Applies the classifier to scanned candidates, preserving order.
///
/// Zero-area candidates never pass, independent of the agent's own
/// filtering.
fn classify(classifier: &dyn AdClassifier, candidates: Vec<AdCandidate>) -> Vec<AdCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.rect.width > 0.0 && c.rect.height > 0.0)
        .filter(|c| classifier.is_ad(c))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct AcceptAll;

    impl AdClassifier for AcceptAll {
        fn selectors(&self) -> Vec<String> {
            vec!["div".to_string()]
        }

        fn is_ad(&self, _candidate: &AdCandidate) -> bool {
            true
        }
    }

    struct RejectAll;

    impl AdClassifier for RejectAll {
        fn selectors(&self) -> Vec<String> {
            Vec::new()
        }

        fn is_ad(&self, _candidate: &AdCandidate) -> bool {
            false
        }
    }

    fn candidate(marker: &str, width: f64, height: f64, page_y: f64) -> AdCandidate {
        AdCandidate {
            marker: MarkerId::new(marker),
            tag: "div".to_string(),
            rect: ElementRect {
                x: 10.0,
                y: page_y,
                width,
                height,
            },
            viewport_rect: ElementRect {
                x: 10.0,
                y: page_y,
                width,
                height,
            },
            src: String::new(),
            id: String::new(),
            class_name: String::new(),
            matched_selector: None,
            in_viewport: false,
            device_pixel_ratio: 2.0,
        }
    }

    #[test]
    fn test_to_detected_copies_geometry() {
        let c = candidate("3", 300.0, 250.0, 100.0);
        let element = c.to_detected();
        assert_eq!(element.width, 300.0);
        assert_eq!(element.height, 250.0);
        assert_eq!(element.page_x, 10.0);
        assert_eq!(element.page_y, 100.0);
        assert_eq!(element.device_pixel_ratio, 2.0);
        assert_eq!(element.marker, MarkerId::new("3"));
    }

    #[test]
    fn test_center_y() {
        let element = candidate("0", 300.0, 250.0, 100.0).to_detected();
        assert_eq!(element.center_y(), 225.0);
    }

    #[test]
    fn test_classify_filters_zero_area() {
        let candidates = vec![
            candidate("0", 300.0, 250.0, 100.0),
            candidate("1", 0.0, 250.0, 200.0),
            candidate("2", 728.0, 0.0, 300.0),
            candidate("3", 728.0, 90.0, 2000.0),
        ];

        let ads = classify(&AcceptAll, candidates);
        assert_eq!(ads.len(), 2);
        assert_eq!(ads[0].marker, MarkerId::new("0"));
        assert_eq!(ads[1].marker, MarkerId::new("3"));
    }

    #[test]
    fn test_classify_applies_policy() {
        let candidates = vec![candidate("0", 300.0, 250.0, 100.0)];
        assert!(classify(&RejectAll, candidates).is_empty());
    }

    #[test]
    fn test_classify_preserves_order() {
        let candidates = vec![
            candidate("a", 300.0, 250.0, 100.0),
            candidate("b", 728.0, 90.0, 2000.0),
            candidate("c", 160.0, 600.0, 400.0),
        ];

        let markers: Vec<String> = classify(&AcceptAll, candidates)
            .iter()
            .map(|c| c.marker.to_string())
            .collect();
        assert_eq!(markers, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_candidate_deserializes_from_agent_json() {
        let json = r#"{
            "marker": "2",
            "tag": "iframe",
            "rect": {"x": 10.0, "y": 2000.0, "width": 728.0, "height": 90.0},
            "viewportRect": {"x": 10.0, "y": 150.0, "width": 728.0, "height": 90.0},
            "src": "https://tpc.googlesyndication.com/safeframe/1",
            "matchedSelector": "iframe[src*=\"googlesyndication\"]",
            "inViewport": true,
            "devicePixelRatio": 2.0
        }"#;

        let c: AdCandidate = serde_json::from_str(json).expect("deserialize");
        assert_eq!(c.marker, MarkerId::new("2"));
        assert_eq!(c.rect.y, 2000.0);
        assert_eq!(c.viewport_rect.y, 150.0);
        assert!(c.in_viewport);
        // Omitted attribute fields default to empty
        assert!(c.id.is_empty());
        assert!(c.class_name.is_empty());
    }

    #[test]
    fn test_candidate_dpr_defaults_to_one() {
        let json = r#"{
            "marker": "0",
            "tag": "div",
            "rect": {"x": 0.0, "y": 0.0, "width": 300.0, "height": 250.0},
            "viewportRect": {"x": 0.0, "y": 0.0, "width": 300.0, "height": 250.0}
        }"#;

        let c: AdCandidate = serde_json::from_str(json).expect("deserialize");
        assert_eq!(c.device_pixel_ratio, 1.0);
    }
}
