//! End-to-end capture orchestration.
//!
//! [`CapturePipeline`] chains the three stages over one attached page:
//! detect ad elements, capture each one through the coordinator, and
//! hand the results to a sink. Each stage stays independently usable;
//! the pipeline only sequences them and reports a [`Summary`].
//!
//! # Example
//!
//! ```no_run
//! use adsnap::{CaptureHost, CapturePipeline, DownloadSink};
//!
//! # async fn example() -> adsnap::Result<()> {
//! let host = CaptureHost::builder().build().await?;
//! let page = host.wait_for_page().await?;
//!
//! let sink = DownloadSink::new("./captures")?;
//! let summary = CapturePipeline::new(page, Box::new(sink)).run().await?;
//!
//! println!("{}/{} captured", summary.succeeded, summary.total);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::capture::{CaptureCoordinator, CoordinatorConfig};
use crate::detect::{AdClassifier, Detector};
use crate::error::Result;
use crate::page::Page;
use crate::sink::{CaptureSink, SinkReport};

// ============================================================================
// Summary
// ============================================================================

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// Elements the detector handed to the coordinator.
    pub total: usize,
    /// Jobs that produced an image.
    pub succeeded: usize,
    /// Jobs that did not.
    pub failed: usize,
    /// What the sink did with the results.
    pub sink: SinkReport,
}

impl Summary {
    /// Returns the percentage of jobs that succeeded.
    ///
    /// A run with nothing to capture counts as fully successful.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.succeeded as f64 / self.total as f64 * 100.0
    }
}

// ============================================================================
// CapturePipeline
// ============================================================================

/// Scan-capture-persist orchestration over one page.
///
/// The page is scanned once per [`run()`] call; detection records are
/// frozen at scan time and the coordinator works from them. Captures
/// append to the coordinator's process-wide queue, so concurrent runs
/// over different pipelines never overlap captures on the same window.
///
/// [`run()`]: CapturePipeline::run
pub struct CapturePipeline {
    /// Page all three stages operate on.
    page: Page,
    /// Detection stage.
    detector: Detector,
    /// Capture stage.
    coordinator: CaptureCoordinator,
    /// Persistence stage.
    sink: Box<dyn CaptureSink>,
    /// Whether to draw numbered overlays before capturing.
    highlight: bool,
}

impl fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("page", &self.page)
            .field("highlight", &self.highlight)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CapturePipeline - Construction
// ============================================================================

impl CapturePipeline {
    /// Creates a pipeline with default coordinator configuration and
    /// the default signature classifier.
    #[must_use]
    pub fn new(page: Page, sink: Box<dyn CaptureSink>) -> Self {
        Self::with_config(page, sink, CoordinatorConfig::default())
    }

    /// Creates a pipeline with a custom coordinator configuration.
    #[must_use]
    pub fn with_config(page: Page, sink: Box<dyn CaptureSink>, config: CoordinatorConfig) -> Self {
        let detector = Detector::new(page.clone());
        let coordinator = CaptureCoordinator::with_config(Arc::new(page.clone()), config);

        Self {
            page,
            detector,
            coordinator,
            sink,
            highlight: false,
        }
    }

    /// Replaces the classification policy.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn AdClassifier>) -> Self {
        self.detector = Detector::with_classifier(self.page.clone(), classifier);
        self
    }

    /// Enables or disables highlight overlays before capture.
    ///
    /// Overlays are drawn on the page, so they appear in the captured
    /// images. Off by default.
    #[must_use]
    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    /// Returns the coordinator, e.g. to cancel pending jobs.
    #[inline]
    #[must_use]
    pub fn coordinator(&self) -> &CaptureCoordinator {
        &self.coordinator
    }
}

// ============================================================================
// CapturePipeline - Run
// ============================================================================

impl CapturePipeline {
    /// Runs one full scan-capture-persist cycle.
    ///
    /// Per-element capture failures are folded into the summary, not
    /// returned as errors.
    ///
    /// # Errors
    ///
    /// - Scan or page-info failures (nothing to work with)
    /// - Viewport metrics unavailable at capture start
    /// - [`Error::PersistenceFailed`] from the sink
    ///
    /// [`Error::PersistenceFailed`]: crate::Error::PersistenceFailed
    pub async fn run(&self) -> Result<Summary> {
        let page_info = self.page.info().await?;
        info!(url = %page_info.url, domain = %page_info.domain, "Starting capture run");

        let elements = self.detector.scan().await?;
        if elements.is_empty() {
            info!(domain = %page_info.domain, "No ad elements detected");
            return Ok(Summary::default());
        }

        let total = elements.len();
        info!(count = total, "Ad elements detected");

        // Overlays are cosmetic; a failed draw never blocks the captures
        if self.highlight {
            if let Err(e) = self.detector.highlight(&elements).await {
                warn!(error = %e, "Highlighting failed, capturing without overlays");
            }
        }

        let results = self.coordinator.enqueue(elements).await?;
        let succeeded = results.iter().filter(|r| r.success).count();

        let sink = self.sink.persist(&page_info, &results).await?;

        let summary = Summary {
            total,
            succeeded,
            failed: total - succeeded,
            sink,
        };

        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            saved = summary.sink.saved_count(),
            success_rate = format!("{:.1}%", summary.success_rate()),
            "Capture run complete"
        );

        Ok(summary)
    }
}

// ============================================================================
// Tests
// ============================================================================
