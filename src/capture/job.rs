//! Capture job lifecycle and result types.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::detect::DetectedElement;
use crate::identifiers::BatchId;

use super::geometry::CropRect;

/// Milliseconds since the Unix epoch, zero if the clock is unset.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ============================================================================
// JobState
// ============================================================================

/// Lifecycle states of a capture job.
///
/// At most one job in the whole queue is `Scrolling` or `Capturing` at
/// any time; the visible-tab capture primitive is exclusive per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting in the queue.
    Queued,
    /// Scroll command issued, settle delay pending.
    Scrolling,
    /// Visible-tab capture in flight.
    Capturing,
    /// Terminal: captured and translated.
    Succeeded,
    /// Terminal: scroll or capture failed.
    Failed,
    /// Terminal: cancelled while still queued.
    Cancelled,
}

impl JobState {
    /// Returns `true` for states a job never leaves.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Returns `true` while the job holds the capture resource.
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Scrolling | Self::Capturing)
    }
}

// ============================================================================
// CaptureJob
// ============================================================================

/// One queued capture job.
///
/// Created at enqueue time with its scroll offset already computed
/// from the batch's viewport metrics; only the coordinator mutates it.
pub(crate) struct CaptureJob {
    /// Position within its batch (0-based).
    pub sequence_index: usize,
    /// Batch the job belongs to.
    pub batch: BatchId,
    /// Element to capture.
    pub element: DetectedElement,
    /// Scroll offset that centers the element.
    pub target_scroll_offset: f64,
    /// Viewport height the offset was computed against.
    pub viewport_height: f64,
    /// Current lifecycle state.
    pub state: JobState,
}

impl CaptureJob {
    /// Creates a queued job.
    pub(crate) fn new(
        sequence_index: usize,
        batch: BatchId,
        element: DetectedElement,
        target_scroll_offset: f64,
        viewport_height: f64,
    ) -> Self {
        Self {
            sequence_index,
            batch,
            element,
            target_scroll_offset,
            viewport_height,
            state: JobState::Queued,
        }
    }
}

// ============================================================================
// CaptureResult
// ============================================================================

/// Outcome of one capture job, exactly one per job, in job order.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// Position within the batch (0-based).
    pub sequence_index: usize,
    /// The element the job targeted.
    pub element: DetectedElement,
    /// `true` only for [`JobState::Succeeded`].
    pub success: bool,
    /// Terminal state of the job.
    pub state: JobState,
    /// Encoded image bytes, cropped when cropping is enabled.
    pub image_data: Option<Vec<u8>>,
    /// Where the element sits inside the captured frame.
    pub crop_rect: Option<CropRect>,
    /// Scroll offset the capture actually used.
    pub scroll_offset_used: Option<f64>,
    /// Unix milliseconds of the successful capture.
    pub captured_at_ms: Option<u64>,
    /// Failure reason, verbatim from the failing layer.
    pub error_reason: Option<String>,
}

impl CaptureResult {
    /// Builds a successful result.
    pub(crate) fn succeeded(
        sequence_index: usize,
        element: DetectedElement,
        image_data: Vec<u8>,
        crop_rect: CropRect,
        scroll_offset_used: f64,
    ) -> Self {
        Self {
            sequence_index,
            element,
            success: true,
            state: JobState::Succeeded,
            image_data: Some(image_data),
            crop_rect: Some(crop_rect),
            scroll_offset_used: Some(scroll_offset_used),
            captured_at_ms: Some(unix_millis()),
            error_reason: None,
        }
    }

    /// Builds a failed result.
    pub(crate) fn failed(
        sequence_index: usize,
        element: DetectedElement,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            sequence_index,
            element,
            success: false,
            state: JobState::Failed,
            image_data: None,
            crop_rect: None,
            scroll_offset_used: None,
            captured_at_ms: None,
            error_reason: Some(reason.into()),
        }
    }

    /// Builds a cancelled result.
    pub(crate) fn cancelled(sequence_index: usize, element: DetectedElement) -> Self {
        Self {
            sequence_index,
            element,
            success: false,
            state: JobState::Cancelled,
            image_data: None,
            crop_rect: None,
            scroll_offset_used: None,
            captured_at_ms: None,
            error_reason: Some("cancelled before scroll".to_string()),
        }
    }

    /// Returns `true` if the job was cancelled rather than failed.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state == JobState::Cancelled
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::MarkerId;

    fn element() -> DetectedElement {
        DetectedElement {
            width: 300.0,
            height: 250.0,
            page_x: 0.0,
            page_y: 100.0,
            device_pixel_ratio: 1.0,
            marker: MarkerId::new("0"),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Scrolling.is_terminal());
        assert!(!JobState::Capturing.is_terminal());
    }

    #[test]
    fn test_active_states() {
        assert!(JobState::Scrolling.is_active());
        assert!(JobState::Capturing.is_active());
        assert!(!JobState::Queued.is_active());
        assert!(!JobState::Succeeded.is_active());
    }

    #[test]
    fn test_new_job_starts_queued() {
        let job = CaptureJob::new(0, BatchId::next(), element(), 0.0, 600.0);
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.sequence_index, 0);
    }

    #[test]
    fn test_succeeded_result() {
        let rect = CropRect {
            x: 0.0,
            y: 100.0,
            width: 300.0,
            height: 250.0,
        };
        let result = CaptureResult::succeeded(1, element(), vec![1, 2, 3], rect, 0.0);

        assert!(result.success);
        assert_eq!(result.state, JobState::Succeeded);
        assert_eq!(result.image_data.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(result.crop_rect, Some(rect));
        assert_eq!(result.scroll_offset_used, Some(0.0));
        assert!(result.captured_at_ms.is_some_and(|ms| ms > 0));
        assert!(result.error_reason.is_none());
    }

    #[test]
    fn test_failed_result_keeps_reason() {
        let result = CaptureResult::failed(2, element(), "tab not capturable");

        assert!(!result.success);
        assert_eq!(result.state, JobState::Failed);
        assert!(result.image_data.is_none());
        assert_eq!(result.error_reason.as_deref(), Some("tab not capturable"));
        assert!(!result.is_cancelled());
    }

    #[test]
    fn test_cancelled_result() {
        let result = CaptureResult::cancelled(3, element());

        assert!(!result.success);
        assert!(result.is_cancelled());
        assert_eq!(result.state, JobState::Cancelled);
    }
}
