//! Capture coordination: one queue, one job at a time.
//!
//! The platform's visible-tab capture works on whatever is on screen,
//! so every capture owns the scroll position while it runs. All jobs
//! from all batches share a single FIFO queue drained by one drive
//! loop; at most one job is ever scrolling or capturing.
//!
//! # Architecture
//!
//! ```text
//! Detector ──► CaptureCoordinator ──► CaptureSink
//!   scan()         enqueue()            persist()
//!                     │
//!                     ▼
//!            ┌───────────────────┐
//!            │  FIFO job queue   │  one drive loop:
//!            │ (process lifetime)│  scroll → settle →
//!            └───────────────────┘  capture → crop
//! ```
//!
//! # Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `geometry` | Scroll-offset and crop-rectangle math |
//! | `crop` | Pixel-space cropping of captured frames |
//! | `job` | Job lifecycle states and per-job results |

mod crop;
mod geometry;
mod job;

pub use self::geometry::{CropRect, DeviceRect, crop_rect, target_scroll_offset, to_device_pixels};
pub use self::job::{CaptureResult, JobState};

pub(crate) use self::job::unix_millis;

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::detect::{DetectedElement, ElementRect};
use crate::error::{Error, Result};
use crate::identifiers::{BatchId, MarkerId};
use crate::page::{CaptureFormat, Page, ViewportSize};

use self::job::CaptureJob;

// ============================================================================
// Constants
// ============================================================================

/// Default delay after scrolling before the frame is captured.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(800);

/// Smallest settle delay the builder accepts.
pub const MIN_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Largest settle delay the builder accepts.
pub const MAX_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Default pause between consecutive jobs.
pub const DEFAULT_JOB_PAUSE: Duration = Duration::from_millis(300);

/// Viewport height assumed when the page reports nothing usable.
pub const DEFAULT_VIEWPORT_FALLBACK: f64 = 600.0;

/// Default timeout for a single scroll or capture operation.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Surface Traits
// ============================================================================

/// Scroll access to the page a capture runs against.
///
/// Implemented by [`Page`]; tests substitute in-process stubs.
#[async_trait]
pub trait ScrollSurface: Send + Sync {
    /// Scrolls the page so `top` becomes the top of the viewport.
    async fn scroll_to(&self, top: f64) -> Result<()>;

    /// Returns the current viewport size in CSS pixels.
    async fn viewport_size(&self) -> Result<ViewportSize>;

    /// Re-resolves a marked element, `None` if it left the DOM.
    async fn locate(&self, marker: &MarkerId) -> Result<Option<ElementRect>>;
}

/// Produces encoded frames of the currently visible viewport.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Captures the visible viewport as encoded image bytes.
    async fn capture_visible(&self, format: CaptureFormat) -> Result<Vec<u8>>;
}

/// Everything the coordinator needs from a page.
///
/// Blanket-implemented for any type that can both scroll and capture.
pub trait CaptureSurface: ScrollSurface + FrameSource {}

impl<T: ScrollSurface + FrameSource> CaptureSurface for T {}

// ============================================================================
// CoordinatorConfig
// ============================================================================

/// Tuning knobs for the capture coordinator.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use adsnap::capture::CoordinatorConfig;
/// use adsnap::page::CaptureFormat;
///
/// let config = CoordinatorConfig::default()
///     .with_settle_delay(Duration::from_millis(600))
///     .with_format(CaptureFormat::jpeg(90))
///     .with_revalidation(true);
/// assert_eq!(config.settle_delay, Duration::from_millis(600));
/// ```
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Delay between scroll completion and capture, letting lazy-load
    /// and animation settle. The builder clamps this to 500..=1000 ms.
    pub settle_delay: Duration,

    /// Pause between consecutive jobs, skipped after the final job.
    pub job_pause: Duration,

    /// Viewport height used when the page reports zero.
    pub viewport_fallback: f64,

    /// Image format for captured frames.
    pub format: CaptureFormat,

    /// Re-resolve each element just before scrolling to it.
    pub revalidate: bool,

    /// Crop each frame down to the element's rectangle.
    pub crop_to_element: bool,

    /// Timeout for a single scroll, locate, or capture operation.
    pub op_timeout: Duration,

    /// Scroll back to the top once the queue drains.
    pub reset_scroll: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            job_pause: DEFAULT_JOB_PAUSE,
            viewport_fallback: DEFAULT_VIEWPORT_FALLBACK,
            format: CaptureFormat::Png,
            revalidate: false,
            crop_to_element: true,
            op_timeout: DEFAULT_OP_TIMEOUT,
            reset_scroll: true,
        }
    }
}

// ============================================================================
// CoordinatorConfig - Builder Methods
// ============================================================================

impl CoordinatorConfig {
    /// Sets the settle delay, clamped to 500..=1000 ms.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay.clamp(MIN_SETTLE_DELAY, MAX_SETTLE_DELAY);
        self
    }

    /// Sets the pause between consecutive jobs.
    #[must_use]
    pub fn with_job_pause(mut self, pause: Duration) -> Self {
        self.job_pause = pause;
        self
    }

    /// Sets the viewport height fallback.
    #[must_use]
    pub fn with_viewport_fallback(mut self, height: f64) -> Self {
        self.viewport_fallback = height;
        self
    }

    /// Sets the capture image format.
    #[must_use]
    pub fn with_format(mut self, format: CaptureFormat) -> Self {
        self.format = format;
        self
    }

    /// Enables or disables pre-scroll element revalidation.
    #[must_use]
    pub fn with_revalidation(mut self, revalidate: bool) -> Self {
        self.revalidate = revalidate;
        self
    }

    /// Enables or disables cropping frames to the element rectangle.
    #[must_use]
    pub fn with_cropping(mut self, crop: bool) -> Self {
        self.crop_to_element = crop;
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Enables or disables the post-drain scroll reset.
    #[must_use]
    pub fn with_reset_scroll(mut self, reset: bool) -> Self {
        self.reset_scroll = reset;
        self
    }
}

// ============================================================================
// Coordinator Internals
// ============================================================================

/// One `enqueue` call waiting for its jobs to finish.
struct BatchWaiter {
    batch: BatchId,
    remaining: usize,
    results: Vec<CaptureResult>,
    tx: oneshot::Sender<Vec<CaptureResult>>,
}

/// Mutable coordinator state behind one lock.
struct CoordinatorState {
    /// Shared FIFO queue, fed by every batch in arrival order.
    queue: VecDeque<CaptureJob>,
    /// Whether a drive loop currently owns the queue.
    active: bool,
    /// Batch, sequence index and state of the in-flight job.
    active_job: Option<(BatchId, usize, JobState)>,
    /// Unfinished batches, in arrival order.
    waiters: Vec<BatchWaiter>,
}

struct CoordinatorInner {
    surface: Arc<dyn CaptureSurface>,
    config: CoordinatorConfig,
    state: Mutex<CoordinatorState>,
}

// ============================================================================
// CaptureCoordinator
// ============================================================================

/// Serializes element captures into a single scroll-and-shoot loop.
///
/// Cloning is cheap; clones share the queue. The drive loop is spawned
/// lazily on the first enqueue and exits when the queue drains.
///
/// # Example
///
/// ```ignore
/// let coordinator = CaptureCoordinator::new(Arc::new(page.clone()));
/// let elements = detector.scan().await?;
/// let results = coordinator.enqueue(elements).await?;
/// for result in &results {
///     println!("#{}: success={}", result.sequence_index, result.success);
/// }
/// ```
#[derive(Clone)]
pub struct CaptureCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl fmt::Debug for CaptureCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CaptureCoordinator")
            .field("queued", &state.queue.len())
            .field("active", &state.active)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CaptureCoordinator - Constructor
// ============================================================================

impl CaptureCoordinator {
    /// Creates a coordinator over `surface` with default configuration.
    #[must_use]
    pub fn new(surface: Arc<dyn CaptureSurface>) -> Self {
        Self::with_config(surface, CoordinatorConfig::default())
    }

    /// Creates a coordinator with explicit configuration.
    #[must_use]
    pub fn with_config(surface: Arc<dyn CaptureSurface>, config: CoordinatorConfig) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                surface,
                config,
                state: Mutex::new(CoordinatorState {
                    queue: VecDeque::new(),
                    active: false,
                    active_job: None,
                    waiters: Vec::new(),
                }),
            }),
        }
    }

    /// Returns the coordinator's configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }
}

// ============================================================================
// CaptureCoordinator - Public API
// ============================================================================

impl CaptureCoordinator {
    /// Queues one batch of elements and waits for all of its results.
    ///
    /// The viewport is measured once per batch and every job's scroll
    /// offset is fixed from it at enqueue time. Jobs append to the
    /// shared queue behind earlier batches; the returned results cover
    /// exactly this batch, in input order, one per element.
    ///
    /// An empty `elements` resolves immediately without touching the
    /// queue. Per-job failures are reported inside [`CaptureResult`];
    /// only failures before any job starts surface as `Err`.
    ///
    /// # Errors
    ///
    /// - Viewport query errors, verbatim from the page surface
    /// - [`Error::ChannelClosed`] if the coordinator is torn down
    ///   while the batch is still queued
    pub async fn enqueue(&self, elements: Vec<DetectedElement>) -> Result<Vec<CaptureResult>> {
        if elements.is_empty() {
            debug!("Enqueue called with no elements");
            return Ok(Vec::new());
        }

        let viewport = self.inner.surface.viewport_size().await?;
        let viewport_height = usable_height(&viewport, self.inner.config.viewport_fallback);

        let batch = BatchId::next();
        let count = elements.len();
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.inner.state.lock();
            for (index, element) in elements.into_iter().enumerate() {
                let offset = geometry::target_scroll_offset(&element, viewport_height);
                state
                    .queue
                    .push_back(CaptureJob::new(index, batch, element, offset, viewport_height));
            }
            state.waiters.push(BatchWaiter {
                batch,
                remaining: count,
                results: Vec::with_capacity(count),
                tx,
            });

            if !state.active {
                state.active = true;
                tokio::spawn(Arc::clone(&self.inner).drive());
            }
        }

        info!(
            batch = %batch,
            jobs = count,
            viewport_height,
            "Capture batch enqueued"
        );

        let results = rx.await?;
        Ok(results)
    }

    /// Cancels every job still queued, returning how many were cut.
    ///
    /// The in-flight job, if any, runs to completion; its result is
    /// unaffected. Cancelled jobs resolve into their batches as
    /// [`JobState::Cancelled`] results.
    pub fn cancel_pending(&self) -> usize {
        let mut completed = Vec::new();
        let cancelled = {
            let mut state = self.inner.state.lock();
            let drained: Vec<CaptureJob> = state.queue.drain(..).collect();
            let count = drained.len();
            for job in drained {
                let result = CaptureResult::cancelled(job.sequence_index, job.element);
                if let Some(done) = CoordinatorInner::deliver(&mut state, job.batch, result) {
                    completed.push(done);
                }
            }
            count
        };

        for (tx, results) in completed {
            let _ = tx.send(results);
        }

        if cancelled > 0 {
            info!(cancelled, "Cancelled pending capture jobs");
        }
        cancelled
    }

    /// Returns the number of jobs still waiting in the queue.
    #[inline]
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Returns `true` while a drive loop owns the queue.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }

    /// Returns the state of the in-flight job, if any.
    #[inline]
    #[must_use]
    pub fn active_job_state(&self) -> Option<JobState> {
        self.inner.state.lock().active_job.map(|(_, _, state)| state)
    }
}

// ============================================================================
// Drive Loop
// ============================================================================

/// Clamps a reported viewport to something scroll math can use.
fn usable_height(viewport: &ViewportSize, fallback: f64) -> f64 {
    if viewport.height > 0.0 {
        viewport.height
    } else {
        warn!(
            reported = viewport.height,
            fallback, "Viewport height unusable, falling back"
        );
        fallback
    }
}

/// Extracts the reason string carried back with a failed job.
///
/// Platform capture errors are recorded verbatim; everything else
/// uses its display form.
fn failure_reason(error: &Error) -> String {
    match error {
        Error::CaptureFailed { message } => message.clone(),
        other => other.to_string(),
    }
}

/// Runs `future` under the per-operation timeout.
async fn step<T, F>(op_timeout: Duration, operation: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(op_timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(operation, op_timeout.as_millis() as u64)),
    }
}

impl CoordinatorInner {
    /// Background task that drains the queue one job at a time.
    async fn drive(self: Arc<Self>) {
        debug!("Capture drive loop started");

        loop {
            let next = { self.state.lock().queue.pop_front() };

            let Some(mut job) = next else {
                // Queue looks drained. Reset the scroll position while
                // still holding the active flag so a concurrent enqueue
                // cannot start a second loop mid-reset.
                if self.config.reset_scroll {
                    if let Err(e) = self.surface.scroll_to(0.0).await {
                        debug!(error = %e, "Post-drain scroll reset failed");
                    }
                }
                let mut state = self.state.lock();
                if state.queue.is_empty() {
                    state.active = false;
                    break;
                }
                // New work arrived during the reset
                continue;
            };

            {
                let mut state = self.state.lock();
                state.active_job = Some((job.batch, job.sequence_index, job.state));
            }

            let result = self.run_job(&mut job).await;

            let completed = {
                let mut state = self.state.lock();
                state.active_job = None;
                Self::deliver(&mut state, job.batch, result)
            };
            if let Some((tx, results)) = completed {
                let _ = tx.send(results);
            }

            let more_pending = { !self.state.lock().queue.is_empty() };
            if more_pending {
                tokio::time::sleep(self.config.job_pause).await;
            }
        }

        debug!("Capture drive loop terminated");
    }

    /// Runs a single job through scroll, settle, capture and crop.
    ///
    /// Never returns early with the queue disturbed: every failure
    /// folds into the job's own result and the loop moves on.
    async fn run_job(&self, job: &mut CaptureJob) -> CaptureResult {
        let config = &self.config;
        let seq = job.sequence_index;
        let mut element = job.element.clone();
        let mut offset = job.target_scroll_offset;

        if config.revalidate {
            match step(
                config.op_timeout,
                "detect.locate",
                self.surface.locate(&element.marker),
            )
            .await
            {
                Ok(Some(live)) => {
                    let moved = live.x != element.page_x
                        || live.y != element.page_y
                        || live.width != element.width
                        || live.height != element.height;
                    if moved {
                        debug!(
                            marker = %element.marker,
                            y = live.y,
                            "Element moved since detection, recomputing scroll target"
                        );
                        element.page_x = live.x;
                        element.page_y = live.y;
                        element.width = live.width;
                        element.height = live.height;
                        offset = geometry::target_scroll_offset(&element, job.viewport_height);
                    }
                }
                Ok(None) => {
                    let stale = Error::detection_stale(element.marker.clone());
                    warn!(sequence = seq, marker = %element.marker, "Element gone before capture");
                    return CaptureResult::failed(seq, element, failure_reason(&stale));
                }
                Err(e) => {
                    warn!(sequence = seq, error = %e, "Revalidation failed");
                    return CaptureResult::failed(seq, element, failure_reason(&e));
                }
            }
        }

        self.transition(job, JobState::Scrolling);
        debug!(sequence = seq, offset, "Scrolling to capture target");
        if let Err(e) = step(
            config.op_timeout,
            "page.scrollTo",
            self.surface.scroll_to(offset),
        )
        .await
        {
            warn!(sequence = seq, error = %e, "Scroll failed, skipping capture");
            return CaptureResult::failed(seq, element, failure_reason(&e));
        }

        tokio::time::sleep(config.settle_delay).await;

        self.transition(job, JobState::Capturing);
        let frame = match step(
            config.op_timeout,
            "capture.visibleTab",
            self.surface.capture_visible(config.format),
        )
        .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(sequence = seq, error = %e, "Capture failed");
                let mut result = CaptureResult::failed(seq, element, failure_reason(&e));
                result.scroll_offset_used = Some(offset);
                return result;
            }
        };

        let rect = geometry::crop_rect(&element, offset);
        let image = if config.crop_to_element {
            match crop::crop_frame(&frame, &rect, element.device_pixel_ratio, config.format) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(sequence = seq, error = %e, "Crop failed");
                    let mut result = CaptureResult::failed(seq, element, failure_reason(&e));
                    result.scroll_offset_used = Some(offset);
                    return result;
                }
            }
        } else {
            frame
        };

        debug!(sequence = seq, bytes = image.len(), "Capture complete");
        CaptureResult::succeeded(seq, element, image, rect, offset)
    }

    /// Records a job state change where observers can see it.
    fn transition(&self, job: &mut CaptureJob, state: JobState) {
        job.state = state;
        if let Some(active) = self.state.lock().active_job.as_mut() {
            active.2 = state;
        }
    }

    /// Folds a finished job into its batch waiter.
    ///
    /// Returns the waiter's channel and sorted results once the last
    /// job of the batch lands.
    fn deliver(
        state: &mut CoordinatorState,
        batch: BatchId,
        result: CaptureResult,
    ) -> Option<(oneshot::Sender<Vec<CaptureResult>>, Vec<CaptureResult>)> {
        let index = state.waiters.iter().position(|w| w.batch == batch)?;
        let waiter = &mut state.waiters[index];
        waiter.results.push(result);
        waiter.remaining = waiter.remaining.saturating_sub(1);
        if waiter.remaining > 0 {
            return None;
        }

        let mut done = state.waiters.remove(index);
        done.results.sort_by_key(|r| r.sequence_index);
        Some((done.tx, done.results))
    }
}

// ============================================================================
// Page Surface
// ============================================================================

#[async_trait]
impl ScrollSurface for Page {
    async fn scroll_to(&self, top: f64) -> Result<()> {
        Page::scroll_to(self, top).await
    }

    async fn viewport_size(&self) -> Result<ViewportSize> {
        Page::viewport_size(self).await
    }

    async fn locate(&self, marker: &MarkerId) -> Result<Option<ElementRect>> {
        Page::locate(self, marker).await
    }
}

#[async_trait]
impl FrameSource for Page {
    async fn capture_visible(&self, format: CaptureFormat) -> Result<Vec<u8>> {
        self.capture_visible_bytes(format).await
    }
}

// ============================================================================
// Tests
// ============================================================================
