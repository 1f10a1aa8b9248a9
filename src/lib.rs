//! adsnap - Ad-element detection and per-element screenshot capture.
//!
//! This library detects advertising elements on a live web page and
//! captures a cropped screenshot of each one, coordinating scrolling,
//! settling, and the exclusive visible-viewport capture primitive.
//!
//! # Architecture
//!
//! The pipeline follows a client-server model:
//!
//! - **Host (Rust)**: Owns the capture queue, classifier policy, and
//!   persistence; sends commands over WebSocket
//! - **Page agent (browser side)**: Executes page-scoped commands
//!   (scan, scroll, locate, highlight) and the privileged capture
//!
//! Key design principles:
//!
//! - One process-wide FIFO capture queue; at most one job is ever
//!   scrolling or capturing (the capture primitive is exclusive)
//! - Detection geometry is frozen at scan time; a marker stamped on
//!   each element is the only live link back to the DOM
//! - Per-element failures produce failed results, never lost batches
//! - Protocol uses `module.methodName` format (BiDi-inspired)
//!
//! # Quick Start
//!
//! ```no_run
//! use adsnap::{CaptureHost, CapturePipeline, DownloadSink, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Bind the endpoint and wait for a page agent to connect
//!     let host = CaptureHost::builder().build().await?;
//!     println!("Agent URL: {}", host.ws_url());
//!
//!     let page = host.wait_for_page().await?;
//!
//!     // Detect, capture, and save every ad on the page
//!     let sink = DownloadSink::new("./captures")?.with_manifest(true);
//!     let summary = CapturePipeline::new(page, Box::new(sink)).run().await?;
//!
//!     println!("{}/{} ads captured", summary.succeeded, summary.total);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capture`] | Capture coordinator, queue, geometry, cropping |
//! | [`detect`] | [`Detector`] and pluggable ad classification |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | [`CaptureHost`]: endpoint and page factory |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`page`] | [`Page`]: command surface of one attached tab |
//! | [`pipeline`] | Scan-capture-persist orchestration |
//! | [`protocol`] | WebSocket message types (internal) |
//! | [`sink`] | Persistence sinks for capture results |
//! | [`transport`] | WebSocket transport layer (internal) |
//!
//! # Features
//!
//! - **Serialized captures**: concurrent batches append to one queue,
//!   never overlapping the platform's single-capture window
//! - **Coordinate translation**: page-absolute geometry mapped into
//!   each captured frame, DPR-aware, clamped to frame bounds
//! - **Failure isolation**: one stale or refused element never costs
//!   the rest of the batch
//! - **Download-folder layout**: self-describing filenames grouped by
//!   domain, with an optional JSON manifest per batch

// ============================================================================
// Modules
// ============================================================================

/// Capture coordination: queue, scroll-settle-capture, cropping.
///
/// The heart of the crate. [`CaptureCoordinator`] serializes capture
/// jobs; geometry helpers translate page coordinates into frames.
pub mod capture;

/// Ad-element detection.
///
/// [`Detector`] scans a page through an [`AdClassifier`] policy and
/// produces frozen [`DetectedElement`] records.
pub mod detect;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Capture host: WebSocket endpoint and page factory.
///
/// Use [`CaptureHost::builder()`] to create a configured host instance.
pub mod host;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Page handle for an attached browser tab.
///
/// Each [`Page`] exposes scrolling, metrics, scanning, and capture for
/// one agent connection.
pub mod page;

/// End-to-end orchestration.
///
/// [`CapturePipeline`] chains detection, capture, and persistence over
/// one page and reports a [`Summary`].
pub mod pipeline;

/// WebSocket protocol message types.
///
/// Internal module defining command/response/event structures.
pub mod protocol;

/// Persistence sinks.
///
/// [`CaptureSink`] implementations decide where capture results go;
/// [`DownloadSink`] writes a download-folder layout.
pub mod sink;

/// WebSocket transport layer.
///
/// Internal module handling the listener and connection management.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Capture types
pub use capture::{
    CaptureCoordinator, CaptureResult, CoordinatorConfig, CropRect, FrameSource, JobState,
    ScrollSurface,
};

// Detection types
pub use detect::{
    AdCandidate, AdClassifier, DetectedElement, Detector, ElementRect, SignatureClassifier,
};

// Error types
pub use error::{Error, Result};

// Host types
pub use host::{CaptureHost, CaptureHostBuilder};

// Identifier types
pub use identifiers::{BatchId, MarkerId, RequestId, SessionId, TabId};

// Page types
pub use page::{CaptureFormat, Page, PageInfo, ViewportSize};

// Pipeline types
pub use pipeline::{CapturePipeline, Summary};

// Sink types
pub use sink::{CaptureSink, DownloadSink, SinkReport};
