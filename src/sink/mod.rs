//! Persistence sinks for capture results.
//!
//! A sink receives a page's finished capture results and stores the
//! successful ones somewhere durable. The bundled [`DownloadSink`]
//! lays screenshots out under a per-domain download folder.

mod download;

pub use self::download::DownloadSink;

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use async_trait::async_trait;

use crate::capture::CaptureResult;
use crate::error::Result;
use crate::page::PageInfo;

// ============================================================================
// CaptureSink
// ============================================================================

/// Where finished captures go.
///
/// Implementations must tolerate partial batches: failed and cancelled
/// results arrive alongside successful ones and are never written.
#[async_trait]
pub trait CaptureSink: Send + Sync {
    /// Persists the successful results of one batch for one page.
    ///
    /// Sequence numbers restart at 1 for every call and count only
    /// the successful results, in their job order.
    async fn persist(&self, page: &PageInfo, results: &[CaptureResult]) -> Result<SinkReport>;
}

// ============================================================================
// SinkReport
// ============================================================================

/// Summary of one persist call.
#[derive(Debug, Clone, Default)]
pub struct SinkReport {
    /// Paths of the screenshots written, in sequence order.
    pub saved: Vec<PathBuf>,
    /// Successful results whose write failed even after retry.
    pub failed_writes: usize,
    /// Results skipped because their job failed or was cancelled.
    pub skipped: usize,
    /// Path of the manifest, when one was written.
    pub manifest: Option<PathBuf>,
}

impl SinkReport {
    /// Number of screenshots written.
    #[inline]
    #[must_use]
    pub fn saved_count(&self) -> usize {
        self.saved.len()
    }
}
