//! Filesystem sink mirroring a browser download folder.
//!
//! Screenshots land under `<root>/ad_screenshots/<domain>/` with
//! self-describing names:
//!
//! ```text
//! ad_screenshots/
//! └── example.com/
//!     ├── ad_1_300x250_1724580000123.png
//!     ├── ad_2_728x90_1724580001456.png
//!     └── summary_1724580000000.json        (opt-in)
//! ```
//!
//! Sequence numbers are 1-based and count successful captures only.
//! A write that fails under the per-domain directory is retried once
//! with a flat name directly under the root; a second failure is
//! logged and the batch moves on.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::capture::{CaptureResult, unix_millis};
use crate::error::{Error, Result};
use crate::page::{CaptureFormat, PageInfo};

use super::{CaptureSink, SinkReport};

// ============================================================================
// Constants
// ============================================================================

/// Top-level directory all screenshots go under.
const SCREENSHOT_DIR: &str = "ad_screenshots";

/// Manifest filename prefix.
const MANIFEST_PREFIX: &str = "summary";

/// How the manifest records where its coordinates came from.
const CAPTURE_METHOD: &str = "agent_coordinates";

// ============================================================================
// DownloadSink
// ============================================================================

/// Writes capture results into a download-folder layout on disk.
///
/// # Temporary Roots
///
/// Created with [`DownloadSink::new_temp()`], the root directory is
/// deleted when the sink is dropped. [`DownloadSink::new()`] targets a
/// persistent directory, creating it if needed.
///
/// # Example
///
/// ```no_run
/// use adsnap::sink::DownloadSink;
///
/// # fn example() -> adsnap::Result<()> {
/// let sink = DownloadSink::new("./captures")?.with_manifest(true);
/// println!("Saving under: {}", sink.root().display());
/// # Ok(())
/// # }
/// ```
pub struct DownloadSink {
    /// Optional temporary directory handle (keeps temp dir alive).
    _temp_dir: Option<TempDir>,

    /// Root directory screenshots are written under.
    root: PathBuf,

    /// Extension stamped onto screenshot filenames.
    format: CaptureFormat,

    /// Whether to write a JSON manifest next to the screenshots.
    write_manifest: bool,
}

// ============================================================================
// DownloadSink - Constructors
// ============================================================================

impl DownloadSink {
    /// Creates a sink rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PersistenceFailed`] if the directory cannot be
    /// created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| {
                Error::persistence_failed(&root, format!("Failed to create sink root: {}", e))
            })?;
            debug!(root = %root.display(), "Created sink root directory");
        }

        Ok(Self {
            _temp_dir: None,
            root,
            format: CaptureFormat::Png,
            write_manifest: false,
        })
    }

    /// Creates a sink rooted in a fresh temporary directory.
    ///
    /// The directory and everything in it are deleted when the sink
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PersistenceFailed`] if the temporary directory
    /// cannot be created.
    pub fn new_temp() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("adsnap-").map_err(|e| {
            Error::persistence_failed(
                std::env::temp_dir(),
                format!("Failed to create temp sink root: {}", e),
            )
        })?;

        let root = temp_dir.path().to_path_buf();
        debug!(root = %root.display(), "Created temporary sink root");

        Ok(Self {
            _temp_dir: Some(temp_dir),
            root,
            format: CaptureFormat::Png,
            write_manifest: false,
        })
    }
}

// ============================================================================
// DownloadSink - Builder Methods
// ============================================================================

impl DownloadSink {
    /// Sets the filename extension to match the capture format.
    #[must_use]
    pub fn with_format(mut self, format: CaptureFormat) -> Self {
        self.format = format;
        self
    }

    /// Enables or disables the per-batch JSON manifest.
    #[must_use]
    pub fn with_manifest(mut self, write_manifest: bool) -> Self {
        self.write_manifest = write_manifest;
        self
    }
}

// ============================================================================
// DownloadSink - Accessors
// ============================================================================

impl DownloadSink {
    /// Returns the root directory screenshots are written under.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

// ============================================================================
// DownloadSink - CaptureSink
// ============================================================================

#[async_trait]
impl CaptureSink for DownloadSink {
    async fn persist(&self, page: &PageInfo, results: &[CaptureResult]) -> Result<SinkReport> {
        let successful: Vec<&CaptureResult> = results.iter().filter(|r| r.success).collect();
        let skipped = results.len() - successful.len();

        if successful.is_empty() {
            debug!(domain = %page.domain, skipped, "No successful captures to persist");
            return Ok(SinkReport {
                skipped,
                ..SinkReport::default()
            });
        }

        let batch_stamp = unix_millis();
        let dir = self
            .root
            .join(SCREENSHOT_DIR)
            .join(path_component(&page.domain));

        let mut report = SinkReport {
            skipped,
            ..SinkReport::default()
        };

        for (index, result) in successful.iter().enumerate() {
            let sequence = index + 1;
            let Some(image) = result.image_data.as_deref() else {
                warn!(sequence, "Successful result carries no image data");
                report.failed_writes += 1;
                continue;
            };

            let name = self.screenshot_name(result, sequence);
            match self.write_with_fallback(&dir, &name, image) {
                Ok(path) => {
                    debug!(path = %path.display(), "Screenshot written");
                    report.saved.push(path);
                }
                Err(e) => {
                    warn!(sequence, error = %e, "Screenshot write failed");
                    report.failed_writes += 1;
                }
            }
        }

        if self.write_manifest {
            let name = format!("{}_{}.json", MANIFEST_PREFIX, batch_stamp);
            match self.write_manifest_file(&dir, &name, page, batch_stamp, &successful) {
                Ok(path) => {
                    debug!(path = %path.display(), "Manifest written");
                    report.manifest = Some(path);
                }
                Err(e) => warn!(error = %e, "Manifest write failed"),
            }
        }

        info!(
            domain = %page.domain,
            saved = report.saved.len(),
            failed = report.failed_writes,
            skipped = report.skipped,
            "Capture batch persisted"
        );
        Ok(report)
    }
}

// ============================================================================
// DownloadSink - Write Helpers
// ============================================================================

impl DownloadSink {
    /// Builds a screenshot filename: `ad_<seq>_<W>x<H>_<unix-ms>.<ext>`.
    fn screenshot_name(&self, result: &CaptureResult, sequence: usize) -> String {
        format!(
            "ad_{}_{}x{}_{}.{}",
            sequence,
            result.element.width as u64,
            result.element.height as u64,
            result.captured_at_ms.unwrap_or_else(unix_millis),
            self.format.extension(),
        )
    }

    /// Writes under `dir`, retrying once flat under the root.
    fn write_with_fallback(&self, dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        match write_at(dir, name, bytes) {
            Ok(path) => Ok(path),
            Err(e) => {
                warn!(error = %e, name, "Nested write failed, retrying flat under root");
                write_at(&self.root, name, bytes)
            }
        }
    }

    /// Serializes and writes the batch manifest.
    fn write_manifest_file(
        &self,
        dir: &Path,
        name: &str,
        page: &PageInfo,
        batch_stamp: u64,
        successful: &[&CaptureResult],
    ) -> Result<PathBuf> {
        let manifest = Manifest {
            capture_info: CaptureInfo {
                timestamp: batch_stamp,
                url: &page.url,
                domain: &page.domain,
                title: &page.title,
                total_ads: successful.len(),
                capture_method: CAPTURE_METHOD,
            },
            ads: successful
                .iter()
                .enumerate()
                .map(|(index, result)| AdEntry::from_result(index + 1, result))
                .collect(),
        };

        let json = serde_json::to_vec_pretty(&manifest)?;
        self.write_with_fallback(dir, name, &json)
    }
}

/// Creates `dir` if needed and writes `name` into it.
fn write_at(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| {
        Error::persistence_failed(dir, format!("Failed to create directory: {}", e))
    })?;

    let path = dir.join(name);
    fs::write(&path, bytes)
        .map_err(|e| Error::persistence_failed(&path, format!("Failed to write file: {}", e)))?;
    Ok(path)
}

/// Makes a domain safe to use as a single path component.
///
/// Hostnames are already close to path-safe; IPv6 literals and
/// degenerate hosts are the exceptions.
fn path_component(domain: &str) -> String {
    let cleaned: String = domain
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '[' | ']' => '_',
            other => other,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        cleaned
    }
}

// ============================================================================
// Manifest
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    capture_info: CaptureInfo<'a>,
    ads: Vec<AdEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptureInfo<'a> {
    timestamp: u64,
    url: &'a str,
    domain: &'a str,
    title: &'a str,
    total_ads: usize,
    capture_method: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdEntry {
    sequence: usize,
    ad_info: AdInfo,
    screenshot_info: ScreenshotInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdInfo {
    dimensions: Dimensions,
    original_position: Position,
    device_pixel_ratio: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dimensions {
    width: f64,
    height: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Position {
    left: f64,
    top: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotInfo {
    coordinates_in_screenshot: Coordinates,
    scroll_position: f64,
    capture_timestamp: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Coordinates {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    center_x: f64,
    center_y: f64,
}

impl AdEntry {
    fn from_result(sequence: usize, result: &CaptureResult) -> Self {
        let rect = result.crop_rect.unwrap_or_default();
        Self {
            sequence,
            ad_info: AdInfo {
                dimensions: Dimensions {
                    width: result.element.width,
                    height: result.element.height,
                },
                original_position: Position {
                    left: result.element.page_x,
                    top: result.element.page_y,
                },
                device_pixel_ratio: result.element.device_pixel_ratio,
            },
            screenshot_info: ScreenshotInfo {
                coordinates_in_screenshot: Coordinates {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    center_x: rect.center_x(),
                    center_y: rect.center_y(),
                },
                scroll_position: result.scroll_offset_used.unwrap_or(0.0),
                capture_timestamp: result.captured_at_ms.unwrap_or(0),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use crate::capture::{crop_rect, target_scroll_offset};
    use crate::detect::DetectedElement;
    use crate::identifiers::MarkerId;

    use super::*;

    fn page() -> PageInfo {
        PageInfo {
            url: "https://example.com/article".to_string(),
            title: "Example Article".to_string(),
            domain: "example.com".to_string(),
        }
    }

    fn successful_result(sequence_index: usize, y: f64, width: f64, height: f64) -> CaptureResult {
        let element = DetectedElement {
            width,
            height,
            page_x: 0.0,
            page_y: y,
            device_pixel_ratio: 1.0,
            marker: MarkerId::new(format!("m-{sequence_index}")),
        };
        let offset = target_scroll_offset(&element, 600.0);
        let rect = crop_rect(&element, offset);
        CaptureResult::succeeded(sequence_index, element, vec![0x89, 0x50, 0x4e, 0x47], rect, offset)
    }

    fn failed_result(sequence_index: usize) -> CaptureResult {
        let element = DetectedElement {
            width: 300.0,
            height: 250.0,
            page_x: 0.0,
            page_y: 100.0,
            device_pixel_ratio: 1.0,
            marker: MarkerId::new(format!("m-{sequence_index}")),
        };
        CaptureResult::failed(sequence_index, element, "capture refused")
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_persist_writes_per_domain_files() {
        let sink = DownloadSink::new_temp().expect("temp sink");
        let results = vec![
            successful_result(0, 100.0, 300.0, 250.0),
            successful_result(1, 2000.0, 728.0, 90.0),
        ];

        let report = sink.persist(&page(), &results).await.expect("persist");

        assert_eq!(report.saved_count(), 2);
        assert_eq!(report.failed_writes, 0);
        assert_eq!(report.skipped, 0);

        let dir = sink.root().join("ad_screenshots").join("example.com");
        let names = names_in(&dir);
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("ad_1_300x250_"));
        assert!(names[1].starts_with("ad_2_728x90_"));
        assert!(names.iter().all(|n| n.ends_with(".png")));
    }

    #[tokio::test]
    async fn test_sequence_counts_successful_results_only() {
        let sink = DownloadSink::new_temp().expect("temp sink");
        let results = vec![failed_result(0), successful_result(1, 2000.0, 728.0, 90.0)];

        let report = sink.persist(&page(), &results).await.expect("persist");

        assert_eq!(report.saved_count(), 1);
        assert_eq!(report.skipped, 1);

        let dir = sink.root().join("ad_screenshots").join("example.com");
        let names = names_in(&dir);
        // The surviving capture is number 1, not number 2
        assert!(names[0].starts_with("ad_1_728x90_"));
    }

    #[tokio::test]
    async fn test_all_failed_batch_writes_nothing() {
        let sink = DownloadSink::new_temp().expect("temp sink");
        let results = vec![failed_result(0), failed_result(1)];

        let report = sink.persist(&page(), &results).await.expect("persist");

        assert_eq!(report.saved_count(), 0);
        assert_eq!(report.skipped, 2);
        assert!(!sink.root().join("ad_screenshots").exists());
    }

    #[tokio::test]
    async fn test_manifest_is_opt_in() {
        let sink = DownloadSink::new_temp().expect("temp sink");
        let results = vec![successful_result(0, 100.0, 300.0, 250.0)];

        let report = sink.persist(&page(), &results).await.expect("persist");
        assert!(report.manifest.is_none());

        let dir = sink.root().join("ad_screenshots").join("example.com");
        assert!(names_in(&dir).iter().all(|n| !n.starts_with("summary_")));
    }

    #[tokio::test]
    async fn test_manifest_describes_the_batch() {
        let sink = DownloadSink::new_temp().expect("temp sink").with_manifest(true);
        let results = vec![
            successful_result(0, 100.0, 300.0, 250.0),
            successful_result(1, 2000.0, 728.0, 90.0),
        ];

        let report = sink.persist(&page(), &results).await.expect("persist");
        let manifest_path = report.manifest.expect("manifest path");

        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(&manifest_path).expect("read manifest"))
                .expect("parse manifest");

        assert_eq!(json["captureInfo"]["domain"], "example.com");
        assert_eq!(json["captureInfo"]["totalAds"], 2);
        assert_eq!(json["captureInfo"]["captureMethod"], "agent_coordinates");

        let ads = json["ads"].as_array().expect("ads array");
        assert_eq!(ads.len(), 2);
        assert_eq!(ads[0]["sequence"], 1);
        assert_eq!(ads[0]["adInfo"]["dimensions"]["width"], 300.0);
        assert_eq!(ads[1]["screenshotInfo"]["scrollPosition"], 1745.0);
        assert_eq!(
            ads[1]["screenshotInfo"]["coordinatesInScreenshot"]["centerY"],
            300.0
        );
    }

    #[tokio::test]
    async fn test_nested_write_falls_back_to_flat() {
        let sink = DownloadSink::new_temp().expect("temp sink");
        // Occupy the nested path with a file so directory creation fails
        fs::write(sink.root().join("ad_screenshots"), b"in the way").expect("blocker");

        let results = vec![successful_result(0, 100.0, 300.0, 250.0)];
        let report = sink.persist(&page(), &results).await.expect("persist");

        assert_eq!(report.saved_count(), 1);
        assert_eq!(report.failed_writes, 0);
        assert_eq!(
            report.saved[0].parent().expect("parent"),
            sink.root(),
            "fallback writes flat under the root"
        );
    }

    #[tokio::test]
    async fn test_jpeg_extension_follows_format() {
        let sink = DownloadSink::new_temp()
            .expect("temp sink")
            .with_format(CaptureFormat::jpeg(85));
        let results = vec![successful_result(0, 100.0, 300.0, 250.0)];

        let report = sink.persist(&page(), &results).await.expect("persist");
        assert!(
            report.saved[0]
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".jpg"))
        );
    }

    #[test]
    fn test_domain_path_component() {
        assert_eq!(path_component("example.com"), "example.com");
        assert_eq!(path_component("sub.domain.co.uk"), "sub.domain.co.uk");
        assert_eq!(path_component("[::1]"), "___1_");
        assert_eq!(path_component(""), "unknown");
        assert_eq!(path_component("..."), "unknown");
    }

    #[test]
    fn test_new_creates_missing_root() {
        let base = tempfile::tempdir().expect("base dir");
        let target = base.path().join("nested").join("captures");

        let sink = DownloadSink::new(&target).expect("sink");
        assert!(target.is_dir());
        assert_eq!(sink.root(), target);
    }
}
