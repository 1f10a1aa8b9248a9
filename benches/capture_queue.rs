//! Capture queue benchmark suite.
//!
//! Benchmarks the coordinator's bookkeeping at different batch sizes:
//! - Geometry math (offset, crop rect, device scaling) per batch
//! - Full enqueue-to-results drain over an instant stub surface
//!
//! Run with: cargo bench --bench capture_queue
//! Results saved to: target/criterion/

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use adsnap::capture::{
    CaptureCoordinator, CoordinatorConfig, FrameSource, ScrollSurface, crop_rect,
    target_scroll_offset, to_device_pixels,
};
use adsnap::detect::{DetectedElement, ElementRect};
use adsnap::identifiers::MarkerId;
use adsnap::page::{CaptureFormat, ViewportSize};
use adsnap::{Error, Result};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[8, 32, 128];

const VIEWPORT_HEIGHT: f64 = 600.0;

// ============================================================================
// Benchmark: Geometry Math
// ============================================================================

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");

    for &count in BATCH_SIZES {
        let elements = make_elements(count);
        group.bench_with_input(
            BenchmarkId::new("offset_and_crop", count),
            &elements,
            |b, elements| {
                b.iter(|| {
                    elements
                        .iter()
                        .map(|element| {
                            let offset = target_scroll_offset(element, VIEWPORT_HEIGHT);
                            let rect = crop_rect(element, offset);
                            to_device_pixels(&rect, 2.0)
                        })
                        .collect::<Vec<_>>()
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Benchmark: Queue Drain
// ============================================================================

fn bench_queue_drain(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("queue_drain");
    group.sample_size(20);

    for &count in BATCH_SIZES {
        group.bench_with_input(BenchmarkId::new("drain", count), &count, |b, &count| {
            b.to_async(&rt).iter(|| async move { drain_batch(count).await });
        });
    }

    group.finish();
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Runs one batch through a fresh coordinator and reports successes.
async fn drain_batch(count: usize) -> usize {
    let coordinator =
        CaptureCoordinator::with_config(Arc::new(InstantSurface), instant_config());

    let results = match coordinator.enqueue(make_elements(count)).await {
        Ok(results) => results,
        Err(_) => return 0,
    };

    results.iter().filter(|r| r.success).count()
}

fn make_elements(count: usize) -> Vec<DetectedElement> {
    (0..count)
        .map(|i| DetectedElement {
            width: 300.0,
            height: 250.0,
            page_x: 10.0,
            page_y: 100.0 + i as f64 * 400.0,
            device_pixel_ratio: 1.0,
            marker: MarkerId::new(i.to_string()),
        })
        .collect()
}

/// Coordinator config with every real-world delay zeroed out, so the
/// benchmark measures queue bookkeeping rather than sleeps.
fn instant_config() -> CoordinatorConfig {
    CoordinatorConfig {
        settle_delay: Duration::ZERO,
        job_pause: Duration::ZERO,
        crop_to_element: false,
        reset_scroll: false,
        ..CoordinatorConfig::default()
    }
}

// ============================================================================
// Stub Surface
// ============================================================================

/// Surface whose every operation completes immediately.
struct InstantSurface;

#[async_trait]
impl ScrollSurface for InstantSurface {
    async fn scroll_to(&self, _top: f64) -> Result<()> {
        Ok(())
    }

    async fn viewport_size(&self) -> Result<ViewportSize> {
        Ok(ViewportSize {
            width: 1280.0,
            height: VIEWPORT_HEIGHT,
        })
    }

    async fn locate(&self, _marker: &MarkerId) -> Result<Option<ElementRect>> {
        Err(Error::protocol("locate not scripted in benchmarks"))
    }
}

#[async_trait]
impl FrameSource for InstantSurface {
    async fn capture_visible(&self, _format: CaptureFormat) -> Result<Vec<u8>> {
        Ok(vec![0u8; 64])
    }
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_geometry, bench_queue_drain);
criterion_main!(benches);
