//! Ad capture demonstration.
//!
//! Demonstrates:
//! - Hosting the agent WebSocket endpoint
//! - Waiting for a page agent to attach
//! - Running the scan -> capture -> persist pipeline
//! - Reading the per-batch summary and saved files
//!
//! Point a page agent at the printed WebSocket URL once the host is up;
//! the pipeline runs as soon as the agent attaches.
//!
//! Usage:
//!   cargo run --example capture_ads
//!   cargo run --example capture_ads -- --no-wait
//!   cargo run --example capture_ads -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use adsnap::{CaptureHost, CapturePipeline, DownloadSink, Result};
use common::Args;

// ============================================================================
// Constants
// ============================================================================

const PORT: u16 = 9744;
const CAPTURE_DIR: &str = "./captures";
const ATTACH_WAIT: Duration = Duration::from_secs(120);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Capture Ads ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    println!("[Setup] Binding host endpoint...");

    let host = CaptureHost::builder()
        .port(PORT)
        .connect_timeout(ATTACH_WAIT)
        .build()
        .await?;

    println!("        ✓ Listening on {}\n", host.ws_url());

    println!("[Setup] Waiting for a page agent to attach...");
    println!("        (connect your agent to the URL above)");

    let page = host.wait_for_page().await?;
    let info = page.info().await?;
    println!(
        "        ✓ Attached: {} ({})\n",
        info.title, info.domain
    );

    // ========================================================================
    // Capture
    // ========================================================================

    println!("[1] Scan, capture and persist...");

    let sink = DownloadSink::new(CAPTURE_DIR)?.with_manifest(true);
    let pipeline = CapturePipeline::new(page, Box::new(sink));
    let summary = pipeline.run().await?;

    println!(
        "    ✓ {} detected, {} captured, {} failed ({:.1}% success)\n",
        summary.total,
        summary.succeeded,
        summary.failed,
        summary.success_rate()
    );

    // ========================================================================
    // Done
    // ========================================================================

    println!("[Summary] Saved screenshots:");
    if summary.sink.saved.is_empty() {
        println!("    (none)");
    }
    for path in &summary.sink.saved {
        if let Ok(metadata) = std::fs::metadata(path) {
            println!("    - {} ({} bytes)", path.display(), metadata.len());
        }
    }
    if let Some(manifest) = &summary.sink.manifest {
        println!("    - {} (manifest)", manifest.display());
    }

    println!("\n=== Capture complete ===\n");

    common::wait_for_exit(args.no_wait).await;

    println!("\n[Cleanup] Shutting down host...");
    host.shutdown().await;
    println!("          ✓ Done");

    Ok(())
}
