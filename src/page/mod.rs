//! Page handle for an attached browser tab.
//!
//! Each [`Page`] is the command surface of one page agent: a content
//! script that connected to the [`AgentPool`](crate::transport::AgentPool)
//! and announced its tab via the READY handshake. Methods serialize to
//! typed protocol commands and route through the pool by session.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Page struct, page info, accessors |
//! | `scroll` | Scroll control and viewport metrics |
//! | `capture` | Visible-viewport capture |
//! | `detect` | Candidate scanning, markers, highlights |
//!
//! # Example
//!
//! ```ignore
//! let page = host.wait_for_page().await?;
//!
//! // Scan for ad candidates
//! let candidates = page.scan(&classifier.selectors()).await?;
//!
//! // Scroll and capture
//! page.scroll_to(1745.0).await?;
//! let png = page.capture_visible_bytes(CaptureFormat::Png).await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod capture;
mod core;
mod detect;
mod scroll;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::capture::CaptureFormat;
pub use self::core::{Page, PageInfo};
pub use self::scroll::{PageMetrics, ScrollPosition, ViewportSize};
