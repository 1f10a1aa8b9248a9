//! Capture host module.
//!
//! This module provides the main entry point for attaching to pages.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CaptureHost`] | WebSocket endpoint and page factory |
//! | [`CaptureHostBuilder`] | Fluent configuration builder |
//!
//! # Example
//!
//! ```no_run
//! use adsnap::{CaptureHost, Result};
//!
//! # async fn example() -> Result<()> {
//! let host = CaptureHost::builder().build().await?;
//!
//! // Point the browser-side agent at host.ws_url(), then:
//! let page = host.wait_for_page().await?;
//! let info = page.info().await?;
//!
//! println!("Attached to {}", info.url);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for host configuration.
pub mod builder;

/// Core host implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::builder::CaptureHostBuilder;
pub use self::core::CaptureHost;
