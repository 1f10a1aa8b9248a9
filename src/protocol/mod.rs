//! WebSocket protocol message types.
//!
//! This module defines the message format for communication between
//! the local end (Rust host) and the remote end (page agent).
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Remote | Command request |
//! | `Response` | Remote → Local | Command response |
//! | `Event` | Remote → Local | Page notification |
//!
//! # Command Naming
//!
//! Commands follow `module.methodName` format:
//!
//! - `page.scrollTo`
//! - `detect.scan`
//! - `capture.visibleTab`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `event` | Event types |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by module.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{CaptureCommand, Command, DetectCommand, PageCommand, ScrollBehavior};
pub use event::{Event, ParsedEvent};
pub use request::{Request, Response, ResponseType};
