//! Error types for adsnap.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use adsnap::{Result, Error};
//!
//! async fn example(page: &Page) -> Result<()> {
//!     page.scroll_to(1200.0).await?;
//!     let frame = page.capture_visible(Default::default()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::AgentGone`] |
//! | Protocol | [`Error::Protocol`], [`Error::CommandFailed`] |
//! | Capture pipeline | [`Error::DetectionStale`], [`Error::ScrollFailed`], [`Error::CaptureFailed`], [`Error::InvalidImage`], [`Error::Cancelled`] |
//! | Persistence | [`Error::PersistenceFailed`] |
//! | Execution | [`Error::Timeout`], [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! Per-job capture failures are additionally folded into
//! [`CaptureResult`](crate::capture::CaptureResult) entries by the
//! coordinator; only pipeline-start failures surface as `Err` from
//! [`enqueue`](crate::capture::CaptureCoordinator::enqueue).

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{MarkerId, RequestId, SessionId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when host or coordinator configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the agent connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for a page agent.
    ///
    /// Returned when no agent connects within the timeout period.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    ///
    /// Returned when the connection is lost during operation.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Page agent no longer registered.
    ///
    /// Returned when a command is routed to a session that has
    /// disconnected, typically because the tab was closed.
    #[error("Page agent gone: session={session_id}")]
    AgentGone {
        /// Session whose agent disappeared.
        session_id: SessionId,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected response.
    ///
    /// Returned when a protocol message format is invalid.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Agent reported a command failure.
    ///
    /// Returned when the page agent executed a command and sent back
    /// an error payload instead of a result.
    #[error("Command {command} failed: {message}")]
    CommandFailed {
        /// The command method that failed.
        command: String,
        /// Error message reported by the agent.
        message: String,
    },

    // ========================================================================
    // Capture Pipeline Errors
    // ========================================================================
    /// Detected element could not be re-located at capture time.
    ///
    /// Returned by the re-validation step when the marker attribute no
    /// longer resolves to a live element. Staleness is an expected
    /// outcome of page mutation, not a bug.
    #[error("Detection stale: marker={marker}")]
    DetectionStale {
        /// Marker of the element that vanished.
        marker: MarkerId,
    },

    /// Scroll command could not be issued or acknowledged.
    ///
    /// The affected job fails without a capture attempt.
    #[error("Scroll failed: {message}")]
    ScrollFailed {
        /// Description of the scroll failure.
        message: String,
    },

    /// Visible-viewport capture returned a platform error.
    ///
    /// The platform's reason is preserved verbatim for diagnostics.
    #[error("Capture failed: {message}")]
    CaptureFailed {
        /// Error reason reported by the capture platform.
        message: String,
    },

    /// Captured frame could not be decoded or cropped.
    #[error("Invalid image data: {message}")]
    InvalidImage {
        /// Description of the image failure.
        message: String,
    },

    /// Batch processing was cancelled before this job started.
    #[error("Capture cancelled")]
    Cancelled,

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// Downstream write failed.
    ///
    /// Does not retroactively invalidate capture results; surfaced on
    /// the sink's own error channel.
    #[error("Persistence failed at {path}: {message}")]
    PersistenceFailed {
        /// Path of the failed write.
        path: PathBuf,
        /// Description of the write failure.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation timeout.
    ///
    /// Returned when an operation exceeds its timeout duration.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Command request timeout.
    ///
    /// Returned when a WebSocket request times out.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an agent gone error.
    #[inline]
    pub fn agent_gone(session_id: SessionId) -> Self {
        Self::AgentGone { session_id }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a command failed error.
    #[inline]
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a detection stale error.
    #[inline]
    pub fn detection_stale(marker: MarkerId) -> Self {
        Self::DetectionStale { marker }
    }

    /// Creates a scroll failed error.
    #[inline]
    pub fn scroll_failed(message: impl Into<String>) -> Self {
        Self::ScrollFailed {
            message: message.into(),
        }
    }

    /// Creates a capture failed error.
    #[inline]
    pub fn capture_failed(message: impl Into<String>) -> Self {
        Self::CaptureFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid image error.
    #[inline]
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    /// Creates a persistence failed error.
    #[inline]
    pub fn persistence_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PersistenceFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::AgentGone { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a per-job capture pipeline error.
    ///
    /// These errors are folded into individual [`CaptureResult`] entries
    /// rather than aborting a batch.
    ///
    /// [`CaptureResult`]: crate::capture::CaptureResult
    #[inline]
    #[must_use]
    pub fn is_capture_error(&self) -> bool {
        matches!(
            self,
            Self::DetectionStale { .. }
                | Self::ScrollFailed { .. }
                | Self::CaptureFailed { .. }
                | Self::InvalidImage { .. }
                | Self::Cancelled
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::Timeout { .. }
                | Self::RequestTimeout { .. }
                | Self::DetectionStale { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "Connection failed: failed to connect");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing output directory");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing output directory"
        );
    }

    #[test]
    fn test_capture_failed_preserves_reason() {
        let err = Error::capture_failed("tab not capturable: about:blank");
        assert_eq!(
            err.to_string(),
            "Capture failed: tab not capturable: about:blank"
        );
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::ConnectionTimeout { timeout_ms: 5000 };
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        let conn_err = Error::connection("test");
        let timeout_err = Error::ConnectionTimeout { timeout_ms: 1000 };
        let closed_err = Error::ConnectionClosed;
        let other_err = Error::config("test");

        assert!(conn_err.is_connection_error());
        assert!(timeout_err.is_connection_error());
        assert!(closed_err.is_connection_error());
        assert!(!other_err.is_connection_error());
    }

    #[test]
    fn test_is_capture_error() {
        let scroll_err = Error::scroll_failed("no scrollable frame");
        let capture_err = Error::capture_failed("rate limited");
        let stale_err = Error::detection_stale(MarkerId::new("3"));
        let config_err = Error::config("test");

        assert!(scroll_err.is_capture_error());
        assert!(capture_err.is_capture_error());
        assert!(stale_err.is_capture_error());
        assert!(!config_err.is_capture_error());
    }

    #[test]
    fn test_is_recoverable() {
        let timeout_err = Error::Timeout {
            operation: "test".into(),
            timeout_ms: 1000,
        };
        let config_err = Error::config("test");

        assert!(timeout_err.is_recoverable());
        assert!(!config_err.is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
