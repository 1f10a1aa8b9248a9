//! Visible-viewport capture methods.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{CaptureCommand, Command};

use super::Page;

// ============================================================================
// Types
// ============================================================================

/// Image format for captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureFormat {
    /// PNG format (lossless, larger file size).
    #[default]
    Png,
    /// JPEG format with quality (0-100).
    Jpeg(u8),
}

impl CaptureFormat {
    /// Creates PNG format.
    #[inline]
    #[must_use]
    pub fn png() -> Self {
        Self::Png
    }

    /// Creates JPEG format with quality (0-100).
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.min(100))
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg(_) => "image/jpeg",
        }
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpg",
        }
    }

    /// Returns the format string for the protocol.
    pub(crate) fn format_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpeg",
        }
    }

    /// Returns the quality value if JPEG.
    pub(crate) fn quality(&self) -> Option<u8> {
        match self {
            Self::Png => None,
            Self::Jpeg(q) => Some(*q),
        }
    }
}

// ============================================================================
// Page - Capture
// ============================================================================

impl Page {
    /// Captures the visible viewport and returns base64-encoded data.
    ///
    /// The capture primitive is exclusive per window; concurrent calls
    /// race on the platform side. The capture coordinator serializes
    /// its own calls and is the intended caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureFailed`] carrying the platform's reason
    /// verbatim if the capture is rejected.
    pub async fn capture_visible(&self, format: CaptureFormat) -> Result<String> {
        debug!(tab_id = %self.inner.tab_id, ?format, "Capturing visible viewport");

        let command = Command::Capture(CaptureCommand::VisibleTab {
            format: format.format_str().to_string(),
            quality: format.quality(),
        });

        let response = self.send_command(command).await?;

        if response.is_error() {
            return Err(Error::capture_failed(response.error_message()));
        }

        let data = response.get_string("data");
        if data.is_empty() {
            return Err(Error::capture_failed("capture response missing data field"));
        }

        // The platform hands back a data URL; keep only the payload
        let payload = data
            .split_once("base64,")
            .map(|(_, b64)| b64.to_string())
            .unwrap_or(data);

        Ok(payload)
    }

    /// Captures the visible viewport and returns decoded image bytes.
    pub async fn capture_visible_bytes(&self, format: CaptureFormat) -> Result<Vec<u8>> {
        let base64_data = self.capture_visible(format).await?;
        Base64Standard
            .decode(&base64_data)
            .map_err(|e| Error::invalid_image(format!("base64 decode failed: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
