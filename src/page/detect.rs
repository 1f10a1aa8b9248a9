//! Candidate scanning, marker lookup, and highlight overlays.

use serde_json::Value;
use tracing::debug;

use crate::detect::{AdCandidate, ElementRect};
use crate::error::{Error, Result};
use crate::identifiers::MarkerId;
use crate::protocol::{Command, DetectCommand};

use super::Page;

// ============================================================================
// Page - Detect
// ============================================================================

impl Page {
    /// Scans the page for candidate elements matching the selectors.
    ///
    /// The agent stamps every match with a marker attribute and returns
    /// one record per match with geometry at scan time. Zero-area
    /// elements are filtered agent-side; classification is the caller's
    /// concern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandFailed`] if the agent rejects the scan.
    pub async fn scan(&self, selectors: &[String]) -> Result<Vec<AdCandidate>> {
        debug!(tab_id = %self.inner.tab_id, selector_count = selectors.len(), "Scanning for candidates");

        let response = self
            .send_command(Command::Detect(DetectCommand::Scan {
                selectors: selectors.to_vec(),
            }))
            .await?;

        if response.is_error() {
            return Err(Error::command_failed(
                "detect.scan",
                response.error_message(),
            ));
        }

        let raw = response
            .result
            .as_ref()
            .and_then(|v| v.get("candidates"))
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));

        let candidates: Vec<AdCandidate> = serde_json::from_value(raw)?;

        debug!(tab_id = %self.inner.tab_id, count = candidates.len(), "Scan complete");
        Ok(candidates)
    }

    /// Re-locates a previously marked element.
    ///
    /// Returns the element's current page-absolute geometry, or `None`
    /// if the marker no longer resolves to a node.
    pub async fn locate(&self, marker: &MarkerId) -> Result<Option<ElementRect>> {
        let response = self
            .send_command(Command::Detect(DetectCommand::Locate {
                marker: marker.clone(),
            }))
            .await?;

        if response.is_error() {
            return Err(Error::command_failed(
                "detect.locate",
                response.error_message(),
            ));
        }

        if !response.get_bool("found") {
            debug!(tab_id = %self.inner.tab_id, marker = %marker, "Marker no longer resolves");
            return Ok(None);
        }

        let rect = response
            .result
            .as_ref()
            .and_then(|v| v.get("rect"))
            .cloned()
            .ok_or_else(|| Error::protocol("detect.locate reported found without a rect"))?;

        Ok(Some(serde_json::from_value(rect)?))
    }

    /// Draws numbered highlight overlays on the marked elements.
    ///
    /// Labels follow marker order. Re-highlighting an already
    /// highlighted element is a no-op agent-side.
    pub async fn highlight(&self, markers: &[MarkerId]) -> Result<()> {
        debug!(tab_id = %self.inner.tab_id, count = markers.len(), "Highlighting markers");

        let response = self
            .send_command(Command::Detect(DetectCommand::Highlight {
                markers: markers.to_vec(),
            }))
            .await?;

        if response.is_error() {
            return Err(Error::command_failed(
                "detect.highlight",
                response.error_message(),
            ));
        }

        Ok(())
    }

    /// Removes all highlight overlays from the page.
    pub async fn clear_highlights(&self) -> Result<()> {
        debug!(tab_id = %self.inner.tab_id, "Clearing highlights");

        let response = self
            .send_command(Command::Detect(DetectCommand::ClearHighlights))
            .await?;

        if response.is_error() {
            return Err(Error::command_failed(
                "detect.clearHighlights",
                response.error_message(),
            ));
        }

        Ok(())
    }
}
