//! Event message types.
//!
//! Events are notifications sent from the remote end (page agent) to the
//! local end (Rust) when page activity occurs. Events are one-way; the
//! host never replies to them.
//!
//! # Event Types
//!
//! | Module | Events |
//! |--------|--------|
//! | `detect` | `adsDetected` |
//! | `page` | `navigated`, `unloaded` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::RequestId;

// ============================================================================
// Event
// ============================================================================

/// An event notification from remote end to local end.
///
/// # Format
///
/// ```json
/// {
///   "id": "event-uuid",
///   "type": "event",
///   "method": "module.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: RequestId,

    /// Event type marker (always "event").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    pub params: Value,
}

impl Event {
    /// Returns the module name from the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let event = Event { method: "detect.adsDetected".into(), .. };
    /// assert_eq!(event.module(), "detect");
    /// ```
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let event = Event { method: "detect.adsDetected".into(), .. };
    /// assert_eq!(event.event_name(), "adsDetected");
    /// ```
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        self.parse_internal()
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    /// The agent's own scan found ad candidates.
    ///
    /// Pushed after the agent's delayed initial scan; the host may
    /// respond by running a full detection pass over the session.
    AdsDetected {
        /// Tab ID.
        tab_id: u32,
        /// Number of candidates the agent marked.
        count: u64,
    },

    /// The page navigated to a new document.
    ///
    /// All markers stamped on the previous document are stale.
    PageNavigated {
        /// Tab ID.
        tab_id: u32,
        /// New page URL.
        url: String,
    },

    /// The page is being unloaded (tab closing or navigating away).
    PageUnloaded {
        /// Tab ID.
        tab_id: u32,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Event Parsing Implementation
// ============================================================================

impl Event {
    /// Internal parsing implementation.
    fn parse_internal(&self) -> ParsedEvent {
        match self.method.as_str() {
            "detect.adsDetected" => ParsedEvent::AdsDetected {
                tab_id: self.get_u32("tabId"),
                count: self.get_u64("count"),
            },

            "page.navigated" => ParsedEvent::PageNavigated {
                tab_id: self.get_u32("tabId"),
                url: self.get_string("url"),
            },

            "page.unloaded" => ParsedEvent::PageUnloaded {
                tab_id: self.get_u32("tabId"),
            },

            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }

    /// Gets a string from params.
    #[inline]
    fn get_string(&self, key: &str) -> String {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a u32 from params.
    #[inline]
    fn get_u32(&self, key: &str) -> u32 {
        self.params
            .get(key)
            .and_then(|v| v.as_u64())
            .unwrap_or_default() as u32
    }

    /// Gets a u64 from params.
    #[inline]
    fn get_u64(&self, key: &str) -> u64 {
        self.params
            .get(key)
            .and_then(|v| v.as_u64())
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
