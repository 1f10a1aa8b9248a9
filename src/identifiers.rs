//! Identifier newtypes used across the crate.
//!
//! Each identifier wraps a primitive with validation and serialization
//! behavior so the protocol layer cannot mix them up.
//!
//! | Type | Backing | Purpose |
//! |------|---------|---------|
//! | [`TabId`] | `u32` | Browser tab hosting a page agent |
//! | [`SessionId`] | `u32` | One agent connection (one per attached tab) |
//! | [`RequestId`] | `Uuid` | Request/response correlation |
//! | [`MarkerId`] | `String` | Stable handle stamped on a detected element |
//! | [`BatchId`] | `u64` | One `enqueue` call's worth of capture jobs |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// TabId
// ============================================================================

/// Browser tab identifier.
///
/// Tab IDs are assigned by the browser and must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab ID, returning `None` for zero.
    #[inline]
    #[must_use]
    pub fn new(id: u32) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Returns the raw tab ID value.
    #[inline]
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Monotonically increasing session counter for locally allocated IDs.
static NEXT_SESSION: AtomicU32 = AtomicU32::new(1);

/// Agent session identifier.
///
/// Each page agent connection carries one session ID, self-reported in
/// its READY handshake. Session IDs must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u32);

impl SessionId {
    /// Allocates the next locally unique session ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a session ID from a raw value, returning `None` for zero.
    #[inline]
    #[must_use]
    pub fn from_u32(id: u32) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Returns the raw session ID value.
    #[inline]
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Request identifier for request/response correlation.
///
/// Regular requests use random v4 UUIDs. The READY handshake uses the
/// nil UUID so it can be correlated before any request exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random request ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the sentinel ID used by the READY handshake.
    #[inline]
    #[must_use]
    pub fn ready() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` if this is the READY sentinel.
    #[inline]
    #[must_use]
    pub fn is_ready(self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// MarkerId
// ============================================================================

/// Stable handle for a detected element.
///
/// The page agent stamps each candidate with a marker attribute
/// (`data-ad-capture-id`) whose value this type carries. The marker is
/// opaque to the host: it is only ever sent back to the agent for
/// re-location or highlighting. A marker going stale when the page
/// mutates is expected, not an error in itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    /// Creates a marker ID from the agent-provided attribute value.
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the marker value as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// BatchId
// ============================================================================

/// Monotonically increasing batch counter.
static NEXT_BATCH: AtomicU64 = AtomicU64::new(1);

/// Capture batch identifier.
///
/// One batch per `enqueue` call; used to attribute jobs in the shared
/// queue back to the call that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(u64);

impl BatchId {
    /// Allocates the next batch ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_BATCH.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw batch ID value.
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_id_rejects_zero() {
        assert!(TabId::new(0).is_none());
        assert_eq!(TabId::new(7).map(TabId::value), Some(7));
    }

    #[test]
    fn test_session_id_next_is_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_id_from_u32() {
        assert!(SessionId::from_u32(0).is_none());
        assert_eq!(SessionId::from_u32(3).map(SessionId::value), Some(3));
    }

    #[test]
    fn test_request_id_ready_sentinel() {
        assert!(RequestId::ready().is_ready());
        assert!(!RequestId::generate().is_ready());
        assert_eq!(RequestId::ready(), RequestId::ready());
    }

    #[test]
    fn test_request_id_generate_is_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn test_marker_id_roundtrip() {
        let marker = MarkerId::new("4");
        assert_eq!(marker.as_str(), "4");
        assert_eq!(marker.to_string(), "4");

        let json = serde_json::to_string(&marker).expect("serialize");
        assert_eq!(json, "\"4\"");
    }

    #[test]
    fn test_batch_id_monotonic() {
        let a = BatchId::next();
        let b = BatchId::next();
        assert!(b.value() > a.value());
    }

    #[test]
    fn test_tab_id_serializes_as_number() {
        let tab = TabId::new(12).expect("valid tab id");
        let json = serde_json::to_string(&tab).expect("serialize");
        assert_eq!(json, "12");
    }
}
