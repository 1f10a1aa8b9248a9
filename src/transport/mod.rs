//! WebSocket transport layer.
//!
//! This module handles communication between the local end (Rust host)
//! and remote end (page agents) via WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Host (Rust)    │                              │  Page Agent     │
//! │                 │         WebSocket            │  (per tab)      │
//! │  AgentPool      │◄────────────────────────────►│                 │
//! │  → Connection   │      localhost:PORT          │  WebSocket      │
//! │                 │                              │  Client         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `AgentPool::new` - Bind to localhost, spawn the accept loop
//! 2. Agents connect as their tabs load the instrumented extension
//! 3. Each agent sends READY with its tab/session IDs and page info
//! 4. `Connection` - Send commands, receive responses/events
//! 5. `AgentPool::remove` / `shutdown` - Close connections explicitly
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `pool` | Multi-session agent pool |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Agent pool for multiplexed connections.
pub mod pool;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, EventHandler, ReadyData};
pub use pool::AgentPool;
