//! Agent pool for multiplexed WebSocket connections.
//!
//! Manages multiple agent connections keyed by SessionId.
//! Every attached tab's agent connects to the same port; messages are
//! routed by session.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              AgentPool                  │
//! │            (single port)                │
//! │  ┌─────────────────────────────────┐   │
//! │  │ SessionId=1 → agent in tab 12   │   │
//! │  │ SessionId=2 → agent in tab 40   │   │
//! │  │ SessionId=3 → agent in tab 41   │   │
//! │  └─────────────────────────────────┘   │
//! └─────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{Request, Response};
use crate::transport::Connection;
use crate::transport::connection::ReadyData;

// ============================================================================
// Constants
// ============================================================================

/// Default bind address for WebSocket server (localhost).
const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default timeout for waiting for an agent to connect.
const AGENT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// AgentPool
// ============================================================================

/// Manages multiple agent connections keyed by SessionId.
///
/// Thread-safe, supports concurrent access from multiple Page handles.
/// Agents self-assign their session IDs and announce them via READY, so
/// waiting is first-come-first-served rather than keyed by session.
///
/// # Example
///
/// ```ignore
/// let pool = AgentPool::new().await?;
/// println!("WebSocket URL: {}", pool.ws_url());
///
/// // Wait for the next agent to connect
/// let ready_data = pool.wait_for_agent().await?;
/// let session_id = SessionId::from_u32(ready_data.session_id).unwrap();
///
/// // Send a request to that session
/// let response = pool.send(session_id, request).await?;
/// ```
pub struct AgentPool {
    /// WebSocket server port.
    port: u16,

    /// Active connections by session ID.
    connections: RwLock<FxHashMap<SessionId, Connection>>,

    /// Waiters for the next agent connection, in arrival order.
    waiters: Mutex<VecDeque<oneshot::Sender<ReadyData>>>,

    /// Agents that connected before anyone waited for them.
    ready_backlog: Mutex<VecDeque<ReadyData>>,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

// ============================================================================
// AgentPool - Constructor
// ============================================================================

impl AgentPool {
    /// Creates a new agent pool and starts the accept loop.
    ///
    /// Binds to `localhost:0` (random available port).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn new() -> Result<Arc<Self>> {
        Self::with_ip_port(DEFAULT_BIND_IP, 0).await
    }

    /// Creates a new agent pool bound to a specific port.
    ///
    /// # Arguments
    ///
    /// * `port` - Port to bind to (0 for random)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn with_port(port: u16) -> Result<Arc<Self>> {
        Self::with_ip_port(DEFAULT_BIND_IP, port).await
    }

    /// Creates a new agent pool bound to a specific IP and port.
    ///
    /// # Arguments
    ///
    /// * `ip` - IP address to bind to
    /// * `port` - Port to bind to (0 for random)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn with_ip_port(ip: IpAddr, port: u16) -> Result<Arc<Self>> {
        let addr = SocketAddr::new(ip, port);
        let listener = TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        debug!(port = actual_port, "AgentPool WebSocket server bound");

        let pool = Arc::new(Self {
            port: actual_port,
            connections: RwLock::new(FxHashMap::default()),
            waiters: Mutex::new(VecDeque::new()),
            ready_backlog: Mutex::new(VecDeque::new()),
            shutdown: AtomicBool::new(false),
        });

        // Spawn accept loop
        let pool_clone = Arc::clone(&pool);
        tokio::spawn(async move {
            pool_clone.accept_loop(listener).await;
        });

        info!(port = actual_port, "AgentPool started");

        Ok(pool)
    }
}

// ============================================================================
// AgentPool - Public API
// ============================================================================

impl AgentPool {
    /// Returns the WebSocket URL for this pool.
    ///
    /// Format: `ws://127.0.0.1:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Returns the port the pool is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the number of active connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Waits for the next agent to connect, with the default timeout.
    ///
    /// Returns immediately if an agent connected before anyone waited.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no agent connects within 30s
    pub async fn wait_for_agent(&self) -> Result<ReadyData> {
        self.wait_for_agent_with_timeout(AGENT_CONNECT_TIMEOUT).await
    }

    /// Waits for the next agent to connect, with a custom timeout.
    ///
    /// # Arguments
    ///
    /// * `connect_timeout` - Maximum time to wait for an agent
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no agent connects in time
    pub async fn wait_for_agent_with_timeout(
        &self,
        connect_timeout: Duration,
    ) -> Result<ReadyData> {
        // Claim a backlogged agent if one connected already
        if let Some(ready_data) = self.ready_backlog.lock().pop_front() {
            debug!(session_id = ready_data.session_id, "Claimed backlogged agent");
            return Ok(ready_data);
        }

        let (tx, rx) = oneshot::channel();

        // Register waiter
        {
            let mut waiters = self.waiters.lock();
            waiters.push_back(tx);
        }

        // Wait with timeout
        match timeout(connect_timeout, rx).await {
            Ok(Ok(ready_data)) => {
                debug!(session_id = ready_data.session_id, "Agent connected");
                Ok(ready_data)
            }
            Ok(Err(_)) => {
                // Channel closed without sending - pool shut down
                Err(Error::connection("Agent waiter channel closed"))
            }
            Err(_) => {
                // Timeout - the stale waiter is dropped lazily when the
                // next agent arrives and its send fails
                Err(Error::connection_timeout(
                    connect_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Sends a request to a specific session.
    ///
    /// # Arguments
    ///
    /// * `session_id` - Target session
    /// * `request` - Request to send
    ///
    /// # Errors
    ///
    /// - [`Error::AgentGone`] if session doesn't exist
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    pub async fn send(&self, session_id: SessionId, request: Request) -> Result<Response> {
        let connection = {
            let connections = self.connections.read();
            connections
                .get(&session_id)
                .ok_or_else(|| Error::agent_gone(session_id))?
                .clone()
        };

        connection.send(request).await
    }

    /// Sends a request with custom timeout.
    ///
    /// # Arguments
    ///
    /// * `session_id` - Target session
    /// * `request` - Request to send
    /// * `request_timeout` - Maximum time to wait for response
    ///
    /// # Errors
    ///
    /// - [`Error::AgentGone`] if session doesn't exist
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    pub async fn send_with_timeout(
        &self,
        session_id: SessionId,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        let connection = {
            let connections = self.connections.read();
            connections
                .get(&session_id)
                .ok_or_else(|| Error::agent_gone(session_id))?
                .clone()
        };

        connection.send_with_timeout(request, request_timeout).await
    }

    /// Returns `true` if the session is currently connected.
    #[inline]
    #[must_use]
    pub fn has_session(&self, session_id: SessionId) -> bool {
        self.connections.read().contains_key(&session_id)
    }
}

// ============================================================================
// AgentPool - Event Handlers
// ============================================================================

impl AgentPool {
    /// Sets the event handler for a session.
    ///
    /// # Arguments
    ///
    /// * `session_id` - Target session
    /// * `handler` - Event handler callback
    pub fn set_event_handler(
        &self,
        session_id: SessionId,
        handler: crate::transport::EventHandler,
    ) {
        let connections = self.connections.read();
        if let Some(connection) = connections.get(&session_id) {
            connection.set_event_handler(handler);
        }
    }

    /// Clears the event handler for a session.
    ///
    /// # Arguments
    ///
    /// * `session_id` - Target session
    pub fn clear_event_handler(&self, session_id: SessionId) {
        let connections = self.connections.read();
        if let Some(connection) = connections.get(&session_id) {
            connection.clear_event_handler();
        }
    }
}

// ============================================================================
// AgentPool - Lifecycle
// ============================================================================

impl AgentPool {
    /// Removes a session from the pool.
    ///
    /// Called when a Page detaches.
    ///
    /// # Arguments
    ///
    /// * `session_id` - Session to remove
    pub fn remove(&self, session_id: SessionId) {
        let removed = {
            let mut connections = self.connections.write();
            connections.remove(&session_id)
        };

        if let Some(connection) = removed {
            connection.shutdown();
            debug!(session_id = %session_id, "Session removed from pool");
        }
    }

    /// Shuts down the pool and all connections.
    pub async fn shutdown(&self) {
        info!("AgentPool shutting down");

        // Signal accept loop to stop
        self.shutdown.store(true, Ordering::SeqCst);

        // Close all connections
        let connections: Vec<_> = {
            let mut map = self.connections.write();
            map.drain().collect()
        };

        for (session_id, connection) in connections {
            connection.shutdown();
            debug!(session_id = %session_id, "Connection closed during shutdown");
        }

        // Cancel all waiters
        let waiters: Vec<_> = {
            let mut queue = self.waiters.lock();
            queue.drain(..).collect()
        };

        drop(waiters); // Dropping senders will cause receivers to error

        self.ready_backlog.lock().clear();

        info!("AgentPool shutdown complete");
    }
}

// ============================================================================
// AgentPool - Accept Loop
// ============================================================================

impl AgentPool {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            // Check shutdown flag
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(Duration::from_millis(100), listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let pool = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = pool.handle_connection(stream, addr).await {
                            warn!(error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => {
                    // Timeout - just continue to check shutdown flag
                    continue;
                }
            }
        }

        debug!("Accept loop terminated");
    }

    /// Handles a single incoming connection.
    async fn handle_connection(
        &self,
        stream: tokio::net::TcpStream,
        addr: SocketAddr,
    ) -> Result<()> {
        debug!(?addr, "New TCP connection");

        // Upgrade to WebSocket
        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        info!(?addr, "WebSocket connection established");

        // Create Connection and wait for READY
        let connection = Connection::new(ws_stream);
        let ready_data = connection.wait_ready().await?;

        let session_id = SessionId::from_u32(ready_data.session_id)
            .ok_or_else(|| Error::protocol("Invalid session_id in READY (must be > 0)"))?;

        info!(session_id = %session_id, ?addr, "Agent READY received");

        // Store connection
        {
            let mut connections = self.connections.write();
            connections.insert(session_id, connection);
        }

        // Hand the agent to the oldest live waiter, or backlog it
        let mut unclaimed = Some(ready_data);
        {
            let mut waiters = self.waiters.lock();
            while let Some(data) = unclaimed.take() {
                match waiters.pop_front() {
                    // Stale waiters (timed out, receiver dropped) hand
                    // the data back; try the next one
                    Some(tx) => {
                        if let Err(data) = tx.send(data) {
                            unclaimed = Some(data);
                        }
                    }
                    None => {
                        unclaimed = Some(data);
                        break;
                    }
                }
            }
        }

        if let Some(data) = unclaimed {
            self.ready_backlog.lock().push_back(data);
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_creation() {
        let pool = AgentPool::new().await.expect("pool creation");
        assert!(pool.port() > 0);
        assert!(pool.ws_url().starts_with("ws://127.0.0.1:"));
        assert_eq!(pool.connection_count(), 0);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_pool_ws_url_format() {
        let pool = AgentPool::new().await.expect("pool creation");
        let url = pool.ws_url();
        let expected = format!("ws://127.0.0.1:{}", pool.port());
        assert_eq!(url, expected);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_to_unknown_session() {
        let pool = AgentPool::new().await.expect("pool creation");
        let session_id = SessionId::next();
        let request = crate::protocol::Request::new(
            crate::identifiers::TabId::new(1).unwrap(),
            crate::protocol::Command::Page(crate::protocol::PageCommand::GetViewportSize),
        );

        let result = pool.send(session_id, request).await;
        assert!(matches!(result, Err(Error::AgentGone { .. })));

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_wait_for_agent_times_out() {
        let pool = AgentPool::new().await.expect("pool creation");

        let result = pool
            .wait_for_agent_with_timeout(Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(Error::ConnectionTimeout { .. })));

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_backlogged_agent_is_claimed() {
        let pool = AgentPool::new().await.expect("pool creation");

        pool.ready_backlog.lock().push_back(ReadyData {
            tab_id: 12,
            session_id: 1,
            url: None,
            title: None,
        });

        let ready = pool
            .wait_for_agent_with_timeout(Duration::from_millis(50))
            .await
            .expect("backlogged agent");
        assert_eq!(ready.tab_id, 12);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_remove_nonexistent_session() {
        let pool = AgentPool::new().await.expect("pool creation");
        let session_id = SessionId::next();

        // Should not panic
        pool.remove(session_id);

        pool.shutdown().await;
    }
}
