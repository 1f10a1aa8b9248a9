//! Capture host coordinator and page factory.
//!
//! The [`CaptureHost`] owns the WebSocket endpoint page agents dial
//! into and hands out [`Page`] handles as they arrive.
//!
//! # Example
//!
//! ```no_run
//! use adsnap::CaptureHost;
//!
//! # async fn example() -> adsnap::Result<()> {
//! let host = CaptureHost::builder().build().await?;
//! println!("Agents connect to: {}", host.ws_url());
//!
//! let page = host.wait_for_page().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::Result;
use crate::page::Page;
use crate::transport::AgentPool;

use super::builder::CaptureHostBuilder;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the host.
pub(crate) struct HostInner {
    /// Pool of multiplexed agent connections.
    pub pool: Arc<AgentPool>,

    /// Per-call wait override; `None` uses the transport default.
    pub connect_timeout: Option<Duration>,
}

// ============================================================================
// CaptureHost
// ============================================================================

/// Capture host coordinator.
///
/// The host is responsible for:
/// - Binding the WebSocket endpoint page agents connect to
/// - Attaching a [`Page`] handle to each agent as it announces itself
///
/// It does not launch browsers. Point the agent at [`ws_url()`] through
/// whatever drives the browser side, then collect pages with
/// [`wait_for_page()`].
///
/// [`ws_url()`]: CaptureHost::ws_url
/// [`wait_for_page()`]: CaptureHost::wait_for_page
#[derive(Clone)]
pub struct CaptureHost {
    /// Shared inner state.
    pub(crate) inner: Arc<HostInner>,
}

// ============================================================================
// CaptureHost - Display
// ============================================================================

impl fmt::Debug for CaptureHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureHost")
            .field("port", &self.port())
            .field("page_count", &self.page_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CaptureHost - Public API
// ============================================================================

impl CaptureHost {
    /// Creates a configuration builder for the host.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use adsnap::CaptureHost;
    ///
    /// # async fn example() -> adsnap::Result<()> {
    /// let host = CaptureHost::builder().port(9744).build().await?;
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    #[must_use]
    pub fn builder() -> CaptureHostBuilder {
        CaptureHostBuilder::new()
    }

    /// Returns the WebSocket URL page agents should connect to.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        self.inner.pool.ws_url()
    }

    /// Returns the port the WebSocket endpoint is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.pool.port()
    }

    /// Returns the number of currently attached pages.
    #[inline]
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.inner.pool.connection_count()
    }

    /// Waits for the next page agent to connect and attaches to it.
    ///
    /// Agents that connected before anyone waited are claimed in
    /// arrival order.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no agent connects in time
    /// - [`Error::Protocol`] if the agent's handshake is malformed
    ///
    /// [`Error::ConnectionTimeout`]: crate::Error::ConnectionTimeout
    /// [`Error::Protocol`]: crate::Error::Protocol
    pub async fn wait_for_page(&self) -> Result<Page> {
        let ready = match self.inner.connect_timeout {
            Some(connect_timeout) => {
                self.inner
                    .pool
                    .wait_for_agent_with_timeout(connect_timeout)
                    .await?
            }
            None => self.inner.pool.wait_for_agent().await?,
        };

        let page = Page::attach(Arc::clone(&self.inner.pool), &ready)?;
        info!(
            tab_id = %page.tab_id(),
            session_id = %page.session_id(),
            "Page agent attached"
        );

        Ok(page)
    }

    /// Shuts down the WebSocket endpoint and drops all connections.
    ///
    /// Existing [`Page`] handles become detached; their calls fail
    /// with [`Error::AgentGone`].
    ///
    /// [`Error::AgentGone`]: crate::Error::AgentGone
    pub async fn shutdown(&self) {
        info!(page_count = self.page_count(), "Shutting down capture host");
        self.inner.pool.shutdown().await;
    }
}

// ============================================================================
// CaptureHost - Internal API
// ============================================================================

impl CaptureHost {
    /// Creates a host over an already-bound pool.
    pub(crate) fn new(pool: Arc<AgentPool>, connect_timeout: Option<Duration>) -> Self {
        info!(port = pool.port(), "Capture host initialized");

        Self {
            inner: Arc::new(HostInner {
                pool,
                connect_timeout,
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
