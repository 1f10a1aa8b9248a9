//! Core Page struct and accessors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{SessionId, TabId};
use crate::protocol::{Command, PageCommand, ParsedEvent, Request, Response};
use crate::transport::{AgentPool, EventHandler, ReadyData};

// ============================================================================
// Types
// ============================================================================

/// Identity of the page an agent is attached to.
///
/// Feeds the persistence sink: `domain` names the per-site folder that
/// captures land in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Full page URL.
    pub url: String,
    /// Document title.
    pub title: String,
    /// Hostname with a leading `www.` stripped.
    pub domain: String,
}

impl PageInfo {
    /// Derives page info from a URL and title.
    ///
    /// An unparseable URL yields the `unknown` domain rather than an
    /// error, so persistence always has a folder name to work with.
    #[must_use]
    pub fn derive(url: &str, title: &str) -> Self {
        let domain = match Url::parse(url) {
            Ok(parsed) => parsed
                .host_str()
                .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            Err(_) => "unknown".to_string(),
        };

        let title = if title.is_empty() { "untitled" } else { title };

        Self {
            url: if url.is_empty() { "unknown" } else { url }.to_string(),
            title: title.to_string(),
            domain,
        }
    }
}

/// Internal shared state for a page.
pub(crate) struct PageInner {
    /// Tab ID the agent is attached to.
    pub tab_id: TabId,
    /// Session ID of the agent connection.
    pub session_id: SessionId,
    /// Pool that routes requests to the agent.
    pub pool: Arc<AgentPool>,
}

// ============================================================================
// Page
// ============================================================================

/// A handle to an attached browser tab.
///
/// Pages provide scrolling, viewport metrics, candidate scanning, and
/// visible-viewport capture over the agent protocol.
#[derive(Clone)]
pub struct Page {
    pub(crate) inner: Arc<PageInner>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("tab_id", &self.inner.tab_id)
            .field("session_id", &self.inner.session_id)
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Creates a page handle from a completed READY handshake.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the handshake carried a zero tab
    /// or session ID.
    pub(crate) fn attach(pool: Arc<AgentPool>, ready: &ReadyData) -> Result<Self> {
        let tab_id = TabId::new(ready.tab_id)
            .ok_or_else(|| Error::protocol("READY handshake carried tab_id 0"))?;
        let session_id = SessionId::from_u32(ready.session_id)
            .ok_or_else(|| Error::protocol("READY handshake carried session_id 0"))?;

        Ok(Self {
            inner: Arc::new(PageInner {
                tab_id,
                session_id,
                pool,
            }),
        })
    }
}

// ============================================================================
// Page - Accessors
// ============================================================================

impl Page {
    /// Returns the tab ID.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.inner.tab_id
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    /// Returns `true` while the agent connection is alive in the pool.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.pool.has_session(self.inner.session_id)
    }
}

// ============================================================================
// Page - Info
// ============================================================================

impl Page {
    /// Fetches the current page identity (URL, title, domain).
    ///
    /// The agent reports URL and title; the domain is derived locally
    /// when the agent omits it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandFailed`] if the agent rejects the command.
    pub async fn info(&self) -> Result<PageInfo> {
        let response = self
            .send_command(Command::Page(PageCommand::GetInfo))
            .await?;

        if response.is_error() {
            return Err(Error::command_failed(
                "page.getInfo",
                response.error_message(),
            ));
        }

        let url = response.get_string("url");
        let title = response.get_string("title");
        let domain = response.get_string("domain");

        let mut info = PageInfo::derive(&url, &title);
        if !domain.is_empty() {
            info.domain = domain;
        }

        debug!(tab_id = %self.inner.tab_id, domain = %info.domain, "Got page info");
        Ok(info)
    }
}

// ============================================================================
// Page - Events
// ============================================================================

impl Page {
    /// Sets the raw event handler for this page's agent connection.
    ///
    /// Replaces any previously registered handler, including typed
    /// ones installed via [`on_ads_detected`](Self::on_ads_detected).
    pub fn set_event_handler(&self, handler: EventHandler) {
        self.inner
            .pool
            .set_event_handler(self.inner.session_id, handler);
    }

    /// Clears the event handler for this page's agent connection.
    pub fn clear_event_handler(&self) {
        self.inner.pool.clear_event_handler(self.inner.session_id);
    }

    /// Registers a callback for the agent's auto-scan notification.
    ///
    /// Agents push `detect.adsDetected` after their own initial scan;
    /// the callback receives the reported candidate count.
    pub fn on_ads_detected<F>(&self, callback: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.set_event_handler(Box::new(move |event| {
            if let ParsedEvent::AdsDetected { count, .. } = event.parse() {
                callback(count);
            }
        }));
    }
}

// ============================================================================
// Page - Lifecycle
// ============================================================================

impl Page {
    /// Detaches from the agent and closes its connection.
    ///
    /// Other clones of this handle become unusable; their commands fail
    /// with [`Error::AgentGone`].
    pub fn detach(&self) {
        debug!(tab_id = %self.inner.tab_id, session_id = %self.inner.session_id, "Detaching page");
        self.inner.pool.remove(self.inner.session_id);
    }
}

// ============================================================================
// Page - Internal
// ============================================================================

impl Page {
    /// Sends a command and returns the response.
    pub(crate) async fn send_command(&self, command: Command) -> Result<Response> {
        let request = Request::new(self.inner.tab_id, command);
        self.inner.pool.send(self.inner.session_id, request).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::{Page, PageInfo};

    #[test]
    fn test_page_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Page>();
    }

    #[test]
    fn test_page_is_debug() {
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_debug::<Page>();
    }

    #[test]
    fn test_page_info_strips_www() {
        let info = PageInfo::derive("https://www.example.com/news", "Example");
        assert_eq!(info.domain, "example.com");
        assert_eq!(info.title, "Example");
    }

    #[test]
    fn test_page_info_keeps_bare_host() {
        let info = PageInfo::derive("https://news.example.org/a/b", "News");
        assert_eq!(info.domain, "news.example.org");
    }

    #[test]
    fn test_page_info_unparseable_url() {
        let info = PageInfo::derive("not a url", "");
        assert_eq!(info.domain, "unknown");
        assert_eq!(info.title, "untitled");
        assert_eq!(info.url, "not a url");
    }

    #[test]
    fn test_page_info_empty_url() {
        let info = PageInfo::derive("", "");
        assert_eq!(info.url, "unknown");
        assert_eq!(info.domain, "unknown");
    }
}
