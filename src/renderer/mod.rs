//! Rendering collaborator abstraction.
//!
//! The analysis core never talks to a browser engine directly; it consumes
//! these three traits. One [`Session`] is acquired per job and shared by both
//! site walks; each page path gets its own [`PageHandle`], closed before the
//! next path is attempted.

pub mod chromium;

use crate::error::PageError;
use anyhow::Result;
use async_trait::async_trait;

/// A browser engine that can hand out rendering sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Acquire a rendering session. Failure here is fatal to the whole job.
    async fn acquire_session(&self) -> Result<Box<dyn Session>>;
    /// Number of currently open sessions.
    fn active_sessions(&self) -> usize;
    /// Shut down the engine.
    async fn shutdown(&self) -> Result<()>;
}

/// A rendering session scoped to one analysis job.
#[async_trait]
pub trait Session: Send + Sync {
    /// Open a page and navigate it to `url`, failing with
    /// [`PageError::NavigationTimeout`] past the deadline.
    async fn open(&self, url: &str, timeout_ms: u64) -> Result<Box<dyn PageHandle>, PageError>;
    /// Release the session.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A single rendered page.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Execute a script in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError>;
    /// Capture a full-page PNG screenshot.
    async fn screenshot(&self) -> Result<Vec<u8>, PageError>;
    /// Close the page, releasing its rendering resources.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Stand-in engine used when Chromium is unavailable.
///
/// Keeps the REST surface up: every job submitted against it fails with a
/// session acquisition error instead of crashing the process.
pub struct NoopBrowser;

#[async_trait]
impl Browser for NoopBrowser {
    async fn acquire_session(&self) -> Result<Box<dyn Session>> {
        Err(anyhow::anyhow!(
            "Chromium not available — install it or set MATCHUP_CHROMIUM_PATH"
        ))
    }
    fn active_sessions(&self) -> usize {
        0
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
