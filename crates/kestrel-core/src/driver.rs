use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Factory for browser sessions.
///
/// The automation backend is an injected collaborator rather than a fixed
/// filesystem path, so tests can substitute a scripted fake and real runs
/// can configure where the browser binary lives.
#[async_trait]
pub trait BrowserDriver {
    type Session: BrowserSession + Send;

    /// Acquire a handle to a new browser instance. At most one session
    /// exists per run.
    async fn open(&self) -> Result<Self::Session>;
}

/// One live browser instance under remote control.
///
/// The session is owned by the automator for the duration of a run and must
/// be closed exactly once; `close` is terminal and no further operations are
/// issued after it.
#[async_trait]
pub trait BrowserSession: Send {
    /// Drive the browser to the given URL.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Poll until an element matches `selector` or `timeout` elapses.
    ///
    /// Replaces a blind fixed-duration sleep as the readiness check: returns
    /// as soon as the element exists, and fails with an element-not-found
    /// error only after the full timeout.
    async fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<()>;

    /// Type `text` into the first element matching `selector`.
    async fn fill(&mut self, selector: &str, text: &str) -> Result<()>;

    /// Submit the form containing the first element matching `selector`.
    async fn submit(&mut self, selector: &str) -> Result<()>;

    /// Tear down the browser instance and release all resources.
    async fn close(&mut self) -> Result<()>;
}
