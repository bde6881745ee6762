use crate::Result;
use async_trait::async_trait;

/// Gate between form submission and browser teardown.
///
/// In interactive use this blocks on operator input so the browser window
/// stays open for manual inspection; non-interactive runs and tests inject
/// [`ImmediateSignal`] instead.
#[async_trait]
pub trait ContinueSignal: Send + Sync {
    /// Resolve when the run may proceed to teardown. Any received input
    /// counts, including empty input; its content is discarded.
    async fn wait(&self) -> Result<()>;
}

#[async_trait]
impl ContinueSignal for Box<dyn ContinueSignal> {
    async fn wait(&self) -> Result<()> {
        self.as_ref().wait().await
    }
}

/// A continue signal that resolves immediately, for non-interactive runs.
pub struct ImmediateSignal;

#[async_trait]
impl ContinueSignal for ImmediateSignal {
    async fn wait(&self) -> Result<()> {
        Ok(())
    }
}
