use crate::credentials::{CredentialProvider, Credentials};
use crate::driver::{BrowserDriver, BrowserSession};
use crate::plan::LoginPlan;
use crate::signal::ContinueSignal;
use crate::Result;

/// Executes one scripted login attempt against its three collaborators:
/// a credential provider, a browser driver, and a continue signal.
///
/// The sequence is fixed and runs exactly once per [`run`](Self::run): fetch
/// credentials, open a session, navigate, wait for the form, fill both
/// fields, submit, hold at the continue gate, close. There is no retry and
/// no branching on outcome. Once a session has been opened it is closed on
/// every exit path, including mid-sequence failure.
pub struct LoginAutomator<P, D, G> {
    provider: P,
    driver: D,
    signal: G,
}

impl<P, D, G> LoginAutomator<P, D, G>
where
    P: CredentialProvider,
    D: BrowserDriver,
    G: ContinueSignal,
{
    pub fn new(provider: P, driver: D, signal: G) -> Self {
        Self {
            provider,
            driver,
            signal,
        }
    }

    /// Run the login sequence once.
    ///
    /// Credentials are fetched before any browser resource is allocated, so
    /// a provider failure leaves nothing to clean up. Every failure is fatal
    /// for the run; a fresh invocation opens an independent session.
    pub async fn run(&self, plan: &LoginPlan) -> Result<()> {
        let credentials = self.provider.credentials()?;
        tracing::debug!(username = %credentials.username(), "credentials obtained");

        let mut session = self.driver.open().await?;
        tracing::info!("browser session open");

        let outcome = self.drive(&mut session, plan, &credentials).await;

        // The session closes on every exit path from here on. If both the
        // sequence and the close fail, the sequence error wins and the close
        // error is logged.
        let closed = session.close().await;
        match (outcome, closed) {
            (Ok(()), closed) => closed,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(error = %close_err, "session close failed after sequence error");
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        session: &mut D::Session,
        plan: &LoginPlan,
        credentials: &Credentials,
    ) -> Result<()> {
        tracing::info!(url = %plan.url, "navigating to login page");
        session.navigate(&plan.url).await?;

        session
            .wait_for(&plan.username_selector, plan.timeout(), plan.poll_interval())
            .await?;
        tracing::debug!(selector = %plan.username_selector, "login form ready");

        session
            .fill(&plan.username_selector, credentials.username())
            .await?;
        session
            .fill(&plan.password_selector, credentials.password())
            .await?;

        tracing::info!("submitting login form");
        session.submit(&plan.password_selector).await?;

        self.signal.wait().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Navigate(String),
        WaitFor(String),
        Fill(String, String),
        Submit(String),
        Gate,
        Close,
    }

    #[derive(Default)]
    struct ScriptedDriver {
        log: Arc<Mutex<Vec<Op>>>,
        opens: AtomicUsize,
        missing_selectors: HashSet<String>,
        fail_open: bool,
    }

    impl ScriptedDriver {
        fn log(&self) -> Vec<Op> {
            self.log.lock().unwrap().clone()
        }

        fn with_missing(selector: &str) -> Self {
            let mut driver = Self::default();
            driver.missing_selectors.insert(selector.to_string());
            driver
        }
    }

    struct ScriptedSession {
        log: Arc<Mutex<Vec<Op>>>,
        missing_selectors: HashSet<String>,
    }

    #[async_trait]
    impl BrowserDriver for ScriptedDriver {
        type Session = ScriptedSession;

        async fn open(&self) -> Result<ScriptedSession> {
            if self.fail_open {
                return Err(Error::SessionOpen("driver unavailable".to_string()));
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptedSession {
                log: self.log.clone(),
                missing_selectors: self.missing_selectors.clone(),
            })
        }
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn navigate(&mut self, url: &str) -> Result<()> {
            self.log.lock().unwrap().push(Op::Navigate(url.to_string()));
            Ok(())
        }

        async fn wait_for(
            &mut self,
            selector: &str,
            timeout: Duration,
            _poll_interval: Duration,
        ) -> Result<()> {
            if self.missing_selectors.contains(selector) {
                return Err(Error::ElementNotFound {
                    selector: selector.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                });
            }
            self.log.lock().unwrap().push(Op::WaitFor(selector.to_string()));
            Ok(())
        }

        async fn fill(&mut self, selector: &str, text: &str) -> Result<()> {
            if self.missing_selectors.contains(selector) {
                return Err(Error::ElementNotFound {
                    selector: selector.to_string(),
                    waited_ms: 0,
                });
            }
            self.log
                .lock()
                .unwrap()
                .push(Op::Fill(selector.to_string(), text.to_string()));
            Ok(())
        }

        async fn submit(&mut self, selector: &str) -> Result<()> {
            self.log.lock().unwrap().push(Op::Submit(selector.to_string()));
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.log.lock().unwrap().push(Op::Close);
            Ok(())
        }
    }

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    impl CredentialProvider for CountingProvider {
        fn credentials(&self) -> Result<Credentials> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Credentials("provider offline".to_string()));
            }
            Ok(Credentials::new("alice", "hunter2"))
        }
    }

    /// Records each release of the confirmation gate into the shared op log.
    struct RecordingSignal {
        log: Arc<Mutex<Vec<Op>>>,
        waits: AtomicUsize,
        fail: bool,
    }

    impl RecordingSignal {
        fn new(log: Arc<Mutex<Vec<Op>>>) -> Self {
            Self {
                log,
                waits: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing(log: Arc<Mutex<Vec<Op>>>) -> Self {
            Self {
                log,
                waits: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl crate::ContinueSignal for RecordingSignal {
        async fn wait(&self) -> Result<()> {
            self.waits.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Signal("operator gone".to_string()));
            }
            self.log.lock().unwrap().push(Op::Gate);
            Ok(())
        }
    }

    fn plan() -> LoginPlan {
        LoginPlan::new("https://example.com/login")
    }

    #[tokio::test]
    async fn test_happy_path_runs_steps_in_order() {
        let automator =
            LoginAutomator::new(CountingProvider::new(), ScriptedDriver::default(), crate::ImmediateSignal);

        automator.run(&plan()).await.unwrap();

        let log = automator.driver.log();
        assert_eq!(
            log,
            vec![
                Op::Navigate("https://example.com/login".to_string()),
                Op::WaitFor("input[type='text']".to_string()),
                Op::Fill("input[type='text']".to_string(), "alice".to_string()),
                Op::Fill("input[type='password']".to_string(), "hunter2".to_string()),
                Op::Submit("input[type='password']".to_string()),
                Op::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_credentials_fetched_exactly_once() {
        let automator =
            LoginAutomator::new(CountingProvider::new(), ScriptedDriver::default(), crate::ImmediateSignal);

        automator.run(&plan()).await.unwrap();

        assert_eq!(automator.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_credentials_fetched_once_even_when_open_fails() {
        let driver = ScriptedDriver {
            fail_open: true,
            ..Default::default()
        };
        let automator = LoginAutomator::new(CountingProvider::new(), driver, crate::ImmediateSignal);

        let result = automator.run(&plan()).await;

        assert!(matches!(result, Err(Error::SessionOpen(_))));
        assert_eq!(automator.provider.calls.load(Ordering::SeqCst), 1);
        // No session was created, so nothing was driven or closed.
        assert!(automator.driver.log().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_before_browser_launch() {
        let automator =
            LoginAutomator::new(CountingProvider::failing(), ScriptedDriver::default(), crate::ImmediateSignal);

        let result = automator.run(&plan()).await;

        assert!(matches!(result, Err(Error::Credentials(_))));
        assert_eq!(automator.driver.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_happy_path_closes_session_exactly_once_and_last() {
        let automator =
            LoginAutomator::new(CountingProvider::new(), ScriptedDriver::default(), crate::ImmediateSignal);

        automator.run(&plan()).await.unwrap();

        let log = automator.driver.log();
        let closes = log.iter().filter(|op| **op == Op::Close).count();
        assert_eq!(closes, 1);
        assert_eq!(log.last(), Some(&Op::Close));
    }

    #[tokio::test]
    async fn test_missing_password_element_aborts_without_submit() {
        let driver = ScriptedDriver::with_missing("input[type='password']");
        let automator = LoginAutomator::new(CountingProvider::new(), driver, crate::ImmediateSignal);

        let result = automator.run(&plan()).await;

        assert!(matches!(result, Err(Error::ElementNotFound { .. })));

        let log = automator.driver.log();
        assert!(!log.iter().any(|op| matches!(op, Op::Submit(_))));
        // The username was still typed before the password lookup failed.
        assert!(log.iter().any(|op| matches!(op, Op::Fill(s, _) if s == "input[type='text']")));
        // Teardown is scoped to the session, so the handle is released even
        // on the failure path.
        assert_eq!(log.last(), Some(&Op::Close));
    }

    #[tokio::test]
    async fn test_missing_form_times_out_without_fills() {
        let driver = ScriptedDriver::with_missing("input[type='text']");
        let automator = LoginAutomator::new(CountingProvider::new(), driver, crate::ImmediateSignal);

        let result = automator.run(&plan()).await;

        assert!(matches!(result, Err(Error::ElementNotFound { .. })));

        let log = automator.driver.log();
        assert!(!log.iter().any(|op| matches!(op, Op::Fill(..))));
        assert_eq!(log.last(), Some(&Op::Close));
    }

    #[tokio::test]
    async fn test_confirmation_gate_held_after_submit_before_close() {
        let driver = ScriptedDriver::default();
        let signal = RecordingSignal::new(driver.log.clone());
        let automator = LoginAutomator::new(CountingProvider::new(), driver, signal);

        automator.run(&plan()).await.unwrap();

        assert_eq!(automator.signal.waits.load(Ordering::SeqCst), 1);

        let log = automator.driver.log();
        let submit = log
            .iter()
            .position(|op| matches!(op, Op::Submit(_)))
            .unwrap();
        let gate = log.iter().position(|op| *op == Op::Gate).unwrap();
        let close = log.iter().position(|op| *op == Op::Close).unwrap();
        assert!(submit < gate);
        assert!(gate < close);
    }

    #[tokio::test]
    async fn test_failing_gate_still_closes_session() {
        let driver = ScriptedDriver::default();
        let signal = RecordingSignal::failing(driver.log.clone());
        let automator = LoginAutomator::new(CountingProvider::new(), driver, signal);

        let result = automator.run(&plan()).await;

        assert!(matches!(result, Err(Error::Signal(_))));
        assert_eq!(automator.signal.waits.load(Ordering::SeqCst), 1);

        // The form was submitted and the session still torn down.
        let log = automator.driver.log();
        assert!(log.iter().any(|op| matches!(op, Op::Submit(_))));
        assert_eq!(log.last(), Some(&Op::Close));
    }

    #[tokio::test]
    async fn test_sequential_runs_use_independent_sessions() {
        let automator =
            LoginAutomator::new(CountingProvider::new(), ScriptedDriver::default(), crate::ImmediateSignal);

        automator.run(&plan()).await.unwrap();
        automator.run(&plan()).await.unwrap();

        assert_eq!(automator.driver.opens.load(Ordering::SeqCst), 2);
        assert_eq!(automator.provider.calls.load(Ordering::SeqCst), 2);

        let log = automator.driver.log();
        let closes = log.iter().filter(|op| **op == Op::Close).count();
        assert_eq!(closes, 2);
    }
}
