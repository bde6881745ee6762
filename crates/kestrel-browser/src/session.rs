use crate::chrome_finder::ChromeFinder;
use crate::launcher::ChromeLauncher;
use crate::profile::ProfileManager;
use crate::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::Page;
use futures::StreamExt;
use kestrel_core::driver::{BrowserDriver, BrowserSession};
use kestrel_core::Error as CoreError;
use std::path::PathBuf;
use std::process::Child;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const DEFAULT_DEBUGGING_PORT: u16 = 9222;
const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);
const CLOSE_GRACE: Duration = Duration::from_secs(3);

/// Kill a process by PID (cross-platform)
fn kill_process_by_pid(pid: u32) {
    #[cfg(unix)]
    {
        use std::process::Command;
        // SIGTERM first so Chrome can flush its profile
        let _ = Command::new("kill").arg(pid.to_string()).output();
    }

    #[cfg(windows)]
    {
        use std::process::Command;
        let _ = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .output();
    }
}

/// Configurable factory for Chrome-backed browser sessions.
///
/// Where the binary lives and which profile it uses are injected here rather
/// than hardcoded, so callers (and tests) control the environment.
pub struct ChromeDriver {
    chrome_path: Option<PathBuf>,
    profile_dir: Option<PathBuf>,
    debugging_port: u16,
}

impl ChromeDriver {
    pub fn new() -> Self {
        Self {
            chrome_path: None,
            profile_dir: None,
            debugging_port: DEFAULT_DEBUGGING_PORT,
        }
    }

    /// Use a specific Chrome binary instead of searching platform defaults.
    pub fn with_chrome_path(mut self, path: PathBuf) -> Self {
        self.chrome_path = Some(path);
        self
    }

    /// Use a persistent profile directory instead of a throwaway one.
    pub fn with_profile_dir(mut self, path: PathBuf) -> Self {
        self.profile_dir = Some(path);
        self
    }

    pub fn with_debugging_port(mut self, port: u16) -> Self {
        self.debugging_port = port;
        self
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }

    async fn open_session(&self) -> Result<ChromeSession> {
        let finder = ChromeFinder::new(self.chrome_path.clone());
        let chrome_binary = finder.find()?;
        tracing::info!(path = %chrome_binary.display(), "found Chrome binary");

        let profile = match &self.profile_dir {
            Some(dir) => ProfileManager::persistent(dir.clone())?,
            None => ProfileManager::temporary()?,
        };
        tracing::debug!(path = %profile.path().display(), "using profile");

        let launcher = ChromeLauncher::new(
            chrome_binary,
            profile.path().to_path_buf(),
            self.debugging_port,
        );
        let process = launcher.launch()?;
        tracing::info!(pid = process.id(), "Chrome started");

        match self.connect(process.id()).await {
            Ok((browser, page, handler_task)) => Ok(ChromeSession {
                browser,
                page,
                process,
                handler_task,
                _profile: profile,
            }),
            Err(e) => {
                // Connection never came up, so the session was never handed
                // out; reap the process we just spawned.
                let mut process = process;
                kill_process_by_pid(process.id());
                let _ = process.wait();
                Err(e)
            }
        }
    }

    async fn connect(&self, pid: u32) -> Result<(Browser, Page, JoinHandle<()>)> {
        // Chrome needs a moment before the debugging port accepts connections
        let ws_url = format!("http://localhost:{}", self.debugging_port);
        let (browser, mut handler) = {
            let mut retries = CONNECT_ATTEMPTS;
            loop {
                tracing::debug!(url = %ws_url, "attempting CDP connection");
                match Browser::connect(&ws_url).await {
                    Ok(result) => {
                        tracing::info!("CDP connection established");
                        break result;
                    }
                    Err(e) => {
                        retries -= 1;
                        if retries == 0 {
                            return Err(Error::Cdp(format!(
                                "Failed to connect to Chrome (pid {}) after {} attempts: {}",
                                pid, CONNECT_ATTEMPTS, e
                            )));
                        }
                        tracing::debug!(retries, "CDP connection attempt failed, retrying");
                        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                    }
                }
            }
        };

        // The handler task must run for any browser command to complete
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        // Wait for Chrome to create its initial page
        tokio::time::sleep(Duration::from_millis(500)).await;

        let page = if let Some(page) = browser.pages().await?.first() {
            page.clone()
        } else {
            browser.new_page("about:blank").await?
        };

        Ok((browser, page, handler_task))
    }
}

impl Default for ChromeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    type Session = ChromeSession;

    async fn open(&self) -> kestrel_core::Result<ChromeSession> {
        self.open_session()
            .await
            .map_err(|e| CoreError::SessionOpen(e.to_string()))
    }
}

/// One live Chrome instance: the spawned process plus its CDP connection.
///
/// Owned by the automator for the duration of a run and closed exactly once;
/// `close` tears down the CDP session and reaps the process.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    process: Child,
    handler_task: JoinHandle<()>,
    _profile: ProfileManager,
}

impl ChromeSession {
    async fn shutdown(&mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("CDP browser close failed: {}", e);
        }

        // Grace period for Chrome to exit after the CDP close, then SIGTERM,
        // then a hard kill.
        let deadline = Instant::now() + CLOSE_GRACE;
        loop {
            match self.process.try_wait() {
                Ok(Some(status)) => {
                    tracing::info!(code = status.code().unwrap_or(-1), "Chrome exited");
                    return Ok(());
                }
                Ok(None) if Instant::now() >= deadline => break,
                Ok(None) => tokio::time::sleep(Duration::from_millis(100)).await,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        tracing::debug!(pid = self.process.id(), "Chrome still running, terminating");
        kill_process_by_pid(self.process.id());

        let deadline = Instant::now() + CLOSE_GRACE;
        loop {
            match self.process.try_wait() {
                Ok(Some(_)) => return Ok(()),
                Ok(None) if Instant::now() >= deadline => {
                    self.process.kill().map_err(Error::Io)?;
                    self.process.wait().map_err(Error::Io)?;
                    return Ok(());
                }
                Ok(None) => tokio::time::sleep(Duration::from_millis(100)).await,
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> kestrel_core::Result<()> {
        tracing::debug!(url, "navigating");
        self.page.goto(url).await.map_err(|e| CoreError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> kestrel_core::Result<()> {
        let start = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                tracing::debug!(
                    selector,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "element appeared"
                );
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(CoreError::ElementNotFound {
                    selector: selector.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn fill(&mut self, selector: &str, text: &str) -> kestrel_core::Result<()> {
        let element =
            self.page
                .find_element(selector)
                .await
                .map_err(|_| CoreError::ElementNotFound {
                    selector: selector.to_string(),
                    waited_ms: 0,
                })?;

        // Click to focus before typing, as a user would
        element.click().await.map_err(|e| CoreError::Input {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;
        element.type_str(text).await.map_err(|e| CoreError::Input {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn submit(&mut self, selector: &str) -> kestrel_core::Result<()> {
        let element =
            self.page
                .find_element(selector)
                .await
                .map_err(|_| CoreError::ElementNotFound {
                    selector: selector.to_string(),
                    waited_ms: 0,
                })?;

        // Enter from the field submits its enclosing form
        element.press_key("Enter").await.map_err(|e| CoreError::Submit {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn close(&mut self) -> kestrel_core::Result<()> {
        let result = self.shutdown().await;
        self.handler_task.abort();
        result.map_err(|e| CoreError::SessionClose(e.to_string()))
    }
}
