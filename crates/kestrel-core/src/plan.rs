use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default CSS selector for the username field.
pub const DEFAULT_USERNAME_SELECTOR: &str = "input[type='text']";
/// Default CSS selector for the password field.
pub const DEFAULT_PASSWORD_SELECTOR: &str = "input[type='password']";

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Describes one login attempt: where to go, which fields to fill, and how
/// long to wait for the page to become ready.
///
/// Readiness is condition-based: the automator polls for the username
/// selector until `timeout_ms` elapses rather than sleeping a fixed interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPlan {
    /// Login page URL. Scheme-less values get `https://` prefixed.
    pub url: String,

    /// CSS selector for the username input.
    #[serde(default = "default_username_selector")]
    pub username_selector: String,

    /// CSS selector for the password input.
    #[serde(default = "default_password_selector")]
    pub password_selector: String,

    /// How long to wait for the login form to appear.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How often to re-check for the login form while waiting.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_username_selector() -> String {
    DEFAULT_USERNAME_SELECTOR.to_string()
}

fn default_password_selector() -> String {
    DEFAULT_PASSWORD_SELECTOR.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl LoginPlan {
    /// Create a plan for the given URL with default selectors and timing.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username_selector: default_username_selector(),
            password_selector: default_password_selector(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Load a plan from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::Plan(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Normalize and validate the plan.
    ///
    /// Prefixes `https://` onto scheme-less URLs, then checks that the result
    /// parses and that neither selector is empty.
    pub fn validate(mut self) -> Result<Self> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            self.url = format!("https://{}", self.url);
        }

        url::Url::parse(&self.url).map_err(|e| Error::Plan(format!("bad URL {}: {}", self.url, e)))?;

        if self.username_selector.trim().is_empty() {
            return Err(Error::Plan("username selector is empty".to_string()));
        }
        if self.password_selector.trim().is_empty() {
            return Err(Error::Plan("password selector is empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Plan("poll interval must be non-zero".to_string()));
        }

        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
