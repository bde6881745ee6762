use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Credential provider failed: {0}")]
    Credentials(String),

    #[error("Failed to open browser session: {0}")]
    SessionOpen(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("No element matched selector {selector:?} after {waited_ms}ms")]
    ElementNotFound { selector: String, waited_ms: u64 },

    #[error("Input to element {selector:?} failed: {reason}")]
    Input { selector: String, reason: String },

    #[error("Submission from element {selector:?} failed: {reason}")]
    Submit { selector: String, reason: String },

    #[error("Continue signal failed: {0}")]
    Signal(String),

    #[error("Failed to close browser session: {0}")]
    SessionClose(String),

    #[error("Invalid login plan: {0}")]
    Plan(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
