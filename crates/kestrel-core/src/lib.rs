pub mod automator;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod plan;
pub mod signal;

pub use automator::LoginAutomator;
pub use credentials::{CredentialProvider, Credentials, EnvCredentials, StaticCredentials};
pub use driver::{BrowserDriver, BrowserSession};
pub use error::{Error, Result};
pub use plan::LoginPlan;
pub use signal::{ContinueSignal, ImmediateSignal};
