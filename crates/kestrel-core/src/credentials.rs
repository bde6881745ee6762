use crate::{Error, Result};
use std::fmt;

/// A username/password pair held in memory for the duration of one run.
///
/// Never persisted, never mutated. The password is excluded from `Debug`
/// output so it cannot end up in logs by accident.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of the credential pair. Invoked exactly once per run, before any
/// browser resource is allocated; its internal mechanism is opaque and its
/// output trusted verbatim.
pub trait CredentialProvider {
    fn credentials(&self) -> Result<Credentials>;
}

impl CredentialProvider for Box<dyn CredentialProvider> {
    fn credentials(&self) -> Result<Credentials> {
        self.as_ref().credentials()
    }
}

/// Environment variable name for the username.
pub const USERNAME_VAR: &str = "KESTREL_USERNAME";
/// Environment variable name for the password.
pub const PASSWORD_VAR: &str = "KESTREL_PASSWORD";

/// Reads credentials from environment variables.
pub struct EnvCredentials {
    username_var: String,
    password_var: String,
}

impl EnvCredentials {
    pub fn new() -> Self {
        Self {
            username_var: USERNAME_VAR.to_string(),
            password_var: PASSWORD_VAR.to_string(),
        }
    }

    /// Use custom variable names instead of the defaults.
    pub fn with_vars(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialProvider for EnvCredentials {
    fn credentials(&self) -> Result<Credentials> {
        let username = std::env::var(&self.username_var)
            .map_err(|_| Error::Credentials(format!("{} is not set", self.username_var)))?;
        let password = std::env::var(&self.password_var)
            .map_err(|_| Error::Credentials(format!("{} is not set", self.password_var)))?;

        if username.is_empty() {
            return Err(Error::Credentials(format!(
                "{} is set but empty",
                self.username_var
            )));
        }
        if password.is_empty() {
            return Err(Error::Credentials(format!(
                "{} is set but empty",
                self.password_var
            )));
        }

        Ok(Credentials::new(username, password))
    }
}

/// A fixed credential pair, for embedding and tests.
pub struct StaticCredentials {
    inner: Credentials,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            inner: Credentials::new(username, password),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Result<Credentials> {
        Ok(self.inner.clone())
    }
}
