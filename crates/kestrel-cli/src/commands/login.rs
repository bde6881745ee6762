use anyhow::Result;
use async_trait::async_trait;
use console::Term;
use kestrel_browser::ChromeDriver;
use kestrel_core::credentials::{PASSWORD_VAR, USERNAME_VAR};
use kestrel_core::{
    ContinueSignal, CredentialProvider, Credentials, EnvCredentials, ImmediateSignal,
    LoginAutomator, LoginPlan,
};
use std::path::PathBuf;

pub struct LoginOptions {
    pub url: Option<String>,
    pub plan: Option<PathBuf>,
    pub username_selector: Option<String>,
    pub password_selector: Option<String>,
    pub timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub chrome_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub username: Option<String>,
    pub no_wait: bool,
}

pub fn execute(opts: LoginOptions) -> Result<()> {
    let plan = build_plan(&opts)?;
    let driver = build_driver(&opts)?;

    let provider: Box<dyn CredentialProvider> = select_provider(opts.username.clone());
    let signal: Box<dyn ContinueSignal> = if opts.no_wait {
        Box::new(ImmediateSignal)
    } else {
        Box::new(ConsoleGate)
    };

    // Create tokio runtime for async operations
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        println!("🔐 Logging in at: {}", plan.url);

        let automator = LoginAutomator::new(provider, driver, signal);
        automator.run(&plan).await?;

        println!("✅ Browser closed");
        Ok(())
    });

    // Explicitly shutdown runtime with timeout to prevent hanging on blocking tasks
    runtime.shutdown_timeout(std::time::Duration::from_millis(100));

    result
}

fn build_plan(opts: &LoginOptions) -> Result<LoginPlan> {
    let mut plan = match (&opts.plan, &opts.url) {
        (Some(path), _) => LoginPlan::from_json_file(path)?,
        (None, Some(url)) => LoginPlan::new(url.clone()),
        (None, None) => anyhow::bail!("either a URL or --plan is required"),
    };

    // Flags override the plan file
    if let (Some(_), Some(url)) = (&opts.plan, &opts.url) {
        plan.url = url.clone();
    }
    if let Some(selector) = &opts.username_selector {
        plan.username_selector = selector.clone();
    }
    if let Some(selector) = &opts.password_selector {
        plan.password_selector = selector.clone();
    }
    if let Some(secs) = opts.timeout_secs {
        plan.timeout_ms = secs.saturating_mul(1000);
    }
    if let Some(ms) = opts.poll_interval_ms {
        plan.poll_interval_ms = ms;
    }

    Ok(plan.validate()?)
}

fn build_driver(opts: &LoginOptions) -> Result<ChromeDriver> {
    let mut driver = ChromeDriver::new();

    if let Some(path) = &opts.chrome_path {
        driver = driver.with_chrome_path(path.clone());
    }

    if let Some(name) = &opts.profile {
        let profile_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
            .join(".kestrel")
            .join("profiles")
            .join(name);

        println!("📁 Using profile: {}", profile_dir.display());
        driver = driver.with_profile_dir(profile_dir);
    } else {
        println!("📁 Using temporary profile");
    }

    Ok(driver)
}

fn select_provider(username: Option<String>) -> Box<dyn CredentialProvider> {
    if username.is_none()
        && std::env::var(USERNAME_VAR).is_ok()
        && std::env::var(PASSWORD_VAR).is_ok()
    {
        return Box::new(EnvCredentials::new());
    }
    Box::new(PromptCredentials { username })
}

/// Asks for whatever part of the credential pair is not already known: the
/// username can come from `--username` or a prompt, the password from
/// `KESTREL_PASSWORD` or a no-echo prompt.
struct PromptCredentials {
    username: Option<String>,
}

impl CredentialProvider for PromptCredentials {
    fn credentials(&self) -> kestrel_core::Result<Credentials> {
        let term = Term::stderr();

        let username = match &self.username {
            Some(user) => user.clone(),
            None => {
                term.write_str("Username: ").map_err(prompt_err)?;
                term.read_line().map_err(prompt_err)?
            }
        };

        let password = match std::env::var(PASSWORD_VAR) {
            Ok(password) if !password.is_empty() => password,
            _ => {
                term.write_str("Password: ").map_err(prompt_err)?;
                term.read_secure_line().map_err(prompt_err)?
            }
        };

        Ok(Credentials::new(username, password))
    }
}

fn prompt_err(e: std::io::Error) -> kestrel_core::Error {
    kestrel_core::Error::Credentials(format!("prompt failed: {}", e))
}

/// Holds the run open until the operator presses Enter, so the logged-in
/// browser window can be used manually before teardown.
struct ConsoleGate;

#[async_trait]
impl ContinueSignal for ConsoleGate {
    async fn wait(&self) -> kestrel_core::Result<()> {
        let line = tokio::task::spawn_blocking(|| {
            let term = Term::stdout();
            term.write_line("⏸  Press Enter to close the browser...")?;
            term.read_line()
        })
        .await
        .map_err(|e| kestrel_core::Error::Signal(e.to_string()))?
        .map_err(|e| kestrel_core::Error::Signal(e.to_string()))?;

        // Any input releases the gate; its content is discarded
        drop(line);
        Ok(())
    }
}
