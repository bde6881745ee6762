use crate::{Error, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Spawns the Chrome process with remote debugging enabled.
///
/// The browser always starts at `about:blank`; navigation to the login page
/// happens over CDP once the session is connected.
pub struct ChromeLauncher {
    chrome_path: PathBuf,
    profile_path: PathBuf,
    debugging_port: u16,
}

impl ChromeLauncher {
    pub fn new(chrome_path: PathBuf, profile_path: PathBuf, debugging_port: u16) -> Self {
        Self {
            chrome_path,
            profile_path,
            debugging_port,
        }
    }

    /// Launch the Chrome process
    pub fn launch(&self) -> Result<Child> {
        let args = self.build_args();

        Command::new(&self.chrome_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))
    }

    /// Build Chrome command-line arguments
    fn build_args(&self) -> Vec<String> {
        vec![
            format!("--remote-debugging-port={}", self.debugging_port),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            format!("--user-data-dir={}", self.profile_path.display()),
            "about:blank".to_string(),
        ]
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }
}
