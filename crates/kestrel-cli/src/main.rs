use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "kestrel")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Drive a real browser through a scripted login",
    long_about = "Kestrel launches Chrome, navigates to a login page, waits for the login form \
                  to appear, fills in your credentials, submits, and keeps the window open \
                  until you press Enter."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log into a site by driving a Chrome browser
    Login {
        /// Login page URL (scheme-less values get https:// prefixed)
        #[arg(value_name = "URL", required_unless_present = "plan")]
        url: Option<String>,

        /// Read the login plan from a JSON file; flags override its values
        #[arg(long, value_name = "FILE")]
        plan: Option<PathBuf>,

        /// CSS selector for the username field
        #[arg(long, value_name = "SELECTOR")]
        username_selector: Option<String>,

        /// CSS selector for the password field
        #[arg(long, value_name = "SELECTOR")]
        password_selector: Option<String>,

        /// How long to wait for the login form, in seconds
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,

        /// How often to re-check for the login form, in milliseconds
        #[arg(long, value_name = "MS")]
        poll_interval_ms: Option<u64>,

        /// Path to the Chrome binary (default: search platform paths)
        #[arg(long, value_name = "PATH")]
        chrome_path: Option<PathBuf>,

        /// Use a named persistent profile under ~/.kestrel/profiles/
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,

        /// Username (otherwise KESTREL_USERNAME or an interactive prompt)
        #[arg(long, value_name = "USER")]
        username: Option<String>,

        /// Close the browser right after submitting instead of waiting for Enter
        #[arg(long)]
        no_wait: bool,
    },

    /// Generate shell completion scripts
    #[command(long_about = "Generate shell completion scripts for kestrel.\n\n\
        SUPPORTED SHELLS:\n  \
        bash, zsh, fish, powershell, elvish\n\n\
        INSTALLATION:\n  \
        bash:       kestrel completion --shell bash >> ~/.bashrc\n  \
        zsh:        kestrel completion --shell zsh > ~/.zfunc/_kestrel, then add\n              \
        'fpath+=~/.zfunc; autoload -Uz compinit && compinit' to ~/.zshrc\n  \
        fish:       kestrel completion --shell fish > ~/.config/fish/completions/kestrel.fish\n  \
        powershell: kestrel completion --shell powershell | Out-String | Invoke-Expression")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Login {
            url,
            plan,
            username_selector,
            password_selector,
            timeout_secs,
            poll_interval_ms,
            chrome_path,
            profile,
            username,
            no_wait,
        } => commands::login::execute(commands::login::LoginOptions {
            url,
            plan,
            username_selector,
            password_selector,
            timeout_secs,
            poll_interval_ms,
            chrome_path,
            profile,
            username,
            no_wait,
        }),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            commands::completion::execute(shell, &mut cmd)
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("kestrel=debug,kestrel_core=debug,kestrel_browser=debug")
    } else {
        EnvFilter::new("kestrel=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
