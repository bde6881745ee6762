use anyhow::Result;
use clap::Command;
use clap_complete::{Shell, generate};
use std::io;

/// Write a kestrel completion script for the given shell to stdout.
pub fn execute(shell: Shell, cmd: &mut Command) -> Result<()> {
    generate(shell, cmd, "kestrel", &mut io::stdout());
    Ok(())
}
