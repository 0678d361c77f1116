//! `conflux completions <shell>`
//!
//! Prints a completion script for the command tree defined in [`crate::Cli`],
//! covering `resolve` and its flags as well as the `config` subcommands.
//! For bash, for instance:
//! `conflux completions bash > ~/.local/share/bash-completion/completions/conflux`

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::Shell;

use crate::AppContext;

/// Arguments for the completions subcommand
#[derive(Debug, clap::Args)]
pub struct CompletionsCommand {
    /// Target shell for the completion script
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsCommand {
    pub async fn execute(&self, _ctx: &AppContext) -> Result<ExitCode> {
        let mut stdout = io::stdout().lock();
        self.write_script(&mut stdout);
        stdout.flush().context("Cannot write completion script")?;
        Ok(ExitCode::SUCCESS)
    }

    /// Writes the script, naming the binary after the clap command itself
    fn write_script<W: Write>(&self, out: &mut W) {
        let mut cmd = crate::Cli::command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(self.shell, &mut cmd, bin_name, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut out = Vec::new();
        CompletionsCommand { shell }.write_script(&mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_bash_script_covers_subcommands() {
        let script = script(Shell::Bash);
        assert!(script.contains("conflux"));
        assert!(script.contains("resolve"));
        assert!(script.contains("validate"));
    }

    #[test]
    fn test_fish_script_covers_resolve_flags() {
        let script = script(Shell::Fish);
        assert!(script.contains("-c conflux"));
        assert!(script.contains("backup-dir"));
    }
}
