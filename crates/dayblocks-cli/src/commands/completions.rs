use clap::{Args, Command};
use clap_complete::{generate, Shell};

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to stdout.
pub fn run(shell: Shell, cmd: &mut Command) -> super::CmdResult {
    generate(shell, cmd, "dayblocks", &mut std::io::stdout());
    Ok(())
}
