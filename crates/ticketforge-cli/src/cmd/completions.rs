use clap::Args;
use clap_complete::{Shell, generate};
use std::io::Write;

/// Arguments for `tkf completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script generation.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `command` to `out`, using the command's
/// own name as the binary name.
pub fn write_completions(args: &CompletionsArgs, mut command: clap::Command, out: &mut dyn Write) {
    let bin_name = command.get_name().to_string();
    generate(args.shell, &mut command, bin_name, out);
}
