//! Command dispatch and handler modules.

mod compile;

use miette::Result;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Compile(args) => compile::exec(args),
    }
}
