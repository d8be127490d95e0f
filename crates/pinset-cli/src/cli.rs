//! CLI argument definitions for pinset.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pinset",
    version,
    about = "Pin Python requirements to exact versions",
    long_about = "pinset resolves Python package requirements against PyPI or a local index, \
                  honouring exact-version constraints, and writes a pinned requirements list \
                  and a JSON dependency map."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve requirements into exact pins
    Compile(CompileArgs),
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Requirement specifiers, e.g. `Flask>=0.11` or `requests[socks]`
    #[arg(value_name = "REQUIREMENT")]
    pub requirements: Vec<String>,

    /// Read requirements from a file (repeatable)
    #[arg(short = 'r', long = "requirement", value_name = "FILE")]
    pub requirement_files: Vec<PathBuf>,

    /// Constrain versions with a file of `name==version` lines (repeatable).
    /// Every resolved package must then be covered by a constraint.
    #[arg(short = 'c', long = "constraint", value_name = "FILE")]
    pub constraint_files: Vec<PathBuf>,

    /// Only pin the given requirements, not their dependencies
    #[arg(long)]
    pub flat: bool,

    /// Allow a package to be required more than once (requires -c)
    #[arg(long)]
    pub allow_double: bool,

    /// Write the pinned list to PATH (`-` for stdout)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the JSON dependency map to PATH (`-` for stdout)
    #[arg(short = 'j', long, value_name = "PATH")]
    pub json_output: Option<PathBuf>,

    /// Resolve against a local TOML index instead of PyPI (takes precedence over --index-url)
    #[arg(long, value_name = "PATH")]
    pub index: Option<PathBuf>,

    /// Base URL of a PyPI-compatible JSON API
    #[arg(short = 'i', long, value_name = "URL", env = "PINSET_INDEX_URL")]
    pub index_url: Option<String>,

    /// Allow pre-release versions
    #[arg(long)]
    pub pre: bool,

    /// Do not read or write the response cache
    #[arg(long)]
    pub no_cache: bool,

    /// Python version (X.Y) used to evaluate environment markers
    #[arg(long, value_name = "X.Y")]
    pub python_version: Option<String>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
