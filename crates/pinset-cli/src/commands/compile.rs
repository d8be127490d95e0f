//! Handler for `pinset compile`.

use miette::Result;

use pinset_core::config::GlobalConfig;
use pinset_ops::ops_compile::{self, CompileOptions};

use crate::cli::CompileArgs;

pub fn exec(args: CompileArgs) -> Result<()> {
    let config = GlobalConfig::load()?;

    let opts = CompileOptions {
        requirements: args.requirements,
        requirement_files: args.requirement_files,
        constraint_files: args.constraint_files,
        flat: args.flat,
        allow_double: args.allow_double,
        output: args.output,
        json_output: args.json_output,
        index: args.index,
        index_url: args.index_url,
        pre: args.pre,
        no_cache: args.no_cache,
        python_version: args.python_version,
    };

    ops_compile::compile(&opts, &config).map(|_| ())
}
