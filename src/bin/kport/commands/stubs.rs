//! `kport stubs` command
//!
//! Prints the files of the required manifest that the handled manifest does
//! not list yet, with their symbols.

use anyhow::Result;

use crate::cli::StubsArgs;
use kport::ops::manifest_diff::{stubs, StubsOptions};

pub fn execute(args: StubsArgs) -> Result<()> {
    let to_stdout = args.output.is_none();

    let remaining = stubs(&StubsOptions {
        required: args.required,
        handled: args.handled,
        output: args.output,
    })?;

    if to_stdout {
        print!("{}", remaining);
    }

    Ok(())
}
