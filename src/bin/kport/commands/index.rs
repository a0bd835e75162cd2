//! `kport index` command

use anyhow::Result;

use super::GlobalArgs;
use crate::cli::{IndexArgs, IndexFormatArg};
use kport::ops::index::{index, IndexFormat, IndexOptions};

pub fn execute(args: IndexArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.load_config()?;

    let format = match args.format {
        IndexFormatArg::Triples => IndexFormat::Triples,
        IndexFormatArg::Json => IndexFormat::Json,
    };
    let to_stdout = args.output.is_none();

    let rendered = index(
        &config,
        &IndexOptions {
            root: args.root,
            format,
            output: args.output,
        },
    )?;

    if to_stdout {
        print!("{}", rendered);
    }

    Ok(())
}
