//! `kport xref` command

use anyhow::Result;

use super::GlobalArgs;
use crate::cli::XrefArgs;
use kport::ops::xref::{format_report, xref, XrefOptions};

pub fn execute(args: XrefArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.load_config()?;

    let report = xref(
        &XrefOptions {
            reference: args.reference,
            candidate: args.candidate,
        },
        &config,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report, global.verbose));
    }

    Ok(())
}
