//! `kport resolve` command

use anyhow::Result;

use super::{apply_trees, GlobalArgs};
use crate::cli::ResolveArgs;
use kport::ops::resolve::{format_report, resolve, ResolveOptions};
use kport::util::diagnostic::emit;

pub fn execute(args: ResolveArgs, global: &GlobalArgs) -> Result<()> {
    let mut config = global.load_config()?;

    // CLI overrides config
    apply_trees(&mut config, args.trees);
    if !args.link_cmd.is_empty() {
        config.link.command = args.link_cmd;
    }
    if args.symbols.is_some() {
        config.link.symbols = args.symbols;
    }
    if !args.objects.is_empty() {
        config.link.objects = args.objects;
    }

    let options = ResolveOptions {
        from_log: args.from_log,
        output: args.output,
    };

    let report = resolve(&config, &options)?;

    for ambiguous in &report.ambiguous {
        emit(&ambiguous.to_diagnostic(), global.color);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report, options.output.as_deref()));
    }

    Ok(())
}
