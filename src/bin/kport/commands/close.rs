//! `kport close` command

use std::path::PathBuf;

use anyhow::Result;

use super::{apply_trees, GlobalArgs};
use crate::cli::CloseArgs;
use kport::ops::close::{close, format_report, CloseOptions};

pub fn execute(args: CloseArgs, global: &GlobalArgs) -> Result<()> {
    let mut config = global.load_config()?;

    // CLI overrides config
    apply_trees(&mut config, args.trees);
    if !args.build_cmd.is_empty() {
        config.build.command = args.build_cmd;
    }
    if args.stall_threshold.is_some() {
        config.closure.stall_threshold = args.stall_threshold;
    }
    if args.prefix.is_some() {
        config.closure.prefix = args.prefix;
    }
    if args.allow_overwrite {
        config.closure.allow_overwrite = Some(true);
    }

    let options = CloseOptions {
        from_log: args.from_log,
        no_log: args.no_log,
    };

    let report = close(&config, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let target = config.trees.target.clone().unwrap_or_else(|| PathBuf::from("."));
        print!("{}", format_report(&report, &target, global.verbose));
    }

    Ok(())
}
