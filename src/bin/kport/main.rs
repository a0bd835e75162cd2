//! kport CLI - header closure and symbol cross-reference for kernel ports

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use kport::builder::ClosureError;
use kport::resolver::ResolveError;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        // Closure and resolution failures carry their own diagnostics
        if let Some(err) = e.downcast_ref::<ClosureError>() {
            eprint!("{}", err.to_diagnostic().format(color));
        } else if let Some(err) = e.downcast_ref::<ResolveError>() {
            eprint!("{}", err.to_diagnostic().format(color));
        } else {
            eprintln!("error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("kport=debug")
    } else {
        EnvFilter::new("kport=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let global = commands::GlobalArgs {
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    // Execute command
    match cli.command {
        Commands::Close(args) => commands::close::execute(args, &global),
        Commands::Resolve(args) => commands::resolve::execute(args, &global),
        Commands::Xref(args) => commands::xref::execute(args, &global),
        Commands::Stubs(args) => commands::stubs::execute(args),
        Commands::Index(args) => commands::index::execute(args, &global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
