//! `close`: iterate the build until the target tree has every header it needs.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::closure::{ClosureBuilder, ClosureReport, ClosureState};
use crate::builder::materialize::Materializer;
use crate::builder::tool::{CommandTool, ExternalTool, SavedOutput};
use crate::core::diagnostics::DiagnosticParser;
use crate::util::config::Config;
use crate::util::diagnostic::suggestions;

/// Options for a closure run beyond what the configuration holds.
#[derive(Debug, Clone, Default)]
pub struct CloseOptions {
    /// Replay these build logs, one per pass, instead of running the build.
    pub from_log: Vec<PathBuf>,

    /// Do not write the audit log file.
    pub no_log: bool,
}

/// Donor and target roots from `[trees]`.
pub fn trees(config: &Config) -> Result<(PathBuf, PathBuf)> {
    let donor = config
        .trees
        .donor
        .clone()
        .with_context(|| format!("no donor tree configured\n{}", suggestions::NO_CONFIG))?;
    let target = config
        .trees
        .target
        .clone()
        .with_context(|| format!("no target tree configured\n{}", suggestions::NO_CONFIG))?;

    if !donor.is_dir() {
        anyhow::bail!("donor tree `{}` is not a directory", donor.display());
    }
    if !target.is_dir() {
        anyhow::bail!("target tree `{}` is not a directory", target.display());
    }
    Ok((donor, target))
}

/// Run the closure builder as configured.
///
/// A stalled run is returned as an error carrying [`ClosureError::Stalled`],
/// so callers can render it as a diagnostic.
///
/// [`ClosureError::Stalled`]: crate::builder::errors::ClosureError::Stalled
pub fn close(config: &Config, options: &CloseOptions) -> Result<ClosureReport> {
    let (donor, target) = trees(config)?;

    let mut materializer =
        Materializer::new(&donor, &target).with_policy(config.materialize_policy());
    if !options.no_log {
        materializer = materializer.with_log_file(target.join(config.closure_log()?));
    }

    let builder = ClosureBuilder::new(
        DiagnosticParser::new(&config.diagnostic_grammar()),
        materializer,
    )
    .with_options(config.closure_options());

    let report = if options.from_log.is_empty() {
        let mut tool = build_tool(config)?;
        builder.run(&mut tool)?
    } else {
        let mut tool = SavedOutput::sequence(options.from_log.clone());
        builder.run(&mut tool)?
    };

    Ok(report.into_result()?)
}

fn build_tool(config: &Config) -> Result<CommandTool> {
    if config.build.command.is_empty() {
        anyhow::bail!("no build command configured\n{}", suggestions::BUILD_COMMAND);
    }

    let tool = config
        .build
        .env
        .iter()
        .fold(CommandTool::from_argv(&config.build.command)?, |tool, (key, value)| {
            tool.env(key, value)
        });
    tracing::debug!("build tool: {}", tool.describe());
    Ok(tool)
}

/// Render a closure report for the terminal.
pub fn format_report(report: &ClosureReport, target: &Path, verbose: bool) -> String {
    let mut output = String::new();

    match report.state {
        ClosureState::Building => writeln!(
            output,
            "closure incomplete: replay ended after {} pass(es), {} header(s) materialized",
            report.iterations,
            report.materialized.len()
        )
        .unwrap(),
        state => writeln!(
            output,
            "closure {} after {} pass(es): {} header(s) materialized",
            if state == ClosureState::Converged { "converged" } else { "stalled" },
            report.iterations,
            report.materialized.len()
        )
        .unwrap(),
    }

    for record in &report.materialized {
        let shown = record
            .target_path
            .strip_prefix(target)
            .unwrap_or(&record.target_path);
        writeln!(
            output,
            "  [{}] {:<11} {}",
            record.iteration,
            record.action.to_string(),
            shown.display()
        )
        .unwrap();
        if verbose {
            writeln!(output, "      requested by {}", record.requested_by).unwrap();
            writeln!(output, "      sha256 {}", record.sha256).unwrap();
        }
    }

    for file in &report.pending {
        writeln!(output, "  pending {}", file.path()).unwrap();
        for header in file.unresolved_includes() {
            writeln!(output, "      {}", header).unwrap();
        }
    }

    if report.ambiguous_lines > 0 {
        writeln!(
            output,
            "  {} diagnostic line(s) skipped as ambiguous (see --verbose)",
            report.ambiguous_lines
        )
        .unwrap();
    }

    output
}
