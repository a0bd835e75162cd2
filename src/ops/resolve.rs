//! `resolve`: link once and list the donor files that define missing symbols.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::tool::{CommandTool, SavedOutput};
use crate::core::diagnostics::DiagnosticParser;
use crate::ops::xref::extraction_pipeline;
use crate::resolver::errors::ResolveError;
use crate::resolver::resolve::{ResolveReport, SymbolResolver};
use crate::resolver::symbols::SourceSymbolTable;
use crate::util::config::Config;
use crate::util::diagnostic::suggestions;
use crate::util::fs::{read_to_string, source_files, write_string};
use crate::util::process::find_nm;

/// Options for a resolution run beyond what the configuration holds.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Replay this link log instead of running the link step.
    pub from_log: Option<PathBuf>,

    /// Write the manifest here.
    pub output: Option<PathBuf>,
}

/// Build the symbol table from `[link] symbols`, by scanning donor objects
/// with `nm`, or by running the `[extract]` command over the donor tree.
pub fn symbol_table(config: &Config) -> Result<SourceSymbolTable> {
    if let Some(listing) = &config.link.symbols {
        let table = SourceSymbolTable::from_listing(&read_to_string(listing)?);
        tracing::info!("loaded {} symbol(s) from {}", table.len(), listing.display());
        return Ok(table);
    }

    let donor = config
        .trees
        .donor
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no donor tree configured\n{}", suggestions::NO_CONFIG))?;

    if !config.link.objects.is_empty() {
        let nm = match &config.link.nm {
            Some(nm) => nm.clone(),
            None => find_nm()
                .ok_or_else(|| anyhow::anyhow!("`nm` not found in PATH\n{}", suggestions::NM))?,
        };

        return Ok(SourceSymbolTable::scan_objects(
            &donor,
            &config.link.objects,
            &nm,
            config.source_extension(),
        )?);
    }

    if !config.extract.command.is_empty() {
        let files = source_files(&donor, &config.extract_suffixes())?;
        let index = extraction_pipeline(config)?.index_files(&donor, &files)?;
        let table = SourceSymbolTable::from_definitions(&index);
        tracing::info!(
            "extracted {} function symbol(s) from {}",
            table.len(),
            donor.display()
        );
        return Ok(table);
    }

    anyhow::bail!(
        "no symbol source configured; set `[link] symbols`, `[link] objects` or `[extract] command`\n{}",
        suggestions::OBJECTS
    )
}

/// Run the link step (or replay it) and resolve its undefined symbols.
pub fn resolve(config: &Config, options: &ResolveOptions) -> Result<ResolveReport> {
    let table = symbol_table(config)?;
    let resolver = SymbolResolver::new(DiagnosticParser::new(&config.diagnostic_grammar()), table)
        .with_options(config.resolver_options());

    let cwd = config
        .trees
        .target
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let report = match &options.from_log {
        Some(log) => resolver.run(&mut SavedOutput::new(log), &cwd)?,
        None => {
            if config.link.command.is_empty() {
                return Err(ResolveError::LinkTool {
                    message: "no link command configured".to_string(),
                }
                .into());
            }
            let mut tool = CommandTool::from_argv(&config.link.command)?;
            resolver.run(&mut tool, &cwd)?
        }
    };

    if let Some(output) = &options.output {
        write_string(output, &report.manifest.render())?;
        tracing::info!("wrote manifest to {}", output.display());
    }

    Ok(report)
}

/// Render a resolution report for the terminal.
pub fn format_report(report: &ResolveReport, output: Option<&Path>) -> String {
    let mut text = String::new();

    match output {
        Some(path) => writeln!(
            text,
            "{} undefined symbol(s) in {} file(s), manifest written to {}",
            report.symbols.len(),
            report.manifest.len(),
            path.display()
        )
        .unwrap(),
        None => text.push_str(&report.manifest.render()),
    }

    if !report.unresolved.is_empty() {
        writeln!(text, "unresolved:").unwrap();
        for symbol in &report.unresolved {
            writeln!(text, "\t{}", symbol).unwrap();
        }
    }

    text
}
