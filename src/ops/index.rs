//! `index`: extract the definitions of a source tree.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::definition::Definition;
use crate::core::extract::{ExtractionPipeline, Extractor};
use crate::core::index::DefinitionIndex;
use crate::ops::xref::extraction_pipeline;
use crate::util::config::Config;
use crate::util::fs::{source_files, write_string};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexFormat {
    /// `file<TAB>kind<TAB>name` per definition, loadable by `xref`.
    #[default]
    Triples,
    /// The keyed index as JSON.
    Json,
}

/// Options for `kport index`.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub root: PathBuf,
    pub format: IndexFormat,
    pub output: Option<PathBuf>,
}

/// Extract every matching file under `root`, in path order.
pub fn extract_tree<E: Extractor>(
    pipeline: &ExtractionPipeline<E>,
    root: &Path,
    suffixes: &[String],
) -> Result<Vec<Definition>> {
    let files = source_files(root, suffixes)?;
    let mut definitions = Vec::new();
    for file in &files {
        definitions.extend(pipeline.extract_file(root, file)?);
    }
    tracing::info!(
        "extracted {} definition(s) from {} file(s) under {}",
        definitions.len(),
        files.len(),
        root.display()
    );
    Ok(definitions)
}

/// Render definitions in the requested format.
pub fn render(definitions: Vec<Definition>, format: IndexFormat) -> Result<String> {
    match format {
        IndexFormat::Triples => {
            let mut out = String::new();
            for def in &definitions {
                out.push_str(&def.to_triple());
                out.push('\n');
            }
            Ok(out)
        }
        IndexFormat::Json => {
            let index = DefinitionIndex::from_definitions(definitions);
            let mut json = serde_json::to_string_pretty(&index)?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Index a tree with the configured extractor.
pub fn index(config: &Config, options: &IndexOptions) -> Result<String> {
    let pipeline = extraction_pipeline(config)?;
    let definitions = extract_tree(&pipeline, &options.root, &config.extract_suffixes())?;
    let rendered = render(definitions, options.format)?;

    if let Some(output) = &options.output {
        write_string(output, &rendered)?;
    }
    Ok(rendered)
}
