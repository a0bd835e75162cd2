//! Files still owed stubs: the required manifest minus what is already handled.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::manifest::{parse_blocks, ManifestBlock};
use crate::util::fs::{read_to_string, write_string};

/// Blocks of `required` whose file is not in `handled`, verbatim and in order.
pub fn remaining_blocks(required: &str, handled: &str) -> Vec<ManifestBlock> {
    let handled = parse_blocks(handled);
    let done: HashSet<&str> = handled.iter().map(|block| block.file()).collect();

    parse_blocks(required)
        .into_iter()
        .filter(|block| !done.contains(block.file()))
        .collect()
}

/// Render [`remaining_blocks`] in manifest form.
pub fn manifest_diff(required: &str, handled: &str) -> String {
    let mut out = String::new();
    for block in remaining_blocks(required, handled) {
        block.render_into(&mut out);
    }
    out
}

/// Options for `kport stubs`.
#[derive(Debug, Clone)]
pub struct StubsOptions {
    /// Every file the link step needs.
    pub required: PathBuf,
    /// Files already stubbed or ported.
    pub handled: PathBuf,
    /// Write here instead of returning only.
    pub output: Option<PathBuf>,
}

/// Compute the remaining manifest and optionally write it out.
pub fn stubs(options: &StubsOptions) -> Result<String> {
    let required = read_to_string(&options.required)?;
    let handled = read_to_string(&options.handled)?;

    let remaining = manifest_diff(&required, &handled);
    tracing::info!(
        "{} of {} file(s) still need stubs",
        parse_blocks(&remaining).len(),
        parse_blocks(&required).len()
    );

    if let Some(output) = &options.output {
        write_string(output, &remaining)?;
    }
    Ok(remaining)
}
