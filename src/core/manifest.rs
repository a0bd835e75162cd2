//! Symbol manifests: which defining file owes which symbols.
//!
//! On disk a manifest is a sequence of blocks:
//!
//! ```text
//! kern/uipc_mbuf.c
//! 	m_get
//! 	m_free
//!
//! netinet/in_cksum.c
//! 	in_cksum
//!
//! ```
//!
//! A block is a file line followed by detail lines; blocks are separated
//! purely by blank lines.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;

use super::symbol::Symbol;

/// A defining file and the symbols it has to supply, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub defining_file: String,
    pub symbols: Vec<Symbol>,
}

/// Ordered collection of manifest entries, one per defining file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolManifest {
    entries: Vec<ManifestEntry>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl SymbolManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol under a file. Files keep first-seen order; a symbol is
    /// listed at most once per file.
    pub fn push(&mut self, defining_file: &str, symbol: &Symbol) {
        let idx = match self.positions.get(defining_file) {
            Some(&idx) => idx,
            None => {
                self.entries.push(ManifestEntry {
                    defining_file: defining_file.to_string(),
                    symbols: Vec::new(),
                });
                self.positions
                    .insert(defining_file.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let symbols = &mut self.entries[idx].symbols;
        if !symbols.contains(symbol) {
            symbols.push(symbol.clone());
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn get(&self, defining_file: &str) -> Option<&ManifestEntry> {
        self.positions.get(defining_file).map(|&idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render in the on-disk block format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry.defining_file);
            for symbol in &entry.symbols {
                let _ = writeln!(out, "\t{}", symbol);
            }
            out.push('\n');
        }
        out
    }
}

/// One block of a manifest listing, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestBlock {
    /// The file line as written.
    pub file_line: String,
    /// Detail lines as written, in order.
    pub details: Vec<String>,
}

impl ManifestBlock {
    /// File identity used for comparisons.
    pub fn file(&self) -> &str {
        self.file_line.trim()
    }

    pub fn render_into(&self, out: &mut String) {
        out.push_str(&self.file_line);
        out.push('\n');
        for detail in &self.details {
            out.push_str(detail);
            out.push('\n');
        }
        out.push('\n');
    }
}

/// Split a listing into blocks. The first non-blank line after a blank line
/// (or at the start) is a file line; the following non-blank lines are its
/// details.
pub fn parse_blocks(text: &str) -> Vec<ManifestBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<ManifestBlock> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            blocks.extend(current.take());
            continue;
        }

        match current.as_mut() {
            Some(block) => block.details.push(line.to_string()),
            None => {
                current = Some(ManifestBlock {
                    file_line: line.to_string(),
                    details: Vec::new(),
                })
            }
        }
    }

    blocks.extend(current);
    blocks
}
