//! Source symbol tables: which files define which linker symbols.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::errors::ResolveError;
use crate::core::definition::{Definition, DefinitionKind};
use crate::core::index::DefinitionIndex;
use crate::core::source_file::{normalize, normalize_path};
use crate::util::fs::{glob_files, relative_path};
use crate::util::process::ProcessBuilder;

/// `nm` type letters for global symbols defined in an object.
const DEFINED_NM_TYPES: &[char] = &['T', 'D', 'B', 'R', 'S', 'G', 'V', 'W', 'C'];

/// Maps symbol names to every file that defines them.
#[derive(Debug, Clone, Default)]
pub struct SourceSymbolTable {
    symbols: Vec<String>,
    owners: HashMap<String, Vec<String>>,
}

impl SourceSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `file` defines `symbol`.
    pub fn insert(&mut self, symbol: &str, file: &str) {
        let file = normalize_path(file);
        match self.owners.get_mut(symbol) {
            Some(owners) => {
                if !owners.contains(&file) {
                    owners.push(file);
                }
            }
            None => {
                self.symbols.push(symbol.to_string());
                self.owners.insert(symbol.to_string(), vec![file]);
            }
        }
    }

    /// Files defining `symbol`, in insertion order.
    pub fn owners(&self, symbol: &str) -> &[String] {
        self.owners.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Build from a listing.
    ///
    /// Two-column lines are `file symbol`. Lines in the `file kind name`
    /// triple format written by `kport index` contribute their function
    /// definitions; other kinds are not linker symbols and are skipped.
    pub fn from_listing(text: &str) -> Self {
        let mut table = SourceSymbolTable::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(def) = Definition::parse_triple(line) {
                if def.kind == DefinitionKind::Function {
                    table.insert(&def.name, &def.owning_file);
                }
                continue;
            }

            let mut fields = line.split_whitespace();
            if let (Some(file), Some(symbol)) = (fields.next(), fields.next()) {
                table.insert(symbol, file);
            }
        }
        table
    }

    /// Build from the function definitions of an extracted donor index.
    pub fn from_definitions(index: &DefinitionIndex) -> Self {
        let mut table = SourceSymbolTable::new();
        for (name, owners) in index.functions() {
            for owner in owners {
                table.insert(name, owner);
            }
        }
        table
    }

    /// Add the globally defined symbols listed in `nm` output for `file`.
    pub fn add_nm_output(&mut self, file: &str, output: &str) {
        for line in output.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (kind, name) = match fields.as_slice() {
                [_, kind, name, ..] => (*kind, *name),
                [kind, name] => (*kind, *name),
                _ => continue,
            };

            let mut letters = kind.chars();
            let is_defined = matches!(
                (letters.next(), letters.next()),
                (Some(c), None) if DEFINED_NM_TYPES.contains(&c)
            );
            if is_defined {
                self.insert(name, file);
            }
        }
    }

    /// Run `nm` over every object matching `patterns` under `root`.
    ///
    /// Objects are recorded under their source name: `kern/uipc_mbuf.o`
    /// becomes `kern/uipc_mbuf.c` when `source_extension` is `c`.
    pub fn scan_objects(
        root: &Path,
        patterns: &[String],
        nm: &Path,
        source_extension: &str,
    ) -> Result<Self, ResolveError> {
        let objects = glob_files(root, patterns).map_err(|e| ResolveError::SymbolScan {
            path: root.to_path_buf(),
            message: format!("{:#}", e),
        })?;

        if objects.is_empty() {
            return Err(ResolveError::NoSymbolSources {
                patterns: patterns.to_vec(),
            });
        }

        let mut table = SourceSymbolTable::new();
        for object in &objects {
            let output = ProcessBuilder::new(nm)
                .arg(object)
                .exec_and_check()
                .map_err(|e| ResolveError::SymbolScan {
                    path: object.clone(),
                    message: format!("{:#}", e),
                })?;

            let source = source_name(&relative_path(root, object), source_extension);
            table.add_nm_output(&source, &String::from_utf8_lossy(&output.stdout));
        }

        tracing::info!(
            "scanned {} object(s), {} defined symbol(s)",
            objects.len(),
            table.len()
        );
        Ok(table)
    }
}

fn source_name(object: &Path, source_extension: &str) -> String {
    let source: PathBuf = object.with_extension(source_extension);
    normalize(&source)
}
