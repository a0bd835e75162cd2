//! Core data structures for kport.
//!
//! This module contains the foundational types shared by the closure
//! builder, the symbol resolver and the analyzers:
//! - Diagnostic parsing (missing includes, undefined symbols)
//! - Definitions and the definition index
//! - Source file identity
//! - Symbol manifests

pub mod definition;
pub mod diagnostics;
pub mod extract;
pub mod index;
pub mod manifest;
pub mod source_file;
pub mod symbol;

pub use definition::{definition_key, Definition, DefinitionKind};
pub use diagnostics::{
    DiagnosticEvent, DiagnosticGrammar, DiagnosticParser, MissingInclude, ParseReport,
};
pub use extract::{ExtractionPipeline, NameNormalizer, StripAction, StripRule};
pub use index::DefinitionIndex;
pub use manifest::{ManifestBlock, ManifestEntry, SymbolManifest};
pub use source_file::{normalize_path, Ecosystem, SourceFile};
pub use symbol::Symbol;
