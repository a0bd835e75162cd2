//! kport - header closure and symbol cross-reference for porting a BSD
//! network stack onto Linux headers
//!
//! This crate provides the library behind the `kport` tool: parsing build
//! and link diagnostics, copying missing headers from a donor tree until the
//! build converges, mapping undefined symbols back to the files that define
//! them, and cross-referencing definitions between the two header
//! ecosystems.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities for kport unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a scripted build/link tool and temporary
/// donor/target trees.
#[cfg(test)]
pub mod test_support;

pub use builder::{ClosureBuilder, ClosureError, ClosureReport, Materializer};
pub use core::{DefinitionIndex, DiagnosticParser, SymbolManifest};
pub use resolver::{ResolveError, SourceSymbolTable, SymbolResolver};
pub use util::Config;
