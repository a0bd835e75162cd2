//! Symbol resolution.
//!
//! After the header closure builds, the link step reports undefined symbols.
//! This module maps each of them back to the donor source file that defines
//! it, producing the manifest of files that still need stubs.

pub mod errors;
pub mod resolve;
pub mod symbols;

pub use errors::ResolveError;
pub use resolve::{AmbiguousSymbolOwner, ResolveReport, ResolverOptions, SymbolResolver};
pub use symbols::SourceSymbolTable;
