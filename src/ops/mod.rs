//! High-level operations.
//!
//! This module contains the implementation of kport commands.

pub mod close;
pub mod index;
pub mod manifest_diff;
pub mod resolve;
pub mod xref;

pub use close::{close, CloseOptions};
pub use index::{index, IndexFormat, IndexOptions};
pub use manifest_diff::{manifest_diff, stubs, StubsOptions};
pub use resolve::{resolve, ResolveOptions};
pub use xref::{cross_reference, xref, XrefEntry, XrefOptions, XrefReport, XrefSide};
