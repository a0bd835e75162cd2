//! Header closure building.
//!
//! This module drives the external build tool against the target tree and
//! copies the headers it is missing from the donor tree until the build
//! stops asking for more.

pub mod closure;
pub mod errors;
pub mod materialize;
pub mod tool;

pub use closure::{ClosureBuilder, ClosureOptions, ClosureReport, ClosureState, StallInfo};
pub use errors::ClosureError;
pub use materialize::{CopyAction, MaterializePolicy, MaterializedHeader, Materializer};
pub use tool::{CommandTool, ExternalTool, SavedOutput, ToolOutput};
