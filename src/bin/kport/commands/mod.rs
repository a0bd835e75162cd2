//! Command implementations

pub mod close;
pub mod completions;
pub mod index;
pub mod resolve;
pub mod stubs;
pub mod xref;

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cli::TreeArgs;
use kport::util::config::{global_config_path, load_config, Config, PROJECT_CONFIG};

/// Flags shared by every command.
pub struct GlobalArgs {
    pub verbose: bool,
    pub color: bool,
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    /// Load global and project configuration.
    ///
    /// An explicit `--config` file must exist; the default `kport.toml` is
    /// optional. Either one failing to parse is an error.
    pub fn load_config(&self) -> Result<Config> {
        let project = match &self.config {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file `{}` not found", path.display());
                }
                path.clone()
            }
            None => PathBuf::from(PROJECT_CONFIG),
        };

        load_config(global_config_path().as_deref(), &project)
    }
}

/// Apply `--donor`/`--target` over the configured trees.
pub fn apply_trees(config: &mut Config, trees: TreeArgs) {
    if trees.donor.is_some() {
        config.trees.donor = trees.donor;
    }
    if trees.target.is_some() {
        config.trees.target = trees.target;
    }
}
