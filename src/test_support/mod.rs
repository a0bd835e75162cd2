//! Test utilities for kport unit tests.
//!
//! Provides a scripted stand-in for the build and link tools and a pair of
//! donor/target trees on a temporary directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use kport::test_support::{ScriptedTool, TreeFixture};
//!
//! let fixture = TreeFixture::new().donor_file("sys/mbuf.h", "struct mbuf;\n");
//! let mut tool = ScriptedTool::new([tool_outputs::gcc_missing_include("net/if.c", "sys/mbuf.h")]);
//! ```

pub mod fixtures;

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tempfile::TempDir;

use crate::builder::tool::{ExternalTool, ToolOutput};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Build or link tool that replays canned outputs.
///
/// Outputs are returned in order; once the script runs out the last output
/// is repeated, so a tool that never stops complaining is one entry long.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTool {
    outputs: VecDeque<String>,
    last: Option<String>,
    failure: Option<String>,
    calls: usize,
    cwds: Vec<PathBuf>,
}

impl ScriptedTool {
    pub fn new(outputs: impl IntoIterator<Item = String>) -> Self {
        ScriptedTool {
            outputs: outputs.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A tool that prints the same text on every run.
    pub fn repeating(output: impl Into<String>) -> Self {
        ScriptedTool {
            last: Some(output.into()),
            ..Self::default()
        }
    }

    /// A tool that cannot be run at all.
    pub fn failing(message: &str) -> Self {
        ScriptedTool {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Number of invocations so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Working directories of every invocation.
    pub fn cwds(&self) -> &[PathBuf] {
        &self.cwds
    }
}

impl ExternalTool for ScriptedTool {
    fn describe(&self) -> String {
        "scripted tool".to_string()
    }

    fn invoke(&mut self, cwd: &Path) -> Result<ToolOutput> {
        self.calls += 1;
        self.cwds.push(cwd.to_path_buf());

        if let Some(message) = &self.failure {
            bail!("{}", message);
        }

        if let Some(next) = self.outputs.pop_front() {
            self.last = Some(next);
        }
        match &self.last {
            Some(text) => Ok(ToolOutput {
                text: text.clone(),
                status: Some(1),
            }),
            None => Ok(ToolOutput::from_text("")),
        }
    }
}

/// Donor and target trees under one temporary directory.
pub struct TreeFixture {
    root: TempDir,
}

impl TreeFixture {
    /// Create empty `donor/` and `target/` trees.
    pub fn new() -> Self {
        let root = TempDir::new().expect("create temp dir");
        fs::create_dir_all(root.path().join("donor")).expect("create donor tree");
        fs::create_dir_all(root.path().join("target")).expect("create target tree");
        TreeFixture { root }
    }

    /// Add a file to the donor tree.
    pub fn donor_file(self, path: &str, content: &str) -> Self {
        write_file(&self.donor().join(path), content);
        self
    }

    /// Add a file to the target tree.
    pub fn target_file(self, path: &str, content: &str) -> Self {
        write_file(&self.target().join(path), content);
        self
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn donor(&self) -> PathBuf {
        self.root.path().join("donor")
    }

    pub fn target(&self) -> PathBuf {
        self.root.path().join("target")
    }

    /// Read a file from the target tree.
    pub fn read_target(&self, path: &str) -> String {
        fs::read_to_string(self.target().join(path)).expect("read target file")
    }
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, content).expect("write fixture file");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_tool_repeats_last_output() {
        let mut tool = ScriptedTool::new(["first".to_string(), "second".to_string()]);
        let cwd = Path::new("/target");

        assert_eq!(tool.invoke(cwd).unwrap().text, "first");
        assert_eq!(tool.invoke(cwd).unwrap().text, "second");
        assert_eq!(tool.invoke(cwd).unwrap().text, "second");
        assert_eq!(tool.calls(), 3);
        assert_eq!(tool.cwds()[0], PathBuf::from("/target"));
    }

    #[test]
    fn test_failing_tool() {
        let mut tool = ScriptedTool::failing("make: not found");
        let err = tool.invoke(Path::new(".")).unwrap_err();
        assert_eq!(err.to_string(), "make: not found");
        assert_eq!(tool.calls(), 1);
    }

    #[test]
    fn test_tree_fixture() {
        let fixture = TreeFixture::new()
            .donor_file("sys/mbuf.h", "struct mbuf;\n")
            .target_file("net/if.c", "#include <sys/mbuf.h>\n");

        assert!(fixture.donor().join("sys/mbuf.h").is_file());
        assert_eq!(fixture.read_target("net/if.c"), "#include <sys/mbuf.h>\n");
        assert!(fixture.root().join("target").is_dir());
    }
}
