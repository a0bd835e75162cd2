//! External tool collaborators.
//!
//! The build and link steps are opaque tools: they run in a working
//! directory and produce text. Only the text is inspected; the exit status is
//! recorded for logging.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::util::fs::read_to_string;
use crate::util::process::ProcessBuilder;

/// Captured output of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Combined stdout and stderr.
    pub text: String,
    /// Exit code, if the tool ran as a process and exited normally.
    pub status: Option<i32>,
}

impl ToolOutput {
    pub fn from_text(text: impl Into<String>) -> Self {
        ToolOutput {
            text: text.into(),
            status: None,
        }
    }
}

/// A build or link tool.
pub trait ExternalTool {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// Run the tool with `cwd` as working directory.
    fn invoke(&mut self, cwd: &Path) -> Result<ToolOutput>;

    /// No further invocation can produce output, as with a replay whose
    /// logs are used up.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Runs a command line as a subprocess.
#[derive(Debug, Clone)]
pub struct CommandTool {
    command: ProcessBuilder,
}

impl CommandTool {
    pub fn new(command: ProcessBuilder) -> Self {
        CommandTool { command }
    }

    /// Create a tool from an argv-style list (`["make", "-k"]`).
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("empty tool command");
        };
        Ok(CommandTool::new(ProcessBuilder::new(program).args(args)))
    }

    /// Set an environment variable for every invocation.
    pub fn env(self, key: &str, value: &str) -> Self {
        CommandTool {
            command: self.command.env(key, value),
        }
    }
}

impl ExternalTool for CommandTool {
    fn describe(&self) -> String {
        self.command.display_command()
    }

    fn invoke(&mut self, cwd: &Path) -> Result<ToolOutput> {
        let output = self.command.clone().cwd(cwd).exec()?;

        // Compilers write diagnostics to stderr, make echoes to stdout.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        tracing::debug!(
            "`{}` exited with {:?}",
            self.command.display_command(),
            output.status.code()
        );

        Ok(ToolOutput {
            text,
            status: output.status.code(),
        })
    }
}

/// Replays saved tool logs instead of running anything.
///
/// Each invocation reads the next log. Once every log has been replayed the
/// tool is exhausted and further invocations fail.
#[derive(Debug, Clone)]
pub struct SavedOutput {
    paths: Vec<PathBuf>,
    next: usize,
}

impl SavedOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::sequence(vec![path.into()])
    }

    /// Replay one log per invocation, in order.
    pub fn sequence(paths: Vec<PathBuf>) -> Self {
        SavedOutput { paths, next: 0 }
    }
}

impl ExternalTool for SavedOutput {
    fn describe(&self) -> String {
        let paths: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        format!("saved log {}", paths.join(", "))
    }

    fn invoke(&mut self, _cwd: &Path) -> Result<ToolOutput> {
        let Some(path) = self.paths.get(self.next) else {
            bail!("all {} saved log(s) have been replayed", self.paths.len());
        };
        self.next += 1;
        Ok(ToolOutput::from_text(read_to_string(path)?))
    }

    fn is_exhausted(&self) -> bool {
        self.next >= self.paths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_argv_rejects_empty() {
        assert!(CommandTool::from_argv(&[]).is_err());

        let tool = CommandTool::from_argv(&["make".to_string(), "-k".to_string()]).unwrap();
        assert_eq!(tool.describe(), "make -k");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_tool_combines_streams() {
        let tmp = TempDir::new().unwrap();
        let mut tool = CommandTool::from_argv(&[
            "sh".to_string(),
            "-c".to_string(),
            "echo out; echo err >&2; exit 2".to_string(),
        ])
        .unwrap();

        let output = tool.invoke(tmp.path()).unwrap();
        assert_eq!(output.text, "out\nerr\n");
        assert_eq!(output.status, Some(2));
    }

    #[test]
    fn test_saved_output_replays_file() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("link.log");
        std::fs::write(&log, "undefined reference to `m_get'\n").unwrap();

        let mut tool = SavedOutput::new(&log);
        let output = tool.invoke(tmp.path()).unwrap();
        assert!(output.text.contains("m_get"));
        assert_eq!(output.status, None);
    }

    #[test]
    fn test_saved_sequence_is_exhausted_after_last_log() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("pass1.log");
        let second = tmp.path().join("pass2.log");
        std::fs::write(&first, "one\n").unwrap();
        std::fs::write(&second, "two\n").unwrap();

        let mut tool = SavedOutput::sequence(vec![first, second]);
        assert!(!tool.is_exhausted());
        assert_eq!(tool.invoke(tmp.path()).unwrap().text, "one\n");
        assert_eq!(tool.invoke(tmp.path()).unwrap().text, "two\n");
        assert!(tool.is_exhausted());
        assert!(tool.invoke(tmp.path()).is_err());
    }

    #[test]
    fn test_saved_output_missing_file() {
        let mut tool = SavedOutput::new("/nonexistent/build.log");
        let err = tool.invoke(Path::new(".")).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read file"));
    }
}
