//! User-friendly diagnostic messages.
//!
//! Errors from the closure builder and resolver render through [`Diagnostic`]:
//! a message, the file involved, context lines and numbered suggestions.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a requested header is not in the donor tree.
    pub const DONOR_ROOT: &str =
        "help: Check `[trees] donor` in kport.toml or pass `--donor <DIR>`";

    /// Suggestion when the closure keeps requesting the same header.
    pub const STALLED: &str =
        "help: The header was copied but the build still cannot find it; check the build's include paths";

    /// Suggestion to see every pass in detail.
    pub const VERBOSE: &str = "help: Run `kport close --verbose` to see every pass";

    /// Suggestion when a target file would be replaced.
    pub const OVERWRITE: &str =
        "help: Set `allow_overwrite = true` under `[closure]` to replace pre-existing files";

    /// Suggestion to avoid clashing with files already in the target tree.
    pub const PREFIX: &str = "help: Set `prefix` under `[closure]` to copy headers under a new name";

    /// Suggestion when the build tool cannot be run.
    pub const BUILD_COMMAND: &str =
        "help: Check `[build] command` in kport.toml or pass `--build-cmd`";

    /// Suggestion when the link tool cannot be run.
    pub const LINK_COMMAND: &str = "help: Check `[link] command` in kport.toml or pass `--link-cmd`";

    /// Suggestion to replay saved tool output.
    pub const FROM_LOG: &str = "help: Save the tool output to a file and pass `--from-log <FILE>`";

    /// Suggestion when `nm` fails on an object.
    pub const NM: &str = "help: Set `[link] nm` to an `nm` that understands the object format";

    /// Suggestion when no object files match.
    pub const OBJECTS: &str =
        "help: Build the donor objects first, or adjust `[link] objects` globs";

    /// Suggestion when no project configuration exists.
    pub const NO_CONFIG: &str = "help: Create a kport.toml with `[trees]` donor and target";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Help => write!(f, "help"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        // Severity prefix with optional color
        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
                Severity::Help => "\x1b[1;32mhelp\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
                Severity::Help => "help",
            }
        };

        // Main message
        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        // Location if present
        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        // Context lines
        for ctx in &self.context {
            output.push_str(&format!("  → {}\n", ctx));
        }

        // Suggestions
        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("`sys/nothere.h` is not in the donor tree")
            .with_location("/donor/sys/nothere.h")
            .with_context("requested by net/if.c on pass 2")
            .with_suggestion(suggestions::DONOR_ROOT);

        let output = diag.format(false);
        assert!(output.starts_with("error: `sys/nothere.h`"));
        assert!(output.contains("  --> /donor/sys/nothere.h\n"));
        assert!(output.contains("\u{2192} requested by net/if.c"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. help: Check `[trees] donor`"));
    }

    #[test]
    fn test_warning_has_no_help_without_suggestions() {
        let output = Diagnostic::warning("`if_attach` is defined by 2 files").format(false);
        assert_eq!(output, "warning: `if_attach` is defined by 2 files\n");
    }

    #[test]
    fn test_colored_severity() {
        let output = Diagnostic::error("boom").format(true);
        assert!(output.starts_with("\x1b[1;31merror\x1b[0m: boom"));
    }
}
