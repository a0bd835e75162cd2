//! Symbol resolution error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error during symbol resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("link tool failed: {message}")]
    LinkTool { message: String },

    #[error("could not read symbols from `{}`: {message}", path.display())]
    SymbolScan { path: PathBuf, message: String },

    #[error("no symbol sources matched {patterns:?}")]
    NoSymbolSources { patterns: Vec<String> },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::LinkTool { message } => Diagnostic::error("link tool failed")
                .with_context(message.clone())
                .with_suggestion(suggestions::LINK_COMMAND)
                .with_suggestion(suggestions::FROM_LOG),

            ResolveError::SymbolScan { path, message } => {
                Diagnostic::error(format!("could not read symbols: {}", message))
                    .with_location(path)
                    .with_suggestion(suggestions::NM)
            }

            ResolveError::NoSymbolSources { patterns } => {
                let mut diag = Diagnostic::error("no object files to scan for symbols");
                for pattern in patterns {
                    diag = diag.with_context(format!("pattern `{}` matched nothing", pattern));
                }
                diag.with_suggestion(suggestions::OBJECTS)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_symbol_sources_diagnostic() {
        let err = ResolveError::NoSymbolSources {
            patterns: vec!["build/**/*.o".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("no object files"));
        assert!(output.contains("build/**/*.o"));
        assert!(output.contains("help: consider:"));
    }

    #[test]
    fn test_symbol_scan_diagnostic_has_location() {
        let err = ResolveError::SymbolScan {
            path: PathBuf::from("build/uipc_mbuf.o"),
            message: "nm: file format not recognized".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "could not read symbols from `build/uipc_mbuf.o`: nm: file format not recognized"
        );
        assert!(err.to_diagnostic().format(false).contains("--> build/uipc_mbuf.o"));
    }
}
