//! Closure builder error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Fatal conditions that end a closure run.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ClosureError {
    #[error("`{header}` requested by `{requested_by}` is not in the donor tree")]
    #[diagnostic(
        code(kport::closure::donor_missing),
        help("check the donor root, or provide `{header}` in the target tree by hand")
    )]
    DonorMissing {
        header: String,
        requested_by: String,
        donor_path: PathBuf,
        iteration: usize,
    },

    #[error("closure stalled on `{header}` after {iterations} passes")]
    #[diagnostic(
        code(kport::closure::stalled),
        help("`{header}` was copied but the build still cannot use it")
    )]
    Stalled {
        header: String,
        requested_by: String,
        iterations: usize,
        repeat_passes: usize,
    },

    #[error("`{}` already exists with different content", target_path.display())]
    #[diagnostic(
        code(kport::closure::already_exists),
        help("set `closure.allow_overwrite = true` or a `closure.prefix` to avoid shadowing")
    )]
    AlreadyExistsDiffers { header: String, target_path: PathBuf },

    #[error("refusing to materialize `{header}` outside the target tree")]
    #[diagnostic(code(kport::closure::unsafe_path))]
    UnsafeHeaderPath { header: String, requested_by: String },

    #[error("build tool failed on pass {iteration}: {message}")]
    #[diagnostic(code(kport::closure::tool))]
    Tool { iteration: usize, message: String },

    #[error("I/O error on `{}`", path.display())]
    #[diagnostic(code(kport::closure::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClosureError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClosureError::Io {
            path: path.into(),
            source,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ClosureError::DonorMissing {
                header,
                requested_by,
                donor_path,
                iteration,
            } => Diagnostic::error(format!("donor tree has no `{}`", header))
                .with_location(donor_path)
                .with_context(format!("requested by `{}` on pass {}", requested_by, iteration))
                .with_suggestion(suggestions::DONOR_ROOT)
                .with_suggestion(format!(
                    "Provide `{}` under the target tree manually",
                    header
                )),

            ClosureError::Stalled {
                header,
                requested_by,
                iterations,
                repeat_passes,
            } => Diagnostic::error(format!("non-resolvable dependency `{}`", header))
                .with_context(format!("requested by `{}`", requested_by))
                .with_context(format!(
                    "still missing after {} passes ({} without progress)",
                    iterations, repeat_passes
                ))
                .with_suggestion(suggestions::STALLED)
                .with_suggestion(suggestions::VERBOSE),

            ClosureError::AlreadyExistsDiffers {
                header,
                target_path,
            } => Diagnostic::error(format!(
                "cannot materialize `{}`: target differs from donor",
                header
            ))
            .with_location(target_path)
            .with_suggestion(suggestions::OVERWRITE)
            .with_suggestion(suggestions::PREFIX),

            ClosureError::UnsafeHeaderPath {
                header,
                requested_by,
            } => Diagnostic::error(format!("unsafe header path `{}`", header))
                .with_context(format!("requested by `{}`", requested_by))
                .with_context("absolute paths and `..` cannot be materialized"),

            ClosureError::Tool { iteration, message } => {
                Diagnostic::error(format!("build tool failed on pass {}", iteration))
                    .with_context(message.clone())
                    .with_suggestion(suggestions::BUILD_COMMAND)
            }

            ClosureError::Io { path, source } => Diagnostic::error(source.to_string())
                .with_location(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stalled_diagnostic_names_header() {
        let err = ClosureError::Stalled {
            header: "sys/fakehdr.h".to_string(),
            requested_by: "net/if.c".to_string(),
            iterations: 4,
            repeat_passes: 3,
        };

        assert_eq!(
            err.to_string(),
            "closure stalled on `sys/fakehdr.h` after 4 passes"
        );
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("non-resolvable dependency `sys/fakehdr.h`"));
        assert!(output.contains("requested by `net/if.c`"));
    }

    #[test]
    fn test_donor_missing_diagnostic_has_location() {
        let err = ClosureError::DonorMissing {
            header: "sys/nothere.h".to_string(),
            requested_by: "kern/kern_mbuf.c".to_string(),
            donor_path: PathBuf::from("/donor/sys/nothere.h"),
            iteration: 2,
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("--> /donor/sys/nothere.h"));
        assert!(output.contains("on pass 2"));
    }
}
