//! Header closure: build, parse missing includes, copy from the donor, repeat.
//!
//! The builder runs passes until a build produces no missing-include
//! diagnostics (`Converged`) or keeps asking only for headers it already
//! copied (`Stalled`). A replayed run whose logs run out first stays in
//! `Building`. Every pass that makes progress copies at least one new
//! header, and the donor tree is finite, so the stall threshold is the only
//! bound needed.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::errors::ClosureError;
use super::materialize::{MaterializedHeader, Materializer};
use super::tool::ExternalTool;
use crate::core::diagnostics::{DiagnosticParser, MissingInclude};
use crate::core::source_file::{Ecosystem, SourceFile};

/// Default number of passes without progress tolerated before stalling.
pub const DEFAULT_STALL_THRESHOLD: usize = 3;

/// Tunables for a closure run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosureOptions {
    /// Consecutive passes that only re-request already copied headers before
    /// the run is declared stalled.
    pub stall_threshold: usize,
}

impl Default for ClosureOptions {
    fn default() -> Self {
        ClosureOptions {
            stall_threshold: DEFAULT_STALL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosureState {
    Building,
    Converged,
    Stalled,
}

/// The header a stalled run kept asking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StallInfo {
    pub header: String,
    pub requested_by: String,
    /// Pass on which the run stalled.
    pub iteration: usize,
    /// Consecutive passes without a new header.
    pub repeat_passes: usize,
}

/// Outcome of a closure run.
#[derive(Debug, Clone, Serialize)]
pub struct ClosureReport {
    pub state: ClosureState,
    /// Number of build passes run.
    pub iterations: usize,
    /// Every header handled, in order.
    pub materialized: Vec<MaterializedHeader>,
    pub stalled: Option<StallInfo>,
    /// Files that still had missing includes on the last failing pass.
    pub pending: Vec<SourceFile>,
    /// Diagnostic lines skipped as ambiguous across all passes.
    pub ambiguous_lines: usize,
}

impl ClosureReport {
    pub fn converged(&self) -> bool {
        self.state == ClosureState::Converged
    }

    /// The tool ran out of saved output before the build converged.
    pub fn replay_ended(&self) -> bool {
        self.state == ClosureState::Building
    }

    /// Turn a stalled outcome into an error.
    pub fn into_result(self) -> Result<Self, ClosureError> {
        match &self.stalled {
            Some(stall) => Err(ClosureError::Stalled {
                header: stall.header.clone(),
                requested_by: stall.requested_by.clone(),
                iterations: stall.iteration,
                repeat_passes: stall.repeat_passes,
            }),
            None => Ok(self),
        }
    }
}

/// Drives the build tool until the target tree is closed under its includes.
pub struct ClosureBuilder {
    parser: DiagnosticParser,
    materializer: Materializer,
    options: ClosureOptions,
    state: ClosureState,
}

impl ClosureBuilder {
    pub fn new(parser: DiagnosticParser, materializer: Materializer) -> Self {
        ClosureBuilder {
            parser,
            materializer,
            options: ClosureOptions::default(),
            state: ClosureState::Building,
        }
    }

    pub fn with_options(mut self, options: ClosureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> ClosureState {
        self.state
    }

    /// Run passes until convergence or a stall.
    pub fn run<T: ExternalTool>(mut self, tool: &mut T) -> Result<ClosureReport, ClosureError> {
        let target_root = self.materializer.target_root().to_path_buf();
        let mut seen: HashSet<String> = HashSet::new();
        let mut repeat_passes = 0;
        let mut iteration = 0;
        let mut ambiguous_lines = 0;
        let mut pending = Vec::new();
        let mut stalled = None;

        tracing::info!("closing `{}` with `{}`", target_root.display(), tool.describe());

        while self.state == ClosureState::Building {
            if tool.is_exhausted() {
                tracing::warn!(
                    "replay ended after {} pass(es) before the build converged",
                    iteration
                );
                break;
            }
            iteration += 1;

            let output = tool
                .invoke(&target_root)
                .map_err(|e| ClosureError::Tool {
                    iteration,
                    message: format!("{:#}", e),
                })?;

            let parsed = self.parser.parse(&output.text);
            ambiguous_lines += parsed.ambiguous.len();
            let requests = dedup_requests(parsed.missing_includes());

            if requests.is_empty() {
                tracing::info!("pass {}: no missing includes, converged", iteration);
                self.state = ClosureState::Converged;
                pending.clear();
                break;
            }

            tracing::info!(
                "pass {}: {} missing include(s)",
                iteration,
                requests.len()
            );
            pending = pending_sources(&requests);

            let mut progressed = false;
            let mut first_repeat: Option<&MissingInclude> = None;
            let mut this_pass = HashSet::new();

            for request in &requests {
                if !this_pass.insert(request.header.as_str()) {
                    continue;
                }
                if seen.contains(&request.header) {
                    first_repeat.get_or_insert(request);
                    continue;
                }

                self.materializer.materialize(request, iteration)?;
                seen.insert(request.header.clone());
                progressed = true;
            }

            if progressed {
                repeat_passes = 0;
                continue;
            }

            repeat_passes += 1;
            if let Some(repeat) = first_repeat {
                tracing::warn!(
                    "pass {}: `{}` requested again ({} pass(es) without progress)",
                    iteration,
                    repeat.header,
                    repeat_passes
                );

                if repeat_passes >= self.options.stall_threshold {
                    self.state = ClosureState::Stalled;
                    stalled = Some(StallInfo {
                        header: repeat.header.clone(),
                        requested_by: repeat.source_file.clone(),
                        iteration,
                        repeat_passes,
                    });
                }
            }
        }

        Ok(ClosureReport {
            state: self.state,
            iterations: iteration,
            materialized: self.materializer.into_log(),
            stalled,
            pending,
            ambiguous_lines,
        })
    }
}

/// Dedup by `(requesting file, header)` keeping first-seen order.
fn dedup_requests<'a>(requests: impl Iterator<Item = &'a MissingInclude>) -> Vec<MissingInclude> {
    let mut seen = HashSet::new();
    requests
        .filter(|req| seen.insert((req.source_file.as_str(), req.header.as_str())))
        .cloned()
        .collect()
}

fn pending_sources(requests: &[MissingInclude]) -> Vec<SourceFile> {
    let mut files: Vec<SourceFile> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for request in requests {
        let file = SourceFile::new(&request.source_file, Ecosystem::Target);
        let idx = *positions.entry(file.path().to_string()).or_insert_with(|| {
            files.push(file);
            files.len() - 1
        });
        files[idx].add_unresolved_include(request.header.clone());
    }

    files
}
