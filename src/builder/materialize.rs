//! Copying donor headers into the target tree.

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::ClosureError;
use crate::core::diagnostics::MissingInclude;
use crate::util::hash::sha256_bytes;

/// How donor headers are placed into the target tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializePolicy {
    /// Prefix applied to the copied file name, e.g. `bsd_` turns
    /// `sys/queue.h` into `sys/bsd_queue.h`.
    pub prefix: Option<String>,

    /// Replace pre-existing target files whose content differs from the donor.
    /// Files written earlier in the same run are never replaced.
    pub allow_overwrite: bool,
}

/// What happened to a requested header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CopyAction {
    Copied,
    /// The target already held identical content.
    AlreadyPresent,
    Overwritten,
}

impl fmt::Display for CopyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyAction::Copied => write!(f, "copied"),
            CopyAction::AlreadyPresent => write!(f, "present"),
            CopyAction::Overwritten => write!(f, "overwritten"),
        }
    }
}

/// One audit log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedHeader {
    pub iteration: usize,
    pub header: String,
    pub requested_by: String,
    pub donor_path: PathBuf,
    pub target_path: PathBuf,
    pub sha256: String,
    pub action: CopyAction,
}

impl MaterializedHeader {
    fn log_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            self.iteration,
            self.action,
            self.header,
            self.donor_path.display(),
            self.target_path.display(),
            self.sha256,
            self.requested_by
        )
    }
}

/// Resolved source and destination for a header reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPaths {
    pub donor: PathBuf,
    pub target: PathBuf,
}

/// Copies donor headers under the target root and keeps an append-only log.
#[derive(Debug)]
pub struct Materializer {
    donor_root: PathBuf,
    target_root: PathBuf,
    policy: MaterializePolicy,
    log_file: Option<PathBuf>,
    log: Vec<MaterializedHeader>,
    written: HashSet<PathBuf>,
}

impl Materializer {
    pub fn new(donor_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Materializer {
            donor_root: donor_root.into(),
            target_root: target_root.into(),
            policy: MaterializePolicy::default(),
            log_file: None,
            log: Vec::new(),
            written: HashSet::new(),
        }
    }

    pub fn with_policy(mut self, policy: MaterializePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Also append every record to this file.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    pub fn donor_root(&self) -> &Path {
        &self.donor_root
    }

    /// Records made so far, oldest first.
    pub fn log(&self) -> &[MaterializedHeader] {
        &self.log
    }

    pub fn into_log(self) -> Vec<MaterializedHeader> {
        self.log
    }

    /// Split a header reference into donor and target paths.
    pub fn paths_for(&self, request: &MissingInclude) -> Result<HeaderPaths, ClosureError> {
        let header = Path::new(&request.header);
        let unsafe_path = || ClosureError::UnsafeHeaderPath {
            header: request.header.clone(),
            requested_by: request.source_file.clone(),
        };

        if header
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(unsafe_path());
        }

        let file_name = header
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(unsafe_path)?;
        let directory = header.parent().unwrap_or_else(|| Path::new(""));

        let target_name = match &self.policy.prefix {
            Some(prefix) => format!("{}{}", prefix, file_name),
            None => file_name.to_string(),
        };

        Ok(HeaderPaths {
            donor: self.donor_root.join(directory).join(file_name),
            target: self.target_root.join(directory).join(target_name),
        })
    }

    /// Materialize one requested header.
    pub fn materialize(
        &mut self,
        request: &MissingInclude,
        iteration: usize,
    ) -> Result<&MaterializedHeader, ClosureError> {
        let paths = self.paths_for(request)?;

        if !paths.donor.is_file() {
            return Err(ClosureError::DonorMissing {
                header: request.header.clone(),
                requested_by: request.source_file.clone(),
                donor_path: paths.donor,
                iteration,
            });
        }

        let contents =
            fs::read(&paths.donor).map_err(|e| ClosureError::io(&paths.donor, e))?;

        let action = if paths.target.exists() {
            let existing =
                fs::read(&paths.target).map_err(|e| ClosureError::io(&paths.target, e))?;
            if existing == contents {
                CopyAction::AlreadyPresent
            } else if self.policy.allow_overwrite && !self.written.contains(&paths.target) {
                CopyAction::Overwritten
            } else {
                return Err(ClosureError::AlreadyExistsDiffers {
                    header: request.header.clone(),
                    target_path: paths.target,
                });
            }
        } else {
            CopyAction::Copied
        };

        if action != CopyAction::AlreadyPresent {
            if let Some(parent) = paths.target.parent() {
                fs::create_dir_all(parent).map_err(|e| ClosureError::io(parent, e))?;
            }
            fs::write(&paths.target, &contents)
                .map_err(|e| ClosureError::io(&paths.target, e))?;
            self.written.insert(paths.target.clone());
        }

        let record = MaterializedHeader {
            iteration,
            header: request.header.clone(),
            requested_by: request.source_file.clone(),
            donor_path: paths.donor,
            target_path: paths.target,
            sha256: sha256_bytes(&contents),
            action,
        };
        self.append_log(&record)?;

        tracing::info!(
            "{:>12} {} (for {})",
            record.action.to_string(),
            record.header,
            record.requested_by
        );

        self.log.push(record);
        Ok(&self.log[self.log.len() - 1])
    }

    fn append_log(&self, record: &MaterializedHeader) -> Result<(), ClosureError> {
        let Some(path) = &self.log_file else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ClosureError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ClosureError::io(path, e))?;
        file.write_all(record.log_line().as_bytes())
            .map_err(|e| ClosureError::io(path, e))
    }
}
