//! Cross-reference of definitions between two ecosystems.
//!
//! The candidate index (usually the donor) is walked file by file in the
//! order its files were first seen. Every key a file declares is looked up in
//! the reference index: a hit is a match (the same type, function, struct or
//! macro exists on both sides, a naming conflict when both get compiled
//! together), a miss is exclusive to the candidate.

use std::collections::HashSet;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::core::extract::{CommandExtractor, ExtractionPipeline, NameNormalizer};
use crate::core::index::DefinitionIndex;
use crate::core::source_file::{Ecosystem, SourceFile};
use crate::util::config::Config;
use crate::util::fs::{read_to_string, source_files};
use crate::util::process::ProcessBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum XrefSide {
    /// Present in both indexes.
    Matched,
    /// Only in the candidate index.
    Exclusive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XrefEntry {
    pub key: String,
    pub side: XrefSide,
    pub candidate_owners: Vec<String>,
    pub reference_owners: Vec<String>,
}

/// Entries for one candidate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileXref {
    /// The candidate file with every definition it declares.
    pub file: SourceFile,
    pub matches: Vec<XrefEntry>,
    pub exclusive: Vec<XrefEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XrefReport {
    pub files: Vec<FileXref>,
    /// Files with at least one match.
    pub conflict_files: usize,
    pub matched_keys: usize,
    pub exclusive_keys: usize,
}

/// Reconcile `candidate` against `reference`.
pub fn cross_reference(reference: &DefinitionIndex, candidate: &DefinitionIndex) -> XrefReport {
    let mut report = XrefReport::default();

    for file in candidate.files() {
        let mut seen = HashSet::new();
        let mut file_report = FileXref {
            file: candidate.source_file(file, Ecosystem::Donor),
            matches: Vec::new(),
            exclusive: Vec::new(),
        };

        for key in candidate.declared_by(file) {
            if !seen.insert(key.as_str()) {
                continue;
            }

            let reference_owners = reference.lookup(key);
            let side = if reference_owners.is_empty() {
                XrefSide::Exclusive
            } else {
                XrefSide::Matched
            };
            let entry = XrefEntry {
                key: key.clone(),
                side,
                candidate_owners: candidate.lookup(key).to_vec(),
                reference_owners: reference_owners.to_vec(),
            };

            match side {
                XrefSide::Matched => file_report.matches.push(entry),
                XrefSide::Exclusive => file_report.exclusive.push(entry),
            }
        }

        if !file_report.matches.is_empty() {
            report.conflict_files += 1;
        }
        report.matched_keys += file_report.matches.len();
        report.exclusive_keys += file_report.exclusive.len();
        report.files.push(file_report);
    }

    tracing::info!(
        "{} matched key(s) across {} file(s), {} exclusive",
        report.matched_keys,
        report.conflict_files,
        report.exclusive_keys
    );
    report
}

/// Render a report for the terminal.
///
/// Files without matches are only listed with `verbose`.
pub fn format_report(report: &XrefReport, verbose: bool) -> String {
    let mut output = String::new();

    for file in &report.files {
        if file.matches.is_empty() && !verbose {
            continue;
        }

        writeln!(output, "{}", file.file.path()).unwrap();
        for entry in &file.matches {
            writeln!(output, "  match      {}", entry.key).unwrap();
            for owner in &entry.reference_owners {
                writeln!(output, "             reference: {}", owner).unwrap();
            }
            if verbose {
                for owner in &entry.candidate_owners {
                    writeln!(output, "             candidate: {}", owner).unwrap();
                }
            }
        }
        if verbose {
            for entry in &file.exclusive {
                writeln!(output, "  exclusive  {}", entry.key).unwrap();
            }
        }
        writeln!(output).unwrap();
    }

    writeln!(output, "conflict files: {}", report.conflict_files).unwrap();
    writeln!(output, "matched keys: {}", report.matched_keys).unwrap();
    writeln!(output, "exclusive keys: {}", report.exclusive_keys).unwrap();
    output
}

/// Load an index from a triple listing, or extract one from a source tree.
pub fn load_index(path: &Path, config: &Config) -> Result<DefinitionIndex> {
    if !path.is_dir() {
        return Ok(DefinitionIndex::from_listing(&read_to_string(path)?));
    }

    let files = source_files(path, &config.extract_suffixes())?;
    let pipeline = extraction_pipeline(config)?;
    pipeline.index_files(path, &files)
}

/// Build the extraction pipeline configured under `[extract]`.
pub fn extraction_pipeline(config: &Config) -> Result<ExtractionPipeline<CommandExtractor>> {
    let Some((program, args)) = config.extract.command.split_first() else {
        anyhow::bail!("no extraction command configured; set `[extract] command` in kport.toml");
    };
    let extractor = CommandExtractor::new(ProcessBuilder::new(program).args(args));
    let normalizer = NameNormalizer::new(&config.extract.strip)?;
    Ok(ExtractionPipeline::new(extractor, normalizer))
}

/// Options for `kport xref`.
#[derive(Debug, Clone)]
pub struct XrefOptions {
    /// Reference side (usually the target ecosystem).
    pub reference: PathBuf,
    /// Candidate side (usually the donor).
    pub candidate: PathBuf,
}

/// Load both sides and cross-reference them.
pub fn xref(options: &XrefOptions, config: &Config) -> Result<XrefReport> {
    let reference = load_index(&options.reference, config)?;
    let candidate = load_index(&options.candidate, config)?;
    tracing::debug!(
        "reference has {} key(s), candidate has {} key(s)",
        reference.len(),
        candidate.len()
    );
    Ok(cross_reference(&reference, &candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_single_match_scenario() {
        let reference = DefinitionIndex::from_listing("sys/socket.h funcdef socket\n");
        let candidate = DefinitionIndex::from_listing(
            "net/socket.c funcdef socket\nnet/socket.c funcdef soclose\n",
        );

        let report = cross_reference(&reference, &candidate);

        assert_eq!(report.conflict_files, 1);
        assert_eq!(report.matched_keys, 1);
        assert_eq!(report.exclusive_keys, 1);

        let file = &report.files[0];
        assert_eq!(file.file.path(), "net/socket.c");
        assert_eq!(
            file.matches,
            vec![XrefEntry {
                key: "funcdef.socket".to_string(),
                side: XrefSide::Matched,
                candidate_owners: vec!["net/socket.c".to_string()],
                reference_owners: vec!["sys/socket.h".to_string()],
            }]
        );
        assert_eq!(file.exclusive[0].key, "funcdef.soclose");
    }

    #[test]
    fn test_socket_match_counts() {
        let reference = DefinitionIndex::from_listing("net/socket.c funcdef socket\n");
        let candidate = DefinitionIndex::from_listing("bsd_socket.c funcdef socket\n");

        let report = cross_reference(&reference, &candidate);

        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].file.path(), "bsd_socket.c");
        assert_eq!(report.files[0].matches.len(), 1);
        assert_eq!(report.files[0].matches[0].key, "funcdef.socket");
        assert_eq!(report.files[0].matches[0].reference_owners, vec!["net/socket.c"]);
        assert!(report.files[0].exclusive.is_empty());
        assert_eq!(report.conflict_files, 1);
        assert_eq!(report.matched_keys, 1);
        assert_eq!(report.exclusive_keys, 0);
    }

    #[test]
    fn test_file_reports_carry_declared_definitions() {
        let candidate = DefinitionIndex::from_listing(
            "sys/queue.h macro LIST_HEAD\nsys/queue.h macro LIST_ENTRY\nsys/queue.h macro LIST_HEAD\n",
        );

        let report = cross_reference(&DefinitionIndex::new(), &candidate);

        let file = &report.files[0].file;
        assert_eq!(file.ecosystem(), Ecosystem::Donor);
        assert_eq!(
            file.definitions().collect::<Vec<_>>(),
            vec!["macro.LIST_ENTRY", "macro.LIST_HEAD"]
        );
    }

    #[test]
    fn test_match_lists_every_reference_owner() {
        let reference = DefinitionIndex::from_listing(
            "linux/types.h typedef u_int32_t\ncompat/types.h typedef u_int32_t\n",
        );
        let candidate = DefinitionIndex::from_listing("sys/types.h typedef u_int32_t\n");

        let report = cross_reference(&reference, &candidate);
        assert_eq!(
            report.files[0].matches[0].reference_owners,
            vec!["linux/types.h", "compat/types.h"]
        );
    }

    #[test]
    fn test_duplicate_keys_within_file_count_once() {
        let reference = DefinitionIndex::from_listing("linux/list.h macro LIST_HEAD\n");
        let candidate = DefinitionIndex::from_listing(
            "sys/queue.h macro LIST_HEAD\n\
             sys/queue.h macro LIST_ENTRY\n\
             sys/queue.h macro LIST_HEAD\n\
             net/if.c macro LIST_HEAD\n",
        );

        let report = cross_reference(&reference, &candidate);

        let files: Vec<_> = report.files.iter().map(|f| f.file.path()).collect();
        assert_eq!(files, vec!["sys/queue.h", "net/if.c"]);
        assert_eq!(report.files[0].matches.len(), 1);
        assert_eq!(report.conflict_files, 2);
        assert_eq!(report.matched_keys, 2);
        assert_eq!(report.exclusive_keys, 1);
    }

    #[test]
    fn test_format_report() {
        let reference = DefinitionIndex::from_listing("sys/socket.h funcdef socket\n");
        let candidate = DefinitionIndex::from_listing(
            "net/socket.c funcdef socket\nnet/raw.c funcdef rip_input\n",
        );
        let report = cross_reference(&reference, &candidate);

        let terse = format_report(&report, false);
        assert!(terse.starts_with("net/socket.c\n  match      funcdef.socket\n"));
        assert!(terse.contains("reference: sys/socket.h"));
        assert!(!terse.contains("net/raw.c"));
        assert!(terse.ends_with("conflict files: 1\nmatched keys: 1\nexclusive keys: 1\n"));

        let verbose = format_report(&report, true);
        assert!(verbose.contains("net/raw.c\n  exclusive  funcdef.rip_input\n"));
    }

    #[test]
    fn test_xref_from_listing_files() {
        let tmp = TempDir::new().unwrap();
        let reference = tmp.path().join("linux.defs");
        let candidate = tmp.path().join("bsd.defs");
        std::fs::write(&reference, "include/linux/socket.h struct sockaddr\n").unwrap();
        std::fs::write(&candidate, "# donor\nsys/socket.h struct sockaddr\n").unwrap();

        let report = xref(
            &XrefOptions {
                reference,
                candidate,
            },
            &Config::default(),
        )
        .unwrap();

        assert_eq!(report.matched_keys, 1);
        assert_eq!(report.files[0].file.path(), "sys/socket.h");
    }

    #[test]
    fn test_tree_without_extractor_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_index(tmp.path(), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("[extract] command"));
    }
}
