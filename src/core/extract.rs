//! Definition extraction.
//!
//! The extraction front-end is an external tool: given one source file it
//! prints `kind name` per line in source order. This module runs it, cleans
//! up the names it reports, and feeds the results into a [`DefinitionIndex`].
//!
//! Name cleanup is driven by [`StripRule`]s from configuration (attribute
//! macros like `__malloc_like`, `__P((...))` wrappers, stop words) followed
//! by removal of a trailing parenthesized clause such as a parameter list.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::definition::{Definition, DefinitionKind};
use super::index::DefinitionIndex;
use super::source_file::normalize;
use crate::util::process::ProcessBuilder;

/// What to do with a name matching a [`StripRule`] pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StripAction {
    /// Drop the whole definition.
    Discard,
    /// Remove the matched text.
    #[default]
    Strip,
    /// Remove the matched text and the parenthesized group following it.
    StripClause,
}

/// A configured `pattern -> action` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripRule {
    /// Regular expression matched against the reported name.
    pub pattern: String,
    #[serde(default)]
    pub rule: StripAction,
}

impl StripRule {
    pub fn new(pattern: impl Into<String>, rule: StripAction) -> Self {
        StripRule {
            pattern: pattern.into(),
            rule,
        }
    }
}

/// Cleans up names reported by the extraction tool.
#[derive(Debug, Clone, Default)]
pub struct NameNormalizer {
    rules: Vec<(Regex, StripAction)>,
}

impl NameNormalizer {
    /// Compile a rule set.
    pub fn new(rules: &[StripRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|re| (re, rule.rule))
                    .with_context(|| format!("invalid strip pattern `{}`", rule.pattern))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(NameNormalizer { rules })
    }

    /// Normalize a reported name. Returns `None` if the definition should be dropped.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let mut name = raw.trim().to_string();

        for (re, action) in &self.rules {
            match action {
                StripAction::Discard => {
                    if re.is_match(&name) {
                        return None;
                    }
                }
                StripAction::Strip => {
                    name = re.replace_all(&name, "").into_owned();
                }
                StripAction::StripClause => {
                    while let Some(m) = re.find(&name) {
                        if m.start() == m.end() {
                            break;
                        }
                        name = remove_clause(&name, m.start(), m.end());
                    }
                }
            }
        }

        let name = strip_trailing_group(&name).trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// Remove `text[start..end]` plus an immediately following `( ... )` group.
fn remove_clause(text: &str, start: usize, end: usize) -> String {
    let rest = &text[end..];
    let skipped = rest.len() - rest.trim_start().len();

    let mut clause_end = end;
    if rest[skipped..].starts_with('(') {
        let mut depth = 0usize;
        clause_end = text.len();
        for (offset, ch) in rest[skipped..].char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        clause_end = end + skipped + offset + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    format!("{}{}", &text[..start], &text[clause_end..])
}

/// Strip a trailing parenthesized clause, e.g. `m_get(int how, short type)` -> `m_get`.
///
/// Scans right to left from the final `)` with a depth counter. Unbalanced
/// input is returned unchanged (minus trailing whitespace).
pub fn strip_trailing_group(text: &str) -> &str {
    let trimmed = text.trim_end();
    if !trimmed.ends_with(')') {
        return trimmed;
    }

    let mut depth = 0usize;
    for (idx, ch) in trimmed.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return trimmed[..idx].trim_end();
                }
            }
            _ => {}
        }
    }

    trimmed
}

/// Parse extraction tool output for one file.
pub fn parse_extraction_output(
    file: &str,
    output: &str,
    normalizer: &NameNormalizer,
) -> Vec<Definition> {
    let mut definitions = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((kind, name)) = line.split_once(char::is_whitespace) else {
            tracing::debug!("{}: ignoring extraction line without a name: {}", file, line);
            continue;
        };

        let kind: DefinitionKind = match kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!("{}: {}", file, e);
                continue;
            }
        };

        if let Some(name) = normalizer.normalize(name) {
            definitions.push(Definition::new(kind, name, file));
        }
    }

    definitions
}

/// The extraction collaborator.
pub trait Extractor {
    /// Return the raw `kind name` listing for one source file.
    fn extract(&self, file: &Path) -> Result<String>;
}

/// Runs an external command with the source file appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    command: ProcessBuilder,
}

impl CommandExtractor {
    pub fn new(command: ProcessBuilder) -> Self {
        CommandExtractor { command }
    }
}

impl Extractor for CommandExtractor {
    fn extract(&self, file: &Path) -> Result<String> {
        let output = self.command.clone().arg(file).exec_and_check()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extraction tool plus name cleanup.
pub struct ExtractionPipeline<E> {
    extractor: E,
    normalizer: NameNormalizer,
}

impl<E: Extractor> ExtractionPipeline<E> {
    pub fn new(extractor: E, normalizer: NameNormalizer) -> Self {
        ExtractionPipeline {
            extractor,
            normalizer,
        }
    }

    /// Extract definitions from one file, owned under `root`-relative identity.
    pub fn extract_file(&self, root: &Path, file: &Path) -> Result<Vec<Definition>> {
        let output = self
            .extractor
            .extract(file)
            .with_context(|| format!("failed to extract definitions from {}", file.display()))?;

        let relative = crate::util::fs::relative_path(root, file);
        Ok(parse_extraction_output(
            &normalize(&relative),
            &output,
            &self.normalizer,
        ))
    }

    /// Build an index over a list of files.
    pub fn index_files(&self, root: &Path, files: &[impl AsRef<Path>]) -> Result<DefinitionIndex> {
        let mut index = DefinitionIndex::new();
        for file in files {
            for def in self.extract_file(root, file.as_ref())? {
                index.insert(&def.owning_file, def.kind, &def.name);
            }
        }
        tracing::info!(
            "indexed {} definitions from {} files",
            index.len(),
            files.len()
        );
        Ok(index)
    }
}
