//! Declaration-level definitions extracted from C sources.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four definition categories tracked across ecosystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Function,
    Typedef,
    Struct,
    Macro,
}

impl DefinitionKind {
    /// Prefix used when building index keys.
    pub fn key_prefix(self) -> &'static str {
        match self {
            DefinitionKind::Function => "funcdef",
            DefinitionKind::Typedef => "typedef",
            DefinitionKind::Struct => "struct",
            DefinitionKind::Macro => "macro",
        }
    }

    pub fn all() -> [DefinitionKind; 4] {
        [
            DefinitionKind::Function,
            DefinitionKind::Typedef,
            DefinitionKind::Struct,
            DefinitionKind::Macro,
        ]
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_prefix())
    }
}

/// Error parsing a definition kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionKindParseError(pub String);

impl fmt::Display for DefinitionKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid definition kind '{}', valid values: funcdef, typedef, struct, macro",
            self.0
        )
    }
}

impl std::error::Error for DefinitionKindParseError {}

impl FromStr for DefinitionKind {
    type Err = DefinitionKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "funcdef" | "function" | "func" => Ok(DefinitionKind::Function),
            "typedef" | "type" => Ok(DefinitionKind::Typedef),
            "struct" => Ok(DefinitionKind::Struct),
            "macro" | "define" => Ok(DefinitionKind::Macro),
            _ => Err(DefinitionKindParseError(s.to_string())),
        }
    }
}

/// Build the normalized index key for a definition.
pub fn definition_key(kind: DefinitionKind, name: &str) -> String {
    format!("{}.{}", kind.key_prefix(), name)
}

/// A `(kind, name, owning file)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub name: String,
    pub owning_file: String,
}

impl Definition {
    pub fn new(kind: DefinitionKind, name: impl Into<String>, owning_file: impl Into<String>) -> Self {
        Definition {
            kind,
            name: name.into(),
            owning_file: owning_file.into(),
        }
    }

    pub fn key(&self) -> String {
        definition_key(self.kind, &self.name)
    }

    /// Parse one line of a triple listing: `file kind name`.
    ///
    /// Returns `None` for blank lines, `#` comments, and lines with an
    /// unknown kind or missing fields.
    pub fn parse_triple(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut fields = line.split_whitespace();
        let file = fields.next()?;
        let kind = fields.next()?.parse().ok()?;
        let name = fields.next()?;
        Some(Definition::new(kind, name, file))
    }

    /// Render as a triple listing line.
    pub fn to_triple(&self) -> String {
        format!("{}\t{}\t{}", self.owning_file, self.kind, self.name)
    }
}
