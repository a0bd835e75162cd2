//! Source files taking part in a port.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Which header/symbol ecosystem a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// The established tree headers and symbols are pulled from.
    Donor,
    /// The tree under construction.
    Target,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ecosystem::Donor => write!(f, "donor"),
            Ecosystem::Target => write!(f, "target"),
        }
    }
}

/// A file identified by its normalized path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    path: String,
    ecosystem: Ecosystem,
    definitions: BTreeSet<String>,
    unresolved_includes: BTreeSet<String>,
}

impl SourceFile {
    pub fn new(path: &str, ecosystem: Ecosystem) -> Self {
        SourceFile {
            path: normalize_path(path),
            ecosystem,
            definitions: BTreeSet::new(),
            unresolved_includes: BTreeSet::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    /// Record a definition key owned by this file. Definitions are never removed.
    pub fn add_definition(&mut self, key: impl Into<String>) {
        self.definitions.insert(key.into());
    }

    pub fn definitions(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(String::as_str)
    }

    pub fn add_unresolved_include(&mut self, header: impl Into<String>) {
        self.unresolved_includes.insert(header.into());
    }

    pub fn unresolved_includes(&self) -> impl Iterator<Item = &str> {
        self.unresolved_includes.iter().map(String::as_str)
    }
}

/// Normalize a path string into a stable file identity.
///
/// Backslashes become forward slashes, `.` components and duplicate
/// separators are dropped. `..` components are kept verbatim.
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let absolute = unified.starts_with('/');

    let parts: Vec<&str> = unified
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Normalize a filesystem path into a file identity.
pub fn normalize(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./netinet//ip_input.c"), "netinet/ip_input.c");
        assert_eq!(normalize_path("sys\\mbuf.h"), "sys/mbuf.h");
        assert_eq!(normalize_path("/usr/src/./sys/"), "/usr/src/sys");
        assert_eq!(normalize_path("../sys/param.h"), "../sys/param.h");
    }

    #[test]
    fn test_source_file_sets_are_append_only() {
        let mut file = SourceFile::new("./kern/uipc_mbuf.c", Ecosystem::Donor);
        file.add_definition("funcdef.m_get");
        file.add_definition("funcdef.m_get");
        file.add_unresolved_include("sys/mbuf.h");

        assert_eq!(file.path(), "kern/uipc_mbuf.c");
        assert_eq!(file.definitions().collect::<Vec<_>>(), vec!["funcdef.m_get"]);
        assert_eq!(
            file.unresolved_includes().collect::<Vec<_>>(),
            vec!["sys/mbuf.h"]
        );
    }
}
