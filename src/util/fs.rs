//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Walk `root` for files whose name ends with one of `suffixes`.
///
/// Hidden directories (`.git`, `.kport`) are skipped. Results are sorted so
/// indexes built from a tree are reproducible.
pub fn source_files(root: &Path, suffixes: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with('.'))
                .unwrap_or(false)
    });

    for entry in walker {
        let entry =
            entry.with_context(|| format!("failed to walk directory: {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .map(|name| suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())))
            .unwrap_or(false);
        if matches {
            results.push(entry.into_path());
        }
    }

    results.sort();
    Ok(results)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        let build = tmp.path().join("build/kern");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("uipc_mbuf.o"), "").unwrap();
        fs::write(build.join("uipc_socket.o"), "").unwrap();
        fs::write(build.join("Makefile"), "").unwrap();

        let files = glob_files(tmp.path(), &["build/**/*.o".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_source_files_skips_hidden_dirs() {
        let tmp = TempDir::new().unwrap();
        write_string(&tmp.path().join("sys/mbuf.h"), "").unwrap();
        write_string(&tmp.path().join("kern/uipc_mbuf.c"), "").unwrap();
        write_string(&tmp.path().join("kern/README"), "").unwrap();
        write_string(&tmp.path().join(".kport/cache.h"), "").unwrap();

        let files = source_files(tmp.path(), &[".c".to_string(), ".h".to_string()]).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|f| relative_path(tmp.path(), f))
            .collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("kern/uipc_mbuf.c"), PathBuf::from("sys/mbuf.h")]
        );
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/donor"), Path::new("/donor/sys/mbuf.h")),
            PathBuf::from("sys/mbuf.h")
        );
    }
}
