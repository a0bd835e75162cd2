//! Configuration file support for kport.
//!
//! kport reads two configuration files:
//! - Global: `~/.kport/config.toml` - User-wide defaults
//! - Project: `kport.toml` in the working directory (or `--config <FILE>`)
//!
//! Project config takes precedence over global config field by field, and
//! command-line flags take precedence over both.
//!
//! ```toml
//! [trees]
//! donor = "../freebsd/sys"
//! target = "port"
//!
//! [build]
//! command = ["make", "-k"]
//!
//! [link]
//! command = ["make", "link"]
//! objects = ["obj/**/*.o"]
//!
//! [closure]
//! stall_threshold = 3
//! prefix = "bsd_"
//!
//! [[extract.strip]]
//! pattern = "__P"
//! rule = "strip-clause"
//! ```

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::closure::ClosureOptions;
use crate::builder::materialize::MaterializePolicy;
use crate::core::diagnostics::DiagnosticGrammar;
use crate::core::extract::StripRule;
use crate::resolver::resolve::ResolverOptions;

/// Name of the project configuration file.
pub const PROJECT_CONFIG: &str = "kport.toml";

/// kport configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Donor and target source trees
    pub trees: TreesConfig,

    /// Build tool used by the closure builder
    pub build: BuildConfig,

    /// Link step and symbol tables used by the resolver
    pub link: LinkConfig,

    /// Closure builder settings
    pub closure: ClosureConfig,

    /// Diagnostic wording
    pub grammar: GrammarConfig,

    /// Definition extraction settings
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreesConfig {
    /// Tree headers are copied from
    pub donor: Option<PathBuf>,

    /// Tree being built
    pub target: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build command, run in the target tree (e.g. `["make", "-k"]`)
    pub command: Vec<String>,

    /// Extra environment for the build command
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Link command, run once in the target tree
    pub command: Vec<String>,

    /// Globs (relative to the donor tree) of objects to scan with `nm`
    pub objects: Vec<String>,

    /// `nm` binary; looked up on PATH when unset
    pub nm: Option<PathBuf>,

    /// Extension scanned objects are mapped back to (default `c`)
    pub source_extension: Option<String>,

    /// `file symbol` listing used instead of scanning objects
    pub symbols: Option<PathBuf>,

    /// Owning files with these suffixes are not stub candidates
    pub header_suffixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosureConfig {
    /// Passes without a new header before the run stalls
    pub stall_threshold: Option<usize>,

    /// Prefix applied to copied header file names
    pub prefix: Option<String>,

    /// Replace differing files that predate the run
    pub allow_overwrite: Option<bool>,

    /// Audit log path, relative to the target tree
    pub log: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    pub error_markers: Option<Vec<String>>,
    pub missing_include_suffixes: Option<Vec<String>>,
    pub undefined_tokens: Option<Vec<String>>,
    pub blank_separated_symbols: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Extraction front-end; the file to scan is appended as last argument
    pub command: Vec<String>,

    /// File name suffixes indexed when scanning a tree
    pub suffixes: Option<Vec<String>>,

    /// Name cleanup rules, applied in order
    pub strip: Vec<StripRule>,
}

/// Default audit log location inside the target tree.
pub const DEFAULT_CLOSURE_LOG: &str = ".kport/materialized.log";

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Trees
        if other.trees.donor.is_some() {
            self.trees.donor = other.trees.donor;
        }
        if other.trees.target.is_some() {
            self.trees.target = other.trees.target;
        }

        // Build
        if !other.build.command.is_empty() {
            self.build.command = other.build.command;
        }
        self.build.env.extend(other.build.env);

        // Link
        if !other.link.command.is_empty() {
            self.link.command = other.link.command;
        }
        if !other.link.objects.is_empty() {
            self.link.objects = other.link.objects;
        }
        if other.link.nm.is_some() {
            self.link.nm = other.link.nm;
        }
        if other.link.source_extension.is_some() {
            self.link.source_extension = other.link.source_extension;
        }
        if other.link.symbols.is_some() {
            self.link.symbols = other.link.symbols;
        }
        if other.link.header_suffixes.is_some() {
            self.link.header_suffixes = other.link.header_suffixes;
        }

        // Closure
        if other.closure.stall_threshold.is_some() {
            self.closure.stall_threshold = other.closure.stall_threshold;
        }
        if other.closure.prefix.is_some() {
            self.closure.prefix = other.closure.prefix;
        }
        if other.closure.allow_overwrite.is_some() {
            self.closure.allow_overwrite = other.closure.allow_overwrite;
        }
        if other.closure.log.is_some() {
            self.closure.log = other.closure.log;
        }

        // Grammar
        if other.grammar.error_markers.is_some() {
            self.grammar.error_markers = other.grammar.error_markers;
        }
        if other.grammar.missing_include_suffixes.is_some() {
            self.grammar.missing_include_suffixes = other.grammar.missing_include_suffixes;
        }
        if other.grammar.undefined_tokens.is_some() {
            self.grammar.undefined_tokens = other.grammar.undefined_tokens;
        }
        if other.grammar.blank_separated_symbols.is_some() {
            self.grammar.blank_separated_symbols = other.grammar.blank_separated_symbols;
        }

        // Extract
        if !other.extract.command.is_empty() {
            self.extract.command = other.extract.command;
        }
        if other.extract.suffixes.is_some() {
            self.extract.suffixes = other.extract.suffixes;
        }
        if !other.extract.strip.is_empty() {
            self.extract.strip = other.extract.strip;
        }
    }

    /// Diagnostic grammar with unset fields at their defaults.
    pub fn diagnostic_grammar(&self) -> DiagnosticGrammar {
        let defaults = DiagnosticGrammar::default();
        let grammar = self.grammar.clone();
        DiagnosticGrammar {
            error_markers: grammar.error_markers.unwrap_or(defaults.error_markers),
            missing_include_suffixes: grammar
                .missing_include_suffixes
                .unwrap_or(defaults.missing_include_suffixes),
            undefined_tokens: grammar.undefined_tokens.unwrap_or(defaults.undefined_tokens),
            blank_separated_symbols: grammar
                .blank_separated_symbols
                .unwrap_or(defaults.blank_separated_symbols),
        }
    }

    pub fn closure_options(&self) -> ClosureOptions {
        let mut options = ClosureOptions::default();
        if let Some(threshold) = self.closure.stall_threshold {
            options.stall_threshold = threshold;
        }
        options
    }

    pub fn materialize_policy(&self) -> MaterializePolicy {
        MaterializePolicy {
            prefix: self.closure.prefix.clone(),
            allow_overwrite: self.closure.allow_overwrite.unwrap_or(false),
        }
    }

    /// Audit log path, relative to the target tree.
    ///
    /// Absolute paths and `..` are rejected so the log stays under the target.
    pub fn closure_log(&self) -> Result<PathBuf> {
        let log = self
            .closure
            .log
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CLOSURE_LOG));

        if log.as_os_str().is_empty()
            || log
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            anyhow::bail!(
                "`closure.log` must be a relative path inside the target tree, got `{}`",
                log.display()
            );
        }
        Ok(log)
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        let mut options = ResolverOptions::default();
        if let Some(suffixes) = &self.link.header_suffixes {
            options.header_suffixes = suffixes.clone();
        }
        options
    }

    pub fn source_extension(&self) -> &str {
        self.link.source_extension.as_deref().unwrap_or("c")
    }

    /// File suffixes indexed when scanning a tree.
    pub fn extract_suffixes(&self) -> Vec<String> {
        self.extract
            .suffixes
            .clone()
            .unwrap_or_else(|| vec![".c".to_string(), ".h".to_string()])
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (kport.toml)
/// 2. Global config (~/.kport/config.toml)
/// 3. Defaults
///
/// Missing files are skipped; a file that exists but does not parse is an
/// error.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    // Load global config first
    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load(global_path)?);
        }
    }

    // Project config overrides global
    if project_path.exists() {
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}

/// Get the global kport config directory (~/.kport).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".kport"))
}

/// Get the global config path (~/.kport/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extract::StripAction;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.trees.donor.is_none());
        assert_eq!(config.closure_options().stall_threshold, 3);
        assert_eq!(config.diagnostic_grammar(), DiagnosticGrammar::default());
        assert_eq!(config.closure_log().unwrap(), PathBuf::from(".kport/materialized.log"));
        assert_eq!(config.source_extension(), "c");
        assert_eq!(config.resolver_options(), ResolverOptions::default());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("kport.toml");

        std::fs::write(
            &config_path,
            r#"
[trees]
donor = "../freebsd/sys"
target = "port"

[build]
command = ["make", "-k"]
env = { CC = "clang" }

[link]
objects = ["obj/**/*.o"]
header_suffixes = [".h"]

[closure]
stall_threshold = 5
prefix = "bsd_"

[grammar]
error_markers = ["Fehler:"]

[[extract.strip]]
pattern = "__P"
rule = "strip-clause"

[[extract.strip]]
pattern = "^__"
rule = "discard"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.trees.donor, Some(PathBuf::from("../freebsd/sys")));
        assert_eq!(config.build.command, vec!["make", "-k"]);
        assert_eq!(config.build.env.get("CC"), Some(&"clang".to_string()));
        assert_eq!(config.closure_options().stall_threshold, 5);
        assert_eq!(config.materialize_policy().prefix.as_deref(), Some("bsd_"));
        assert!(!config.materialize_policy().allow_overwrite);
        assert_eq!(config.resolver_options().header_suffixes, vec![".h"]);

        let grammar = config.diagnostic_grammar();
        assert_eq!(grammar.error_markers, vec!["Fehler:"]);
        assert_eq!(
            grammar.missing_include_suffixes,
            DiagnosticGrammar::default().missing_include_suffixes
        );

        assert_eq!(
            config.extract.strip,
            vec![
                StripRule::new("__P", StripAction::StripClause),
                StripRule::new("^__", StripAction::Discard),
            ]
        );
    }

    #[test]
    fn test_closure_log_stays_in_target() {
        let mut config = Config::default();
        config.closure.log = Some(PathBuf::from("logs/closure.log"));
        assert_eq!(config.closure_log().unwrap(), PathBuf::from("logs/closure.log"));

        for bad in ["/tmp/closure.log", "../closure.log", "logs/../../x.log"] {
            config.closure.log = Some(PathBuf::from(bad));
            assert!(config.closure_log().is_err(), "{} accepted", bad);
        }
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.trees.donor = Some(PathBuf::from("/src/freebsd/sys"));
        base.build.command = vec!["make".to_string()];
        base.closure.stall_threshold = Some(4);

        let mut override_cfg = Config::default();
        override_cfg.build.command = vec!["gmake".to_string(), "-k".to_string()];

        base.merge(override_cfg);

        assert_eq!(base.build.command, vec!["gmake", "-k"]);
        assert_eq!(base.trees.donor, Some(PathBuf::from("/src/freebsd/sys"))); // Not overridden
        assert_eq!(base.closure.stall_threshold, Some(4));
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("kport.toml");

        std::fs::write(
            &global_path,
            r#"
[link]
nm = "/usr/bin/llvm-nm"

[closure]
stall_threshold = 6
allow_overwrite = true
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[closure]
stall_threshold = 2
"#,
        )
        .unwrap();

        let config = load_config(Some(&global_path), &project_path).unwrap();

        assert_eq!(config.closure_options().stall_threshold, 2);
        assert!(config.materialize_policy().allow_overwrite);
        assert_eq!(config.link.nm, Some(PathBuf::from("/usr/bin/llvm-nm")));
    }

    #[test]
    fn test_broken_project_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let project_path = tmp.path().join("kport.toml");
        std::fs::write(
            &project_path,
            "[closure]\nprefix = \"bsd_\"\nallow_overwrite = tru\n",
        )
        .unwrap();

        let err = load_config(None, &project_path).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse config file"));
    }

    #[test]
    fn test_broken_global_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("config.toml");
        std::fs::write(&global_path, "[closure\n").unwrap();

        assert!(load_config(Some(&global_path), &tmp.path().join("kport.toml")).is_err());
    }

    #[test]
    fn test_missing_config_files_give_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(
            Some(&tmp.path().join("config.toml")),
            &tmp.path().join("kport.toml"),
        )
        .unwrap();
        assert_eq!(config, Config::default());
    }
}
