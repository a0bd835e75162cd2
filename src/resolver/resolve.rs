//! One-shot symbol resolution: link once, map undefined symbols to sources.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::ResolveError;
use super::symbols::SourceSymbolTable;
use crate::builder::tool::ExternalTool;
use crate::core::diagnostics::DiagnosticParser;
use crate::core::manifest::SymbolManifest;
use crate::core::symbol::Symbol;
use crate::util::diagnostic::Diagnostic;

/// Tunables for resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Owning files with these suffixes are never manifest entries.
    pub header_suffixes: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            header_suffixes: [".h", ".hh", ".hpp", ".hxx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ResolverOptions {
    fn is_header(&self, file: &str) -> bool {
        self.header_suffixes.iter().any(|suffix| file.ends_with(suffix.as_str()))
    }
}

/// A symbol defined by more than one source file.
///
/// The symbol is listed under every candidate in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousSymbolOwner {
    pub symbol: Symbol,
    pub candidates: Vec<String>,
}

impl AmbiguousSymbolOwner {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::warning(format!(
            "`{}` is defined by {} files",
            self.symbol,
            self.candidates.len()
        ));
        for candidate in &self.candidates {
            diag = diag.with_context(format!("candidate: {}", candidate));
        }
        diag.with_suggestion("help: stub only one candidate and drop the others from the manifest")
    }
}

/// Outcome of a resolution run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveReport {
    /// Undefined symbols in first-seen order, deduplicated.
    pub symbols: Vec<Symbol>,
    pub manifest: SymbolManifest,
    pub ambiguous: Vec<AmbiguousSymbolOwner>,
    /// Symbols with no defining source file.
    pub unresolved: Vec<Symbol>,
    /// Link output lines skipped as ambiguous.
    pub ambiguous_lines: usize,
}

/// Maps undefined symbols from a link step to the files that define them.
pub struct SymbolResolver {
    parser: DiagnosticParser,
    table: SourceSymbolTable,
    options: ResolverOptions,
}

impl SymbolResolver {
    pub fn new(parser: DiagnosticParser, table: SourceSymbolTable) -> Self {
        SymbolResolver {
            parser,
            table,
            options: ResolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Invoke the link tool once in `cwd` and resolve its output.
    pub fn run<T: ExternalTool>(&self, tool: &mut T, cwd: &Path) -> Result<ResolveReport, ResolveError> {
        tracing::info!("linking with `{}`", tool.describe());

        let output = tool.invoke(cwd).map_err(|e| ResolveError::LinkTool {
            message: format!("{:#}", e),
        })?;
        if let Some(status) = output.status {
            tracing::debug!("link tool exited with status {}", status);
        }

        Ok(self.resolve_text(&output.text))
    }

    /// Resolve already captured link output.
    pub fn resolve_text(&self, text: &str) -> ResolveReport {
        let parsed = self.parser.parse(text);

        let mut seen = HashSet::new();
        let symbols: Vec<Symbol> = parsed
            .undefined_symbols()
            .filter(|symbol| seen.insert(symbol.as_str()))
            .cloned()
            .collect();

        let mut report = ResolveReport {
            ambiguous_lines: parsed.ambiguous.len(),
            ..ResolveReport::default()
        };

        for symbol in &symbols {
            let candidates: Vec<&String> = self
                .table
                .owners(symbol.as_str())
                .iter()
                .filter(|file| !self.options.is_header(file))
                .collect();

            match candidates.as_slice() {
                [] => {
                    tracing::warn!("no source defines `{}`", symbol);
                    report.unresolved.push(symbol.clone());
                }
                [only] => report.manifest.push(only, symbol),
                many => {
                    tracing::warn!("`{}` has {} candidate owners", symbol, many.len());
                    for file in many {
                        report.manifest.push(file, symbol);
                    }
                    report.ambiguous.push(AmbiguousSymbolOwner {
                        symbol: symbol.clone(),
                        candidates: many.iter().map(|file| file.to_string()).collect(),
                    });
                }
            }
        }

        tracing::info!(
            "{} undefined symbol(s): {} file(s) to stub, {} unresolved",
            symbols.len(),
            report.manifest.len(),
            report.unresolved.len()
        );

        report.symbols = symbols;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTool;

    fn resolver(listing: &str) -> SymbolResolver {
        SymbolResolver::new(
            DiagnosticParser::default(),
            SourceSymbolTable::from_listing(listing),
        )
    }

    #[test]
    fn test_repeated_symbol_yields_one_entry() {
        let link = "ld: net/if.o: in function `if_attach':\n\
                    if.c:(.text+0x1c): undefined reference to `mbuf_alloc'\n\
                    route.c:(.text+0x88): undefined reference to `mbuf_alloc'\n";

        let report = resolver("kern/uipc_mbuf.c mbuf_alloc\n").resolve_text(link);

        assert_eq!(report.symbols, vec![Symbol::new("mbuf_alloc")]);
        assert_eq!(report.manifest.len(), 1);
        let entry = &report.manifest.entries()[0];
        assert_eq!(entry.defining_file, "kern/uipc_mbuf.c");
        assert_eq!(entry.symbols, vec![Symbol::new("mbuf_alloc")]);
        assert!(report.ambiguous.is_empty());
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn test_entries_keep_first_seen_order() {
        let link = "a.o: undefined reference to `m_free'\n\
                    a.o: undefined reference to `in_cksum'\n\
                    a.o: undefined reference to `m_get'\n";

        let report = resolver(
            "kern/uipc_mbuf.c m_get\nkern/uipc_mbuf.c m_free\nnetinet/in_cksum.c in_cksum\n",
        )
        .resolve_text(link);

        assert_eq!(
            report.manifest.render(),
            "kern/uipc_mbuf.c\n\tm_free\n\tm_get\n\nnetinet/in_cksum.c\n\tin_cksum\n\n"
        );
    }

    #[test]
    fn test_ambiguous_owner_listed_under_every_candidate() {
        let link = "x.o: undefined reference to `if_attach'\n";
        let report = resolver("net/if.c if_attach\ncompat/if.c if_attach\n").resolve_text(link);

        assert_eq!(report.manifest.len(), 2);
        assert_eq!(report.ambiguous.len(), 1);
        assert_eq!(report.ambiguous[0].candidates, vec!["net/if.c", "compat/if.c"]);

        let rendered = report.ambiguous[0].to_diagnostic().format(false);
        assert!(rendered.starts_with("warning: `if_attach` is defined by 2 files"));
    }

    #[test]
    fn test_header_owners_are_excluded() {
        let link = "x.o: undefined reference to `m_length'\n\
                    x.o: undefined reference to `nowhere'\n";
        let report =
            resolver("sys/mbuf.h m_length\nkern/uipc_mbuf.c m_length\n").resolve_text(link);

        assert_eq!(report.manifest.entries()[0].defining_file, "kern/uipc_mbuf.c");
        assert!(report.ambiguous.is_empty());
        assert_eq!(report.unresolved, vec![Symbol::new("nowhere")]);
    }

    #[test]
    fn test_run_invokes_link_tool_once() {
        let mut tool = ScriptedTool::new(["x.o: undefined reference to `m_get'\n".to_string()]);
        let report = resolver("kern/uipc_mbuf.c m_get\n")
            .run(&mut tool, Path::new("."))
            .unwrap();

        assert_eq!(tool.calls(), 1);
        assert_eq!(report.manifest.len(), 1);
    }

    #[test]
    fn test_link_tool_failure() {
        let mut tool = ScriptedTool::failing("ld: not found");
        let err = resolver("").run(&mut tool, Path::new(".")).unwrap_err();
        assert!(matches!(err, ResolveError::LinkTool { .. }));
    }
}
