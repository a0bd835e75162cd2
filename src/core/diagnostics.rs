//! Toolchain diagnostic parsing.
//!
//! Compiler and linker output is free-form text whose wording is not a
//! stable contract. Each diagnostic shape we care about is recognized by a
//! small named [`LineMatcher`]; the [`DiagnosticParser`] tries them in a
//! fixed priority order and treats anything unrecognized as noise.
//!
//! The literal wording (error markers, "No such file or directory", the
//! `undefined`/`reference` token pair) lives in [`DiagnosticGrammar`] so it
//! can be adjusted from configuration for a different toolchain.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::symbol::{strip_decoration, Symbol};

/// `<file>:<line>:[<col>:] <rest>`
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>[^:\s][^:]*):(?P<line>\d+):(?:(?P<col>\d+):)?\s*(?P<rest>.*)$")
        .expect("location pattern is valid")
});

/// Literal wording of the diagnostics the parser recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticGrammar {
    /// Markers that introduce an error after the source location, tried in order.
    pub error_markers: Vec<String>,

    /// Suffixes that identify a missing-include error.
    pub missing_include_suffixes: Vec<String>,

    /// Whitespace tokens that must all appear on an undefined-reference line.
    pub undefined_tokens: Vec<String>,

    /// Treat the second token of a line following a blank line as a symbol.
    pub blank_separated_symbols: bool,
}

impl Default for DiagnosticGrammar {
    fn default() -> Self {
        DiagnosticGrammar {
            error_markers: vec!["fatal error:".to_string(), "error:".to_string()],
            missing_include_suffixes: vec![
                "No such file or directory".to_string(),
                "file not found".to_string(),
            ],
            undefined_tokens: vec!["undefined".to_string(), "reference".to_string()],
            blank_separated_symbols: true,
        }
    }
}

/// A header the compiler could not find.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MissingInclude {
    /// File containing the failing `#include`.
    pub source_file: String,
    /// Header reference exactly as written in the include directive.
    pub header: String,
}

impl MissingInclude {
    pub fn new(source_file: impl Into<String>, header: impl Into<String>) -> Self {
        MissingInclude {
            source_file: source_file.into(),
            header: header.into(),
        }
    }
}

/// A structured event extracted from one diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DiagnosticEvent {
    MissingInclude(MissingInclude),
    UndefinedSymbol { symbol: Symbol },
}

/// What the parser knows about the surrounding text when classifying a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineContext {
    /// The previous line was blank (or whitespace only).
    pub follows_blank: bool,
}

/// Result of running one matcher over one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    Event(DiagnosticEvent),
    /// The line looks like this shape but required fields are missing.
    Ambiguous(String),
    NoMatch,
}

/// A recognizer for one diagnostic shape.
pub trait LineMatcher: Send + Sync {
    /// Short name used in logs and parse reports.
    fn name(&self) -> &'static str;

    fn classify(&self, line: &str, ctx: LineContext) -> Match;
}

/// `foo.c:3:10: fatal error: sys/mbuf.h: No such file or directory`
#[derive(Debug, Clone)]
pub struct MissingIncludeMatcher {
    markers: Vec<String>,
    suffixes: Vec<String>,
}

impl MissingIncludeMatcher {
    pub fn new(grammar: &DiagnosticGrammar) -> Self {
        MissingIncludeMatcher {
            markers: grammar.error_markers.clone(),
            suffixes: grammar.missing_include_suffixes.clone(),
        }
    }

    fn header_part<'a>(&self, body: &'a str) -> Option<&'a str> {
        self.suffixes
            .iter()
            .find_map(|suffix| body.strip_suffix(suffix.as_str()))
    }
}

impl LineMatcher for MissingIncludeMatcher {
    fn name(&self) -> &'static str {
        "missing-include"
    }

    fn classify(&self, line: &str, _ctx: LineContext) -> Match {
        let line = line.trim();
        if self.header_part(line).is_none() {
            return Match::NoMatch;
        }

        let Some(caps) = LOCATION.captures(line) else {
            return Match::Ambiguous("missing `<file>:<line>:` location".to_string());
        };
        let file = caps["file"].trim();
        let rest = caps["rest"].trim_start();

        let Some(body) = self
            .markers
            .iter()
            .find_map(|marker| rest.strip_prefix(marker.as_str()))
        else {
            return Match::Ambiguous("no error marker after location".to_string());
        };

        let header = self
            .header_part(body.trim())
            .map(|h| strip_decoration(h.trim().trim_end_matches(':')))
            .unwrap_or_default();

        if header.is_empty() {
            return Match::Ambiguous("empty header name".to_string());
        }

        Match::Event(DiagnosticEvent::MissingInclude(MissingInclude::new(
            file, header,
        )))
    }
}

/// `uipc.c:(.text+0x2a): undefined reference to `mbuf_alloc'`
#[derive(Debug, Clone)]
pub struct UndefinedReferenceMatcher {
    tokens: Vec<String>,
}

impl UndefinedReferenceMatcher {
    pub fn new(grammar: &DiagnosticGrammar) -> Self {
        UndefinedReferenceMatcher {
            tokens: grammar.undefined_tokens.clone(),
        }
    }
}

impl LineMatcher for UndefinedReferenceMatcher {
    fn name(&self) -> &'static str {
        "undefined-reference"
    }

    fn classify(&self, line: &str, _ctx: LineContext) -> Match {
        if self.tokens.is_empty() {
            return Match::NoMatch;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let mut last_marker = 0;
        for token in &self.tokens {
            match words.iter().rposition(|w| *w == token.as_str()) {
                Some(pos) => last_marker = last_marker.max(pos),
                None => return Match::NoMatch,
            }
        }

        // The symbol has to come after the marker words, otherwise the line
        // was cut short ("... undefined reference").
        let Some(last) = words.last() else {
            return Match::NoMatch;
        };
        if words.len() - 1 <= last_marker {
            return Match::Ambiguous("no symbol after undefined reference".to_string());
        }

        match Symbol::from_decorated(last) {
            Some(symbol) => Match::Event(DiagnosticEvent::UndefinedSymbol { symbol }),
            None => Match::Ambiguous("symbol token is only decoration".to_string()),
        }
    }
}

/// A symbol line opening a blank-separated block, as in `nm -u` style
/// listings:
///
/// ```text
/// uipc_mbuf.o:
///
///                  U mbuf_alloc
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlankSeparatedSymbolMatcher;

impl LineMatcher for BlankSeparatedSymbolMatcher {
    fn name(&self) -> &'static str {
        "blank-separated-symbol"
    }

    fn classify(&self, line: &str, ctx: LineContext) -> Match {
        if !ctx.follows_blank {
            return Match::NoMatch;
        }

        let Some(token) = line.split_whitespace().nth(1) else {
            return Match::NoMatch;
        };

        // `ld: if.o: in function ...` names an object, not a symbol.
        if token.ends_with(':') {
            return Match::Ambiguous(format!("`{}` is a location, not a symbol", token));
        }

        let bare = strip_decoration(token);
        if bare.is_empty() || !is_symbol_like(bare) || is_object_name(bare) {
            return Match::Ambiguous(format!("`{}` is not a symbol name", token));
        }

        Match::Event(DiagnosticEvent::UndefinedSymbol {
            symbol: Symbol::new(bare),
        })
    }
}

fn is_symbol_like(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '@'))
}

fn is_object_name(name: &str) -> bool {
    [".o", ".obj", ".a", ".so", ".lo"]
        .iter()
        .any(|ext| name.len() > ext.len() && name.ends_with(ext))
}

/// A line that superficially matched a diagnostic shape but was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseAmbiguous {
    /// 1-based line number in the parsed text.
    pub line_number: usize,
    pub matcher: &'static str,
    pub line: String,
    pub reason: String,
}

/// Everything extracted from one block of tool output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseReport {
    pub events: Vec<DiagnosticEvent>,
    pub ambiguous: Vec<ParseAmbiguous>,
    /// Lines no matcher recognized.
    pub noise: usize,
}

impl ParseReport {
    pub fn missing_includes(&self) -> impl Iterator<Item = &MissingInclude> {
        self.events.iter().filter_map(|event| match event {
            DiagnosticEvent::MissingInclude(include) => Some(include),
            _ => None,
        })
    }

    pub fn undefined_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.events.iter().filter_map(|event| match event {
            DiagnosticEvent::UndefinedSymbol { symbol } => Some(symbol),
            _ => None,
        })
    }
}

/// Classifies tool output lines by trying each matcher in priority order.
pub struct DiagnosticParser {
    matchers: Vec<Box<dyn LineMatcher>>,
}

impl Default for DiagnosticParser {
    fn default() -> Self {
        DiagnosticParser::new(&DiagnosticGrammar::default())
    }
}

impl DiagnosticParser {
    /// Create a parser with the standard matcher set for a grammar.
    pub fn new(grammar: &DiagnosticGrammar) -> Self {
        let mut matchers: Vec<Box<dyn LineMatcher>> = vec![
            Box::new(MissingIncludeMatcher::new(grammar)),
            Box::new(UndefinedReferenceMatcher::new(grammar)),
        ];
        if grammar.blank_separated_symbols {
            matchers.push(Box::new(BlankSeparatedSymbolMatcher));
        }
        DiagnosticParser { matchers }
    }

    /// Names of the matchers in priority order.
    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    fn classify_detailed(&self, line: &str, ctx: LineContext) -> (&'static str, Match) {
        let mut ambiguous = None;
        for matcher in &self.matchers {
            match matcher.classify(line, ctx) {
                Match::Event(event) => return (matcher.name(), Match::Event(event)),
                Match::Ambiguous(reason) => {
                    if ambiguous.is_none() {
                        ambiguous = Some((matcher.name(), reason));
                    }
                }
                Match::NoMatch => {}
            }
        }
        match ambiguous {
            Some((name, reason)) => (name, Match::Ambiguous(reason)),
            None => ("noise", Match::NoMatch),
        }
    }

    /// Parse a whole block of tool output.
    pub fn parse(&self, text: &str) -> ParseReport {
        let mut report = ParseReport::default();
        let mut ctx = LineContext::default();

        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                ctx.follows_blank = true;
                continue;
            }

            match self.classify_detailed(line, ctx) {
                (_, Match::Event(event)) => report.events.push(event),
                (matcher, Match::Ambiguous(reason)) => {
                    tracing::debug!("skipping line {} ({}): {}", idx + 1, matcher, reason);
                    report.ambiguous.push(ParseAmbiguous {
                        line_number: idx + 1,
                        matcher,
                        line: line.to_string(),
                        reason,
                    });
                }
                (_, Match::NoMatch) => report.noise += 1,
            }

            ctx.follows_blank = false;
        }

        report
    }
}
