//! Linker-visible symbol names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Characters toolchains wrap around names in diagnostics.
///
/// GNU ld quotes with a backtick and an apostrophe (`` `foo' ``), newer
/// binutils use Unicode quotes, lld and Mach-O ld use double quotes.
const QUOTE_CHARS: &[char] = &['\'', '"', '`', '\u{2018}', '\u{2019}'];

/// A bare symbol name as the linker sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol from an already-bare name.
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    /// Create a symbol from a diagnostic token, stripping quote decoration.
    ///
    /// Returns `None` when nothing is left after stripping.
    pub fn from_decorated(token: &str) -> Option<Self> {
        let bare = strip_decoration(token);
        if bare.is_empty() {
            None
        } else {
            Some(Symbol(bare.to_string()))
        }
    }

    /// Get the symbol name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strip leading and trailing quote-like decoration and trailing
/// punctuation left over from sentence-style diagnostics.
pub fn strip_decoration(token: &str) -> &str {
    token
        .trim()
        .trim_end_matches([',', ';', ':'])
        .trim_matches(QUOTE_CHARS)
        .trim()
}
