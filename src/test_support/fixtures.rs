//! Canned tool output for common test scenarios.

/// Compiler and linker diagnostics in the shapes real toolchains print.
pub mod tool_outputs {
    /// GCC missing include, with the caret context GCC prints after it.
    pub fn gcc_missing_include(file: &str, header: &str) -> String {
        format!(
            "{file}:12:10: fatal error: {header}: No such file or directory\n   \
             12 | #include <{header}>\n      \
             |          ^~~~~~~~~~~~\n\
             compilation terminated.\n"
        )
    }

    /// Clang missing include.
    pub fn clang_missing_include(file: &str, header: &str) -> String {
        format!("{file}:3:10: fatal error: '{header}' file not found\n#include <{header}>\n         ^~~~~~~~~~~\n1 error generated.\n")
    }

    /// GNU ld undefined reference.
    pub fn ld_undefined_reference(object: &str, function: &str, symbol: &str) -> String {
        format!(
            "/usr/bin/ld: {object}: in function `{function}':\n\
             {object}:(.text+0x2c): undefined reference to `{symbol}'\n"
        )
    }

    /// Trailer a failing link step prints.
    pub fn link_failed() -> &'static str {
        "collect2: error: ld returned 1 exit status\n"
    }

    /// A successful build.
    pub fn build_success() -> String {
        "cc -O2 -c net/if.c -o net/if.o\ncc -O2 -c net/route.c -o net/route.o\n".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::tool_outputs::*;
    use crate::core::diagnostics::{DiagnosticParser, MissingInclude};
    use crate::core::symbol::Symbol;

    #[test]
    fn test_canned_outputs_parse() {
        let parser = DiagnosticParser::default();

        let gcc = parser.parse(&gcc_missing_include("net/if.c", "sys/mbuf.h"));
        assert_eq!(
            gcc.missing_includes().collect::<Vec<_>>(),
            vec![&MissingInclude::new("net/if.c", "sys/mbuf.h")]
        );

        let clang = parser.parse(&clang_missing_include("net/if.c", "sys/mbuf.h"));
        assert_eq!(clang.missing_includes().count(), 1);

        let link = format!(
            "{}{}",
            ld_undefined_reference("net/if.o", "if_attach", "mbuf_alloc"),
            link_failed()
        );
        let parsed = parser.parse(&link);
        assert_eq!(
            parsed.undefined_symbols().collect::<Vec<_>>(),
            vec![&Symbol::new("mbuf_alloc")]
        );

        assert!(parser.parse(&build_success()).events.is_empty());
    }
}
