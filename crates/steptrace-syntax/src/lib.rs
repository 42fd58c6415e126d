//! Front end for the traced language: a dynamically typed,
//! indentation-structured Python subset.
//!
//! The crate turns source text into an [`ast::Module`]. Nothing here executes
//! code; `steptrace-runtime` walks the tree produced by [`parse`].
//!
//! # Pipeline
//!
//! - `tree-sitter-python` parses the text into a concrete syntax tree.
//! - The lowering pass walks that tree into [`ast`], rejecting constructs the
//!   runtime does not support and nesting deep enough to exhaust the stack.
//!   Statements carry the 1-based line they start on, which is what the
//!   runtime reports to line hooks.
//!
//! Any failure is a [`CompileError`]: the program never starts running.

pub mod ast;
pub mod error;
mod lower;

use tree_sitter::Parser;

pub use error::{CompileError, CompileErrorKind};

/// Parses a complete program.
///
/// An empty (or whitespace/comment only) source yields a module with an empty
/// body.
pub fn parse(source: &str) -> Result<ast::Module, CompileError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| CompileError::syntax(format!("grammar unavailable: {e}"), 1, 1))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| CompileError::syntax("source could not be parsed", 1, 1))?;
    lower::module(&tree, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_and_comment_only_sources_have_no_statements() {
        assert!(parse("").unwrap().body.is_empty());
        assert!(parse("# nothing here\n\n   \n").unwrap().body.is_empty());
    }

    #[test]
    fn missing_trailing_newline_is_fine() {
        let module = parse("if x:\n    y = 1").unwrap();
        assert_eq!(module.body.len(), 1);
    }

    proptest! {
        #[test]
        fn never_panics_on_arbitrary_input(src in "\\PC{0,200}") {
            let _ = parse(&src);
        }

        #[test]
        fn simple_assignments_always_parse(lines in proptest::collection::vec("v[a-z]{0,5} = [1-9][0-9]{0,3}", 0..12)) {
            let src = lines.join("\n");
            let module = parse(&src).unwrap();
            prop_assert_eq!(module.body.len(), lines.len());
        }
    }
}
