//! Locating the first error in a parsed program.
//!
//! tree-sitter recovers from bad input by wrapping it in `ERROR` nodes or
//! inserting zero-width `MISSING` ones, and says nothing about indentation.
//! Layout mistakes are found by re-reading the lines up to the first error
//! node, so that a stray indent is reported as an `IndentationError` rather
//! than as the syntax error it causes further on.

use tree_sitter::Node;

use super::position;
use crate::error::CompileError;

/// Tab stops are every eight columns.
const TAB_WIDTH: usize = 8;

/// Reports the earliest problem in a parsed program, if there is one.
///
/// The layout read covers every line even when the tree has no errors,
/// since the grammar accepts some dedents that match no outer block.
pub(crate) fn check(root: Node<'_>, source: &str) -> Result<(), CompileError> {
    let error_node = if root.has_error() {
        first_error_node(root)
    } else {
        None
    };
    let last_line = error_node.map_or(usize::MAX, |node| node.end_position().row + 1);
    let layout = Layout::scan(source, last_line);
    if let Some(err) = layout.indentation {
        return Err(err);
    }
    match error_node {
        Some(node) => Err(syntax_error(node, source, layout.unclosed)),
        None if root.has_error() => Err(CompileError::syntax("invalid syntax", 1, 1)),
        None => Ok(()),
    }
}

fn syntax_error(node: Node<'_>, source: &str, unclosed: Option<(char, u32, u32)>) -> CompileError {
    if node.end_byte() >= source.trim_end().len() {
        if let Some((bracket, line, column)) = unclosed {
            return CompileError::syntax(format!("'{bracket}' was never closed"), line, column);
        }
    }
    let (line, column) = position(node);
    if node.is_missing() {
        let message = if node.is_named() {
            format!("invalid syntax: expected {}", node.kind())
        } else {
            format!("invalid syntax: expected '{}'", node.kind())
        };
        return CompileError::syntax(message, line, column);
    }
    CompileError::syntax("invalid syntax", line, column)
}

/// Pre-order search that only descends into subtrees containing an error.
fn first_error_node(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// What a line-by-line read of the source finds.
#[derive(Default)]
struct Layout {
    indentation: Option<CompileError>,
    /// The innermost bracket left open at the end of the source.
    unclosed: Option<(char, u32, u32)>,
}

impl Layout {
    /// Reads `source`, checking the indentation of logical lines up to
    /// 1-based line `last_line`.
    fn scan(source: &str, last_line: usize) -> Layout {
        let mut layout = Layout::default();
        let mut levels: Vec<usize> = vec![0];
        let mut brackets: Vec<(char, u32, u32)> = Vec::new();
        let mut string: Option<(char, bool)> = None;
        let mut block: Opening = Opening::None;
        let mut continued = false;
        let mut header = false;

        for (index, text) in source.split('\n').enumerate() {
            let line = index + 1;
            let chars: Vec<char> = text.trim_end_matches('\r').chars().collect();
            let starts_logical = string.is_none() && brackets.is_empty() && !continued;

            if starts_logical {
                let (width, first) = indent_width(&chars);
                let blank = first.map_or(true, |c| c == '#');
                if !blank {
                    if line <= last_line && layout.indentation.is_none() {
                        layout.indentation = check_indent(&mut levels, width, block, line);
                    }
                    block = Opening::None;
                    let start = chars.iter().position(|c| !c.is_whitespace()).unwrap_or(0);
                    header = starts_compound(&chars[start..]);
                }
            }

            continued = false;
            let mut last_significant = None;
            let mut i = 0;
            while i < chars.len() {
                let c = chars[i];
                if let Some((quote, triple)) = string {
                    if c == '\\' {
                        continued = i + 1 == chars.len();
                        i += 2;
                        continue;
                    }
                    if c == quote && (!triple || chars[i..].starts_with(&[quote, quote, quote])) {
                        string = None;
                        i += if triple { 3 } else { 1 };
                        last_significant = Some(quote);
                        continue;
                    }
                    i += 1;
                    continue;
                }
                match c {
                    '#' => break,
                    '\'' | '"' => {
                        let triple = chars[i..].starts_with(&[c, c, c]);
                        string = Some((c, triple));
                        i += if triple { 3 } else { 1 };
                        continue;
                    }
                    '(' | '[' | '{' => brackets.push((c, line as u32, i as u32 + 1)),
                    ')' | ']' | '}' => {
                        brackets.pop();
                    }
                    '\\' if i + 1 == chars.len() => continued = true,
                    _ => {}
                }
                if !c.is_whitespace() {
                    last_significant = Some(c);
                }
                i += 1;
            }
            // A single-quoted string ends with its line unless the newline
            // is escaped.
            if matches!(string, Some((_, false))) && !continued {
                string = None;
            }
            if string.is_none() && brackets.is_empty() && !continued {
                if let Some(c) = last_significant {
                    block = match (c == ':', header) {
                        (true, _) => Opening::Required,
                        (false, true) => Opening::Allowed,
                        (false, false) => Opening::None,
                    };
                }
            }
        }

        layout.unclosed = brackets.last().copied();
        layout
    }
}

/// Whether the line before may be followed by a deeper one.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Opening {
    None,
    /// The line ended with `:`.
    Required,
    /// A compound statement header that lost its `:`. The missing colon is
    /// the error to report, not the indent after it.
    Allowed,
}

/// Whether a line starts with a keyword that opens a block.
fn starts_compound(chars: &[char]) -> bool {
    let word: String = chars
        .iter()
        .take_while(|c| c.is_alphanumeric() || **c == '_')
        .collect();
    matches!(
        word.as_str(),
        "if" | "elif" | "else" | "while" | "for" | "def" | "class" | "try" | "except"
            | "finally" | "with" | "async"
    )
}

/// Column width of a line's leading whitespace and its first other char.
fn indent_width(chars: &[char]) -> (usize, Option<char>) {
    let mut width = 0;
    for &c in chars {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
            '\x0c' => width = 0,
            other => return (width, Some(other)),
        }
    }
    (width, None)
}

fn check_indent(
    levels: &mut Vec<usize>,
    width: usize,
    block: Opening,
    line: usize,
) -> Option<CompileError> {
    let line_no = line as u32;
    let column = width as u32 + 1;
    let current = levels.last().copied().unwrap_or(0);
    if width > current {
        if block == Opening::None {
            return Some(CompileError::indentation("unexpected indent", line_no, column));
        }
        levels.push(width);
        return None;
    }
    if block == Opening::Required {
        return Some(CompileError::indentation("expected an indented block", line_no, column));
    }
    while levels.last().is_some_and(|&level| level > width) {
        levels.pop();
    }
    if levels.last().copied().unwrap_or(0) != width {
        return Some(CompileError::indentation(
            "unindent does not match any outer indentation level",
            line_no,
            column,
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::parse;

    #[test]
    fn inconsistent_dedent() {
        let err = parse("if x:\n        y = 1\n    z = 2\n").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Indentation);
        assert_eq!(err.message, "unindent does not match any outer indentation level");
        assert_eq!(err.line, 3);
    }

    #[test]
    fn brackets_and_strings_do_not_count_as_layout() {
        let source = "xs = [\n        1,\n  2]\ns = '''\n      text\n'''\nif xs:\n    y = (1 +)\n";
        let err = parse(source).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax);
        assert_eq!(err.line, 8);
    }

    #[test]
    fn unclosed_bracket_reports_opening_position() {
        let err = parse("x = (1,\n2\n").unwrap_err();
        assert_eq!(err.message, "'(' was never closed");
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn missing_colon_is_a_syntax_error() {
        let err = parse("if x\n    y = 1\n").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn unterminated_string_is_a_syntax_error() {
        let err = parse("s = 'abc\n").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax);
        assert_eq!(err.line, 1);
    }
}
