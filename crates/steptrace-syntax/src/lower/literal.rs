//! Numbers, strings and f-strings.
//!
//! The grammar keeps literal text as written; escapes, digit separators and
//! radix prefixes are resolved here.

use tree_sitter::Node;

use super::{named, LResult, Lowerer};
use crate::ast::*;
use crate::error::CompileError;

impl<'s> Lowerer<'s> {
    pub(crate) fn integer(&self, node: Node<'_>) -> LResult<i64> {
        let text = self.text(node).replace('_', "").to_ascii_lowercase();
        if text.ends_with('j') {
            return Err(self.error(node, "complex literals are not supported"));
        }
        let (digits, radix) = match text.get(..2) {
            Some("0x") => (&text[2..], 16),
            Some("0o") => (&text[2..], 8),
            Some("0b") => (&text[2..], 2),
            _ => (text.as_str(), 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(self.error(node, "invalid number literal"));
        }
        if radix == 10 && digits.len() > 1 && digits.starts_with('0') && digits.bytes().any(|b| b != b'0') {
            return Err(self.error(
                node,
                "leading zeros in decimal integer literals are not permitted",
            ));
        }
        i64::from_str_radix(digits, radix)
            .map_err(|_| self.error(node, "integer literal too large"))
    }

    pub(crate) fn float(&self, node: Node<'_>) -> LResult<f64> {
        let mut text = self.text(node).replace('_', "").to_ascii_lowercase();
        if text.ends_with('j') {
            return Err(self.error(node, "complex literals are not supported"));
        }
        if text.starts_with('.') {
            text.insert(0, '0');
        }
        let mut text = text.replace(".e", ".0e");
        if text.ends_with('.') {
            text.push('0');
        }
        text.parse()
            .map_err(|_| self.error(node, "invalid float literal"))
    }

    /// A string or a run of adjacent strings. Any f-string piece makes the
    /// whole run an f-string.
    pub(crate) fn strings(&mut self, node: Node<'_>) -> LResult<Expr> {
        let pieces = match node.kind() {
            "concatenated_string" => named(node),
            _ => vec![node],
        };
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut formatted = false;
        for piece in pieces {
            formatted |= self.string(piece, &mut parts)?;
        }
        if formatted {
            return Ok(Expr::FString(parts));
        }
        let text = match parts.pop() {
            Some(FStringPart::Literal(text)) => text,
            _ => String::new(),
        };
        Ok(Expr::Constant(Constant::Str(text.into())))
    }

    /// Appends one literal's parts; returns whether it was an f-string.
    fn string(&mut self, node: Node<'_>, parts: &mut Vec<FStringPart>) -> LResult<bool> {
        let children = {
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            children
        };
        let (Some(start), Some(end)) = (
            children.iter().find(|c| c.kind() == "string_start"),
            children.iter().rev().find(|c| c.kind() == "string_end"),
        ) else {
            return Err(self.error(node, "invalid syntax"));
        };

        let prefix: String = self
            .text(*start)
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if prefix.contains('b') {
            return Err(self.error(node, "bytes literals are not supported"));
        }
        let raw = prefix.contains('r');
        let formatted = prefix.contains('f');
        if prefix.contains('t') {
            return Err(self.error(node, "template strings are not supported"));
        }

        let mut literal_start = start.end_byte();
        for field in children.iter().filter(|c| c.kind() == "interpolation") {
            self.literal(node, literal_start, field.start_byte(), raw, formatted, parts)?;
            self.field_part(*field, parts)?;
            literal_start = field.end_byte();
        }
        self.literal(node, literal_start, end.start_byte(), raw, formatted, parts)?;
        Ok(formatted)
    }

    fn literal(
        &self,
        node: Node<'_>,
        from: usize,
        to: usize,
        raw: bool,
        formatted: bool,
        parts: &mut Vec<FStringPart>,
    ) -> LResult<()> {
        let Some(text) = self.source.get(from..to) else {
            return Err(self.error(node, "invalid syntax"));
        };
        let text = if formatted {
            unbrace(text).ok_or_else(|| self.error(node, "f-string: single '}' is not allowed"))?
        } else {
            text.to_string()
        };
        let text = if raw {
            text
        } else {
            unescape(&text).map_err(|message| self.error(node, message))?
        };
        push_literal(parts, &text);
        Ok(())
    }

    /// One `{expr=!r:spec}` replacement field.
    fn field_part(&mut self, node: Node<'_>, parts: &mut Vec<FStringPart>) -> LResult<()> {
        let in_fstring = |mut err: CompileError| {
            if !err.message.starts_with("f-string") {
                err.message = format!("f-string: {}", err.message);
            }
            err
        };
        let expression = self.field(node, "expression").map_err(in_fstring)?;
        let expr = self.expr(expression).map_err(in_fstring)?;

        let mut cursor = node.walk();
        let equals = node.children(&mut cursor).find(|c| c.kind() == "=");
        if let Some(equals) = equals {
            let text = self
                .source
                .get(node.start_byte() + 1..equals.end_byte())
                .unwrap_or_default();
            push_literal(parts, text);
        }

        let conversion = match node.child_by_field_name("type_conversion") {
            Some(conversion) => match self.text(conversion).trim_start_matches('!') {
                "r" => Some('r'),
                "s" => Some('s'),
                "a" => Some('a'),
                _ => {
                    return Err(self.error(
                        conversion,
                        "f-string: invalid conversion character: expected 's', 'r', or 'a'",
                    ))
                }
            },
            None => None,
        };

        let spec = match node.child_by_field_name("format_specifier") {
            Some(spec) => {
                if named(spec).iter().any(|c| c.kind() == "format_expression") {
                    return Err(self.error(spec, "f-string: nested replacement fields are not supported"));
                }
                Some(self.text(spec).trim_start_matches(':').to_string())
            }
            None => None,
        };

        let conversion = match conversion {
            None if equals.is_some() && spec.is_none() => Some('r'),
            other => other,
        };
        parts.push(FStringPart::Field {
            expr,
            conversion,
            spec,
        });
        Ok(())
    }
}

fn push_literal(parts: &mut Vec<FStringPart>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(FStringPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(FStringPart::Literal(text.to_string()));
    }
}

/// Collapses `{{` and `}}` in f-string literal text. `None` for a lone `}`.
fn unbrace(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' | '}' if chars.peek() == Some(&c) => {
                chars.next();
                out.push(c);
            }
            '}' => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

/// Resolves backslash escapes. Unknown escapes are kept as written.
fn unescape(text: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn hex_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    len: usize,
) -> Result<char, &'static str> {
    let mut value = 0u32;
    for _ in 0..len {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or("truncated escape sequence")?;
        value = value * 16 + digit;
    }
    char::from_u32(value).ok_or("invalid unicode escape")
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parse;

    fn value(source: &str) -> Expr {
        let module = parse(source).unwrap();
        match module.body.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Assign { value, .. }) => value,
            Some(StmtKind::Expr(e)) => e,
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    fn string(source: &str) -> String {
        match value(source) {
            Expr::Constant(Constant::Str(s)) => s.to_string(),
            other => panic!("expected string, got {other:?}"),
        }
    }

    fn fstring(source: &str) -> Vec<FStringPart> {
        match value(source) {
            Expr::FString(parts) => parts,
            other => panic!("expected f-string, got {other:?}"),
        }
    }

    #[test]
    fn numbers() {
        assert_eq!(value("x = 0x1F\n"), Expr::int(31));
        assert_eq!(value("x = 0o17\n"), Expr::int(15));
        assert_eq!(value("x = 0b101\n"), Expr::int(5));
        assert_eq!(value("x = 1_000\n"), Expr::int(1000));
        assert_eq!(value("x = 2.5\n"), Expr::Constant(Constant::Float(2.5)));
        assert_eq!(value("x = 1e3\n"), Expr::Constant(Constant::Float(1000.0)));
        assert_eq!(value("x = .5\n"), Expr::Constant(Constant::Float(0.5)));
        assert_eq!(value("x = 3.\n"), Expr::Constant(Constant::Float(3.0)));
    }

    #[test]
    fn out_of_range_and_complex_numbers_are_rejected() {
        let err = parse("x = 99999999999999999999\n").unwrap_err();
        assert_eq!(err.message, "integer literal too large");
        assert_eq!((err.line, err.column), (1, 5));
        assert!(parse("x = 2j\n").is_err());
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(string(r#"s = 'a\nb'"#), "a\nb");
        assert_eq!(string(r#"s = r'a\nb'"#), "a\\nb");
        assert_eq!(string("s = \"\"\"doc\nstring\"\"\"\n"), "doc\nstring");
        assert_eq!(string(r#"s = '\x41é'"#), "Aé");
        assert_eq!(string(r#"s = 'it\'s'"#), "it's");
        assert_eq!(string(r#"s = '\d'"#), "\\d");
        assert_eq!(string("s = ''\n"), "");
        assert!(parse("s = b'raw'\n").is_err());
    }

    #[test]
    fn fstring_literals_and_fields() {
        let parts = fstring("s = f'x = {x}, doubled {x * 2}!'\n");
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], FStringPart::Literal("x = ".into()));
        assert!(matches!(
            &parts[3],
            FStringPart::Field { expr: Expr::BinOp { op: BinOp::Mul, .. }, .. }
        ));
        assert_eq!(parts[4], FStringPart::Literal("!".into()));
    }

    #[test]
    fn fstring_escaped_braces() {
        let parts = fstring("s = f'{{literal}} {x}'\n");
        assert_eq!(parts[0], FStringPart::Literal("{literal} ".into()));
    }

    #[test]
    fn fstring_conversion_and_spec() {
        let parts = fstring("s = f'{name!r:>10}{value:.2f}'\n");
        assert!(matches!(
            &parts[0],
            FStringPart::Field { conversion: Some('r'), spec: Some(s), .. } if s == ">10"
        ));
        assert!(matches!(
            &parts[1],
            FStringPart::Field { conversion: None, spec: Some(s), .. } if s == ".2f"
        ));
    }

    #[test]
    fn fstring_inequality_is_not_a_conversion() {
        let parts = fstring("s = f'{a != b}'\n");
        assert!(matches!(
            &parts[0],
            FStringPart::Field { expr: Expr::Compare { .. }, conversion: None, .. }
        ));
    }

    #[test]
    fn fstring_nested_brackets_and_strings() {
        let parts = fstring("s = f\"{d['k']}{ {1: 2}[1] }\"\n");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn fstring_self_documenting_field() {
        let parts = fstring("s = f'{x=}'\n");
        assert_eq!(parts[0], FStringPart::Literal("x=".into()));
        assert!(matches!(&parts[1], FStringPart::Field { conversion: Some('r'), .. }));
    }

    #[test]
    fn fstring_errors() {
        let err = parse("a = 1\ns = f'{x!z}'\n").unwrap_err();
        assert!(err.message.starts_with("f-string"), "{err}");
        assert_eq!(err.line, 2);
        assert!(parse("s = f'{x:{w}}'\n").is_err());
    }
}
