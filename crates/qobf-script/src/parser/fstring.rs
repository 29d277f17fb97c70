//! Splitting f-string literals into literal text and replacement fields.

use super::Parser;
use crate::ast::{Expr, FString, FStringPart, FormattedField, StringPiece};
use crate::error::{ScriptError, ScriptResult};
use crate::lexer::tokenize_embedded;

/// Classify one string token. Only f-strings are taken apart; every other
/// literal is kept verbatim.
pub(super) fn parse_string_piece(raw: &str, line: usize) -> ScriptResult<StringPiece> {
    let prefix_len = raw.find(['\'', '"']).unwrap_or(0);
    let prefix = &raw[..prefix_len];
    if !prefix.contains(['f', 'F']) {
        return Ok(StringPiece::Plain(raw.to_string()));
    }

    let quoted = &raw[prefix_len..];
    let quote = if quoted.starts_with("'''") || quoted.starts_with("\"\"\"") {
        &quoted[..3]
    } else {
        &quoted[..1]
    };
    let body = quoted
        .len()
        .checked_sub(quote.len())
        .and_then(|end| quoted.get(quote.len()..end))
        .ok_or_else(|| ScriptError::FString(format!("malformed literal at line {line}")))?;

    let scanner = Scanner {
        raw: prefix.contains(['r', 'R']),
        line,
    };
    let (parts, _) = scanner.parts(body, false)?;
    Ok(StringPiece::Formatted(FString {
        prefix: prefix.to_string(),
        quote: quote.to_string(),
        parts,
    }))
}

struct Scanner {
    raw: bool,
    line: usize,
}

impl Scanner {
    fn error(&self, message: &str) -> ScriptError {
        ScriptError::FString(format!("{message} at line {}", self.line))
    }

    /// Literal text and fields of `text`. In a format spec (`nested`) the
    /// scan stops at the `}` closing the enclosing field and returns its
    /// offset.
    fn parts(&self, text: &str, nested: bool) -> ScriptResult<(Vec<FStringPart>, usize)> {
        let bytes = text.as_bytes();
        let mut parts = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'{' if !nested && bytes.get(i + 1) == Some(&b'{') => i += 2,
                b'}' if !nested && bytes.get(i + 1) == Some(&b'}') => i += 2,
                b'{' => {
                    push_literal(&mut parts, &text[literal_start..i]);
                    let (field, consumed) = self.field(&text[i + 1..])?;
                    parts.push(FStringPart::Field(field));
                    i += 1 + consumed;
                    literal_start = i;
                }
                b'}' if nested => {
                    push_literal(&mut parts, &text[literal_start..i]);
                    return Ok((parts, i));
                }
                b'}' => return Err(self.error("single '}' is not allowed")),
                b'\\' if !self.raw && text[i..].starts_with("\\N{") => {
                    let close = text[i..]
                        .find('}')
                        .ok_or_else(|| self.error("unterminated \\N escape"))?;
                    i += close + 1;
                }
                b'\\' if matches!(bytes.get(i + 1), Some(b'{' | b'}')) => i += 1,
                b'\\' => i += 2,
                _ => i += 1,
            }
        }

        if nested {
            return Err(self.error("unterminated replacement field"));
        }
        push_literal(&mut parts, &text[literal_start..]);
        Ok((parts, bytes.len()))
    }

    /// One field starting after its `{`; returns the field and the number of
    /// bytes consumed including the closing `}`.
    fn field(&self, text: &str) -> ScriptResult<(FormattedField, usize)> {
        let bytes = text.as_bytes();
        let mut depth = 0usize;
        let mut in_string: Option<u8> = None;
        let mut expr_end = None;
        let mut debug = false;
        let mut i = 0;

        while i < bytes.len() {
            let c = bytes[i];
            if let Some(quote) = in_string {
                if c == b'\\' {
                    i += 1;
                } else if c == quote {
                    in_string = None;
                }
                i += 1;
                continue;
            }
            match c {
                b'\'' | b'"' => in_string = Some(c),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' if depth > 0 => depth -= 1,
                b'}' | b':' if depth == 0 => {
                    expr_end = Some(i);
                    break;
                }
                b'!' if depth == 0 && bytes.get(i + 1) != Some(&b'=') => {
                    expr_end = Some(i);
                    break;
                }
                b'=' if depth == 0
                    && bytes.get(i + 1) != Some(&b'=')
                    && !matches!(i.checked_sub(1).map(|p| bytes[p]), Some(b'=' | b'!' | b'<' | b'>')) =>
                {
                    expr_end = Some(i);
                    debug = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }

        let expr_end = expr_end.ok_or_else(|| self.error("unterminated replacement field"))?;
        let source = &text[..expr_end];
        if source.trim().is_empty() {
            return Err(self.error("empty expression in replacement field"));
        }
        let expr = parse_embedded(source)?;

        let mut i = expr_end;
        if debug {
            i += 1;
            while bytes.get(i) == Some(&b' ') {
                i += 1;
            }
        }

        let conversion = if bytes.get(i) == Some(&b'!') {
            let conv = text[i + 1..]
                .chars()
                .next()
                .filter(|c| matches!(c, 's' | 'r' | 'a'))
                .ok_or_else(|| self.error("conversion must be !s, !r or !a"))?;
            i += 2;
            Some(conv)
        } else {
            None
        };

        let format_spec = if bytes.get(i) == Some(&b':') {
            let (spec, len) = self.parts(&text[i + 1..], true)?;
            i += 1 + len;
            Some(spec)
        } else {
            None
        };

        if bytes.get(i) != Some(&b'}') {
            return Err(self.error("expected '}' after replacement field"));
        }
        Ok((
            FormattedField {
                expr: Box::new(expr),
                debug,
                conversion,
                format_spec,
            },
            i + 1,
        ))
    }
}

fn push_literal(parts: &mut Vec<FStringPart>, text: &str) {
    if !text.is_empty() {
        parts.push(FStringPart::Literal(text.to_string()));
    }
}

fn parse_embedded(source: &str) -> ScriptResult<Expr> {
    let mut parser = Parser::new(tokenize_embedded(source)?);
    let expr = parser.parse_star_expressions_or_yield()?;
    parser.expect_eof()?;
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fstring(raw: &str) -> FString {
        match parse_string_piece(raw, 1).unwrap() {
            StringPiece::Formatted(f) => f,
            StringPiece::Plain(p) => panic!("expected f-string, got {p}"),
        }
    }

    #[test]
    fn test_plain_string_is_verbatim() {
        assert_eq!(
            parse_string_piece("b'{x}'", 1).unwrap(),
            StringPiece::Plain("b'{x}'".into())
        );
    }

    #[test]
    fn test_debug_field() {
        let f = fstring("f\"{a + b=}\"");
        let FStringPart::Field(field) = &f.parts[0] else {
            panic!("expected field");
        };
        assert!(field.debug);
        assert!(matches!(*field.expr, Expr::BinOp { .. }));
    }

    #[test]
    fn test_comparison_is_not_debug() {
        let f = fstring("f'{a != b}{c <= d}'");
        assert_eq!(f.parts.len(), 2);
        assert!(f.parts.iter().all(|p| matches!(
            p,
            FStringPart::Field(FormattedField { debug: false, .. })
        )));
    }

    #[test]
    fn test_nested_brackets_and_strings() {
        let f = fstring("f'{d[\"k\"]:{w}.{p}f} {fn(a, {1: 2})}'");
        assert_eq!(f.parts.len(), 3);
        let FStringPart::Field(first) = &f.parts[0] else {
            panic!("expected field");
        };
        assert_eq!(first.format_spec.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_triple_quoted() {
        let f = fstring("rf'''a\n{b}'''");
        assert_eq!(f.quote, "'''");
        assert_eq!(f.prefix, "rf");
        assert_eq!(f.parts[0], FStringPart::Literal("a\n".into()));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_string_piece("f'{}'", 1).is_err());
        assert!(parse_string_piece("f'{a'", 1).is_err());
        assert!(parse_string_piece("f'a}b'", 1).is_err());
        assert!(parse_string_piece("f'{a!x}'", 1).is_err());
    }
}
