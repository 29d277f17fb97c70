//! Tokenizer for the Python-subset source language.
//!
//! `logos` produces physical tokens; a layout pass then turns line breaks
//! and leading whitespace into `Newline`, `Indent` and `Dedent` tokens.
//! Line breaks inside brackets, blank lines and comment-only lines produce
//! nothing, and a backslash at the end of a line joins it to the next.

use std::fmt;

use logos::{Lexer, Logos};

use crate::error::{ScriptError, ScriptResult};

/// Tokens of the source language.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\x0C]+")]
#[logos(skip r"#[^\r\n]*")]
#[logos(skip r"\\\r?\n")]
pub enum Token {
    // Layout
    #[regex(r"\r?\n")]
    Newline,
    /// Start of a more deeply indented block; produced by the layout pass.
    Indent,
    /// End of an indented block; produced by the layout pass.
    Dedent,

    // Keywords
    #[token("False")]
    False,
    #[token("None")]
    None,
    #[token("True")]
    True,
    #[token("and")]
    And,
    #[token("as")]
    As,
    #[token("assert")]
    Assert,
    #[token("async")]
    Async,
    #[token("await")]
    Await,
    #[token("break")]
    Break,
    #[token("class")]
    Class,
    #[token("continue")]
    Continue,
    #[token("def")]
    Def,
    #[token("del")]
    Del,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("except")]
    Except,
    #[token("finally")]
    Finally,
    #[token("for")]
    For,
    #[token("from")]
    From,
    #[token("global")]
    Global,
    #[token("if")]
    If,
    #[token("import")]
    Import,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("lambda")]
    Lambda,
    #[token("nonlocal")]
    Nonlocal,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("pass")]
    Pass,
    #[token("raise")]
    Raise,
    #[token("return")]
    Return,
    #[token("try")]
    Try,
    #[token("while")]
    While,
    #[token("with")]
    With,
    #[token("yield")]
    Yield,

    // Literals. Numbers and strings keep their source text.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?[jJ]?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?[jJ]?", |lex| lex.slice().to_string())]
    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| lex.slice().to_string())]
    #[regex(r"0[oO][0-7_]+", |lex| lex.slice().to_string())]
    #[regex(r"0[bB][01_]+", |lex| lex.slice().to_string())]
    Number(String),

    #[regex(r#"([rRbBuUfF]|[bB][rR]|[rR][bB]|[fF][rR]|[rR][fF])?['"]"#, lex_string)]
    String(String),

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    DoubleStar,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("@")]
    At,
    #[token("<<")]
    LShift,
    #[token(">>")]
    RShift,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token(":=")]
    Walrus,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,
    #[token("=")]
    Eq,
    #[token("->")]
    Arrow,
    #[token("...")]
    Ellipsis,

    // Augmented assignment
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("//=")]
    DoubleSlashEq,
    #[token("%=")]
    PercentEq,
    #[token("@=")]
    AtEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
    #[token("<<=")]
    LShiftEq,
    #[token(">>=")]
    RShiftEq,
    #[token("**=")]
    DoubleStarEq,
}

/// Consume the body of a string literal whose prefix and opening quote
/// have been matched. Escaped quotes never terminate the literal, in raw
/// strings as well.
fn lex_string(lex: &mut Lexer<'_, Token>) -> Option<String> {
    let quote = *lex.slice().as_bytes().last()?;
    let rest = lex.remainder().as_bytes();
    let triple = rest.len() >= 2 && rest[0] == quote && rest[1] == quote;

    let mut i = if triple { 2 } else { 0 };
    while i < rest.len() {
        match rest[i] {
            b'\\' => i += 2,
            b'\n' | b'\r' if !triple => return None,
            c if c == quote => {
                if !triple {
                    lex.bump(i + 1);
                    return Some(lex.slice().to_string());
                }
                if rest.get(i + 1) == Some(&quote) && rest.get(i + 2) == Some(&quote) {
                    lex.bump(i + 3);
                    return Some(lex.slice().to_string());
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Newline => "newline",
            Token::Indent => "indent",
            Token::Dedent => "dedent",
            Token::Name(n) => return write!(f, "name '{n}'"),
            Token::Number(n) => return write!(f, "number {n}"),
            Token::String(s) => return write!(f, "string {s}"),
            Token::False => "False",
            Token::None => "None",
            Token::True => "True",
            Token::And => "and",
            Token::As => "as",
            Token::Assert => "assert",
            Token::Async => "async",
            Token::Await => "await",
            Token::Break => "break",
            Token::Class => "class",
            Token::Continue => "continue",
            Token::Def => "def",
            Token::Del => "del",
            Token::Elif => "elif",
            Token::Else => "else",
            Token::Except => "except",
            Token::Finally => "finally",
            Token::For => "for",
            Token::From => "from",
            Token::Global => "global",
            Token::If => "if",
            Token::Import => "import",
            Token::In => "in",
            Token::Is => "is",
            Token::Lambda => "lambda",
            Token::Nonlocal => "nonlocal",
            Token::Not => "not",
            Token::Or => "or",
            Token::Pass => "pass",
            Token::Raise => "raise",
            Token::Return => "return",
            Token::Try => "try",
            Token::While => "while",
            Token::With => "with",
            Token::Yield => "yield",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::DoubleStar => "**",
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Percent => "%",
            Token::At => "@",
            Token::LShift => "<<",
            Token::RShift => ">>",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::Walrus => ":=",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Dot => ".",
            Token::Semicolon => ";",
            Token::Eq => "=",
            Token::Arrow => "->",
            Token::Ellipsis => "...",
            Token::PlusEq => "+=",
            Token::MinusEq => "-=",
            Token::StarEq => "*=",
            Token::SlashEq => "/=",
            Token::DoubleSlashEq => "//=",
            Token::PercentEq => "%=",
            Token::AtEq => "@=",
            Token::AmpEq => "&=",
            Token::PipeEq => "|=",
            Token::CaretEq => "^=",
            Token::LShiftEq => "<<=",
            Token::RShiftEq => ">>=",
            Token::DoubleStarEq => "**=",
        };
        write!(f, "'{text}'")
    }
}

/// A token with its 1-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
}

/// Tokenize a whole program, including layout tokens.
pub fn tokenize(source: &str) -> ScriptResult<Vec<SpannedToken>> {
    layout(source, false)
}

/// Tokenize an expression embedded in an f-string. Line breaks are
/// insignificant, as if the text were wrapped in parentheses.
pub(crate) fn tokenize_embedded(source: &str) -> ScriptResult<Vec<SpannedToken>> {
    layout(source, true)
}

fn layout(source: &str, embedded: bool) -> ScriptResult<Vec<SpannedToken>> {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let line_of = |offset: usize| line_starts.partition_point(|&start| start <= offset);

    let mut tokens = Vec::new();
    let mut indents = vec![0usize];
    let mut depth = usize::from(embedded);
    let mut at_line_start = true;

    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let line = line_of(span.start);
        let token = result.map_err(|()| ScriptError::LexerError {
            line,
            message: describe_error(lexer.slice()),
        })?;

        if token == Token::Newline {
            if depth == 0 && !at_line_start {
                tokens.push(SpannedToken { token, line });
                at_line_start = true;
            }
            continue;
        }

        if at_line_start && depth == 0 {
            let width = indentation_width(&source[line_starts[line - 1]..span.start]);
            let top = indents.last().copied().unwrap_or(0);
            if width > top {
                indents.push(width);
                tokens.push(SpannedToken {
                    token: Token::Indent,
                    line,
                });
            } else {
                while indents.last().is_some_and(|&level| width < level) {
                    indents.pop();
                    tokens.push(SpannedToken {
                        token: Token::Dedent,
                        line,
                    });
                }
                if indents.last() != Some(&width) {
                    return Err(ScriptError::IndentationError { line });
                }
            }
            at_line_start = false;
        }

        match token {
            Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
            Token::RParen | Token::RBracket | Token::RBrace => depth = depth.saturating_sub(1),
            _ => {}
        }
        tokens.push(SpannedToken { token, line });
    }

    let line = line_starts.len();
    if !at_line_start {
        tokens.push(SpannedToken {
            token: Token::Newline,
            line,
        });
    }
    for _ in 1..indents.len() {
        tokens.push(SpannedToken {
            token: Token::Dedent,
            line,
        });
    }
    Ok(tokens)
}

/// Column of the first token on a line; tabs advance to the next multiple of 8.
fn indentation_width(prefix: &str) -> usize {
    prefix.chars().fold(0, |width, c| match c {
        '\t' => (width / 8 + 1) * 8,
        '\x0C' => 0,
        _ => width + 1,
    })
}

fn describe_error(slice: &str) -> String {
    if slice.ends_with(['\'', '"']) {
        "unterminated string literal".to_string()
    } else {
        format!("unexpected character {slice:?}")
    }
}
