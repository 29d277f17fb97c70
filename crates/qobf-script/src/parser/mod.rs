//! Recursive-descent parser for the Python subset.

mod expression;
mod fstring;
mod statement;

use crate::ast::{Expr, ExprContext, Module};
use crate::error::{ScriptError, ScriptResult};
use crate::lexer::{SpannedToken, Token, tokenize, tokenize_embedded};

/// Parse a program.
pub fn parse(source: &str) -> ScriptResult<Module> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.parse_module()
}

/// Parse a single expression, e.g. a call argument taken from a config value.
/// Line breaks inside the text are insignificant.
pub fn parse_expression(source: &str) -> ScriptResult<Expr> {
    let mut parser = Parser::new(tokenize_embedded(source)?);
    if parser.is_eof() {
        return Err(ScriptError::UnexpectedEof("expression".into()));
    }
    let expr = parser.parse_star_expressions_or_yield()?;
    parser.expect_eof()?;
    Ok(expr)
}

/// Parser state.
pub(super) struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_module(&mut self) -> ScriptResult<Module> {
        let mut body = Vec::new();
        while !self.is_eof() {
            if self.consume(&Token::Newline) {
                continue;
            }
            body.extend(self.parse_statement()?);
        }
        Ok(Module { body })
    }

    /// Line of the current token, or of the last token at end of input.
    pub(super) fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    pub(super) fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|t| &t.token)
    }

    pub(super) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        Some(token)
    }

    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    #[allow(clippy::needless_pass_by_value)]
    pub(super) fn expect(&mut self, expected: Token) -> ScriptResult<()> {
        if self.consume(&expected) {
            return Ok(());
        }
        Err(self.unexpected(&expected.to_string()))
    }

    pub(super) fn expect_name(&mut self) -> ScriptResult<String> {
        match self.peek() {
            Some(Token::Name(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("name")),
        }
    }

    fn expect_eof(&self) -> ScriptResult<()> {
        if self.is_eof() {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    /// Error for the current token.
    pub(super) fn unexpected(&self, expected: &str) -> ScriptError {
        match self.peek() {
            Some(found) => ScriptError::UnexpectedToken {
                line: self.line(),
                expected: expected.to_string(),
                found: found.to_string(),
            },
            None => ScriptError::UnexpectedEof(expected.to_string()),
        }
    }

    /// Whether the current token can begin an expression.
    pub(super) fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Name(_)
                    | Token::Number(_)
                    | Token::String(_)
                    | Token::LParen
                    | Token::LBracket
                    | Token::LBrace
                    | Token::Minus
                    | Token::Plus
                    | Token::Tilde
                    | Token::Star
                    | Token::Not
                    | Token::Lambda
                    | Token::Await
                    | Token::Ellipsis
                    | Token::None
                    | Token::True
                    | Token::False
            )
        )
    }
}

/// Rewrite an expression parsed in load context into an assignment target.
pub(super) fn into_target(expr: Expr, ctx: ExprContext, line: usize) -> ScriptResult<Expr> {
    Ok(match expr {
        Expr::Name { id, .. } => Expr::Name { id, ctx },
        Expr::Attribute { value, attr, .. } => Expr::Attribute { value, attr, ctx },
        Expr::Subscript { value, index, .. } => Expr::Subscript { value, index, ctx },
        Expr::Starred { value, .. } => Expr::Starred {
            value: Box::new(into_target(*value, ctx, line)?),
            ctx,
        },
        Expr::Tuple { elts, .. } => Expr::Tuple {
            elts: targets(elts, ctx, line)?,
            ctx,
        },
        Expr::List { elts, .. } => Expr::List {
            elts: targets(elts, ctx, line)?,
            ctx,
        },
        other => {
            return Err(ScriptError::InvalidTarget {
                line,
                what: describe(&other).to_string(),
            });
        }
    })
}

fn targets(elts: Vec<Expr>, ctx: ExprContext, line: usize) -> ScriptResult<Vec<Expr>> {
    elts.into_iter()
        .map(|e| into_target(e, ctx, line))
        .collect()
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Call { .. } => "function call",
        Expr::Number(_) | Expr::Strings(_) | Expr::Bool(_) | Expr::NoneLiteral | Expr::Ellipsis => {
            "literal"
        }
        Expr::Lambda { .. } => "lambda",
        Expr::Compare { .. } => "comparison",
        Expr::BinOp { .. } | Expr::UnaryOp { .. } | Expr::BoolOp { .. } => "expression",
        _ => "this expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Arg, CmpOp, FStringPart, Operator, ParamKind, Stmt, StringPiece};

    fn single(source: &str) -> Stmt {
        let mut module = parse(source).unwrap();
        assert_eq!(module.body.len(), 1, "{module:?}");
        module.body.remove(0)
    }

    #[test]
    fn test_parse_function_definition() {
        let stmt = single("@cache\ndef f(a, b: int = 2, *args, key=None, **kw) -> int:\n    return a + b\n");
        let Stmt::FunctionDef(def) = stmt else {
            panic!("expected def");
        };
        assert_eq!(def.name, "f");
        assert_eq!(def.decorators, vec![Expr::name("cache")]);
        let kinds: Vec<_> = def.params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParamKind::Normal,
                ParamKind::Normal,
                ParamKind::VarArgs,
                ParamKind::Normal,
                ParamKind::KwArgs
            ]
        );
        assert!(def.params[1].annotation.is_some());
        assert!(def.returns.is_some());
        assert_eq!(def.body.len(), 1);
    }

    #[test]
    fn test_parse_assignment_targets_are_store() {
        let stmt = single("a, b = c = f()\n");
        let Stmt::Assign { targets, .. } = stmt else {
            panic!("expected assign");
        };
        assert_eq!(targets.len(), 2);
        let Expr::Tuple { elts, ctx } = &targets[0] else {
            panic!("expected tuple target");
        };
        assert_eq!(*ctx, ExprContext::Store);
        assert_eq!(
            elts[0],
            Expr::Name {
                id: "a".into(),
                ctx: ExprContext::Store
            }
        );
    }

    #[test]
    fn test_parse_rejects_call_target() {
        assert!(matches!(
            parse("f() = 1\n"),
            Err(ScriptError::InvalidTarget { line: 1, .. })
        ));
    }

    #[test]
    fn test_parse_if_elif_else_chain() {
        let stmt = single("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        let Stmt::If { orelse, .. } = stmt else {
            panic!("expected if");
        };
        assert!(matches!(&orelse[..], [Stmt::If { orelse, .. }] if orelse.len() == 1));
    }

    #[test]
    fn test_parse_entry_point_guard() {
        let stmt = single("if __name__ == \"__main__\":\n    main()\n");
        let Stmt::If { test, .. } = stmt else {
            panic!("expected if");
        };
        let Expr::Compare { left, ops, .. } = test else {
            panic!("expected compare");
        };
        assert_eq!(left.as_name(), Some("__name__"));
        assert_eq!(ops, vec![CmpOp::Eq]);
    }

    #[test]
    fn test_parse_precedence() {
        let Stmt::Expr(expr) = single("1 + 2 * 3 ** -x\n") else {
            panic!("expected expression");
        };
        let Expr::BinOp { op, right, .. } = expr else {
            panic!("expected binop");
        };
        assert_eq!(op, Operator::Add);
        assert!(matches!(*right, Expr::BinOp { op: Operator::Mult, .. }));
    }

    #[test]
    fn test_parse_not_in_and_is_not() {
        let Stmt::Expr(Expr::Compare { ops, .. }) = single("a not in b is not c\n") else {
            panic!("expected compare");
        };
        assert_eq!(ops, vec![CmpOp::NotIn, CmpOp::IsNot]);
    }

    #[test]
    fn test_parse_call_arguments() {
        let Stmt::Expr(Expr::Call { args, .. }) = single("f(a, *b, key=1, **c)\n") else {
            panic!("expected call");
        };
        assert!(matches!(args[0], Arg::Positional(_)));
        assert!(matches!(args[1], Arg::Starred(_)));
        assert!(matches!(&args[2], Arg::Keyword { name, .. } if name == "key"));
        assert!(matches!(args[3], Arg::DoubleStarred(_)));
    }

    #[test]
    fn test_parse_comprehensions_and_lambda() {
        let module = parse(
            "squares = [x * x for x in range(10) if x % 2]\n\
             lookup = {k: v for k, v in pairs}\n\
             total = sum(x for x in xs)\n\
             key = lambda item, *, rev=False: item[0]\n",
        )
        .unwrap();
        assert_eq!(module.body.len(), 4);
    }

    #[test]
    fn test_parse_fstring_fields() {
        let Stmt::Expr(Expr::Strings(pieces)) = single("f'{a!r:>{width}} and {{b}}'\n") else {
            panic!("expected string");
        };
        let StringPiece::Formatted(fstring) = &pieces[0] else {
            panic!("expected f-string");
        };
        let FStringPart::Field(field) = &fstring.parts[0] else {
            panic!("expected field");
        };
        assert_eq!(field.expr.as_name(), Some("a"));
        assert_eq!(field.conversion, Some('r'));
        assert!(matches!(
            field.format_spec.as_deref(),
            Some([FStringPart::Literal(lit), FStringPart::Field(_)]) if lit == ">"
        ));
        assert_eq!(fstring.parts[1], FStringPart::Literal(" and {{b}}".into()));
    }

    #[test]
    fn test_parse_semicolon_separated() {
        let module = parse("a = 1; b = 2\n").unwrap();
        assert_eq!(module.body.len(), 2);
    }

    #[test]
    fn test_parse_try_and_with() {
        let module = parse(
            "try:\n    x = 1\nexcept (A, B) as e:\n    raise C from e\nelse:\n    pass\nfinally:\n    done()\n\
             with open(p) as f, lock:\n    f.read()\n",
        )
        .unwrap();
        assert!(matches!(&module.body[0], Stmt::Try { handlers, .. } if handlers.len() == 1));
        assert!(matches!(&module.body[1], Stmt::With { items, .. } if items.len() == 2));
    }

    #[test]
    fn test_parse_relative_import() {
        let stmt = single("from ..pkg.mod import (a as b, c,)\n");
        let Stmt::ImportFrom {
            module,
            names,
            level,
        } = stmt
        else {
            panic!("expected import");
        };
        assert_eq!(module.as_deref(), Some("pkg.mod"));
        assert_eq!(level, 2);
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].bound_name(), "b");
    }

    #[test]
    fn test_parse_unexpected_indent() {
        assert!(matches!(
            parse("x = 1\n    y = 2\n"),
            Err(ScriptError::UnexpectedToken { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_expression_entry() {
        let expr = parse_expression("np.pi / 2").unwrap();
        assert!(matches!(expr, Expr::BinOp { op: Operator::Div, .. }));
        assert!(parse_expression("a b").is_err());
        assert!(parse_expression("").is_err());
    }
}
