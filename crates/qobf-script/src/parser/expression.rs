//! Expression parsing, one method per precedence level.

use super::Parser;
use super::fstring::parse_string_piece;
use crate::ast::{
    Arg, BoolOperator, CmpOp, Comprehension, DictItem, Expr, ExprContext, Operator, Param,
    ParamKind, UnaryOperator,
};
use crate::error::ScriptResult;
use crate::lexer::Token;

/// Number of binary operator levels between comparisons and unary operators.
const BINARY_LEVELS: usize = 6;

/// Operator for `token` at a binary level, loosest (`|`) first.
fn binary_operator(level: usize, token: &Token) -> Option<Operator> {
    Some(match (level, token) {
        (0, Token::Pipe) => Operator::BitOr,
        (1, Token::Caret) => Operator::BitXor,
        (2, Token::Amp) => Operator::BitAnd,
        (3, Token::LShift) => Operator::LShift,
        (3, Token::RShift) => Operator::RShift,
        (4, Token::Plus) => Operator::Add,
        (4, Token::Minus) => Operator::Sub,
        (5, Token::Star) => Operator::Mult,
        (5, Token::Slash) => Operator::Div,
        (5, Token::DoubleSlash) => Operator::FloorDiv,
        (5, Token::Percent) => Operator::Mod,
        (5, Token::At) => Operator::MatMult,
        _ => return None,
    })
}

impl Parser {
    /// Comma-separated expressions; more than one, or a trailing comma,
    /// makes a tuple.
    pub(super) fn parse_star_expressions(&mut self) -> ScriptResult<Expr> {
        let first = self.parse_star_expression()?;
        if !self.check(&Token::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.consume(&Token::Comma) {
            if !self.starts_expression() {
                break;
            }
            elts.push(self.parse_star_expression()?);
        }
        Ok(Expr::Tuple {
            elts,
            ctx: ExprContext::Load,
        })
    }

    pub(super) fn parse_star_expressions_or_yield(&mut self) -> ScriptResult<Expr> {
        if self.check(&Token::Yield) {
            self.parse_yield()
        } else {
            self.parse_star_expressions()
        }
    }

    fn parse_star_expression(&mut self) -> ScriptResult<Expr> {
        if self.consume(&Token::Star) {
            Ok(Expr::Starred {
                value: Box::new(self.parse_bitwise_or()?),
                ctx: ExprContext::Load,
            })
        } else {
            self.parse_expression()
        }
    }

    fn parse_star_named_expression(&mut self) -> ScriptResult<Expr> {
        if self.consume(&Token::Star) {
            Ok(Expr::Starred {
                value: Box::new(self.parse_bitwise_or()?),
                ctx: ExprContext::Load,
            })
        } else {
            self.parse_named_expression()
        }
    }

    /// Assignment target list of `for` loops and comprehensions; stops
    /// before `in` instead of parsing it as a comparison.
    pub(super) fn parse_target_list(&mut self) -> ScriptResult<Expr> {
        let first = self.parse_star_target()?;
        if !self.check(&Token::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.consume(&Token::Comma) {
            if self.check(&Token::In) || self.check(&Token::Eq) {
                break;
            }
            elts.push(self.parse_star_target()?);
        }
        Ok(Expr::Tuple {
            elts,
            ctx: ExprContext::Load,
        })
    }

    pub(super) fn parse_star_target(&mut self) -> ScriptResult<Expr> {
        if self.consume(&Token::Star) {
            Ok(Expr::Starred {
                value: Box::new(self.parse_bitwise_or()?),
                ctx: ExprContext::Load,
            })
        } else {
            self.parse_bitwise_or()
        }
    }

    /// `name := value` or a plain expression.
    pub(super) fn parse_named_expression(&mut self) -> ScriptResult<Expr> {
        if matches!(self.peek(), Some(Token::Name(_))) && self.peek_nth(1) == Some(&Token::Walrus) {
            let id = self.expect_name()?;
            self.advance();
            let value = self.parse_expression()?;
            return Ok(Expr::NamedExpr {
                target: Box::new(Expr::Name {
                    id,
                    ctx: ExprContext::Store,
                }),
                value: Box::new(value),
            });
        }
        self.parse_expression()
    }

    /// Conditional expression or lambda.
    pub(super) fn parse_expression(&mut self) -> ScriptResult<Expr> {
        if self.check(&Token::Lambda) {
            return self.parse_lambda();
        }
        let body = self.parse_disjunction()?;
        if !self.consume(&Token::If) {
            return Ok(body);
        }
        let test = self.parse_disjunction()?;
        self.expect(Token::Else)?;
        let orelse = self.parse_expression()?;
        Ok(Expr::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    fn parse_lambda(&mut self) -> ScriptResult<Expr> {
        self.expect(Token::Lambda)?;
        let params = self.parse_params(&Token::Colon, false)?;
        self.expect(Token::Colon)?;
        let body = self.parse_expression()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    /// Parameter list up to (not including) `close`.
    pub(super) fn parse_params(&mut self, close: &Token, annotated: bool) -> ScriptResult<Vec<Param>> {
        let mut params = Vec::new();
        while !self.check(close) {
            let param = if self.consume(&Token::Slash) {
                Param {
                    name: String::new(),
                    annotation: None,
                    default: None,
                    kind: ParamKind::PosOnlyMarker,
                }
            } else if self.consume(&Token::DoubleStar) {
                let name = self.expect_name()?;
                Param {
                    name,
                    annotation: self.parse_annotation(annotated)?,
                    default: None,
                    kind: ParamKind::KwArgs,
                }
            } else if self.consume(&Token::Star) {
                if self.check(&Token::Comma) || self.check(close) {
                    Param {
                        name: String::new(),
                        annotation: None,
                        default: None,
                        kind: ParamKind::KwOnlyMarker,
                    }
                } else {
                    let name = self.expect_name()?;
                    Param {
                        name,
                        annotation: self.parse_annotation(annotated)?,
                        default: None,
                        kind: ParamKind::VarArgs,
                    }
                }
            } else {
                let name = self.expect_name()?;
                let annotation = self.parse_annotation(annotated)?;
                let default = if self.consume(&Token::Eq) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Param {
                    name,
                    annotation,
                    default,
                    kind: ParamKind::Normal,
                }
            };
            params.push(param);
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_annotation(&mut self, annotated: bool) -> ScriptResult<Option<Expr>> {
        if annotated && self.consume(&Token::Colon) {
            Ok(Some(self.parse_expression()?))
        } else {
            Ok(None)
        }
    }

    fn parse_disjunction(&mut self) -> ScriptResult<Expr> {
        let first = self.parse_conjunction()?;
        if !self.check(&Token::Or) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.consume(&Token::Or) {
            values.push(self.parse_conjunction()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOperator::Or,
            values,
        })
    }

    fn parse_conjunction(&mut self) -> ScriptResult<Expr> {
        let first = self.parse_inversion()?;
        if !self.check(&Token::And) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.consume(&Token::And) {
            values.push(self.parse_inversion()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOperator::And,
            values,
        })
    }

    fn parse_inversion(&mut self) -> ScriptResult<Expr> {
        if self.consume(&Token::Not) {
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(self.parse_inversion()?),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ScriptResult<Expr> {
        let left = self.parse_bitwise_or()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.consume_comparison_operator() {
            ops.push(op);
            comparators.push(self.parse_bitwise_or()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            ops,
            comparators,
        })
    }

    fn consume_comparison_operator(&mut self) -> Option<CmpOp> {
        let op = match self.peek()? {
            Token::EqEq => CmpOp::Eq,
            Token::NotEq => CmpOp::NotEq,
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::LtE,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::GtE,
            Token::In => CmpOp::In,
            Token::Not if self.peek_nth(1) == Some(&Token::In) => {
                self.pos += 2;
                return Some(CmpOp::NotIn);
            }
            Token::Is => {
                self.pos += 1;
                return Some(if self.consume(&Token::Not) {
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                });
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    pub(super) fn parse_bitwise_or(&mut self) -> ScriptResult<Expr> {
        self.parse_binary_level(0)
    }

    fn parse_binary_level(&mut self, level: usize) -> ScriptResult<Expr> {
        if level == BINARY_LEVELS {
            return self.parse_factor();
        }
        let mut left = self.parse_binary_level(level + 1)?;
        while let Some(op) = self.peek().and_then(|t| binary_operator(level, t)) {
            self.advance();
            let right = self.parse_binary_level(level + 1)?;
            left = Expr::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> ScriptResult<Expr> {
        let op = match self.peek() {
            Some(Token::Plus) => UnaryOperator::UAdd,
            Some(Token::Minus) => UnaryOperator::USub,
            Some(Token::Tilde) => UnaryOperator::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        Ok(Expr::UnaryOp {
            op,
            operand: Box::new(self.parse_factor()?),
        })
    }

    /// `**` is right-associative and binds tighter than a unary operator on
    /// its left but looser than one on its right.
    fn parse_power(&mut self) -> ScriptResult<Expr> {
        let base = if self.consume(&Token::Await) {
            Expr::Await(Box::new(self.parse_primary()?))
        } else {
            self.parse_primary()?
        };
        if !self.consume(&Token::DoubleStar) {
            return Ok(base);
        }
        Ok(Expr::BinOp {
            left: Box::new(base),
            op: Operator::Pow,
            right: Box::new(self.parse_factor()?),
        })
    }

    fn parse_primary(&mut self) -> ScriptResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.consume(&Token::Dot) {
                let attr = self.expect_name()?;
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr,
                    ctx: ExprContext::Load,
                };
            } else if self.consume(&Token::LParen) {
                let args = self.parse_call_args()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                };
            } else if self.consume(&Token::LBracket) {
                let index = self.parse_slices()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Subscript {
                    value: Box::new(expr),
                    index: Box::new(index),
                    ctx: ExprContext::Load,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Arguments after an opening `(`, up to and including `)`.
    pub(super) fn parse_call_args(&mut self) -> ScriptResult<Vec<Arg>> {
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            let arg = if self.consume(&Token::Star) {
                Arg::Starred(self.parse_expression()?)
            } else if self.consume(&Token::DoubleStar) {
                Arg::DoubleStarred(self.parse_expression()?)
            } else if matches!(self.peek(), Some(Token::Name(_)))
                && self.peek_nth(1) == Some(&Token::Eq)
            {
                let name = self.expect_name()?;
                self.advance();
                Arg::Keyword {
                    name,
                    value: self.parse_expression()?,
                }
            } else {
                let value = self.parse_named_expression()?;
                if self.check(&Token::For) || self.starts_async_for() {
                    Arg::Positional(Expr::GeneratorExp {
                        elt: Box::new(value),
                        generators: self.parse_comprehension_clauses()?,
                    })
                } else {
                    Arg::Positional(value)
                }
            };
            args.push(arg);
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn parse_slices(&mut self) -> ScriptResult<Expr> {
        let first = self.parse_slice()?;
        if !self.check(&Token::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.consume(&Token::Comma) {
            if self.check(&Token::RBracket) {
                break;
            }
            elts.push(self.parse_slice()?);
        }
        Ok(Expr::Tuple {
            elts,
            ctx: ExprContext::Load,
        })
    }

    fn parse_slice(&mut self) -> ScriptResult<Expr> {
        let lower = if self.check(&Token::Colon) {
            None
        } else {
            let expr = self.parse_star_named_expression()?;
            if !self.check(&Token::Colon) {
                return Ok(expr);
            }
            Some(Box::new(expr))
        };
        self.expect(Token::Colon)?;
        let bound_ends = |p: &Self| {
            p.check(&Token::Colon) || p.check(&Token::RBracket) || p.check(&Token::Comma)
        };
        let upper = if bound_ends(self) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        let step = if self.consume(&Token::Colon) && !bound_ends(self) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Expr::Slice { lower, upper, step })
    }

    fn parse_atom(&mut self) -> ScriptResult<Expr> {
        let line = self.line();
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };
        let expr = match token {
            Token::Name(id) => Expr::Name {
                id,
                ctx: ExprContext::Load,
            },
            Token::Number(n) => Expr::Number(n),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::None => Expr::NoneLiteral,
            Token::Ellipsis => Expr::Ellipsis,
            Token::String(_) => {
                let mut pieces = Vec::new();
                while let Some(Token::String(raw)) = self.peek() {
                    pieces.push(parse_string_piece(raw, line)?);
                    self.pos += 1;
                }
                return Ok(Expr::Strings(pieces));
            }
            Token::LParen => {
                self.advance();
                return self.parse_paren();
            }
            Token::LBracket => {
                self.advance();
                return self.parse_list();
            }
            Token::LBrace => {
                self.advance();
                return self.parse_brace();
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }

    /// Group, tuple, generator expression or parenthesized yield.
    fn parse_paren(&mut self) -> ScriptResult<Expr> {
        if self.consume(&Token::RParen) {
            return Ok(Expr::Tuple {
                elts: Vec::new(),
                ctx: ExprContext::Load,
            });
        }
        if self.check(&Token::Yield) {
            let expr = self.parse_yield()?;
            self.expect(Token::RParen)?;
            return Ok(expr);
        }

        let first = self.parse_star_named_expression()?;
        if self.check(&Token::For) || self.starts_async_for() {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(Token::RParen)?;
            return Ok(Expr::GeneratorExp {
                elt: Box::new(first),
                generators,
            });
        }
        if !self.check(&Token::Comma) {
            self.expect(Token::RParen)?;
            return Ok(first);
        }
        let elts = self.parse_sequence_rest(first, &Token::RParen)?;
        Ok(Expr::Tuple {
            elts,
            ctx: ExprContext::Load,
        })
    }

    fn parse_list(&mut self) -> ScriptResult<Expr> {
        if self.consume(&Token::RBracket) {
            return Ok(Expr::List {
                elts: Vec::new(),
                ctx: ExprContext::Load,
            });
        }
        let first = self.parse_star_named_expression()?;
        if self.check(&Token::For) || self.starts_async_for() {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(Token::RBracket)?;
            return Ok(Expr::ListComp {
                elt: Box::new(first),
                generators,
            });
        }
        let elts = self.parse_sequence_rest(first, &Token::RBracket)?;
        Ok(Expr::List {
            elts,
            ctx: ExprContext::Load,
        })
    }

    fn parse_brace(&mut self) -> ScriptResult<Expr> {
        if self.consume(&Token::RBrace) {
            return Ok(Expr::Dict(Vec::new()));
        }

        let first = if self.consume(&Token::DoubleStar) {
            DictItem::Unpack(self.parse_bitwise_or()?)
        } else {
            let key = self.parse_star_named_expression()?;
            if !self.consume(&Token::Colon) {
                if self.check(&Token::For) || self.starts_async_for() {
                    let generators = self.parse_comprehension_clauses()?;
                    self.expect(Token::RBrace)?;
                    return Ok(Expr::SetComp {
                        elt: Box::new(key),
                        generators,
                    });
                }
                let elts = self.parse_sequence_rest(key, &Token::RBrace)?;
                return Ok(Expr::Set(elts));
            }
            let value = self.parse_expression()?;
            if self.check(&Token::For) || self.starts_async_for() {
                let generators = self.parse_comprehension_clauses()?;
                self.expect(Token::RBrace)?;
                return Ok(Expr::DictComp {
                    key: Box::new(key),
                    value: Box::new(value),
                    generators,
                });
            }
            DictItem::Pair { key, value }
        };

        let mut items = vec![first];
        while self.consume(&Token::Comma) {
            if self.check(&Token::RBrace) {
                break;
            }
            if self.consume(&Token::DoubleStar) {
                items.push(DictItem::Unpack(self.parse_bitwise_or()?));
            } else {
                let key = self.parse_expression()?;
                self.expect(Token::Colon)?;
                let value = self.parse_expression()?;
                items.push(DictItem::Pair { key, value });
            }
        }
        self.expect(Token::RBrace)?;
        Ok(Expr::Dict(items))
    }

    /// Remaining comma-separated elements after `first`, through `close`.
    fn parse_sequence_rest(&mut self, first: Expr, close: &Token) -> ScriptResult<Vec<Expr>> {
        let mut elts = vec![first];
        while self.consume(&Token::Comma) {
            if self.check(close) {
                break;
            }
            elts.push(self.parse_star_named_expression()?);
        }
        self.expect(close.clone())?;
        Ok(elts)
    }

    fn starts_async_for(&self) -> bool {
        self.check(&Token::Async) && self.peek_nth(1) == Some(&Token::For)
    }

    fn parse_comprehension_clauses(&mut self) -> ScriptResult<Vec<Comprehension>> {
        let mut generators = Vec::new();
        loop {
            let is_async = self.starts_async_for();
            if is_async {
                self.advance();
            }
            if !self.consume(&Token::For) {
                break;
            }
            let line = self.line();
            let target = super::into_target(self.parse_target_list()?, ExprContext::Store, line)?;
            self.expect(Token::In)?;
            let iter = self.parse_disjunction()?;
            let mut ifs = Vec::new();
            while self.consume(&Token::If) {
                ifs.push(self.parse_disjunction()?);
            }
            generators.push(Comprehension {
                target,
                iter,
                ifs,
                is_async,
            });
        }
        Ok(generators)
    }

    fn parse_yield(&mut self) -> ScriptResult<Expr> {
        self.expect(Token::Yield)?;
        if self.consume(&Token::From) {
            return Ok(Expr::YieldFrom(Box::new(self.parse_expression()?)));
        }
        if self.starts_expression() {
            Ok(Expr::Yield(Some(Box::new(self.parse_star_expressions()?))))
        } else {
            Ok(Expr::Yield(None))
        }
    }
}
