//! Statement parsing.

use super::{Parser, into_target};
use crate::ast::{
    Alias, ClassDef, ExceptHandler, Expr, ExprContext, FunctionDef, Operator, Stmt, WithItem,
};
use crate::error::{ScriptError, ScriptResult};
use crate::lexer::Token;

impl Parser {
    /// Parse one compound statement or one line of simple statements.
    pub(super) fn parse_statement(&mut self) -> ScriptResult<Vec<Stmt>> {
        match self.peek() {
            Some(
                Token::Def
                | Token::Class
                | Token::At
                | Token::If
                | Token::While
                | Token::For
                | Token::Try
                | Token::With
                | Token::Async,
            ) => Ok(vec![self.parse_compound()?]),
            _ => self.parse_simple_line(),
        }
    }

    /// `:` followed by an indented block or by simple statements on the same line.
    fn parse_block(&mut self) -> ScriptResult<Vec<Stmt>> {
        self.expect(Token::Colon)?;
        if !self.consume(&Token::Newline) {
            return self.parse_simple_line();
        }
        self.expect(Token::Indent)?;
        let mut body = Vec::new();
        while !self.consume(&Token::Dedent) {
            if self.is_eof() {
                return Err(ScriptError::UnexpectedEof("end of block".into()));
            }
            body.extend(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_compound(&mut self) -> ScriptResult<Stmt> {
        let mut decorators = Vec::new();
        while self.consume(&Token::At) {
            decorators.push(self.parse_named_expression()?);
            self.expect(Token::Newline)?;
        }

        match self.peek() {
            Some(Token::Def) => self.parse_function_def(decorators, false),
            Some(Token::Class) => self.parse_class_def(decorators),
            Some(Token::Async) if self.peek_nth(1) == Some(&Token::Def) => {
                self.advance();
                self.parse_function_def(decorators, true)
            }
            _ if !decorators.is_empty() => Err(self.unexpected("'def' or 'class'")),
            Some(Token::Async) => self.parse_async(),
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::For) => self.parse_for(false),
            Some(Token::Try) => self.parse_try(),
            Some(Token::With) => self.parse_with(false),
            _ => Err(self.unexpected("compound statement")),
        }
    }

    fn parse_async(&mut self) -> ScriptResult<Stmt> {
        self.expect(Token::Async)?;
        match self.peek() {
            Some(Token::For) => self.parse_for(true),
            Some(Token::With) => self.parse_with(true),
            _ => Err(self.unexpected("'def', 'for' or 'with' after 'async'")),
        }
    }

    fn parse_function_def(&mut self, decorators: Vec<Expr>, is_async: bool) -> ScriptResult<Stmt> {
        self.expect(Token::Def)?;
        let name = self.expect_name()?;
        self.expect(Token::LParen)?;
        let params = self.parse_params(&Token::RParen, true)?;
        self.expect(Token::RParen)?;
        let returns = if self.consume(&Token::Arrow) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Stmt::FunctionDef(FunctionDef {
            name,
            params,
            body,
            decorators,
            returns,
            is_async,
        }))
    }

    fn parse_class_def(&mut self, decorators: Vec<Expr>) -> ScriptResult<Stmt> {
        self.expect(Token::Class)?;
        let name = self.expect_name()?;
        let bases = if self.consume(&Token::LParen) {
            self.parse_call_args()?
        } else {
            Vec::new()
        };
        let body = self.parse_block()?;
        Ok(Stmt::ClassDef(ClassDef {
            name,
            bases,
            body,
            decorators,
        }))
    }

    /// `if` or `elif` with its trailing branches.
    fn parse_if(&mut self) -> ScriptResult<Stmt> {
        self.advance();
        let test = self.parse_named_expression()?;
        let body = self.parse_block()?;
        let orelse = if self.check(&Token::Elif) {
            vec![self.parse_if()?]
        } else {
            self.parse_else()?
        };
        Ok(Stmt::If { test, body, orelse })
    }

    fn parse_else(&mut self) -> ScriptResult<Vec<Stmt>> {
        if self.consume(&Token::Else) {
            self.parse_block()
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_while(&mut self) -> ScriptResult<Stmt> {
        self.expect(Token::While)?;
        let test = self.parse_named_expression()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else()?;
        Ok(Stmt::While { test, body, orelse })
    }

    fn parse_for(&mut self, is_async: bool) -> ScriptResult<Stmt> {
        self.expect(Token::For)?;
        let line = self.line();
        let target = into_target(self.parse_target_list()?, ExprContext::Store, line)?;
        self.expect(Token::In)?;
        let iter = self.parse_star_expressions()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else()?;
        Ok(Stmt::For {
            target,
            iter,
            body,
            orelse,
            is_async,
        })
    }

    fn parse_try(&mut self) -> ScriptResult<Stmt> {
        self.expect(Token::Try)?;
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        while self.consume(&Token::Except) {
            let typ = if self.check(&Token::Colon) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            let name = if self.consume(&Token::As) {
                Some(self.expect_name()?)
            } else {
                None
            };
            let body = self.parse_block()?;
            handlers.push(ExceptHandler { typ, name, body });
        }

        let orelse = self.parse_else()?;
        let finalbody = if self.consume(&Token::Finally) {
            self.parse_block()?
        } else {
            Vec::new()
        };

        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.unexpected("'except' or 'finally'"));
        }
        Ok(Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        })
    }

    fn parse_with(&mut self, is_async: bool) -> ScriptResult<Stmt> {
        self.expect(Token::With)?;
        let mut items = Vec::new();
        loop {
            let context = self.parse_expression()?;
            let var = if self.consume(&Token::As) {
                let line = self.line();
                Some(into_target(self.parse_star_target()?, ExprContext::Store, line)?)
            } else {
                None
            };
            items.push(WithItem { context, var });
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        let body = self.parse_block()?;
        Ok(Stmt::With {
            items,
            body,
            is_async,
        })
    }

    /// Simple statements separated by `;`, terminated by a newline.
    fn parse_simple_line(&mut self) -> ScriptResult<Vec<Stmt>> {
        let mut stmts = vec![self.parse_simple()?];
        while self.consume(&Token::Semicolon) {
            if self.check(&Token::Newline) || self.is_eof() {
                break;
            }
            stmts.push(self.parse_simple()?);
        }
        if !self.is_eof() {
            self.expect(Token::Newline)?;
        }
        Ok(stmts)
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Newline | Token::Semicolon))
    }

    fn parse_simple(&mut self) -> ScriptResult<Stmt> {
        let line = self.line();
        match self.peek() {
            Some(Token::Pass) => {
                self.advance();
                Ok(Stmt::Pass)
            }
            Some(Token::Break) => {
                self.advance();
                Ok(Stmt::Break)
            }
            Some(Token::Continue) => {
                self.advance();
                Ok(Stmt::Continue)
            }
            Some(Token::Return) => {
                self.advance();
                if self.at_statement_end() {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.parse_star_expressions()?)))
                }
            }
            Some(Token::Raise) => {
                self.advance();
                if self.at_statement_end() {
                    return Ok(Stmt::Raise {
                        exc: None,
                        cause: None,
                    });
                }
                let exc = Some(self.parse_expression()?);
                let cause = if self.consume(&Token::From) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(Stmt::Raise { exc, cause })
            }
            Some(Token::Global) => {
                self.advance();
                Ok(Stmt::Global(self.parse_name_list()?))
            }
            Some(Token::Nonlocal) => {
                self.advance();
                Ok(Stmt::Nonlocal(self.parse_name_list()?))
            }
            Some(Token::Del) => {
                self.advance();
                let mut targets = vec![into_target(self.parse_bitwise_or()?, ExprContext::Del, line)?];
                while self.consume(&Token::Comma) {
                    if self.at_statement_end() {
                        break;
                    }
                    targets.push(into_target(self.parse_bitwise_or()?, ExprContext::Del, line)?);
                }
                Ok(Stmt::Delete(targets))
            }
            Some(Token::Assert) => {
                self.advance();
                let test = self.parse_expression()?;
                let msg = if self.consume(&Token::Comma) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(Stmt::Assert { test, msg })
            }
            Some(Token::Import) => self.parse_import(),
            Some(Token::From) => self.parse_import_from(),
            _ => self.parse_expression_statement(line),
        }
    }

    fn parse_name_list(&mut self) -> ScriptResult<Vec<String>> {
        let mut names = vec![self.expect_name()?];
        while self.consume(&Token::Comma) {
            names.push(self.expect_name()?);
        }
        Ok(names)
    }

    fn parse_dotted_name(&mut self) -> ScriptResult<String> {
        let mut name = self.expect_name()?;
        while self.consume(&Token::Dot) {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    fn parse_alias(&mut self, dotted: bool) -> ScriptResult<Alias> {
        let name = if dotted {
            self.parse_dotted_name()?
        } else {
            self.expect_name()?
        };
        let asname = if self.consume(&Token::As) {
            Some(self.expect_name()?)
        } else {
            None
        };
        Ok(Alias { name, asname })
    }

    fn parse_import(&mut self) -> ScriptResult<Stmt> {
        self.expect(Token::Import)?;
        let mut names = vec![self.parse_alias(true)?];
        while self.consume(&Token::Comma) {
            names.push(self.parse_alias(true)?);
        }
        Ok(Stmt::Import(names))
    }

    fn parse_import_from(&mut self) -> ScriptResult<Stmt> {
        self.expect(Token::From)?;
        let mut level = 0;
        loop {
            if self.consume(&Token::Dot) {
                level += 1;
            } else if self.consume(&Token::Ellipsis) {
                level += 3;
            } else {
                break;
            }
        }
        let module = if self.check(&Token::Import) {
            None
        } else {
            Some(self.parse_dotted_name()?)
        };
        if module.is_none() && level == 0 {
            return Err(self.unexpected("module name"));
        }
        self.expect(Token::Import)?;

        let names = if self.consume(&Token::Star) {
            vec![Alias {
                name: "*".into(),
                asname: None,
            }]
        } else {
            let parenthesized = self.consume(&Token::LParen);
            let mut names = vec![self.parse_alias(false)?];
            while self.consume(&Token::Comma) {
                if parenthesized && self.check(&Token::RParen) {
                    break;
                }
                names.push(self.parse_alias(false)?);
            }
            if parenthesized {
                self.expect(Token::RParen)?;
            }
            names
        };
        Ok(Stmt::ImportFrom {
            module,
            names,
            level,
        })
    }

    /// Expression statement, plain, augmented or annotated assignment.
    fn parse_expression_statement(&mut self, line: usize) -> ScriptResult<Stmt> {
        let first = self.parse_star_expressions_or_yield()?;

        if self.consume(&Token::Colon) {
            let target = into_target(first, ExprContext::Store, line)?;
            let annotation = self.parse_expression()?;
            let value = if self.consume(&Token::Eq) {
                Some(self.parse_star_expressions_or_yield()?)
            } else {
                None
            };
            return Ok(Stmt::AnnAssign {
                target,
                annotation,
                value,
            });
        }

        if let Some(op) = self.peek().and_then(augmented_operator) {
            self.advance();
            if !matches!(
                first,
                Expr::Name { .. } | Expr::Attribute { .. } | Expr::Subscript { .. }
            ) {
                return Err(ScriptError::InvalidTarget {
                    line,
                    what: "augmented assignment target".into(),
                });
            }
            let target = into_target(first, ExprContext::Store, line)?;
            let value = self.parse_star_expressions_or_yield()?;
            return Ok(Stmt::AugAssign { target, op, value });
        }

        if !self.check(&Token::Eq) {
            return Ok(Stmt::Expr(first));
        }

        let mut chain = vec![first];
        while self.consume(&Token::Eq) {
            chain.push(self.parse_star_expressions_or_yield()?);
        }
        let value = chain
            .pop()
            .ok_or_else(|| ScriptError::UnexpectedEof("assigned value".into()))?;
        let targets = chain
            .into_iter()
            .map(|t| into_target(t, ExprContext::Store, line))
            .collect::<ScriptResult<_>>()?;
        Ok(Stmt::Assign { targets, value })
    }
}

fn augmented_operator(token: &Token) -> Option<Operator> {
    Some(match token {
        Token::PlusEq => Operator::Add,
        Token::MinusEq => Operator::Sub,
        Token::StarEq => Operator::Mult,
        Token::AtEq => Operator::MatMult,
        Token::SlashEq => Operator::Div,
        Token::DoubleSlashEq => Operator::FloorDiv,
        Token::PercentEq => Operator::Mod,
        Token::DoubleStarEq => Operator::Pow,
        Token::LShiftEq => Operator::LShift,
        Token::RShiftEq => Operator::RShift,
        Token::PipeEq => Operator::BitOr,
        Token::CaretEq => Operator::BitXor,
        Token::AmpEq => Operator::BitAnd,
        _ => return None,
    })
}
