//! Source generation from program trees.
//!
//! Parentheses are emitted only where operator precedence requires them,
//! blocks are indented by four spaces and comments are not reproduced.

use crate::ast::{
    Arg, BoolOperator, Comprehension, DictItem, ExceptHandler, Expr, FString, FStringPart, Module,
    Operator, Param, ParamKind, Stmt, StringPiece, UnaryOperator, WithItem,
};
use crate::error::{ScriptError, ScriptResult};

const INDENT: &str = "    ";

/// Render a module. Statements are separated by single line breaks and
/// the text has no trailing newline.
pub fn unparse(module: &Module) -> ScriptResult<String> {
    let mut unparser = Unparser::default();
    for stmt in &module.body {
        unparser.stmt(stmt)?;
    }
    Ok(unparser.out)
}

/// Render a single top-level statement.
pub fn unparse_stmt(stmt: &Stmt) -> ScriptResult<String> {
    let mut unparser = Unparser::default();
    unparser.stmt(stmt)?;
    Ok(unparser.out)
}

/// Render an expression as it would appear on the right of `=`.
pub fn unparse_expr(expr: &Expr) -> ScriptResult<String> {
    let mut unparser = Unparser::default();
    unparser.expr(expr, Precedence::Tuple)?;
    Ok(unparser.out)
}

/// Binding strength, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    NamedExpr,
    Tuple,
    Yield,
    Test,
    Or,
    And,
    Not,
    Cmp,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Arith,
    Term,
    Factor,
    Power,
    Await,
    Atom,
}

impl Precedence {
    fn next(self) -> Self {
        use Precedence::*;
        match self {
            NamedExpr => Tuple,
            Tuple => Yield,
            Yield => Test,
            Test => Or,
            Or => And,
            And => Not,
            Not => Cmp,
            Cmp => BitOr,
            BitOr => BitXor,
            BitXor => BitAnd,
            BitAnd => Shift,
            Shift => Arith,
            Arith => Term,
            Term => Factor,
            Factor => Power,
            Power => Await,
            Await | Atom => Atom,
        }
    }

    fn of_operator(op: Operator) -> Self {
        match op {
            Operator::BitOr => Precedence::BitOr,
            Operator::BitXor => Precedence::BitXor,
            Operator::BitAnd => Precedence::BitAnd,
            Operator::LShift | Operator::RShift => Precedence::Shift,
            Operator::Add | Operator::Sub => Precedence::Arith,
            Operator::Mult
            | Operator::MatMult
            | Operator::Div
            | Operator::FloorDiv
            | Operator::Mod => Precedence::Term,
            Operator::Pow => Precedence::Power,
        }
    }

    fn of(expr: &Expr) -> Self {
        match expr {
            Expr::NamedExpr { .. } => Precedence::NamedExpr,
            Expr::Tuple { .. } => Precedence::Tuple,
            Expr::Yield(_) | Expr::YieldFrom(_) => Precedence::Yield,
            Expr::IfExp { .. } | Expr::Lambda { .. } => Precedence::Test,
            Expr::BoolOp {
                op: BoolOperator::Or,
                ..
            } => Precedence::Or,
            Expr::BoolOp {
                op: BoolOperator::And,
                ..
            } => Precedence::And,
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                ..
            } => Precedence::Not,
            Expr::UnaryOp { .. } => Precedence::Factor,
            Expr::Compare { .. } => Precedence::Cmp,
            Expr::BinOp { op, .. } => Precedence::of_operator(*op),
            Expr::Await(_) => Precedence::Await,
            _ => Precedence::Atom,
        }
    }
}

#[derive(Default)]
struct Unparser {
    out: String,
    depth: usize,
}

impl Unparser {
    fn line(&mut self, text: &str) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn block(&mut self, header: &str, body: &[Stmt]) -> ScriptResult<()> {
        if body.is_empty() {
            return Err(ScriptError::EmptyBlock(header.to_string()));
        }
        self.depth += 1;
        for stmt in body {
            self.stmt(stmt)?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> ScriptResult<()> {
        match stmt {
            Stmt::FunctionDef(def) => {
                self.decorators(&def.decorators)?;
                self.line(if def.is_async { "async def " } else { "def " });
                self.write(&def.name);
                self.write("(");
                self.params(&def.params, true)?;
                self.write(")");
                if let Some(returns) = &def.returns {
                    self.write(" -> ");
                    self.expr(returns, Precedence::Test)?;
                }
                self.write(":");
                self.block(&def.name, &def.body)?;
            }
            Stmt::ClassDef(def) => {
                self.decorators(&def.decorators)?;
                self.line("class ");
                self.write(&def.name);
                if !def.bases.is_empty() {
                    self.write("(");
                    self.args(&def.bases)?;
                    self.write(")");
                }
                self.write(":");
                self.block(&def.name, &def.body)?;
            }
            Stmt::Return(value) => {
                self.line("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.expr(value, Precedence::Tuple)?;
                }
            }
            Stmt::Delete(targets) => {
                self.line("del ");
                self.comma_separated(targets, Precedence::Test)?;
            }
            Stmt::Assign { targets, value } => {
                self.line("");
                for target in targets {
                    self.expr(target, Precedence::Tuple)?;
                    self.write(" = ");
                }
                self.expr(value, Precedence::Tuple)?;
            }
            Stmt::AugAssign { target, op, value } => {
                self.line("");
                self.expr(target, Precedence::Tuple)?;
                self.write(" ");
                self.write(op.symbol());
                self.write("= ");
                self.expr(value, Precedence::Tuple)?;
            }
            Stmt::AnnAssign {
                target,
                annotation,
                value,
            } => {
                self.line("");
                self.expr(target, Precedence::Atom)?;
                self.write(": ");
                self.expr(annotation, Precedence::Test)?;
                if let Some(value) = value {
                    self.write(" = ");
                    self.expr(value, Precedence::Tuple)?;
                }
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
                is_async,
            } => {
                self.line(if *is_async { "async for " } else { "for " });
                self.expr(target, Precedence::Tuple)?;
                self.write(" in ");
                self.expr(iter, Precedence::Test)?;
                self.write(":");
                self.block("for", body)?;
                self.orelse(orelse)?;
            }
            Stmt::While { test, body, orelse } => {
                self.line("while ");
                self.expr(test, Precedence::Test)?;
                self.write(":");
                self.block("while", body)?;
                self.orelse(orelse)?;
            }
            Stmt::If { test, body, orelse } => self.if_chain("if ", test, body, orelse)?,
            Stmt::With {
                items,
                body,
                is_async,
            } => {
                self.line(if *is_async { "async with " } else { "with " });
                self.with_items(items)?;
                self.write(":");
                self.block("with", body)?;
            }
            Stmt::Raise { exc, cause } => {
                self.line("raise");
                if let Some(exc) = exc {
                    self.write(" ");
                    self.expr(exc, Precedence::Test)?;
                }
                if let Some(cause) = cause {
                    self.write(" from ");
                    self.expr(cause, Precedence::Test)?;
                }
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.line("try:");
                self.block("try", body)?;
                for handler in handlers {
                    self.handler(handler)?;
                }
                self.orelse(orelse)?;
                if !finalbody.is_empty() {
                    self.line("finally:");
                    self.block("finally", finalbody)?;
                }
            }
            Stmt::Assert { test, msg } => {
                self.line("assert ");
                self.expr(test, Precedence::Test)?;
                if let Some(msg) = msg {
                    self.write(", ");
                    self.expr(msg, Precedence::Test)?;
                }
            }
            Stmt::Import(names) => {
                self.line("import ");
                self.aliases(names);
            }
            Stmt::ImportFrom {
                module,
                names,
                level,
            } => {
                self.line("from ");
                for _ in 0..*level {
                    self.write(".");
                }
                if let Some(module) = module {
                    self.write(module);
                }
                self.write(" import ");
                self.aliases(names);
            }
            Stmt::Global(names) => self.line(&format!("global {}", names.join(", "))),
            Stmt::Nonlocal(names) => self.line(&format!("nonlocal {}", names.join(", "))),
            Stmt::Expr(expr) => {
                self.line("");
                self.expr(expr, Precedence::Tuple)?;
            }
            Stmt::Pass => self.line("pass"),
            Stmt::Break => self.line("break"),
            Stmt::Continue => self.line("continue"),
        }
        Ok(())
    }

    fn decorators(&mut self, decorators: &[Expr]) -> ScriptResult<()> {
        for decorator in decorators {
            self.line("@");
            self.expr(decorator, Precedence::Test)?;
        }
        Ok(())
    }

    fn if_chain(&mut self, keyword: &str, test: &Expr, body: &[Stmt], orelse: &[Stmt]) -> ScriptResult<()> {
        self.line(keyword);
        self.expr(test, Precedence::Test)?;
        self.write(":");
        self.block(keyword.trim_end(), body)?;
        match orelse {
            [Stmt::If { test, body, orelse }] => self.if_chain("elif ", test, body, orelse),
            _ => self.orelse(orelse),
        }
    }

    fn orelse(&mut self, orelse: &[Stmt]) -> ScriptResult<()> {
        if orelse.is_empty() {
            return Ok(());
        }
        self.line("else:");
        self.block("else", orelse)
    }

    fn handler(&mut self, handler: &ExceptHandler) -> ScriptResult<()> {
        self.line("except");
        if let Some(typ) = &handler.typ {
            self.write(" ");
            self.expr(typ, Precedence::Test)?;
        }
        if let Some(name) = &handler.name {
            self.write(" as ");
            self.write(name);
        }
        self.write(":");
        self.block("except", &handler.body)
    }

    fn with_items(&mut self, items: &[WithItem]) -> ScriptResult<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(&item.context, Precedence::Test)?;
            if let Some(var) = &item.var {
                self.write(" as ");
                self.expr(var, Precedence::Test)?;
            }
        }
        Ok(())
    }

    fn aliases(&mut self, names: &[crate::ast::Alias]) {
        let rendered: Vec<String> = names
            .iter()
            .map(|alias| match &alias.asname {
                Some(asname) => format!("{} as {asname}", alias.name),
                None => alias.name.clone(),
            })
            .collect();
        self.write(&rendered.join(", "));
    }

    fn params(&mut self, params: &[Param], annotated: bool) -> ScriptResult<()> {
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match param.kind {
                ParamKind::PosOnlyMarker => {
                    self.write("/");
                    continue;
                }
                ParamKind::KwOnlyMarker => {
                    self.write("*");
                    continue;
                }
                ParamKind::VarArgs => self.write("*"),
                ParamKind::KwArgs => self.write("**"),
                ParamKind::Normal => {}
            }
            self.write(&param.name);
            let annotation = param.annotation.as_ref().filter(|_| annotated);
            if let Some(annotation) = annotation {
                self.write(": ");
                self.expr(annotation, Precedence::Test)?;
            }
            if let Some(default) = &param.default {
                self.write(if annotation.is_some() { " = " } else { "=" });
                self.expr(default, Precedence::Test)?;
            }
        }
        Ok(())
    }

    fn args(&mut self, args: &[Arg]) -> ScriptResult<()> {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match arg {
                Arg::Positional(value) => self.expr(value, Precedence::Test)?,
                Arg::Starred(value) => {
                    self.write("*");
                    self.expr(value, Precedence::BitOr)?;
                }
                Arg::Keyword { name, value } => {
                    self.write(name);
                    self.write("=");
                    self.expr(value, Precedence::Test)?;
                }
                Arg::DoubleStarred(value) => {
                    self.write("**");
                    self.expr(value, Precedence::BitOr)?;
                }
            }
        }
        Ok(())
    }

    fn comma_separated(&mut self, exprs: &[Expr], precedence: Precedence) -> ScriptResult<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(expr, precedence)?;
        }
        Ok(())
    }

    fn comprehensions(&mut self, generators: &[Comprehension]) -> ScriptResult<()> {
        for generator in generators {
            self.write(if generator.is_async {
                " async for "
            } else {
                " for "
            });
            self.expr(&generator.target, Precedence::Tuple)?;
            self.write(" in ");
            self.expr(&generator.iter, Precedence::Or)?;
            for cond in &generator.ifs {
                self.write(" if ");
                self.expr(cond, Precedence::Or)?;
            }
        }
        Ok(())
    }

    /// Write `expr`, parenthesized when it binds looser than `context`.
    fn expr(&mut self, expr: &Expr, context: Precedence) -> ScriptResult<()> {
        let parens = Precedence::of(expr) < context
            || matches!(expr, Expr::Tuple { elts, .. } if elts.is_empty());
        if parens {
            self.write("(");
        }
        self.expr_inner(expr)?;
        if parens {
            self.write(")");
        }
        Ok(())
    }

    fn expr_inner(&mut self, expr: &Expr) -> ScriptResult<()> {
        match expr {
            Expr::Name { id, .. } => self.write(id),
            Expr::Number(n) => self.write(n),
            Expr::Bool(true) => self.write("True"),
            Expr::Bool(false) => self.write("False"),
            Expr::NoneLiteral => self.write("None"),
            Expr::Ellipsis => self.write("..."),
            Expr::Strings(pieces) => {
                for (i, piece) in pieces.iter().enumerate() {
                    if i > 0 {
                        self.write(" ");
                    }
                    match piece {
                        StringPiece::Plain(raw) => self.write(raw),
                        StringPiece::Formatted(fstring) => self.fstring(fstring)?,
                    }
                }
            }
            Expr::Attribute { value, attr, .. } => {
                if matches!(**value, Expr::Number(_)) {
                    self.write("(");
                    self.expr_inner(value)?;
                    self.write(")");
                } else {
                    self.expr(value, Precedence::Atom)?;
                }
                self.write(".");
                self.write(attr);
            }
            Expr::Subscript { value, index, .. } => {
                self.expr(value, Precedence::Atom)?;
                self.write("[");
                self.expr(index, Precedence::Tuple)?;
                self.write("]");
            }
            Expr::Slice { lower, upper, step } => {
                if let Some(lower) = lower {
                    self.expr(lower, Precedence::Test)?;
                }
                self.write(":");
                if let Some(upper) = upper {
                    self.expr(upper, Precedence::Test)?;
                }
                if let Some(step) = step {
                    self.write(":");
                    self.expr(step, Precedence::Test)?;
                }
            }
            Expr::Call { func, args } => {
                self.expr(func, Precedence::Atom)?;
                self.write("(");
                self.args(args)?;
                self.write(")");
            }
            Expr::BinOp { left, op, right } => {
                let own = Precedence::of_operator(*op);
                let (left_prec, right_prec) = if *op == Operator::Pow {
                    (own.next(), own)
                } else {
                    (own, own.next())
                };
                self.expr(left, left_prec)?;
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.expr(right, right_prec)?;
            }
            Expr::UnaryOp { op, operand } => {
                self.write(op.symbol());
                let context = if *op == UnaryOperator::Not {
                    Precedence::Not
                } else {
                    Precedence::Factor
                };
                self.expr(operand, context)?;
            }
            Expr::BoolOp { op, values } => {
                let (separator, own) = match op {
                    BoolOperator::And => (" and ", Precedence::And),
                    BoolOperator::Or => (" or ", Precedence::Or),
                };
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.write(separator);
                    }
                    self.expr(value, own.next())?;
                }
            }
            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                self.expr(left, Precedence::Cmp.next())?;
                for (op, comparator) in ops.iter().zip(comparators) {
                    self.write(" ");
                    self.write(op.symbol());
                    self.write(" ");
                    self.expr(comparator, Precedence::Cmp.next())?;
                }
            }
            Expr::IfExp { test, body, orelse } => {
                self.expr(body, Precedence::Test.next())?;
                self.write(" if ");
                self.expr(test, Precedence::Test.next())?;
                self.write(" else ");
                self.expr(orelse, Precedence::Test)?;
            }
            Expr::Lambda { params, body } => {
                self.write("lambda");
                if !params.is_empty() {
                    self.write(" ");
                    self.params(params, false)?;
                }
                self.write(": ");
                self.expr(body, Precedence::Test)?;
            }
            Expr::NamedExpr { target, value } => {
                self.expr(target, Precedence::Atom)?;
                self.write(" := ");
                self.expr(value, Precedence::Test)?;
            }
            Expr::List { elts, .. } => {
                self.write("[");
                self.comma_separated(elts, Precedence::Test)?;
                self.write("]");
            }
            Expr::Tuple { elts, .. } => {
                self.comma_separated(elts, Precedence::Test)?;
                if elts.len() == 1 {
                    self.write(",");
                }
            }
            Expr::Set(elts) if elts.is_empty() => self.write("set()"),
            Expr::Set(elts) => {
                self.write("{");
                self.comma_separated(elts, Precedence::Test)?;
                self.write("}");
            }
            Expr::Dict(items) => {
                self.write("{");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    match item {
                        DictItem::Pair { key, value } => {
                            self.expr(key, Precedence::Test)?;
                            self.write(": ");
                            self.expr(value, Precedence::Test)?;
                        }
                        DictItem::Unpack(value) => {
                            self.write("**");
                            self.expr(value, Precedence::BitOr)?;
                        }
                    }
                }
                self.write("}");
            }
            Expr::ListComp { elt, generators } => {
                self.write("[");
                self.expr(elt, Precedence::Test)?;
                self.comprehensions(generators)?;
                self.write("]");
            }
            Expr::SetComp { elt, generators } => {
                self.write("{");
                self.expr(elt, Precedence::Test)?;
                self.comprehensions(generators)?;
                self.write("}");
            }
            Expr::GeneratorExp { elt, generators } => {
                self.write("(");
                self.expr(elt, Precedence::Test)?;
                self.comprehensions(generators)?;
                self.write(")");
            }
            Expr::DictComp {
                key,
                value,
                generators,
            } => {
                self.write("{");
                self.expr(key, Precedence::Test)?;
                self.write(": ");
                self.expr(value, Precedence::Test)?;
                self.comprehensions(generators)?;
                self.write("}");
            }
            Expr::Starred { value, .. } => {
                self.write("*");
                self.expr(value, Precedence::BitOr)?;
            }
            Expr::Await(value) => {
                self.write("await ");
                self.expr(value, Precedence::Atom)?;
            }
            Expr::Yield(value) => {
                self.write("yield");
                if let Some(value) = value {
                    self.write(" ");
                    self.expr(value, Precedence::Tuple)?;
                }
            }
            Expr::YieldFrom(value) => {
                self.write("yield from ");
                self.expr(value, Precedence::Test)?;
            }
        }
        Ok(())
    }

    fn fstring(&mut self, fstring: &FString) -> ScriptResult<()> {
        let mut body = String::new();
        fstring_parts(&mut body, &fstring.parts, &fstring.quote)?;
        self.write(&fstring.prefix);
        self.write(&fstring.quote);
        self.write(&body);
        self.write(&fstring.quote);
        Ok(())
    }
}

fn fstring_parts(out: &mut String, parts: &[FStringPart], quote: &str) -> ScriptResult<()> {
    for part in parts {
        match part {
            FStringPart::Literal(text) => out.push_str(text),
            FStringPart::Field(field) => {
                let mut inner = Unparser::default();
                inner.expr(&field.expr, Precedence::Or)?;
                let expr = inner.out;
                if expr.contains(quote) {
                    return Err(ScriptError::FStringQuote {
                        expr,
                        quote: quote.to_string(),
                    });
                }
                out.push('{');
                if expr.starts_with('{') {
                    out.push(' ');
                }
                out.push_str(&expr);
                if field.debug {
                    out.push('=');
                }
                if let Some(conversion) = field.conversion {
                    out.push('!');
                    out.push(conversion);
                }
                if let Some(spec) = &field.format_spec {
                    out.push(':');
                    fstring_parts(out, spec, quote)?;
                }
                out.push('}');
            }
        }
    }
    Ok(())
}
