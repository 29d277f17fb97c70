//! Tree traversal.
//!
//! [`Visitor`] walks a tree by shared reference and [`VisitorMut`] by
//! mutable reference. Both have a hook per node family; the default hook
//! recurses through the matching `walk_*` function, so an implementation
//! overrides only the nodes it cares about and calls the walker to keep
//! descending.

use crate::ast::{Arg, Comprehension, DictItem, Expr, FStringPart, Param, Stmt, StringPiece};

/// Read-only traversal.
pub trait Visitor {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_param(&mut self, param: &Param) {
        walk_param(self, param);
    }
}

/// In-place rewriting traversal.
pub trait VisitorMut {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }

    fn visit_param_mut(&mut self, param: &mut Param) {
        walk_param_mut(self, param);
    }
}

pub fn walk_body<V: Visitor + ?Sized>(visitor: &mut V, body: &[Stmt]) {
    for stmt in body {
        visitor.visit_stmt(stmt);
    }
}

fn walk_exprs<V: Visitor + ?Sized>(visitor: &mut V, exprs: &[Expr]) {
    for expr in exprs {
        visitor.visit_expr(expr);
    }
}

fn walk_args<V: Visitor + ?Sized>(visitor: &mut V, args: &[Arg]) {
    for arg in args {
        visitor.visit_expr(arg.value());
    }
}

fn walk_params<V: Visitor + ?Sized>(visitor: &mut V, params: &[Param]) {
    for param in params {
        visitor.visit_param(param);
    }
}

fn walk_generators<V: Visitor + ?Sized>(visitor: &mut V, generators: &[Comprehension]) {
    for generator in generators {
        visitor.visit_expr(&generator.iter);
        visitor.visit_expr(&generator.target);
        walk_exprs(visitor, &generator.ifs);
    }
}

fn walk_fstring_parts<V: Visitor + ?Sized>(visitor: &mut V, parts: &[FStringPart]) {
    for part in parts {
        if let FStringPart::Field(field) = part {
            visitor.visit_expr(&field.expr);
            if let Some(spec) = &field.format_spec {
                walk_fstring_parts(visitor, spec);
            }
        }
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::FunctionDef(def) => {
            walk_exprs(visitor, &def.decorators);
            walk_params(visitor, &def.params);
            if let Some(returns) = &def.returns {
                visitor.visit_expr(returns);
            }
            walk_body(visitor, &def.body);
        }
        Stmt::ClassDef(def) => {
            walk_exprs(visitor, &def.decorators);
            walk_args(visitor, &def.bases);
            walk_body(visitor, &def.body);
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::Delete(targets) => walk_exprs(visitor, targets),
        Stmt::Assign { targets, value } => {
            walk_exprs(visitor, targets);
            visitor.visit_expr(value);
        }
        Stmt::AugAssign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Stmt::AnnAssign {
            target,
            annotation,
            value,
        } => {
            visitor.visit_expr(target);
            visitor.visit_expr(annotation);
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::For {
            target,
            iter,
            body,
            orelse,
            ..
        } => {
            visitor.visit_expr(target);
            visitor.visit_expr(iter);
            walk_body(visitor, body);
            walk_body(visitor, orelse);
        }
        Stmt::While { test, body, orelse } | Stmt::If { test, body, orelse } => {
            visitor.visit_expr(test);
            walk_body(visitor, body);
            walk_body(visitor, orelse);
        }
        Stmt::With { items, body, .. } => {
            for item in items {
                visitor.visit_expr(&item.context);
                if let Some(var) = &item.var {
                    visitor.visit_expr(var);
                }
            }
            walk_body(visitor, body);
        }
        Stmt::Raise { exc, cause } => {
            for expr in [exc, cause].into_iter().flatten() {
                visitor.visit_expr(expr);
            }
        }
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            walk_body(visitor, body);
            for handler in handlers {
                if let Some(typ) = &handler.typ {
                    visitor.visit_expr(typ);
                }
                walk_body(visitor, &handler.body);
            }
            walk_body(visitor, orelse);
            walk_body(visitor, finalbody);
        }
        Stmt::Assert { test, msg } => {
            visitor.visit_expr(test);
            if let Some(msg) = msg {
                visitor.visit_expr(msg);
            }
        }
        Stmt::Expr(expr) => visitor.visit_expr(expr),
        Stmt::Import(_)
        | Stmt::ImportFrom { .. }
        | Stmt::Global(_)
        | Stmt::Nonlocal(_)
        | Stmt::Pass
        | Stmt::Break
        | Stmt::Continue => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Name { .. }
        | Expr::Number(_)
        | Expr::Bool(_)
        | Expr::NoneLiteral
        | Expr::Ellipsis => {}
        Expr::Strings(pieces) => {
            for piece in pieces {
                if let StringPiece::Formatted(fstring) = piece {
                    walk_fstring_parts(visitor, &fstring.parts);
                }
            }
        }
        Expr::Attribute { value, .. }
        | Expr::Starred { value, .. }
        | Expr::Await(value)
        | Expr::YieldFrom(value) => visitor.visit_expr(value),
        Expr::UnaryOp { operand, .. } => visitor.visit_expr(operand),
        Expr::Yield(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Expr::Subscript { value, index, .. } => {
            visitor.visit_expr(value);
            visitor.visit_expr(index);
        }
        Expr::Slice { lower, upper, step } => {
            for bound in [lower, upper, step].into_iter().flatten() {
                visitor.visit_expr(bound);
            }
        }
        Expr::Call { func, args } => {
            visitor.visit_expr(func);
            walk_args(visitor, args);
        }
        Expr::BinOp { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::BoolOp { values, .. } => walk_exprs(visitor, values),
        Expr::Compare {
            left, comparators, ..
        } => {
            visitor.visit_expr(left);
            walk_exprs(visitor, comparators);
        }
        Expr::IfExp { test, body, orelse } => {
            visitor.visit_expr(test);
            visitor.visit_expr(body);
            visitor.visit_expr(orelse);
        }
        Expr::Lambda { params, body } => {
            walk_params(visitor, params);
            visitor.visit_expr(body);
        }
        Expr::NamedExpr { target, value } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Expr::List { elts, .. } | Expr::Tuple { elts, .. } | Expr::Set(elts) => {
            walk_exprs(visitor, elts);
        }
        Expr::Dict(items) => {
            for item in items {
                match item {
                    DictItem::Pair { key, value } => {
                        visitor.visit_expr(key);
                        visitor.visit_expr(value);
                    }
                    DictItem::Unpack(value) => visitor.visit_expr(value),
                }
            }
        }
        Expr::ListComp { elt, generators }
        | Expr::SetComp { elt, generators }
        | Expr::GeneratorExp { elt, generators } => {
            walk_generators(visitor, generators);
            visitor.visit_expr(elt);
        }
        Expr::DictComp {
            key,
            value,
            generators,
        } => {
            walk_generators(visitor, generators);
            visitor.visit_expr(key);
            visitor.visit_expr(value);
        }
    }
}

pub fn walk_param<V: Visitor + ?Sized>(visitor: &mut V, param: &Param) {
    if let Some(annotation) = &param.annotation {
        visitor.visit_expr(annotation);
    }
    if let Some(default) = &param.default {
        visitor.visit_expr(default);
    }
}

pub fn walk_body_mut<V: VisitorMut + ?Sized>(visitor: &mut V, body: &mut [Stmt]) {
    for stmt in body {
        visitor.visit_stmt_mut(stmt);
    }
}

fn walk_exprs_mut<V: VisitorMut + ?Sized>(visitor: &mut V, exprs: &mut [Expr]) {
    for expr in exprs {
        visitor.visit_expr_mut(expr);
    }
}

fn walk_args_mut<V: VisitorMut + ?Sized>(visitor: &mut V, args: &mut [Arg]) {
    for arg in args {
        match arg {
            Arg::Positional(value) | Arg::Starred(value) | Arg::DoubleStarred(value) => {
                visitor.visit_expr_mut(value);
            }
            Arg::Keyword { value, .. } => visitor.visit_expr_mut(value),
        }
    }
}

fn walk_params_mut<V: VisitorMut + ?Sized>(visitor: &mut V, params: &mut [Param]) {
    for param in params {
        visitor.visit_param_mut(param);
    }
}

fn walk_generators_mut<V: VisitorMut + ?Sized>(
    visitor: &mut V,
    generators: &mut [Comprehension],
) {
    for generator in generators {
        visitor.visit_expr_mut(&mut generator.iter);
        visitor.visit_expr_mut(&mut generator.target);
        walk_exprs_mut(visitor, &mut generator.ifs);
    }
}

fn walk_fstring_parts_mut<V: VisitorMut + ?Sized>(visitor: &mut V, parts: &mut [FStringPart]) {
    for part in parts {
        if let FStringPart::Field(field) = part {
            visitor.visit_expr_mut(&mut field.expr);
            if let Some(spec) = &mut field.format_spec {
                walk_fstring_parts_mut(visitor, spec);
            }
        }
    }
}

pub fn walk_stmt_mut<V: VisitorMut + ?Sized>(visitor: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::FunctionDef(def) => {
            walk_exprs_mut(visitor, &mut def.decorators);
            walk_params_mut(visitor, &mut def.params);
            if let Some(returns) = &mut def.returns {
                visitor.visit_expr_mut(returns);
            }
            walk_body_mut(visitor, &mut def.body);
        }
        Stmt::ClassDef(def) => {
            walk_exprs_mut(visitor, &mut def.decorators);
            walk_args_mut(visitor, &mut def.bases);
            walk_body_mut(visitor, &mut def.body);
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr_mut(value);
            }
        }
        Stmt::Delete(targets) => walk_exprs_mut(visitor, targets),
        Stmt::Assign { targets, value } => {
            walk_exprs_mut(visitor, targets);
            visitor.visit_expr_mut(value);
        }
        Stmt::AugAssign { target, value, .. } => {
            visitor.visit_expr_mut(target);
            visitor.visit_expr_mut(value);
        }
        Stmt::AnnAssign {
            target,
            annotation,
            value,
        } => {
            visitor.visit_expr_mut(target);
            visitor.visit_expr_mut(annotation);
            if let Some(value) = value {
                visitor.visit_expr_mut(value);
            }
        }
        Stmt::For {
            target,
            iter,
            body,
            orelse,
            ..
        } => {
            visitor.visit_expr_mut(target);
            visitor.visit_expr_mut(iter);
            walk_body_mut(visitor, body);
            walk_body_mut(visitor, orelse);
        }
        Stmt::While { test, body, orelse } | Stmt::If { test, body, orelse } => {
            visitor.visit_expr_mut(test);
            walk_body_mut(visitor, body);
            walk_body_mut(visitor, orelse);
        }
        Stmt::With { items, body, .. } => {
            for item in items {
                visitor.visit_expr_mut(&mut item.context);
                if let Some(var) = &mut item.var {
                    visitor.visit_expr_mut(var);
                }
            }
            walk_body_mut(visitor, body);
        }
        Stmt::Raise { exc, cause } => {
            for expr in [exc, cause].into_iter().flatten() {
                visitor.visit_expr_mut(expr);
            }
        }
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            walk_body_mut(visitor, body);
            for handler in handlers {
                if let Some(typ) = &mut handler.typ {
                    visitor.visit_expr_mut(typ);
                }
                walk_body_mut(visitor, &mut handler.body);
            }
            walk_body_mut(visitor, orelse);
            walk_body_mut(visitor, finalbody);
        }
        Stmt::Assert { test, msg } => {
            visitor.visit_expr_mut(test);
            if let Some(msg) = msg {
                visitor.visit_expr_mut(msg);
            }
        }
        Stmt::Expr(expr) => visitor.visit_expr_mut(expr),
        Stmt::Import(_)
        | Stmt::ImportFrom { .. }
        | Stmt::Global(_)
        | Stmt::Nonlocal(_)
        | Stmt::Pass
        | Stmt::Break
        | Stmt::Continue => {}
    }
}

pub fn walk_expr_mut<V: VisitorMut + ?Sized>(visitor: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Name { .. }
        | Expr::Number(_)
        | Expr::Bool(_)
        | Expr::NoneLiteral
        | Expr::Ellipsis => {}
        Expr::Strings(pieces) => {
            for piece in pieces {
                if let StringPiece::Formatted(fstring) = piece {
                    walk_fstring_parts_mut(visitor, &mut fstring.parts);
                }
            }
        }
        Expr::Attribute { value, .. }
        | Expr::Starred { value, .. }
        | Expr::Await(value)
        | Expr::YieldFrom(value) => visitor.visit_expr_mut(value),
        Expr::UnaryOp { operand, .. } => visitor.visit_expr_mut(operand),
        Expr::Yield(value) => {
            if let Some(value) = value {
                visitor.visit_expr_mut(value);
            }
        }
        Expr::Subscript { value, index, .. } => {
            visitor.visit_expr_mut(value);
            visitor.visit_expr_mut(index);
        }
        Expr::Slice { lower, upper, step } => {
            for bound in [lower, upper, step].into_iter().flatten() {
                visitor.visit_expr_mut(bound);
            }
        }
        Expr::Call { func, args } => {
            visitor.visit_expr_mut(func);
            walk_args_mut(visitor, args);
        }
        Expr::BinOp { left, right, .. } => {
            visitor.visit_expr_mut(left);
            visitor.visit_expr_mut(right);
        }
        Expr::BoolOp { values, .. } => walk_exprs_mut(visitor, values),
        Expr::Compare {
            left, comparators, ..
        } => {
            visitor.visit_expr_mut(left);
            walk_exprs_mut(visitor, comparators);
        }
        Expr::IfExp { test, body, orelse } => {
            visitor.visit_expr_mut(test);
            visitor.visit_expr_mut(body);
            visitor.visit_expr_mut(orelse);
        }
        Expr::Lambda { params, body } => {
            walk_params_mut(visitor, params);
            visitor.visit_expr_mut(body);
        }
        Expr::NamedExpr { target, value } => {
            visitor.visit_expr_mut(target);
            visitor.visit_expr_mut(value);
        }
        Expr::List { elts, .. } | Expr::Tuple { elts, .. } | Expr::Set(elts) => {
            walk_exprs_mut(visitor, elts);
        }
        Expr::Dict(items) => {
            for item in items {
                match item {
                    DictItem::Pair { key, value } => {
                        visitor.visit_expr_mut(key);
                        visitor.visit_expr_mut(value);
                    }
                    DictItem::Unpack(value) => visitor.visit_expr_mut(value),
                }
            }
        }
        Expr::ListComp { elt, generators }
        | Expr::SetComp { elt, generators }
        | Expr::GeneratorExp { elt, generators } => {
            walk_generators_mut(visitor, generators);
            visitor.visit_expr_mut(elt);
        }
        Expr::DictComp {
            key,
            value,
            generators,
        } => {
            walk_generators_mut(visitor, generators);
            visitor.visit_expr_mut(key);
            visitor.visit_expr_mut(value);
        }
    }
}

pub fn walk_param_mut<V: VisitorMut + ?Sized>(visitor: &mut V, param: &mut Param) {
    if let Some(annotation) = &mut param.annotation {
        visitor.visit_expr_mut(annotation);
    }
    if let Some(default) = &mut param.default {
        visitor.visit_expr_mut(default);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprContext;
    use crate::{parse, unparse};

    #[derive(Default)]
    struct NameCollector {
        loads: Vec<String>,
        stores: Vec<String>,
        params: Vec<String>,
    }

    impl Visitor for NameCollector {
        fn visit_expr(&mut self, expr: &Expr) {
            if let Expr::Name { id, ctx } = expr {
                match ctx {
                    ExprContext::Store => self.stores.push(id.clone()),
                    _ => self.loads.push(id.clone()),
                }
            }
            walk_expr(self, expr);
        }

        fn visit_param(&mut self, param: &Param) {
            self.params.push(param.name.clone());
            walk_param(self, param);
        }
    }

    #[test]
    fn test_visitor_reaches_nested_names() {
        let module = parse(
            "def f(a, b=default):\n    total = [x * a for x in b]\n    return f'{total!r}'\n",
        )
        .unwrap();
        let mut collector = NameCollector::default();
        walk_body(&mut collector, &module.body);

        assert_eq!(collector.params, vec!["a", "b"]);
        assert_eq!(collector.stores, vec!["total", "x"]);
        assert_eq!(collector.loads, vec!["default", "b", "x", "a", "total"]);
    }

    struct Upper;

    impl VisitorMut for Upper {
        fn visit_expr_mut(&mut self, expr: &mut Expr) {
            if let Expr::Name { id, .. } = expr {
                *id = id.to_uppercase();
            }
            walk_expr_mut(self, expr);
        }
    }

    #[test]
    fn test_visitor_mut_rewrites_in_place() {
        let mut module = parse("x = y + obj.attr(z, key=w)\n").unwrap();
        walk_body_mut(&mut Upper, &mut module.body);
        assert_eq!(unparse(&module).unwrap(), "X = Y + OBJ.attr(Z, key=W)");
    }
}
