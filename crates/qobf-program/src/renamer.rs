//! Symbol renaming for payload programs.
//!
//! A payload is dropped into a template that already imports a fixed set
//! of modules and binds its own helper names. Before that happens the
//! payload loses its own imports of those modules, and every symbol it
//! defines is replaced by a fresh random identifier.
//!
//! Attribute names are rewritten whenever they match a renamed symbol,
//! whatever the receiver is: `obj.total` becomes `obj.var_x1Y2z3W4` when
//! the payload also defines `total`. Method calls on library objects
//! whose name collides with a local definition are therefore renamed too.

use qobf_script::ast::{ParamKind, Stmt};
use qobf_script::visit::{
    walk_body, walk_body_mut, walk_expr_mut, walk_param_mut, walk_stmt, walk_stmt_mut,
};
use qobf_script::{Expr, Module, Param, Visitor, VisitorMut, parse, unparse};
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::decoy::{DEFAULT_PREFIX, DEFAULT_SUFFIX_LEN, identifier};

/// Modules every template imports itself.
pub const DEFAULT_PROVIDED_IMPORTS: [&str; 10] = [
    "qiskit", "random", "time", "math", "datetime", "base64", "hashlib", "unittest", "ast",
    "string",
];

/// Original symbol to fresh name.
pub type SymbolMap = FxHashMap<String, String>;

/// Names that keep their meaning under renaming.
const RESERVED: [&str; 2] = ["self", "__init__"];

/// Replaces every locally defined symbol of a program with a fresh name.
#[derive(Debug, Clone)]
pub struct SymbolRenamer {
    provided_imports: FxHashSet<String>,
    prefix: String,
}

impl Default for SymbolRenamer {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolRenamer {
    pub fn new() -> Self {
        Self {
            provided_imports: DEFAULT_PROVIDED_IMPORTS
                .iter()
                .map(ToString::to_string)
                .collect(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Replace the set of modules whose imports are stripped.
    #[must_use]
    pub fn with_provided_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provided_imports = imports.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_provided(&self, module: &str) -> bool {
        self.provided_imports.contains(module)
    }

    /// Strip provided imports and rename local symbols.
    ///
    /// Text that does not parse comes back unchanged. A program without
    /// local symbols comes back re-serialized but otherwise untouched.
    pub fn rename<R: Rng + ?Sized>(&self, source: &str, rng: &mut R) -> String {
        self.rename_with_map(source, rng).0
    }

    /// Like [`rename`](Self::rename), also returning the map from each
    /// original symbol to its fresh name. The map is empty whenever the
    /// source comes back unrenamed.
    pub fn rename_with_map<R: Rng + ?Sized>(
        &self,
        source: &str,
        rng: &mut R,
    ) -> (String, SymbolMap) {
        let mut module = match parse(source) {
            Ok(module) => module,
            Err(e) => {
                debug!("Renaming skipped, source does not parse: {e}");
                return (source.to_string(), SymbolMap::default());
            }
        };

        self.strip_provided_imports(&mut module);

        let mut collector = SymbolCollector::default();
        walk_body(&mut collector, &module.body);
        let symbols = self.fresh_names(collector.symbols, rng);
        debug!("Renaming {} symbol(s)", symbols.len());

        if !symbols.is_empty() {
            walk_body_mut(&mut Rewriter { symbols: &symbols }, &mut module.body);
        }

        match unparse(&module) {
            Ok(text) => (text, symbols),
            Err(e) => {
                warn!("Renamed program cannot be serialized, keeping the original: {e}");
                (source.to_string(), SymbolMap::default())
            }
        }
    }

    /// Drop top-level imports of provided modules. An `import` left with
    /// no names disappears entirely.
    fn strip_provided_imports(&self, module: &mut Module) {
        module.body.retain_mut(|stmt| match stmt {
            Stmt::Import(aliases) => {
                aliases.retain(|alias| !self.is_provided(&alias.name));
                !aliases.is_empty()
            }
            Stmt::ImportFrom {
                module: Some(name), ..
            } => !self.is_provided(name),
            _ => true,
        });
    }

    fn fresh_names<R: Rng + ?Sized>(
        &self,
        symbols: Vec<String>,
        rng: &mut R,
    ) -> SymbolMap {
        symbols
            .into_iter()
            .map(|symbol| {
                let fresh = identifier(rng, &self.prefix, DEFAULT_SUFFIX_LEN);
                (symbol, fresh)
            })
            .collect()
    }
}

/// Collects definition names, positional parameter names and plain
/// assignment targets, in first-seen order.
#[derive(Default)]
struct SymbolCollector {
    symbols: Vec<String>,
    seen: FxHashSet<String>,
}

impl SymbolCollector {
    fn add(&mut self, name: &str) {
        if !RESERVED.contains(&name) && self.seen.insert(name.to_string()) {
            self.symbols.push(name.to_string());
        }
    }
}

/// Parameters that can be passed positionally without being
/// positional-only: after any `/` and before any `*`.
fn positional_params(params: &[Param]) -> impl Iterator<Item = &Param> {
    let start = params
        .iter()
        .position(|p| p.kind == ParamKind::PosOnlyMarker)
        .map_or(0, |i| i + 1);
    params[start..]
        .iter()
        .take_while(|p| p.kind == ParamKind::Normal)
}

impl Visitor for SymbolCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(def) => {
                self.add(&def.name);
                for param in positional_params(&def.params) {
                    self.add(&param.name);
                }
            }
            Stmt::ClassDef(def) => self.add(&def.name),
            Stmt::Assign { targets, .. } => {
                for target in targets {
                    if let Some(name) = target.as_name() {
                        self.add(name);
                    }
                }
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }
}

struct Rewriter<'a> {
    symbols: &'a SymbolMap,
}

impl Rewriter<'_> {
    fn rename(&self, name: &mut String) {
        if let Some(fresh) = self.symbols.get(name.as_str()) {
            *name = fresh.clone();
        }
    }
}

impl VisitorMut for Rewriter<'_> {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::FunctionDef(def) => self.rename(&mut def.name),
            Stmt::ClassDef(def) => self.rename(&mut def.name),
            Stmt::Global(names) | Stmt::Nonlocal(names) => {
                names.iter_mut().for_each(|name| self.rename(name));
            }
            _ => {}
        }
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Name { id, .. } => self.rename(id),
            Expr::Attribute { attr, .. } => self.rename(attr),
            _ => {}
        }
        walk_expr_mut(self, expr);
    }

    fn visit_param_mut(&mut self, param: &mut Param) {
        if param.binds_name() {
            self.rename(&mut param.name);
        }
        walk_param_mut(self, param);
    }
}
