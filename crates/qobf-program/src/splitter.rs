//! Dependency-aware splitting of a program into two fragments.
//!
//! Top-level statements fall into four groups:
//!
//! | Group | Goes to |
//! |-------|---------|
//! | `import` / `from ... import` | both fragments |
//! | functions named in the protect list | both fragments |
//! | the first `if __name__ ...` block | second fragment only |
//! | everything else ("free") | one fragment, by cluster |
//!
//! Free statements are clustered so that a statement binding a name and a
//! statement reading it always end up together, directly or through a
//! chain. Clusters are shuffled and the list is cut in half.
//!
//! Names bound by the duplicated groups are not tracked: both fragments
//! can read a name that an imported or protected declaration binds, even
//! when one fragment also rebinds it.

use petgraph::unionfind::UnionFind;
use qobf_script::ast::Stmt;
use qobf_script::visit::{walk_expr, walk_param, walk_stmt};
use qobf_script::{Expr, ExprContext, Module, Param, Visitor, parse, unparse, unparse_stmt};
use rand::Rng;
use rand::seq::SliceRandom;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::renamer::SymbolMap;

/// Placeholder body for a fragment with nothing in it.
pub const EMPTY_FRAGMENT: &str = "pass";

/// Name compared against in the entry-point conditional.
const ENTRY_POINT_NAME: &str = "__name__";

/// Splits a program into two independently runnable fragments.
#[derive(Debug, Clone, Default)]
pub struct DependencySplitter {
    protected: Vec<String>,
}

/// Top-level statements sorted by where they may go.
#[derive(Debug, Default)]
struct Categorized<'a> {
    imports: Vec<&'a Stmt>,
    protected: Vec<&'a Stmt>,
    free: Vec<&'a Stmt>,
    entry_point: Option<&'a Stmt>,
}

impl DependencySplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Functions with these names are copied into both fragments.
    #[must_use]
    pub fn with_protected<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn protected(&self) -> &[String] {
        &self.protected
    }

    /// The same splitter with protected names translated through
    /// `symbols`, for use on renamed source. Unmapped names are kept.
    #[must_use]
    pub fn renamed(&self, symbols: &SymbolMap) -> Self {
        Self {
            protected: self
                .protected
                .iter()
                .map(|name| symbols.get(name).unwrap_or(name).clone())
                .collect(),
        }
    }

    /// Split `source` into two fragments.
    ///
    /// Source that does not parse is returned whole as the first fragment,
    /// with [`EMPTY_FRAGMENT`] as the second.
    pub fn split<R: Rng + ?Sized>(&self, source: &str, rng: &mut R) -> (String, String) {
        let module = match parse(source) {
            Ok(module) => module,
            Err(e) => {
                debug!("Splitting skipped, source does not parse: {e}");
                return (source.to_string(), EMPTY_FRAGMENT.to_string());
            }
        };

        let groups = self.categorize(&module);
        let mut clusters = dependency_clusters(&groups.free);
        clusters.shuffle(rng);
        let half = clusters.len() / 2;
        debug!(
            "Split {} free statement(s) into {} cluster(s), {half} in the first fragment",
            groups.free.len(),
            clusters.len()
        );

        let shared = || groups.imports.iter().chain(&groups.protected).copied();
        let first: Vec<&Stmt> = shared()
            .chain(clusters[..half].iter().flatten().map(|&i| groups.free[i]))
            .collect();
        let second: Vec<&Stmt> = shared()
            .chain(clusters[half..].iter().flatten().map(|&i| groups.free[i]))
            .chain(groups.entry_point)
            .collect();

        (render(&first), render(&second))
    }

    fn categorize<'a>(&self, module: &'a Module) -> Categorized<'a> {
        let mut groups = Categorized::default();
        for stmt in &module.body {
            match stmt {
                s if s.is_import() => groups.imports.push(s),
                Stmt::FunctionDef(def) if self.protected.contains(&def.name) => {
                    groups.protected.push(stmt);
                }
                s if groups.entry_point.is_none() && is_entry_point(s) => {
                    groups.entry_point = Some(s);
                }
                s => groups.free.push(s),
            }
        }
        groups
    }
}

/// `if __name__ <op> ...:`
fn is_entry_point(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::If {
            test: Expr::Compare { left, .. },
            ..
        } => left.as_name() == Some(ENTRY_POINT_NAME),
        _ => false,
    }
}

/// Names one statement binds and reads.
#[derive(Debug, Default)]
struct Usage {
    defined: FxHashSet<String>,
    used: FxHashSet<String>,
}

impl Usage {
    fn of(stmt: &Stmt) -> Self {
        let mut usage = Usage::default();
        usage.visit_stmt(stmt);
        if let Some(name) = stmt.definition_name() {
            usage.used.remove(name);
        }
        usage
    }
}

impl Visitor for Usage {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Some(name) = stmt.definition_name() {
            self.defined.insert(name.to_string());
        }
        // `x += 1` reads `x` before rebinding it.
        if let Stmt::AugAssign {
            target: Expr::Name { id, .. },
            ..
        } = stmt
        {
            self.used.insert(id.clone());
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Name { id, ctx } = expr {
            match ctx {
                ExprContext::Store => {
                    self.defined.insert(id.clone());
                }
                ExprContext::Load | ExprContext::Del => {
                    self.used.insert(id.clone());
                }
            }
        }
        walk_expr(self, expr);
    }

    fn visit_param(&mut self, param: &Param) {
        if param.binds_name() {
            self.defined.insert(param.name.clone());
        }
        walk_param(self, param);
    }
}

/// Group statement indices so that no binding is separated from a read
/// of the same name. Clusters are ordered by their first statement and
/// keep source order inside.
fn dependency_clusters(statements: &[&Stmt]) -> Vec<Vec<usize>> {
    let usages: Vec<Usage> = statements.iter().map(|s| Usage::of(s)).collect();

    let mut definers: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    for (i, usage) in usages.iter().enumerate() {
        for name in &usage.defined {
            definers.entry(name.as_str()).or_default().push(i);
        }
    }

    let mut sets = UnionFind::<usize>::new(statements.len());
    for (reader, usage) in usages.iter().enumerate() {
        for name in &usage.used {
            for &definer in definers.get(name.as_str()).into_iter().flatten() {
                sets.union(reader, definer);
            }
        }
    }

    let mut by_root: FxHashMap<usize, usize> = FxHashMap::default();
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for i in 0..statements.len() {
        let root = sets.find(i);
        let slot = *by_root.entry(root).or_insert_with(|| {
            clusters.push(Vec::new());
            clusters.len() - 1
        });
        clusters[slot].push(i);
    }
    clusters
}

/// Serialize a fragment, falling back to statement-by-statement output.
fn render(statements: &[&Stmt]) -> String {
    if statements.is_empty() {
        return EMPTY_FRAGMENT.to_string();
    }
    let module = Module {
        body: statements.iter().map(|&s| s.clone()).collect(),
    };
    match unparse(&module) {
        Ok(text) => text,
        Err(e) => {
            warn!("Fragment cannot be serialized as a whole: {e}");
            let lines: Vec<String> = statements
                .iter()
                .filter_map(|s| unparse_stmt(s).ok())
                .collect();
            if lines.is_empty() {
                EMPTY_FRAGMENT.to_string()
            } else {
                lines.join("\n")
            }
        }
    }
}
