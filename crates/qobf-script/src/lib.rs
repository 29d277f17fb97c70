//! Program trees for qobf
//!
//! This crate turns Python-subset source text into a [`Module`] tree and
//! back. It is the structural representation behind program renaming and
//! splitting, and behind host-script circuit loading.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Imports | `import math as m`, `from .pkg import (a, b)` |
//! | Definitions | decorators, defaults, `*args`, `**kwargs`, annotations |
//! | Assignments | `a, b = c = f()`, `x += 1`, `n: int = 0` |
//! | Control flow | `if/elif/else`, `for`, `while`, `with`, `try` |
//! | Expressions | full precedence, lambdas, comprehensions, walrus |
//! | Strings | concatenation, byte/raw literals, f-strings with parsed fields |
//!
//! Comments are discarded; literals keep their source text.
//!
//! # Example
//!
//! ```rust
//! use qobf_script::{parse, unparse};
//!
//! let module = parse("def add(a, b):\n    return (a + b)\n").unwrap();
//! assert_eq!(module.body.len(), 1);
//! assert_eq!(unparse(&module).unwrap(), "def add(a, b):\n    return a + b");
//! ```

pub mod ast;
mod error;
mod lexer;
mod parser;
mod unparse;
pub mod visit;

pub use ast::{Expr, ExprContext, Module, Param, Stmt};
pub use error::{ScriptError, ScriptResult};
pub use lexer::{SpannedToken, Token, tokenize};
pub use parser::{parse, parse_expression};
pub use unparse::{unparse, unparse_expr, unparse_stmt};
pub use visit::{Visitor, VisitorMut};
