//! `OpenQASM` reader and writer for qobf
//!
//! This crate reads flat gate-list circuits written in `OpenQASM` 2.0 or 3.0
//! into a [`qobf_ir::Circuit`] and writes circuits back out as `OpenQASM` 2.0.
//! It also exposes [`parse_parameter`], the angle-expression parser used for
//! gate tokens such as `rz(pi/4)` in equivalence catalogs.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version declaration | `OPENQASM 2.0;`, `OPENQASM 3.0;` |
//! | Includes (ignored) | `include "qelib1.inc";` |
//! | Register declarations | `qreg q[5];`, `qubit[5] q;`, `creg c[5];`, `bit[5] c;` |
//! | Gate calls with broadcast | `h q;`, `cx q[0], q[1];` |
//! | Parameterized gates | `rx(pi/4) q[0];`, `rz(exp(1)/2) q[0];` |
//! | Measurements | `measure q -> c;`, `c = measure q;` |
//! | Barrier / reset | `barrier q;`, `reset q[0];` |
//! | Comments | `// comment`, `/* block */` |
//!
//! Gate definitions are accepted only for names already in the standard gate
//! table (as emitted for `iswap` and `ryy`); any other `gate` block is
//! rejected.
//!
//! # Example
//!
//! ```rust
//! use qobf_qasm::{emit_qasm2, parse};
//!
//! let circuit = parse(r#"
//!     OPENQASM 2.0;
//!     include "qelib1.inc";
//!     qreg q[2];
//!     creg c[2];
//!     h q[0];
//!     cx q[0], q[1];
//!     measure q -> c;
//! "#).unwrap();
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.len(), 4);
//!
//! let qasm = emit_qasm2(&circuit).unwrap();
//! assert!(qasm.contains("measure q[1] -> c[1];"));
//! ```

mod ast;
mod emitter;
mod error;
mod lexer;
mod parser;

pub use emitter::emit_qasm2;
pub use error::{ParseError, ParseResult};
pub use parser::{parse, parse_parameter};
