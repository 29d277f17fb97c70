//! qobf Circuit Model
//!
//! This crate provides the circuit data structures shared by every stage of
//! the qobf circuit path: loaders produce a [`Circuit`], obfuscation
//! techniques consume one and build a new one, and writers serialize it.
//!
//! # Overview
//!
//! A circuit is an ordered list of [`Instruction`]s over a fixed number of
//! qubits and classical bits. Order is the only structure that matters to
//! the rewriting techniques, so there is no graph representation here; depth
//! is computed on demand from the per-wire layering.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`]
//! - **Gates**: [`StandardGate`] for the fixed gate table and [`CustomGate`]
//!   for anything else a loader encounters
//! - **Parameters**: [`ParameterExpression`] for angles
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **Circuit**: [`Circuit`] with a validating builder API
//!
//! # Example
//!
//! ```rust
//! use qobf_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! ```
//!
//! # Gate Table
//!
//! | Gate | Qubits | Parameters |
//! |------|--------|------------|
//! | `id x y z h s sdg t tdg sx sxdg` | 1 | 0 |
//! | `rx ry rz p` | 1 | 1 |
//! | `u` | 1 | 3 |
//! | `cx cy cz ch swap iswap` | 2 | 0 |
//! | `crx cry crz cp rxx ryy rzz` | 2 | 1 |
//! | `ccx cswap` | 3 | 0 |

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{CustomGate, Gate, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::ParameterExpression;
pub use qubit::{ClbitId, QubitId};
