//! qobf Circuit Obfuscation
//!
//! Rewrites a quantum circuit into a behaviour-equivalent one with a
//! different gate sequence, using precomputed equivalence catalogs.
//!
//! # Overview
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────────────┐   ┌──────────┐
//! │   LOAD   │──▶│ VALIDATE │──▶│ APPLY technique 1..N │──▶│   SAVE   │
//! │ qasm/py  │   │  limits  │   │ registry + catalogs  │   │ qasm/py  │
//! └──────────┘   └──────────┘   └──────────────────────┘   └──────────┘
//! ```
//!
//! - [`catalog`]: the four equivalence catalogs and where they are read from
//! - [`token`]: textual gate references inside catalogs
//! - [`noise`]: tiered selection of identity sequences
//! - [`technique`]: `cloaked`, `inverse`, `delayed` and `composite`
//! - [`pipeline`]: the run state machine with limits and a deadline
//!
//! # Example
//!
//! ```rust
//! use qobf_circuit::{CatalogSet, CircuitPipeline, Deadline, TechniqueRequest};
//! use qobf_ir::{Circuit, QubitId};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut circuit = Circuit::with_size("bell", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! let pipeline = CircuitPipeline::new(CatalogSet::builtin());
//! let mut rng = StdRng::seed_from_u64(7);
//! let (obfuscated, report) = pipeline
//!     .obfuscate(
//!         &circuit,
//!         &[TechniqueRequest::new("cloaked").with_probability(1.0)],
//!         &mut rng,
//!         &Deadline::unbounded(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(obfuscated.name(), "bell_cloaked");
//! assert!(report.stages[0].applied);
//! ```

pub mod catalog;
mod deadline;
mod error;
pub mod host_script;
pub mod io;
pub mod noise;
pub mod pipeline;
pub mod technique;
pub mod token;

pub use catalog::{CatalogSet, MappingCatalog, PairBank, SequenceBank, TokenSequence};
pub use deadline::Deadline;
pub use error::{ObfuscationError, ObfuscationResult, TokenError};
pub use io::{CircuitFormat, load_circuit, output_path, save_circuit};
pub use noise::{NoiseSynthesizer, NoiseTier};
pub use pipeline::{
    Advisory, CircuitLimits, CircuitPipeline, PipelineReport, StageReport, TechniqueRequest,
};
pub use technique::{
    TechniqueConfig, TechniqueContext, TechniqueFn, TechniqueKind, TechniqueRegistry,
    UnknownTechnique,
};
pub use token::GateToken;
