//! qobf Program Obfuscation
//!
//! Hides a payload program inside randomized, circuit-gated control flow.
//!
//! ```text
//! payload.py ──▶ SymbolRenamer ──▶ [DependencySplitter] ──▶ Template fill ──▶ payload_obf_<t>.py
//!                                   noise snippets, decoys, trigger ──┘
//! ```
//!
//! - [`renamer`]: strips imports the templates provide and renames symbols
//! - [`splitter`]: divides a program into two fragments along def/use lines
//! - [`template`]: the four control-flow templates and their filler
//! - [`obfuscator`]: the end-to-end pipeline
//!
//! # Example
//!
//! ```rust
//! use qobf_circuit::CatalogSet;
//! use qobf_program::{ProgramObfuscator, Template};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let catalogs = CatalogSet::builtin();
//! let obfuscator = ProgramObfuscator::new(&catalogs.inverse);
//! let mut rng = StdRng::seed_from_u64(1);
//! let text = obfuscator
//!     .obfuscate_source("total = 40 + 2\nprint(total)\n", Template::SimpleEntanglement, &mut rng)
//!     .unwrap();
//!
//! assert!(text.contains("AerSimulator"));
//! assert!(!text.contains("total"));
//! ```

pub mod decoy;
mod error;
pub mod obfuscator;
pub mod renamer;
pub mod snippet;
pub mod splitter;
pub mod template;
pub mod trigger;

pub use error::{ProgramError, ProgramResult};
pub use obfuscator::{ProgramObfuscator, ProgramOutput, output_path};
pub use renamer::{DEFAULT_PROVIDED_IMPORTS, SymbolMap, SymbolRenamer};
pub use splitter::DependencySplitter;
pub use template::{BuiltinTemplates, Template, TemplateDirectory, TemplateSink, TemplateValues};
