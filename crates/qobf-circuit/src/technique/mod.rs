//! Gate-sequence rewriting techniques.
//!
//! Every technique is a pure function from a circuit to a new circuit; the
//! input is never modified. Techniques are identified by [`TechniqueKind`]
//! and dispatched through a [`TechniqueRegistry`].
//!
//! | Technique | Algorithm | Catalog | Output name |
//! |-----------|-----------|---------|-------------|
//! | `cloaked` | substitution | cloaked | `<name>_cloaked` |
//! | `inverse` | padding insertion | inverse (via the noise synthesizer) | `<name>_noisy` |
//! | `delayed` | delayed replacement | delayed | `<name>_delayed` |
//! | `composite` | composite insertion | aux/residual pairs | `<name>_composite` |

mod composite;
mod padding;
mod substitution;

use std::fmt;
use std::str::FromStr;

use qobf_ir::Circuit;
use rand::RngCore;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::catalog::CatalogSet;
use crate::deadline::Deadline;
use crate::error::ObfuscationResult;
use crate::noise::NoiseSynthesizer;

pub use composite::insert_composites;
pub use padding::insert_padding;
pub use substitution::substitute;

/// The available techniques.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TechniqueKind {
    Cloaked,
    Inverse,
    Delayed,
    Composite,
}

impl TechniqueKind {
    pub const ALL: [TechniqueKind; 4] = [
        TechniqueKind::Cloaked,
        TechniqueKind::Inverse,
        TechniqueKind::Delayed,
        TechniqueKind::Composite,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TechniqueKind::Cloaked => "cloaked",
            TechniqueKind::Inverse => "inverse",
            TechniqueKind::Delayed => "delayed",
            TechniqueKind::Composite => "composite",
        }
    }

    /// Names accepted on the command line.
    pub fn names() -> [&'static str; 4] {
        Self::ALL.map(Self::name)
    }

    /// Suffix appended to the circuit name by this technique.
    pub fn output_suffix(self) -> &'static str {
        match self {
            TechniqueKind::Cloaked => "cloaked",
            TechniqueKind::Inverse => "noisy",
            TechniqueKind::Delayed => "delayed",
            TechniqueKind::Composite => "composite",
        }
    }

    /// The built-in handler.
    pub fn handler(self) -> TechniqueFn {
        match self {
            TechniqueKind::Cloaked => apply_cloaked,
            TechniqueKind::Inverse => apply_inverse,
            TechniqueKind::Delayed => apply_delayed,
            TechniqueKind::Composite => apply_composite,
        }
    }
}

impl fmt::Display for TechniqueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A technique name with no matching [`TechniqueKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown technique '{0}'")]
pub struct UnknownTechnique(pub String);

impl FromStr for TechniqueKind {
    type Err = UnknownTechnique;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| UnknownTechnique(s.to_string()))
    }
}

/// Tuning for one technique application. Substitution techniques read
/// `probability`, insertion techniques read `density`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechniqueConfig {
    /// Chance that an eligible gate is replaced.
    pub probability: f64,
    /// Insertions per instruction.
    pub density: f64,
}

impl TechniqueConfig {
    /// Defaults: probability 0.5; density 0.3, or 0.2 for `composite`.
    pub fn default_for(kind: TechniqueKind) -> Self {
        Self {
            probability: 0.5,
            density: match kind {
                TechniqueKind::Composite => 0.2,
                _ => 0.3,
            },
        }
    }

    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }
}

/// Everything a technique draws on besides the circuit.
pub struct TechniqueContext<'a> {
    pub catalogs: &'a CatalogSet,
    pub synthesizer: &'a NoiseSynthesizer,
    pub deadline: &'a Deadline,
    pub rng: &'a mut dyn RngCore,
}

/// A technique implementation.
pub type TechniqueFn =
    fn(&Circuit, &TechniqueConfig, &mut TechniqueContext<'_>) -> ObfuscationResult<Circuit>;

/// Kind → handler table.
#[derive(Clone, Default)]
pub struct TechniqueRegistry {
    handlers: FxHashMap<TechniqueKind, TechniqueFn>,
}

impl TechniqueRegistry {
    /// A registry with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in handler for every kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for kind in TechniqueKind::ALL {
            registry.register(kind, kind.handler());
        }
        registry
    }

    pub fn register(&mut self, kind: TechniqueKind, handler: TechniqueFn) {
        self.handlers.insert(kind, handler);
    }

    pub fn get(&self, kind: TechniqueKind) -> Option<TechniqueFn> {
        self.handlers.get(&kind).copied()
    }

    pub fn contains(&self, kind: TechniqueKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl fmt::Debug for TechniqueRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("TechniqueRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

fn apply_cloaked(
    circuit: &Circuit,
    config: &TechniqueConfig,
    ctx: &mut TechniqueContext<'_>,
) -> ObfuscationResult<Circuit> {
    substitute(
        circuit,
        &ctx.catalogs.cloaked,
        config.probability,
        TechniqueKind::Cloaked.output_suffix(),
        &mut *ctx.rng,
    )
}

fn apply_delayed(
    circuit: &Circuit,
    config: &TechniqueConfig,
    ctx: &mut TechniqueContext<'_>,
) -> ObfuscationResult<Circuit> {
    substitute(
        circuit,
        &ctx.catalogs.delayed,
        config.probability,
        TechniqueKind::Delayed.output_suffix(),
        &mut *ctx.rng,
    )
}

fn apply_inverse(
    circuit: &Circuit,
    config: &TechniqueConfig,
    ctx: &mut TechniqueContext<'_>,
) -> ObfuscationResult<Circuit> {
    insert_padding(
        circuit,
        ctx.synthesizer,
        config.density,
        ctx.deadline,
        &mut *ctx.rng,
    )
}

fn apply_composite(
    circuit: &Circuit,
    config: &TechniqueConfig,
    ctx: &mut TechniqueContext<'_>,
) -> ObfuscationResult<Circuit> {
    insert_composites(
        circuit,
        &ctx.catalogs.composite,
        config.density,
        ctx.deadline,
        &mut *ctx.rng,
    )
}

/// Number of insertion points for `len` instructions at `density`, capped
/// by the `len + 1` available offsets.
fn insertion_count(len: usize, density: f64) -> usize {
    if density.is_nan() || density <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let k = (len as f64 * density).floor() as usize;
    k.min(len + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in TechniqueKind::ALL {
            assert_eq!(kind.name().parse::<TechniqueKind>(), Ok(kind));
        }
        assert_eq!(" Cloaked ".parse::<TechniqueKind>(), Ok(TechniqueKind::Cloaked));
        assert_eq!(
            "teleport".parse::<TechniqueKind>(),
            Err(UnknownTechnique("teleport".into()))
        );
    }

    #[test]
    fn test_default_configs() {
        assert_eq!(TechniqueConfig::default_for(TechniqueKind::Cloaked).probability, 0.5);
        assert_eq!(TechniqueConfig::default_for(TechniqueKind::Delayed).probability, 0.5);
        assert_eq!(TechniqueConfig::default_for(TechniqueKind::Inverse).density, 0.3);
        assert_eq!(TechniqueConfig::default_for(TechniqueKind::Composite).density, 0.2);
    }

    #[test]
    fn test_standard_registry_covers_every_kind() {
        let registry = TechniqueRegistry::standard();
        assert!(TechniqueKind::ALL.iter().all(|&k| registry.contains(k)));
        assert!(!TechniqueRegistry::new().contains(TechniqueKind::Inverse));
    }

    #[test]
    fn test_insertion_count() {
        assert_eq!(insertion_count(10, 0.3), 3);
        assert_eq!(insertion_count(3, 0.2), 0);
        assert_eq!(insertion_count(0, 0.5), 0);
        assert_eq!(insertion_count(4, 5.0), 5);
        assert_eq!(insertion_count(4, -1.0), 0);
        assert_eq!(insertion_count(4, f64::NAN), 0);
    }
}
