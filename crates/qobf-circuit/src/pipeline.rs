//! Circuit pipeline: LOAD → VALIDATE → APPLY(1..N) → SAVE.
//!
//! One [`Deadline`] covers the whole run. A fatal error in any stage ends
//! the run before SAVE, so a failed run never leaves an output file.
//! Non-fatal findings are collected as [`Advisory`] values in the report.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use qobf_ir::Circuit;
use rand::RngCore;
use tracing::{debug, info, instrument, warn};

use crate::catalog::CatalogSet;
use crate::deadline::Deadline;
use crate::error::{ObfuscationError, ObfuscationResult};
use crate::io::{load_circuit, output_path, save_circuit};
use crate::noise::NoiseSynthesizer;
use crate::technique::{TechniqueConfig, TechniqueContext, TechniqueKind, TechniqueRegistry};

/// Resource ceilings for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitLimits {
    /// Wider circuits are rejected.
    pub max_qubits: usize,
    /// Deeper circuits only produce an advisory.
    pub max_depth: usize,
    pub timeout: Duration,
}

impl Default for CircuitLimits {
    fn default() -> Self {
        Self {
            max_qubits: 30,
            max_depth: 1000,
            timeout: Duration::from_secs(60),
        }
    }
}

/// One requested technique. Unset tuning values take the per-kind
/// defaults of [`TechniqueConfig::default_for`].
#[derive(Debug, Clone, PartialEq)]
pub struct TechniqueRequest {
    pub name: String,
    pub probability: Option<f64>,
    pub density: Option<f64>,
}

impl TechniqueRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probability: None,
            density: None,
        }
    }

    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = Some(density);
        self
    }

    fn config(&self, kind: TechniqueKind) -> TechniqueConfig {
        let mut config = TechniqueConfig::default_for(kind);
        if let Some(p) = self.probability {
            config = config.with_probability(p);
        }
        if let Some(d) = self.density {
            config = config.with_density(d);
        }
        config
    }
}

/// A non-fatal finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    DepthExceeded { depth: usize, max_depth: usize },
    UnknownTechnique { name: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::DepthExceeded { depth, max_depth } => write!(
                f,
                "Circuit depth {depth} exceeds the recommended maximum of {max_depth}; obfuscation may take a while"
            ),
            Advisory::UnknownTechnique { name } => {
                write!(f, "Unknown technique '{name}', skipping")
            }
        }
    }
}

/// What one APPLY stage did.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub technique: String,
    /// False when the technique was skipped.
    pub applied: bool,
    pub gates_before: usize,
    pub gates_after: usize,
    pub depth: usize,
    pub elapsed: Duration,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineReport {
    /// Set once SAVE succeeded.
    pub output_path: Option<PathBuf>,
    pub advisories: Vec<Advisory>,
    pub stages: Vec<StageReport>,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Load,
    Validate,
    Apply,
    Save,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Load => "LOAD",
            Stage::Validate => "VALIDATE",
            Stage::Apply => "APPLY",
            Stage::Save => "SAVE",
        })
    }
}

/// The circuit obfuscation engine.
#[derive(Debug, Clone)]
pub struct CircuitPipeline {
    catalogs: CatalogSet,
    synthesizer: NoiseSynthesizer,
    registry: TechniqueRegistry,
    limits: CircuitLimits,
}

impl CircuitPipeline {
    pub fn new(catalogs: CatalogSet) -> Self {
        let synthesizer = NoiseSynthesizer::new(&catalogs.inverse);
        Self {
            catalogs,
            synthesizer,
            registry: TechniqueRegistry::standard(),
            limits: CircuitLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: CircuitLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: TechniqueRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn limits(&self) -> &CircuitLimits {
        &self.limits
    }

    pub fn catalogs(&self) -> &CatalogSet {
        &self.catalogs
    }

    /// Obfuscate a circuit file and write `<base>_obfuscated<ext>` next to
    /// it.
    #[instrument(skip(self, path, techniques, rng), fields(path = %path.display()))]
    pub fn run_file(
        &self,
        path: &Path,
        techniques: &[TechniqueRequest],
        rng: &mut dyn RngCore,
    ) -> ObfuscationResult<PipelineReport> {
        let deadline = Deadline::after(self.limits.timeout);

        info!("[{}] Reading {}", Stage::Load, path.display());
        let (circuit, format) = load_circuit(path)?;

        let (obfuscated, mut report) = self.obfuscate(&circuit, techniques, rng, &deadline)?;
        deadline.check()?;

        let output = output_path(path);
        info!("[{}] Writing {}", Stage::Save, output.display());
        save_circuit(&obfuscated, format, &output)?;
        report.output_path = Some(output);
        Ok(report)
    }

    /// VALIDATE and APPLY on an in-memory circuit.
    pub fn obfuscate(
        &self,
        circuit: &Circuit,
        techniques: &[TechniqueRequest],
        rng: &mut dyn RngCore,
        deadline: &Deadline,
    ) -> ObfuscationResult<(Circuit, PipelineReport)> {
        let mut report = PipelineReport::default();
        self.validate(circuit, &mut report)?;

        let mut current = circuit.clone();
        for request in techniques {
            deadline.check()?;
            let started = Instant::now();
            let gates_before = current.gate_count();

            let handler = request
                .name
                .parse::<TechniqueKind>()
                .ok()
                .and_then(|kind| self.registry.get(kind).map(|h| (kind, h)));
            let Some((kind, handler)) = handler else {
                let advisory = Advisory::UnknownTechnique {
                    name: request.name.clone(),
                };
                warn!("[{}] {advisory}", Stage::Apply);
                report.advisories.push(advisory);
                report.stages.push(StageReport {
                    technique: request.name.clone(),
                    applied: false,
                    gates_before,
                    gates_after: gates_before,
                    depth: current.depth(),
                    elapsed: started.elapsed(),
                });
                continue;
            };

            let config = request.config(kind);
            debug!("[{}] {kind} with {config:?}", Stage::Apply);
            let mut ctx = TechniqueContext {
                catalogs: &self.catalogs,
                synthesizer: &self.synthesizer,
                deadline,
                rng: &mut *rng,
            };
            current = handler(&current, &config, &mut ctx)?;

            let stage = StageReport {
                technique: kind.name().to_string(),
                applied: true,
                gates_before,
                gates_after: current.gate_count(),
                depth: current.depth(),
                elapsed: started.elapsed(),
            };
            info!(
                "[{}] {kind}: {} → {} gates, depth {} ({:.2?})",
                Stage::Apply,
                stage.gates_before,
                stage.gates_after,
                stage.depth,
                stage.elapsed
            );
            report.stages.push(stage);
        }

        Ok((current, report))
    }

    fn validate(&self, circuit: &Circuit, report: &mut PipelineReport) -> ObfuscationResult<()> {
        let num_qubits = circuit.num_qubits();
        if num_qubits > self.limits.max_qubits {
            return Err(ObfuscationError::ResourceLimitExceeded {
                num_qubits,
                max_qubits: self.limits.max_qubits,
            });
        }
        let depth = circuit.depth();
        if depth > self.limits.max_depth {
            let advisory = Advisory::DepthExceeded {
                depth,
                max_depth: self.limits.max_depth,
            };
            warn!("[{}] {advisory}", Stage::Validate);
            report.advisories.push(advisory);
        }
        info!(
            "[{}] '{}': {num_qubits} qubits, {} gates, depth {depth}",
            Stage::Validate,
            circuit.name(),
            circuit.gate_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MappingCatalog;
    use qobf_ir::QubitId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bell() -> Circuit {
        let mut c = Circuit::with_size("bell", 2, 0);
        c.h(QubitId(0)).unwrap();
        c.cx(QubitId(0), QubitId(1)).unwrap();
        c
    }

    #[test]
    fn test_request_config_falls_back_to_defaults() {
        let request = TechniqueRequest::new("composite").with_probability(0.9);
        let config = request.config(TechniqueKind::Composite);
        assert_eq!(config.probability, 0.9);
        assert_eq!(config.density, 0.2);
    }

    #[test]
    fn test_qubit_limit_is_fatal() {
        let pipeline = CircuitPipeline::new(CatalogSet::default()).with_limits(CircuitLimits {
            max_qubits: 1,
            ..CircuitLimits::default()
        });
        let mut rng = StdRng::seed_from_u64(0);
        let result = pipeline.obfuscate(&bell(), &[], &mut rng, &Deadline::unbounded());
        assert!(matches!(
            result,
            Err(ObfuscationError::ResourceLimitExceeded {
                num_qubits: 2,
                max_qubits: 1
            })
        ));
    }

    #[test]
    fn test_depth_limit_is_advisory() {
        let pipeline = CircuitPipeline::new(CatalogSet::default()).with_limits(CircuitLimits {
            max_depth: 1,
            ..CircuitLimits::default()
        });
        let mut rng = StdRng::seed_from_u64(0);
        let (out, report) = pipeline
            .obfuscate(&bell(), &[], &mut rng, &Deadline::unbounded())
            .unwrap();
        assert_eq!(out, bell());
        assert_eq!(
            report.advisories,
            vec![Advisory::DepthExceeded {
                depth: 2,
                max_depth: 1
            }]
        );
    }

    #[test]
    fn test_unregistered_kind_is_skipped() {
        let mut catalogs = CatalogSet::default();
        catalogs.cloaked = [("h", vec![vec!["x".to_string()]])]
            .into_iter()
            .collect::<MappingCatalog>();
        let pipeline = CircuitPipeline::new(catalogs).with_registry(TechniqueRegistry::new());
        let mut rng = StdRng::seed_from_u64(0);
        let (out, report) = pipeline
            .obfuscate(
                &bell(),
                &[TechniqueRequest::new("cloaked").with_probability(1.0)],
                &mut rng,
                &Deadline::unbounded(),
            )
            .unwrap();
        assert_eq!(out, bell());
        assert!(!report.stages[0].applied);
    }

    #[test]
    fn test_expired_deadline_stops_before_first_technique() {
        let pipeline = CircuitPipeline::new(CatalogSet::builtin());
        let mut rng = StdRng::seed_from_u64(0);
        let result = pipeline.obfuscate(
            &bell(),
            &[TechniqueRequest::new("cloaked")],
            &mut rng,
            &Deadline::after(Duration::ZERO),
        );
        assert!(matches!(result, Err(ObfuscationError::Timeout { .. })));
    }
}
