//! End-to-end tests for the circuit pipeline.

use std::fs;

use proptest::prelude::*;
use qobf_circuit::technique::insert_padding;
use qobf_circuit::{
    Advisory, CatalogSet, CircuitLimits, CircuitPipeline, Deadline, MappingCatalog,
    NoiseSynthesizer, NoiseTier, ObfuscationError, TechniqueRequest, load_circuit,
};
use qobf_ir::{Circuit, Instruction, QubitId};
use rand::SeedableRng;
use rand::rngs::StdRng;

const BELL_QASM: &str = r#"OPENQASM 2.0;
include "qelib1.inc";
qreg q[2];
creg c[2];
h q[0];
cx q[0], q[1];
measure q[0] -> c[0];
measure q[1] -> c[1];
"#;

const BELL_SCRIPT: &str = r#"from qiskit import QuantumCircuit

def get_circuit():
    qc = QuantumCircuit(2, 2, name='bell')
    qc.h(0)
    qc.cx(0, 1)
    qc.measure([0, 1], [0, 1])
    return qc
"#;

fn mapping(entries: &[(&str, &[&[&str]])]) -> MappingCatalog {
    entries
        .iter()
        .map(|(gate, alts)| {
            let alts = alts
                .iter()
                .map(|seq| seq.iter().map(ToString::to_string).collect())
                .collect();
            (*gate, alts)
        })
        .collect()
}

fn cloaked_only(catalog: MappingCatalog) -> CircuitPipeline {
    CircuitPipeline::new(CatalogSet {
        cloaked: catalog,
        ..CatalogSet::default()
    })
}

#[test]
fn test_cloaked_replaces_h_with_catalog_entry() {
    let pipeline = cloaked_only(mapping(&[("h", &[&["x"], &["z"]])]));
    let mut circuit = Circuit::with_size("demo", 3, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let mut rng = StdRng::seed_from_u64(2024);
    let (out, report) = pipeline
        .obfuscate(
            &circuit,
            &[TechniqueRequest::new("cloaked").with_probability(1.0)],
            &mut rng,
            &Deadline::unbounded(),
        )
        .unwrap();

    assert_eq!(out.name(), "demo_cloaked");
    assert_eq!(out.len(), 2);
    let first = &out.instructions()[0];
    assert!(first.name() == "x" || first.name() == "z");
    assert_eq!(first.qubits, vec![QubitId(0)]);
    assert_eq!(out.instructions()[1], circuit.instructions()[1]);
    assert_eq!(report.stages.len(), 1);
    assert_eq!(report.stages[0].gates_before, 2);
    assert_eq!(report.stages[0].gates_after, 2);
}

#[test]
fn test_unknown_technique_is_skipped_and_later_ones_run() {
    let pipeline = cloaked_only(mapping(&[("h", &[&["x"]])]));
    let mut circuit = Circuit::with_size("demo", 1, 0);
    circuit.h(QubitId(0)).unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let (out, report) = pipeline
        .obfuscate(
            &circuit,
            &[
                TechniqueRequest::new("teleport"),
                TechniqueRequest::new("cloaked").with_probability(1.0),
            ],
            &mut rng,
            &Deadline::unbounded(),
        )
        .unwrap();

    assert_eq!(
        report.advisories,
        vec![Advisory::UnknownTechnique {
            name: "teleport".into()
        }]
    );
    assert!(!report.stages[0].applied);
    assert_eq!(report.stages[0].gates_after, 1);
    assert!(report.stages[1].applied);
    assert_eq!(out.instructions()[0].name(), "x");
}

#[test]
fn test_techniques_chain_names() {
    let pipeline = CircuitPipeline::new(CatalogSet::builtin());
    let mut circuit = Circuit::with_size("chain", 3, 3);
    for q in 0..3 {
        circuit.h(QubitId(q)).unwrap();
    }
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(1), QubitId(2)).unwrap();
    circuit.measure_all().unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    let (out, report) = pipeline
        .obfuscate(
            &circuit,
            &[
                TechniqueRequest::new("cloaked"),
                TechniqueRequest::new("inverse"),
            ],
            &mut rng,
            &Deadline::unbounded(),
        )
        .unwrap();

    assert_eq!(out.name(), "chain_cloaked_noisy");
    assert!(report.stages.iter().all(|s| s.applied));
    let measures = out.instructions().iter().filter(|i| i.is_measure()).count();
    assert_eq!(measures, 3);
}

#[test]
fn test_run_file_writes_obfuscated_qasm() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bell.qasm");
    fs::write(&input, BELL_QASM).unwrap();

    let pipeline = CircuitPipeline::new(CatalogSet::builtin());
    let mut rng = StdRng::seed_from_u64(9);
    let report = pipeline
        .run_file(
            &input,
            &[
                TechniqueRequest::new("delayed").with_probability(1.0),
                TechniqueRequest::new("composite").with_density(0.5),
            ],
            &mut rng,
        )
        .unwrap();

    let output = dir.path().join("bell_obfuscated.qasm");
    assert_eq!(report.output_path.as_deref(), Some(output.as_path()));
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("OPENQASM 2.0;"));

    let (reloaded, _) = load_circuit(&output).unwrap();
    assert_eq!(reloaded.num_qubits(), 2);
    assert_eq!(
        reloaded.instructions().iter().filter(|i| i.is_measure()).count(),
        2
    );
}

#[test]
fn test_run_file_host_script_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bell.py");
    fs::write(&input, BELL_SCRIPT).unwrap();

    let pipeline = cloaked_only(mapping(&[("h", &[&["sx", "s", "sx"]])]));
    let mut rng = StdRng::seed_from_u64(3);
    pipeline
        .run_file(
            &input,
            &[TechniqueRequest::new("cloaked").with_probability(1.0)],
            &mut rng,
        )
        .unwrap();

    let output = dir.path().join("bell_obfuscated.py");
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("def get_circuit():"));
    assert!(text.contains("name='bell_cloaked'"));

    let (reloaded, _) = load_circuit(&output).unwrap();
    let names: Vec<&str> = reloaded.instructions().iter().map(|i| i.name()).collect();
    assert_eq!(names, ["sx", "s", "sx", "cx", "measure", "measure"]);
}

#[test]
fn test_failed_runs_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = CircuitPipeline::new(CatalogSet::builtin()).with_limits(CircuitLimits {
        max_qubits: 1,
        ..CircuitLimits::default()
    });
    let mut rng = StdRng::seed_from_u64(0);

    let wide = dir.path().join("wide.qasm");
    fs::write(&wide, BELL_QASM).unwrap();
    let err = pipeline
        .run_file(&wide, &[TechniqueRequest::new("cloaked")], &mut rng)
        .unwrap_err();
    assert!(matches!(err, ObfuscationError::ResourceLimitExceeded { .. }));

    let text = dir.path().join("bell.txt");
    fs::write(&text, BELL_QASM).unwrap();
    let err = pipeline.run_file(&text, &[], &mut rng).unwrap_err();
    assert!(matches!(err, ObfuscationError::UnsupportedFormat(_)));

    let no_entry = dir.path().join("empty.py");
    fs::write(&no_entry, "import math\n").unwrap();
    let err = pipeline.run_file(&no_entry, &[], &mut rng).unwrap_err();
    assert!(matches!(err, ObfuscationError::MissingEntryPoint(_)));

    let mut entries: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    entries.sort();
    assert_eq!(entries, ["bell.txt", "empty.py", "wide.qasm"]);
}

#[derive(Debug, Clone)]
enum Op {
    H(u32),
    X(u32),
    Cx(u32, u32),
    Measure(u32),
}

fn arb_circuit() -> impl Strategy<Value = Circuit> {
    let op = prop_oneof![
        (0_u32..4).prop_map(Op::H),
        (0_u32..4).prop_map(Op::X),
        (0_u32..4, 0_u32..4).prop_map(|(a, b)| Op::Cx(a, b)),
        (0_u32..4).prop_map(Op::Measure),
    ];
    prop::collection::vec(op, 0..24).prop_map(|ops| {
        let mut circuit = Circuit::with_size("prop", 4, 4);
        for op in ops {
            // Invalid operand combinations (cx q, q) are simply not added.
            let _ = match op {
                Op::H(q) => circuit.h(QubitId(q)).map(|_| ()),
                Op::X(q) => circuit.x(QubitId(q)).map(|_| ()),
                Op::Cx(a, b) => circuit.cx(QubitId(a), QubitId(b)).map(|_| ()),
                Op::Measure(q) => circuit
                    .measure(QubitId(q), qobf_ir::ClbitId(q))
                    .map(|_| ()),
            };
        }
        circuit
    })
}

fn full_coverage() -> CircuitPipeline {
    cloaked_only(mapping(&[
        ("h", &[&["h"], &["s", "sx", "s"]]),
        ("x", &[&["h", "z", "h"], &["sx", "sx"]]),
        ("cx", &[&["cx"], &["h", "cz", "h"]]),
    ]))
}

/// True when `needle` appears in `haystack` in the same order, possibly with gaps.
fn is_ordered_subsequence(needle: &[Instruction], haystack: &[Instruction]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|inst| rest.any(|candidate| candidate == inst))
}

proptest! {
    #[test]
    fn padding_keeps_original_instructions_in_order(
        circuit in arb_circuit(),
        density in 0.0f64..1.0,
        seed in any::<u64>(),
    ) {
        let catalogs = CatalogSet::builtin();
        let synthesizer = NoiseSynthesizer::new(&catalogs.inverse);
        let mut rng = StdRng::seed_from_u64(seed);
        let out = insert_padding(&circuit, &synthesizer, density, &Deadline::unbounded(), &mut rng)
            .unwrap();
        prop_assert!(out.len() >= circuit.len());
        prop_assert!(is_ordered_subsequence(circuit.instructions(), out.instructions()));
    }

    #[test]
    fn single_target_noise_stays_on_one_qubit(
        seed in any::<u64>(),
        tier_index in 0usize..NoiseTier::ALL.len(),
        qubit in 0u32..3,
    ) {
        let catalogs = CatalogSet::builtin();
        let synthesizer = NoiseSynthesizer::new(&catalogs.inverse);
        let mut circuit = Circuit::with_size("noise", 3, 0);
        let mut rng = StdRng::seed_from_u64(seed);
        synthesizer
            .inject(&mut circuit, &[QubitId(qubit)], NoiseTier::ALL[tier_index], &mut rng)
            .unwrap();
        for inst in circuit.instructions() {
            prop_assert_eq!(&inst.qubits, &vec![QubitId(qubit)]);
        }
    }

    #[test]
    fn substitution_at_zero_probability_is_identity(circuit in arb_circuit(), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (out, _) = full_coverage()
            .obfuscate(
                &circuit,
                &[TechniqueRequest::new("cloaked").with_probability(0.0)],
                &mut rng,
                &Deadline::unbounded(),
            )
            .unwrap();
        prop_assert_eq!(out.instructions(), circuit.instructions());
        prop_assert_eq!(out.num_qubits(), circuit.num_qubits());
        prop_assert_eq!(out.num_clbits(), circuit.num_clbits());
    }

    #[test]
    fn substitution_with_full_coverage_never_shrinks(circuit in arb_circuit(), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (out, _) = full_coverage()
            .obfuscate(
                &circuit,
                &[TechniqueRequest::new("cloaked").with_probability(1.0)],
                &mut rng,
                &Deadline::unbounded(),
            )
            .unwrap();
        prop_assert!(out.gate_count() >= circuit.gate_count());
        let measures = |c: &Circuit| c.instructions().iter().filter(|i| i.is_measure()).count();
        prop_assert_eq!(measures(&out), measures(&circuit));
    }
}
