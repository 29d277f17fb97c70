//! Substitution: replacing gates with catalog alternatives.

use qobf_ir::{Circuit, InstructionKind};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::catalog::MappingCatalog;
use crate::error::ObfuscationResult;
use crate::token::apply_sequence;

/// Replace each gate that has a catalog entry, with chance `probability`,
/// by one of its alternatives re-targeted onto the gate's operands. The
/// original gate is dropped when replaced. Everything else is copied.
///
/// Used by both `cloaked` and `delayed`; only the catalog differs.
pub fn substitute<R: Rng + ?Sized>(
    circuit: &Circuit,
    catalog: &MappingCatalog,
    probability: f64,
    suffix: &str,
    rng: &mut R,
) -> ObfuscationResult<Circuit> {
    let mut out = circuit.derived(suffix);

    for inst in circuit.instructions() {
        let alternatives = match &inst.kind {
            InstructionKind::Gate(gate) => catalog.get(gate.name()),
            _ => None,
        };
        let chosen = alternatives
            .filter(|_| rng.r#gen::<f64>() < probability)
            .and_then(|alts| alts.choose(rng));

        match chosen {
            Some(sequence) => {
                apply_sequence(&mut out, sequence, &inst.qubits);
            }
            None => {
                out.push(inst.clone())?;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qobf_ir::QubitId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn catalog(entries: &[(&str, &[&[&str]])]) -> MappingCatalog {
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

    fn sample() -> Circuit {
        let mut c = Circuit::with_size("sample", 3, 3);
        c.h(QubitId(0)).unwrap();
        c.cx(QubitId(0), QubitId(1)).unwrap();
        c.t(QubitId(2)).unwrap();
        c.measure_all().unwrap();
        c
    }

    #[test]
    fn test_probability_zero_is_structural_copy() {
        let cat = catalog(&[("h", &[&["x"]]), ("cx", &[&["cx", "cx", "cx"]])]);
        let mut rng = StdRng::seed_from_u64(0);
        let input = sample();
        let out = substitute(&input, &cat, 0.0, "cloaked", &mut rng).unwrap();
        assert_eq!(out.instructions(), input.instructions());
        assert_eq!(out.name(), "sample_cloaked");
        assert_eq!(out.num_clbits(), 3);
    }

    #[test]
    fn test_probability_one_replaces_and_retargets() {
        let cat = catalog(&[("cx", &[&["h", "cz", "h"]])]);
        let mut rng = StdRng::seed_from_u64(0);
        let mut input = Circuit::with_size("c", 3, 0);
        input.cx(QubitId(2), QubitId(1)).unwrap();

        let out = substitute(&input, &cat, 1.0, "delayed", &mut rng).unwrap();
        let ops: Vec<(&str, Vec<QubitId>)> = out
            .instructions()
            .iter()
            .map(|i| (i.name(), i.qubits.clone()))
            .collect();
        assert_eq!(
            ops,
            vec![
                ("h", vec![QubitId(2)]),
                ("cz", vec![QubitId(2), QubitId(1)]),
                ("h", vec![QubitId(2)]),
            ]
        );
    }

    #[test]
    fn test_unknown_gates_and_empty_alternatives_pass_through() {
        let cat = catalog(&[("t", &[])]);
        let mut rng = StdRng::seed_from_u64(5);
        let input = sample();
        let out = substitute(&input, &cat, 1.0, "cloaked", &mut rng).unwrap();
        assert_eq!(out.instructions(), input.instructions());
    }

    #[test]
    fn test_input_is_untouched() {
        let cat = catalog(&[("h", &[&["x", "z"]])]);
        let mut rng = StdRng::seed_from_u64(9);
        let input = sample();
        let before = input.clone();
        let _ = substitute(&input, &cat, 1.0, "cloaked", &mut rng).unwrap();
        assert_eq!(input, before);
    }
}
