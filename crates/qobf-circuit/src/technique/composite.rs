//! Composite insertion: auxiliary/residual pairs that cancel out.

use qobf_ir::{Circuit, QubitId};
use rand::Rng;
use rand::seq::{SliceRandom, index};

use super::insertion_count;
use crate::catalog::PairBank;
use crate::deadline::Deadline;
use crate::error::ObfuscationResult;
use crate::token::apply_sequence;

/// Insert `floor(len * density)` composite blocks at distinct random offsets.
///
/// A block applies every auxiliary token to each qubit in turn, then every
/// residual token the same way. Nothing is inserted, and the input is
/// returned as-is under its own name, when the bank is empty or the count
/// rounds down to zero.
pub fn insert_composites<R: Rng + ?Sized>(
    circuit: &Circuit,
    bank: &PairBank,
    density: f64,
    deadline: &Deadline,
    rng: &mut R,
) -> ObfuscationResult<Circuit> {
    let instructions = circuit.instructions();
    let k = insertion_count(instructions.len(), density);
    if k == 0 || bank.is_empty() {
        return Ok(circuit.clone());
    }

    let mut out = circuit.derived("composite");
    let qubits: Vec<QubitId> = circuit.qubits().collect();
    let mut offsets = index::sample(rng, instructions.len() + 1, k).into_vec();
    offsets.sort_unstable();

    let mut cursor = 0;
    for offset in offsets {
        for inst in &instructions[cursor..offset] {
            out.push(inst.clone())?;
        }
        cursor = offset;

        deadline.check()?;
        let Some((aux, res)) = bank.pairs().choose(rng) else {
            continue;
        };
        for token in aux.iter().chain(res) {
            for &qubit in &qubits {
                apply_sequence(&mut out, std::slice::from_ref(token), &[qubit]);
            }
        }
    }
    for inst in &instructions[cursor..] {
        out.push(inst.clone())?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bank() -> PairBank {
        PairBank::new(vec![(vec!["s".into()], vec!["sdg".into()])])
    }

    fn input() -> Circuit {
        let mut c = Circuit::with_size("comp", 2, 0);
        for _ in 0..5 {
            c.h(QubitId(0)).unwrap();
            c.cx(QubitId(0), QubitId(1)).unwrap();
        }
        c
    }

    #[test]
    fn test_blocks_cover_every_qubit() {
        let circuit = input();
        let mut rng = StdRng::seed_from_u64(3);
        let out =
            insert_composites(&circuit, &bank(), 0.2, &Deadline::unbounded(), &mut rng).unwrap();

        assert_eq!(out.name(), "comp_composite");
        // 10 × 0.2 → 2 blocks of (s on q0, s on q1, sdg on q0, sdg on q1).
        assert_eq!(out.len(), circuit.len() + 8);
        let names: Vec<&str> = out.instructions().iter().map(|i| i.name()).collect();
        let block = ["s", "s", "sdg", "sdg"];
        assert_eq!(names.windows(4).filter(|w| *w == block).count(), 2);

        let kept: Vec<_> = out
            .instructions()
            .iter()
            .filter(|i| i.name() != "s" && i.name() != "sdg")
            .cloned()
            .collect();
        assert_eq!(kept, circuit.instructions());
    }

    #[test]
    fn test_zero_count_returns_input() {
        let mut small = Circuit::with_size("small", 1, 0);
        small.h(QubitId(0)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let out =
            insert_composites(&small, &bank(), 0.2, &Deadline::unbounded(), &mut rng).unwrap();
        assert_eq!(out, small);
    }

    #[test]
    fn test_empty_bank_returns_input() {
        let circuit = input();
        let mut rng = StdRng::seed_from_u64(3);
        let out = insert_composites(
            &circuit,
            &PairBank::default(),
            0.9,
            &Deadline::unbounded(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(out, circuit);
    }
}
