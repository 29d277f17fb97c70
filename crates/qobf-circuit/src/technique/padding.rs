//! Padding insertion: identity noise between existing instructions.

use qobf_ir::{Circuit, QubitId};
use rand::Rng;
use rand::seq::{SliceRandom, index};

use super::insertion_count;
use crate::deadline::Deadline;
use crate::error::ObfuscationResult;
use crate::noise::{NoiseSynthesizer, NoiseTier};

/// Tiers an insertion draws from.
const INSERTION_TIERS: [NoiseTier; 2] = [NoiseTier::Light, NoiseTier::Medium];

/// Insert `floor(len * density)` noise sequences at distinct random offsets.
///
/// Each insertion targets one or two distinct qubits and a random
/// light-or-medium sequence. The original instructions keep their relative
/// order. The deadline is checked before every insertion.
pub fn insert_padding<R: Rng + ?Sized>(
    circuit: &Circuit,
    synthesizer: &NoiseSynthesizer,
    density: f64,
    deadline: &Deadline,
    rng: &mut R,
) -> ObfuscationResult<Circuit> {
    let mut out = circuit.derived("noisy");
    let instructions = circuit.instructions();
    let num_qubits = circuit.num_qubits();

    let k = insertion_count(instructions.len(), density);
    let mut offsets = index::sample(rng, instructions.len() + 1, k).into_vec();
    offsets.sort_unstable();

    let mut cursor = 0;
    for offset in offsets {
        for inst in &instructions[cursor..offset] {
            out.push(inst.clone())?;
        }
        cursor = offset;

        deadline.check()?;
        if num_qubits == 0 {
            continue;
        }
        let count = num_qubits.min(rng.gen_range(1..=2));
        #[allow(clippy::cast_possible_truncation)]
        let targets: Vec<QubitId> = index::sample(rng, num_qubits, count)
            .into_iter()
            .map(|i| QubitId(i as u32))
            .collect();
        let tier = *INSERTION_TIERS.choose(rng).unwrap_or(&NoiseTier::Light);
        synthesizer.inject(&mut out, &targets, tier, rng)?;
    }
    for inst in &instructions[cursor..] {
        out.push(inst.clone())?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SequenceBank;
    use crate::error::ObfuscationError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;

    fn hh_synth() -> NoiseSynthesizer {
        NoiseSynthesizer::new(&SequenceBank::new(vec![vec!["h".into(), "h".into()]]))
    }

    fn input() -> Circuit {
        let mut c = Circuit::with_size("pad", 3, 3);
        for q in 0..3 {
            c.x(QubitId(q)).unwrap();
        }
        c.cx(QubitId(0), QubitId(1)).unwrap();
        c.cz(QubitId(1), QubitId(2)).unwrap();
        c.t(QubitId(2)).unwrap();
        c.s(QubitId(0)).unwrap();
        c.swap(QubitId(0), QubitId(2)).unwrap();
        c.y(QubitId(1)).unwrap();
        c.z(QubitId(2)).unwrap();
        c
    }

    #[test]
    fn test_original_order_is_preserved() {
        let circuit = input();
        let mut rng = StdRng::seed_from_u64(42);
        let out =
            insert_padding(&circuit, &hh_synth(), 0.3, &Deadline::unbounded(), &mut rng).unwrap();

        assert_eq!(out.name(), "pad_noisy");
        let kept: Vec<_> = out
            .instructions()
            .iter()
            .filter(|i| i.name() != "h")
            .cloned()
            .collect();
        assert_eq!(kept, circuit.instructions());
        // 10 instructions at 0.3 → 3 insertions of 2 gates each.
        assert_eq!(out.len(), circuit.len() + 6);
    }

    #[test]
    fn test_zero_density_copies() {
        let circuit = input();
        let mut rng = StdRng::seed_from_u64(1);
        let out =
            insert_padding(&circuit, &hh_synth(), 0.0, &Deadline::unbounded(), &mut rng).unwrap();
        assert_eq!(out.instructions(), circuit.instructions());
    }

    #[test]
    fn test_empty_bank_fails_on_first_insertion() {
        let synth = NoiseSynthesizer::new(&SequenceBank::default());
        let mut rng = StdRng::seed_from_u64(1);
        let result = insert_padding(&input(), &synth, 0.5, &Deadline::unbounded(), &mut rng);
        assert!(matches!(
            result,
            Err(ObfuscationError::NoiseBankExhausted { .. })
        ));
    }

    #[test]
    fn test_expired_deadline_aborts() {
        let mut rng = StdRng::seed_from_u64(1);
        let deadline = Deadline::after(Duration::ZERO);
        let result = insert_padding(&input(), &hh_synth(), 0.5, &deadline, &mut rng);
        assert!(matches!(result, Err(ObfuscationError::Timeout { .. })));
    }
}
