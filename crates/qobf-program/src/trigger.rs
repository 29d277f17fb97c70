//! Deterministic trigger circuit for the `deterministic` template.
//!
//! A phase kickback onto a randomly chosen ancilla: every qubit ends in
//! |1⟩, so the only possible measurement is all ones, but the gate layout
//! changes from one output to the next.

use qobf_ir::{Circuit, ClbitId, QubitId};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::ProgramResult;

pub const TRIGGER_QUBITS: u32 = 5;
pub const TRIGGER_NAME: &str = "smart_branch_obfuscator";

/// Build the trigger and the bitstring it always measures.
pub fn deterministic_circuit<R: Rng + ?Sized>(rng: &mut R) -> ProgramResult<(Circuit, String)> {
    let qubits: Vec<QubitId> = (0..TRIGGER_QUBITS).map(QubitId).collect();
    let ancilla = QubitId(rng.gen_range(0..TRIGGER_QUBITS));
    let mut controls: Vec<QubitId> = qubits.iter().copied().filter(|&q| q != ancilla).collect();
    controls.shuffle(rng);

    let mut circuit = Circuit::with_size(TRIGGER_NAME, TRIGGER_QUBITS, TRIGGER_QUBITS);
    for &q in &qubits {
        circuit.h(q)?;
    }
    circuit.z(ancilla)?;
    for &control in &controls {
        circuit.cx(control, ancilla)?;
    }
    for &q in &qubits {
        circuit.h(q)?;
    }
    for &q in &qubits {
        circuit.measure(q, ClbitId(q.0))?;
    }

    Ok((circuit, "1".repeat(TRIGGER_QUBITS as usize)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_trigger_layout() {
        let mut rng = StdRng::seed_from_u64(12);
        let (circuit, expected) = deterministic_circuit(&mut rng).unwrap();
        assert_eq!(expected, "11111");
        assert_eq!(circuit.name(), TRIGGER_NAME);
        assert_eq!(circuit.num_qubits(), 5);
        assert_eq!(circuit.num_clbits(), 5);

        let names: Vec<&str> = circuit.instructions().iter().map(|i| i.name()).collect();
        assert_eq!(&names[..5], ["h"; 5]);
        assert_eq!(names[5], "z");
        assert_eq!(&names[6..10], ["cx"; 4]);
        assert_eq!(&names[10..15], ["h"; 5]);
        assert_eq!(&names[15..], ["measure"; 5]);

        let ancilla = circuit.instructions()[5].qubits[0];
        let mut controls: Vec<u32> = circuit.instructions()[6..10]
            .iter()
            .map(|i| {
                assert_eq!(i.qubits[1], ancilla);
                i.qubits[0].0
            })
            .collect();
        controls.sort_unstable();
        let expected_controls: Vec<u32> = (0..5).filter(|&q| q != ancilla.0).collect();
        assert_eq!(controls, expected_controls);
    }
}
