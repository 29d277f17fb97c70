//! Circuits rendered as builder calls on a template's circuit variable.

use qobf_circuit::{NoiseSynthesizer, NoiseTier};
use qobf_ir::{Circuit, Instruction, QubitId};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::ProgramResult;

/// Separator between builder calls inside a template function body.
pub const LINE_SEPARATOR: &str = "\n    ";

/// One `<var>.<name>(params, qubits, clbits)` line per instruction.
///
/// Numeric parameters are written with 15 decimals.
pub fn circuit_lines(circuit: &Circuit, var: &str) -> Vec<String> {
    circuit
        .instructions()
        .iter()
        .map(|instruction| call_line(instruction, var))
        .collect()
}

fn call_line(instruction: &Instruction, var: &str) -> String {
    let args: Vec<String> = instruction
        .parameters()
        .into_iter()
        .map(|p| match p.as_f64() {
            Some(value) => format!("{value:.15}"),
            None => p.to_string(),
        })
        .chain(instruction.qubits.iter().map(|q| q.0.to_string()))
        .chain(instruction.clbits.iter().map(|c| c.0.to_string()))
        .collect();
    format!("{var}.{}({})", instruction.name(), args.join(", "))
}

/// Noise as template code: `repeats` sequences (at least one) of a random
/// tier on `targets`, all addressed through `var`.
///
/// A repeat for which the synthesizer finds nothing becomes one `h` per
/// target, so a template never goes without noise.
pub fn noise_snippet<R: Rng + ?Sized>(
    synthesizer: &NoiseSynthesizer,
    targets: &[u32],
    repeats: usize,
    var: &str,
    rng: &mut R,
) -> ProgramResult<String> {
    let targets: Vec<QubitId> = if targets.is_empty() {
        vec![QubitId(0)]
    } else {
        targets.iter().copied().map(QubitId).collect()
    };
    let width = targets.iter().map(|q| q.0).max().unwrap_or(0) + 1;

    let mut snippets = Vec::with_capacity(repeats.max(1));
    for _ in 0..repeats.max(1) {
        let tier = *NoiseTier::ALL.choose(rng).unwrap_or(&NoiseTier::Light);
        let mut scratch = Circuit::with_size("noise", width, 0);
        if let Err(e) = synthesizer.inject(&mut scratch, &targets, tier, rng) {
            debug!("Noise snippet falls back to h: {e}");
            scratch = Circuit::with_size("noise", width, 0);
            for &q in &targets {
                scratch.h(q)?;
            }
        }
        snippets.push(circuit_lines(&scratch, var).join(LINE_SEPARATOR));
    }
    Ok(snippets.join(LINE_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qobf_circuit::SequenceBank;
    use qobf_ir::{ClbitId, ParameterExpression};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_circuit_lines() {
        let mut circuit = Circuit::with_size("demo", 2, 1);
        circuit.h(QubitId(0)).unwrap();
        circuit
            .rz(ParameterExpression::constant(0.5), QubitId(1))
            .unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure(QubitId(1), ClbitId(0)).unwrap();

        assert_eq!(
            circuit_lines(&circuit, "qc"),
            [
                "qc.h(0)",
                "qc.rz(0.500000000000000, 1)",
                "qc.cx(0, 1)",
                "qc.measure(1, 0)",
            ]
        );
    }

    #[test]
    fn test_noise_snippet_uses_bank_sequences() {
        let synth = NoiseSynthesizer::new(&SequenceBank::new(vec![vec![
            "x".to_string(),
            "x".to_string(),
        ]]));
        let mut rng = StdRng::seed_from_u64(6);
        let snippet = noise_snippet(&synth, &[1], 2, "casss_q", &mut rng).unwrap();
        assert_eq!(
            snippet,
            "casss_q.x(1)\n    casss_q.x(1)\n    casss_q.x(1)\n    casss_q.x(1)"
        );
    }

    #[test]
    fn test_noise_snippet_falls_back_to_h() {
        let synth = NoiseSynthesizer::new(&SequenceBank::default());
        let mut rng = StdRng::seed_from_u64(0);
        let snippet = noise_snippet(&synth, &[0, 2], 0, "qc", &mut rng).unwrap();
        assert_eq!(snippet, "qc.h(0)\n    qc.h(2)");
    }
}
