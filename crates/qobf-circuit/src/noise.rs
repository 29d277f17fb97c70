//! Noise synthesis: appending identity sequences from the inverse bank.
//!
//! The bank is split into tiers by sequence length. Selection draws at
//! random from the requested tier and rejects sequences that need more
//! qubits than the caller offers. After a bounded number of draws it falls
//! back to the light tier, and when that also fails the caller gets
//! [`ObfuscationError::NoiseBankExhausted`] instead of a silently wrong
//! circuit.

use std::fmt;
use std::str::FromStr;

use qobf_ir::{Circuit, QubitId};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::catalog::{SequenceBank, TokenSequence};
use crate::error::{ObfuscationError, ObfuscationResult};
use crate::token::{apply_sequence, token_arity};

/// Draws from the requested tier before falling back.
const PRIMARY_ATTEMPTS: usize = 50;
/// Draws from the light tier after the primary phase failed.
const FALLBACK_ATTEMPTS: usize = 200;

/// Length class of a noise sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoiseTier {
    /// 2 to 4 gates.
    Light,
    /// 5 to 8 gates.
    Medium,
    /// More than 8 gates.
    Heavy,
}

impl NoiseTier {
    pub const ALL: [NoiseTier; 3] = [NoiseTier::Light, NoiseTier::Medium, NoiseTier::Heavy];

    pub fn name(self) -> &'static str {
        match self {
            NoiseTier::Light => "light",
            NoiseTier::Medium => "medium",
            NoiseTier::Heavy => "heavy",
        }
    }

    fn admits(self, len: usize) -> bool {
        match self {
            NoiseTier::Light => (2..=4).contains(&len),
            NoiseTier::Medium => (5..=8).contains(&len),
            NoiseTier::Heavy => len > 8,
        }
    }

    fn index(self) -> usize {
        match self {
            NoiseTier::Light => 0,
            NoiseTier::Medium => 1,
            NoiseTier::Heavy => 2,
        }
    }
}

impl fmt::Display for NoiseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoiseTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(NoiseTier::Light),
            "medium" => Ok(NoiseTier::Medium),
            "heavy" => Ok(NoiseTier::Heavy),
            other => Err(format!("unknown noise tier '{other}'")),
        }
    }
}

/// Tiered view over the inverse bank.
#[derive(Debug, Clone)]
pub struct NoiseSynthesizer {
    bank: Vec<TokenSequence>,
    /// Indices into `bank` per tier; an empty tier holds every index.
    tiers: [Vec<usize>; 3],
}

impl NoiseSynthesizer {
    pub fn new(bank: &SequenceBank) -> Self {
        let bank = bank.sequences().to_vec();
        let tiers = NoiseTier::ALL.map(|tier| {
            let members: Vec<usize> = bank
                .iter()
                .enumerate()
                .filter(|(_, seq)| tier.admits(seq.len()))
                .map(|(i, _)| i)
                .collect();
            if members.is_empty() {
                (0..bank.len()).collect()
            } else {
                members
            }
        });
        Self { bank, tiers }
    }

    pub fn is_empty(&self) -> bool {
        self.bank.is_empty()
    }

    /// Sequences of one tier.
    pub fn tier(&self, tier: NoiseTier) -> impl Iterator<Item = &TokenSequence> {
        self.tiers[tier.index()].iter().map(|&i| &self.bank[i])
    }

    /// Pick a sequence usable with `num_targets` qubits.
    pub fn select<R: Rng + ?Sized>(
        &self,
        num_targets: usize,
        tier: NoiseTier,
        rng: &mut R,
    ) -> ObfuscationResult<&TokenSequence> {
        let phases = [
            (tier, PRIMARY_ATTEMPTS),
            (NoiseTier::Light, FALLBACK_ATTEMPTS),
        ];
        for (phase, (tier, attempts)) in phases.into_iter().enumerate() {
            let candidates = &self.tiers[tier.index()];
            for _ in 0..attempts {
                let Some(&index) = candidates.choose(rng) else {
                    break;
                };
                let sequence = &self.bank[index];
                if fits(sequence, num_targets) {
                    return Ok(sequence);
                }
            }
            if phase == 0 {
                debug!("No {tier} noise fits {num_targets} qubit(s), falling back to light tier");
            }
        }
        Err(ObfuscationError::NoiseBankExhausted { num_targets })
    }

    /// Append one selected sequence on `targets`; returns the number of
    /// gates added.
    pub fn inject<R: Rng + ?Sized>(
        &self,
        circuit: &mut Circuit,
        targets: &[QubitId],
        tier: NoiseTier,
        rng: &mut R,
    ) -> ObfuscationResult<usize> {
        let sequence = self.select(targets.len(), tier, rng)?;
        Ok(apply_sequence(circuit, sequence, targets))
    }
}

/// Whether a sequence can run on `num_targets` qubits. Multi-qubit tokens
/// are only ruled out when a single qubit is available.
fn fits(sequence: &[String], num_targets: usize) -> bool {
    num_targets >= 2 || sequence.iter().all(|t| token_arity(t).is_none_or(|a| a < 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bank(sequences: &[&[&str]]) -> SequenceBank {
        SequenceBank::new(
            sequences
                .iter()
                .map(|s| s.iter().map(ToString::to_string).collect())
                .collect(),
        )
    }

    #[test]
    fn test_tiers_by_length() {
        let synth = NoiseSynthesizer::new(&bank(&[
            &["h", "h"],
            &["x", "x", "y", "y", "z"],
            &["h"; 10],
        ]));
        assert_eq!(synth.tier(NoiseTier::Light).count(), 1);
        assert_eq!(synth.tier(NoiseTier::Medium).count(), 1);
        assert_eq!(synth.tier(NoiseTier::Heavy).count(), 1);
    }

    #[test]
    fn test_empty_tier_aliases_whole_bank() {
        let synth = NoiseSynthesizer::new(&bank(&[&["h", "h"], &["x", "x"]]));
        assert_eq!(synth.tier(NoiseTier::Heavy).count(), 2);
        assert_eq!(synth.tier(NoiseTier::Medium).count(), 2);
    }

    #[test]
    fn test_single_target_rejects_multi_qubit_sequences() {
        let synth = NoiseSynthesizer::new(&bank(&[&["cx", "cx"], &["s", "sdg"]]));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let seq = synth.select(1, NoiseTier::Light, &mut rng).unwrap();
            assert_eq!(seq, &vec!["s".to_string(), "sdg".to_string()]);
        }
    }

    #[test]
    fn test_falls_back_to_light_tier() {
        // Medium holds only a two-qubit sequence; light has a 1q one.
        let synth = NoiseSynthesizer::new(&bank(&[
            &["cx", "h", "h", "cx", "z", "z"],
            &["t", "tdg"],
        ]));
        let mut rng = StdRng::seed_from_u64(1);
        let seq = synth.select(1, NoiseTier::Medium, &mut rng).unwrap();
        assert_eq!(seq, &vec!["t".to_string(), "tdg".to_string()]);
    }

    #[test]
    fn test_exhausted_bank_is_an_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let empty = NoiseSynthesizer::new(&SequenceBank::default());
        assert!(matches!(
            empty.select(2, NoiseTier::Light, &mut rng),
            Err(ObfuscationError::NoiseBankExhausted { num_targets: 2 })
        ));

        let only_2q = NoiseSynthesizer::new(&bank(&[&["cz", "cz"]]));
        assert!(matches!(
            only_2q.select(1, NoiseTier::Heavy, &mut rng),
            Err(ObfuscationError::NoiseBankExhausted { num_targets: 1 })
        ));
    }

    #[test]
    fn test_inject_appends_on_targets() {
        let synth = NoiseSynthesizer::new(&bank(&[&["cx", "cx"]]));
        let mut circuit = Circuit::with_size("c", 3, 0);
        let mut rng = StdRng::seed_from_u64(11);
        let added = synth
            .inject(&mut circuit, &[QubitId(2), QubitId(0)], NoiseTier::Light, &mut rng)
            .unwrap();
        assert_eq!(added, 2);
        assert!(circuit
            .instructions()
            .iter()
            .all(|i| i.qubits == vec![QubitId(2), QubitId(0)]));
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!("Medium".parse::<NoiseTier>(), Ok(NoiseTier::Medium));
        assert!("extreme".parse::<NoiseTier>().is_err());
    }
}
