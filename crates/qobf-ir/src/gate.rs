//! Gate table.

use serde::{Deserialize, Serialize};

use crate::parameter::ParameterExpression;

/// Gates with a fixed name, arity and parameter count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase gate.
    P(ParameterExpression),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),

    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around X.
    CRx(ParameterExpression),
    /// Controlled rotation around Y.
    CRy(ParameterExpression),
    /// Controlled rotation around Z.
    CRz(ParameterExpression),
    /// Controlled phase gate.
    CP(ParameterExpression),
    /// XX rotation gate.
    RXX(ParameterExpression),
    /// YY rotation gate.
    RYY(ParameterExpression),
    /// ZZ rotation gate.
    RZZ(ParameterExpression),

    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

/// `(name, qubits, parameters)` for every standard gate.
const GATE_TABLE: &[(&str, u32, usize)] = &[
    ("id", 1, 0),
    ("x", 1, 0),
    ("y", 1, 0),
    ("z", 1, 0),
    ("h", 1, 0),
    ("s", 1, 0),
    ("sdg", 1, 0),
    ("t", 1, 0),
    ("tdg", 1, 0),
    ("sx", 1, 0),
    ("sxdg", 1, 0),
    ("rx", 1, 1),
    ("ry", 1, 1),
    ("rz", 1, 1),
    ("p", 1, 1),
    ("u", 1, 3),
    ("cx", 2, 0),
    ("cy", 2, 0),
    ("cz", 2, 0),
    ("ch", 2, 0),
    ("swap", 2, 0),
    ("iswap", 2, 0),
    ("crx", 2, 1),
    ("cry", 2, 1),
    ("crz", 2, 1),
    ("cp", 2, 1),
    ("rxx", 2, 1),
    ("ryy", 2, 1),
    ("rzz", 2, 1),
    ("ccx", 3, 0),
    ("cswap", 3, 0),
];

impl StandardGate {
    /// Build a gate from its lowercase name and parameter list.
    ///
    /// Returns `None` when the name is not in the table or the number of
    /// parameters differs from what the gate declares. `cnot`, `toffoli`,
    /// `fredkin`, `i` and `phase` are accepted as aliases.
    pub fn from_name(name: &str, params: Vec<ParameterExpression>) -> Option<Self> {
        let name = canonical_name(name);
        let (_, _, expected) = GATE_TABLE.iter().find(|(n, _, _)| *n == name)?;
        if params.len() != *expected {
            return None;
        }
        let mut params = params.into_iter();
        let mut next = || params.next();
        let gate = match name {
            "id" => StandardGate::I,
            "x" => StandardGate::X,
            "y" => StandardGate::Y,
            "z" => StandardGate::Z,
            "h" => StandardGate::H,
            "s" => StandardGate::S,
            "sdg" => StandardGate::Sdg,
            "t" => StandardGate::T,
            "tdg" => StandardGate::Tdg,
            "sx" => StandardGate::SX,
            "sxdg" => StandardGate::SXdg,
            "rx" => StandardGate::Rx(next()?),
            "ry" => StandardGate::Ry(next()?),
            "rz" => StandardGate::Rz(next()?),
            "p" => StandardGate::P(next()?),
            "u" => StandardGate::U(next()?, next()?, next()?),
            "cx" => StandardGate::CX,
            "cy" => StandardGate::CY,
            "cz" => StandardGate::CZ,
            "ch" => StandardGate::CH,
            "swap" => StandardGate::Swap,
            "iswap" => StandardGate::ISwap,
            "crx" => StandardGate::CRx(next()?),
            "cry" => StandardGate::CRy(next()?),
            "crz" => StandardGate::CRz(next()?),
            "cp" => StandardGate::CP(next()?),
            "rxx" => StandardGate::RXX(next()?),
            "ryy" => StandardGate::RYY(next()?),
            "rzz" => StandardGate::RZZ(next()?),
            "ccx" => StandardGate::CCX,
            "cswap" => StandardGate::CSwap,
            _ => return None,
        };
        Some(gate)
    }

    /// Arity of the named gate, if it is in the table.
    pub fn arity_of(name: &str) -> Option<u32> {
        let name = canonical_name(name);
        GATE_TABLE
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, q, _)| *q)
    }

    /// Number of parameters the named gate declares, if it is in the table.
    pub fn param_count_of(name: &str) -> Option<usize> {
        let name = canonical_name(name);
        GATE_TABLE
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, _, p)| *p)
    }

    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(_, _, _) => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RYY(_) => "ryy",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::SX
            | StandardGate::SXdg
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_)
            | StandardGate::U(_, _, _) => 1,

            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::CRx(_)
            | StandardGate::CRy(_)
            | StandardGate::CRz(_)
            | StandardGate::CP(_)
            | StandardGate::RXX(_)
            | StandardGate::RYY(_)
            | StandardGate::RZZ(_) => 2,

            StandardGate::CCX | StandardGate::CSwap => 3,
        }
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p) => vec![p],

            StandardGate::U(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }
}

fn canonical_name(name: &str) -> &str {
    match name {
        "i" => "id",
        "cnot" => "cx",
        "toffoli" => "ccx",
        "fredkin" => "cswap",
        "phase" => "p",
        other => other,
    }
}

/// A gate outside the standard table, carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// The name of the gate.
    pub name: String,
    /// The number of qubits it operates on.
    pub num_qubits: u32,
    /// Parameters of the gate.
    pub params: Vec<ParameterExpression>,
}

impl CustomGate {
    /// Create a new custom gate.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            params: vec![],
        }
    }

    /// Add parameters to the gate.
    #[must_use]
    pub fn with_params(mut self, params: Vec<ParameterExpression>) -> Self {
        self.params = params;
        self
    }
}

/// A quantum gate, either standard or custom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gate {
    /// A gate from the standard table.
    Standard(StandardGate),
    /// Any other gate.
    Custom(CustomGate),
}

impl Gate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            Gate::Standard(g) => g.name(),
            Gate::Custom(g) => &g.name,
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            Gate::Standard(g) => g.num_qubits(),
            Gate::Custom(g) => g.num_qubits,
        }
    }

    /// Get the parameters.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            Gate::Standard(g) => g.parameters(),
            Gate::Custom(g) => g.params.iter().collect(),
        }
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::Standard(gate)
    }
}

impl From<CustomGate> for Gate {
    fn from(gate: CustomGate) -> Self {
        Gate::Custom(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::CCX.num_qubits(), 3);
        assert!(StandardGate::H.parameters().is_empty());
        assert_eq!(StandardGate::Rz(0.5.into()).parameters().len(), 1);
    }

    #[test]
    fn test_from_name_checks_parameter_count() {
        assert_eq!(StandardGate::from_name("h", vec![]), Some(StandardGate::H));
        assert_eq!(StandardGate::from_name("h", vec![1.0.into()]), None);
        assert_eq!(StandardGate::from_name("rz", vec![]), None);
        assert_eq!(
            StandardGate::from_name("rz", vec![0.25.into()]),
            Some(StandardGate::Rz(0.25.into()))
        );
        assert_eq!(StandardGate::from_name("warp", vec![]), None);
    }

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(StandardGate::from_name("cnot", vec![]), Some(StandardGate::CX));
        assert_eq!(StandardGate::from_name("i", vec![]), Some(StandardGate::I));
    }

    #[test]
    fn test_name_round_trips_through_table() {
        for (name, qubits, params) in GATE_TABLE {
            let args = vec![ParameterExpression::from(1); *params];
            let gate = StandardGate::from_name(name, args).unwrap();
            assert_eq!(gate.name(), *name);
            assert_eq!(gate.num_qubits(), *qubits);
            assert_eq!(StandardGate::arity_of(name), Some(*qubits));
        }
    }

    #[test]
    fn test_custom_gate() {
        let gate = Gate::from(CustomGate::new("oracle", 4));
        assert_eq!(gate.name(), "oracle");
        assert_eq!(gate.num_qubits(), 4);
    }
}
