//! Property-based tests for QASM 2 emit/parse.
//!
//! Obfuscated circuits are always written as QASM 2 and must read back
//! as the same instruction list.

use qobf_ir::{Circuit, ParameterExpression, QubitId};
use qobf_qasm::{emit_qasm2, parse};
use proptest::prelude::*;

/// Generate a random circuit with 1-5 qubits and 1-12 gates.
fn arb_simple_circuit() -> impl Strategy<Value = Circuit> {
    (1_u32..=5).prop_flat_map(|num_qubits| {
        (
            Just(num_qubits),
            prop::collection::vec(arb_gate_op(num_qubits), 1..=12),
            any::<bool>(),
        )
            .prop_map(|(nq, ops, measure)| {
                let mut circuit = Circuit::with_size("test", nq, 0);
                for op in ops {
                    op.apply(&mut circuit);
                }
                if measure {
                    let _ = circuit.measure_all();
                }
                circuit
            })
    })
}

#[derive(Debug, Clone)]
enum GateOp {
    H(u32),
    X(u32),
    T(u32),
    Rz(i32, u32),
    CX(u32, u32),
}

impl GateOp {
    fn apply(self, circuit: &mut Circuit) {
        match self {
            GateOp::H(q) => {
                let _ = circuit.h(QubitId(q));
            }
            GateOp::X(q) => {
                let _ = circuit.x(QubitId(q));
            }
            GateOp::T(q) => {
                let _ = circuit.t(QubitId(q));
            }
            GateOp::Rz(denominator, q) => {
                let angle = ParameterExpression::Pi / ParameterExpression::from(denominator);
                let _ = circuit.rz(angle, QubitId(q));
            }
            GateOp::CX(c, t) => {
                let _ = circuit.cx(QubitId(c), QubitId(t));
            }
        }
    }
}

fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
    let single = prop_oneof![
        (0..num_qubits).prop_map(GateOp::H),
        (0..num_qubits).prop_map(GateOp::X),
        (0..num_qubits).prop_map(GateOp::T),
        (1_i32..=8, 0..num_qubits).prop_map(|(d, q)| GateOp::Rz(d, q)),
    ];
    if num_qubits < 2 {
        single.boxed()
    } else {
        prop_oneof![
            single,
            (0..num_qubits, 0..num_qubits)
                .prop_filter("Control and target must differ", |(c, t)| c != t)
                .prop_map(|(c, t)| GateOp::CX(c, t)),
        ]
        .boxed()
    }
}

proptest! {
    #[test]
    fn test_qasm2_roundtrip_preserves_instructions(circuit in arb_simple_circuit()) {
        let qasm = emit_qasm2(&circuit).expect("emit failed");
        let parsed = parse(&qasm).expect("reparse failed");

        prop_assert_eq!(parsed.num_qubits(), circuit.num_qubits());
        prop_assert_eq!(parsed.num_clbits(), circuit.num_clbits());
        prop_assert_eq!(parsed.instructions(), circuit.instructions());
        prop_assert_eq!(parsed.depth(), circuit.depth());
    }

    #[test]
    fn test_empty_circuit_roundtrip(num_qubits in 1_u32..=10, num_clbits in 0_u32..=10) {
        let circuit = Circuit::with_size("empty", num_qubits, num_clbits);

        let qasm = emit_qasm2(&circuit).expect("emit failed");
        let parsed = parse(&qasm).expect("reparse failed");

        prop_assert_eq!(parsed.num_qubits(), num_qubits as usize);
        prop_assert_eq!(parsed.num_clbits(), num_clbits as usize);
        prop_assert!(parsed.is_empty());
    }

    #[test]
    fn test_qasm_generation_is_deterministic(circuit in arb_simple_circuit()) {
        prop_assert_eq!(emit_qasm2(&circuit).unwrap(), emit_qasm2(&circuit).unwrap());
    }
}
