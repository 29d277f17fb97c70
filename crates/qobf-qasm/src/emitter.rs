//! `OpenQASM` 2.0 emitter.

use qobf_ir::{Circuit, ClbitId, Gate, Instruction, InstructionKind, QubitId, StandardGate};

use crate::error::ParseResult;

/// Definitions for standard gates that `qelib1.inc` does not provide.
const ISWAP_DEF: &str = "gate iswap a, b { s a; s b; h a; cx a,b; cx b,a; h b; }";
const RYY_DEF: &str = "gate ryy(theta) a, b { rx(pi/2) a; rx(pi/2) b; cx a,b; rz(theta) b; cx a,b; rx(-pi/2) a; rx(-pi/2) b; }";

/// Emit a circuit as `OpenQASM` 2.0 source code.
///
/// Registers are written as a single `qreg q[n];` and `creg c[m];` and
/// measurements as `measure q[i] -> c[j];`. `iswap` and `ryy` get inline
/// `gate` definitions so the output only depends on `qelib1.inc`. Custom
/// gates are written by name; their definitions are not reproduced.
pub fn emit_qasm2(circuit: &Circuit) -> ParseResult<String> {
    let mut emitter = Qasm2Emitter::default();
    emitter.emit_circuit(circuit);
    Ok(emitter.output)
}

#[derive(Default)]
struct Qasm2Emitter {
    output: String,
}

impl Qasm2Emitter {
    fn emit_circuit(&mut self, circuit: &Circuit) {
        let uses = |wanted: &StandardGate| {
            circuit.instructions().iter().any(|inst| {
                matches!(&inst.kind, InstructionKind::Gate(Gate::Standard(g))
                    if std::mem::discriminant(g) == std::mem::discriminant(wanted))
            })
        };
        let needs_iswap = uses(&StandardGate::ISwap);
        let needs_ryy = uses(&StandardGate::RYY(0.0.into()));

        self.writeln("OPENQASM 2.0;");
        self.writeln("include \"qelib1.inc\";");
        if needs_iswap {
            self.writeln(ISWAP_DEF);
        }
        if needs_ryy {
            self.writeln(RYY_DEF);
        }

        if circuit.num_qubits() > 0 {
            self.writeln(&format!("qreg q[{}];", circuit.num_qubits()));
        }
        if circuit.num_clbits() > 0 {
            self.writeln(&format!("creg c[{}];", circuit.num_clbits()));
        }

        for instruction in circuit.instructions() {
            self.emit_instruction(instruction);
        }
    }

    fn emit_instruction(&mut self, instruction: &Instruction) {
        let qubits = emit_qubits(&instruction.qubits);
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let params = gate.parameters();
                if params.is_empty() {
                    self.writeln(&format!("{} {qubits};", gate.name()));
                } else {
                    let params = params
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(",");
                    self.writeln(&format!("{}({params}) {qubits};", gate.name()));
                }
            }
            InstructionKind::Measure => {
                for (q, c) in instruction.qubits.iter().zip(&instruction.clbits) {
                    self.writeln(&format!("measure {} -> {};", emit_qubit(*q), emit_clbit(*c)));
                }
            }
            InstructionKind::Reset => self.writeln(&format!("reset {qubits};")),
            InstructionKind::Barrier => self.writeln(&format!("barrier {qubits};")),
        }
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

fn emit_qubit(q: QubitId) -> String {
    format!("q[{}]", q.0)
}

fn emit_clbit(c: ClbitId) -> String {
    format!("c[{}]", c.0)
}

fn emit_qubits(qubits: &[QubitId]) -> String {
    qubits
        .iter()
        .map(|q| emit_qubit(*q))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use qobf_ir::ParameterExpression;

    #[test]
    fn test_emit_bell_state() {
        let mut circuit = Circuit::with_size("bell", 2, 2);
        circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure_all().unwrap();

        let qasm = emit_qasm2(&circuit).unwrap();
        assert!(qasm.starts_with("OPENQASM 2.0;\ninclude \"qelib1.inc\";\n"));
        assert!(qasm.contains("qreg q[2];"));
        assert!(qasm.contains("creg c[2];"));
        assert!(qasm.contains("h q[0];"));
        assert!(qasm.contains("cx q[0],q[1];"));
        assert!(qasm.contains("measure q[1] -> c[1];"));
        assert!(!qasm.contains("gate "));
    }

    #[test]
    fn test_emit_parameterized() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit
            .rz(ParameterExpression::Pi / ParameterExpression::from(4), QubitId(0))
            .unwrap();

        let qasm = emit_qasm2(&circuit).unwrap();
        assert!(qasm.contains("rz(pi/4) q[0];"));
        assert!(!qasm.contains("creg"));
    }

    #[test]
    fn test_emit_adds_missing_definitions() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit
            .gate(StandardGate::ISwap, [QubitId(0), QubitId(1)])
            .unwrap();
        let qasm = emit_qasm2(&circuit).unwrap();
        assert!(qasm.contains(ISWAP_DEF));
        assert!(!qasm.contains("gate ryy"));
    }

    #[test]
    fn test_emitted_text_reparses() {
        let mut circuit = Circuit::with_size("test", 3, 3);
        circuit
            .h(QubitId(0))
            .unwrap()
            .gate(StandardGate::RYY(0.5.into()), [QubitId(1), QubitId(2)])
            .unwrap()
            .ccx(QubitId(0), QubitId(1), QubitId(2))
            .unwrap()
            .barrier_all()
            .unwrap()
            .measure_all()
            .unwrap();

        let reparsed = crate::parse(&emit_qasm2(&circuit).unwrap()).unwrap();
        assert_eq!(reparsed.instructions(), circuit.instructions());
    }
}
