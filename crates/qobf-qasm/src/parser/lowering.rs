//! Syntax tree to circuit lowering.

use qobf_ir::{Circuit, ClbitId, ParameterExpression, QubitId, StandardGate};
use rustc_hash::FxHashMap;

use crate::ast::{BinOp, Expression, GateCall, OperandRef, Program, Statement};
use crate::error::{ParseError, ParseResult};

/// Lower a parsed program to a circuit.
pub(super) fn lower_to_circuit(program: &Program) -> ParseResult<Circuit> {
    let mut lowerer = Lowerer::default();
    lowerer.lower(program)
}

#[derive(Default)]
struct Lowerer {
    /// Qubit registers: name -> (`start_id`, size).
    qregs: FxHashMap<String, (u32, u32)>,
    /// Classical registers: name -> (`start_id`, size).
    cregs: FxHashMap<String, (u32, u32)>,
    next_qubit: u32,
    next_clbit: u32,
}

impl Lowerer {
    fn lower(&mut self, program: &Program) -> ParseResult<Circuit> {
        for stmt in &program.statements {
            match stmt {
                Statement::QubitDecl { name, size } => {
                    declare(&mut self.qregs, &mut self.next_qubit, name, *size)?;
                }
                Statement::BitDecl { name, size } => {
                    declare(&mut self.cregs, &mut self.next_clbit, name, *size)?;
                }
                _ => {}
            }
        }

        let mut circuit = Circuit::with_size("circuit", self.next_qubit, self.next_clbit);
        for stmt in &program.statements {
            self.lower_statement(&mut circuit, stmt)?;
        }
        Ok(circuit)
    }

    fn lower_statement(&self, circuit: &mut Circuit, stmt: &Statement) -> ParseResult<()> {
        match stmt {
            Statement::QubitDecl { .. } | Statement::BitDecl { .. } | Statement::Include => {
                Ok(())
            }

            Statement::GateDef { name, .. } => {
                if StandardGate::arity_of(&name.to_lowercase()).is_some() {
                    Ok(())
                } else {
                    Err(ParseError::Unsupported(format!(
                        "definition of non-standard gate '{name}'"
                    )))
                }
            }

            Statement::Gate(call) => self.lower_gate_call(circuit, call),

            Statement::Measure { qubits, bits } => {
                let q_ids = self.resolve_qubits(qubits)?;
                let c_ids = if bits.is_empty() {
                    let ids: Vec<_> = q_ids.iter().map(|q| ClbitId(q.0)).collect();
                    circuit.ensure_clbits(ids.iter().map(|c| c.0 + 1).max().unwrap_or(0));
                    ids
                } else {
                    self.resolve_clbits(bits)?
                };

                if q_ids.len() != c_ids.len() {
                    return Err(ParseError::BroadcastMismatch {
                        gate: "measure".into(),
                        sizes: vec![q_ids.len(), c_ids.len()],
                    });
                }
                for (q, c) in q_ids.into_iter().zip(c_ids) {
                    circuit.measure(q, c)?;
                }
                Ok(())
            }

            Statement::Reset { qubits } => {
                for q in self.resolve_qubits(qubits)? {
                    circuit.reset(q)?;
                }
                Ok(())
            }

            Statement::Barrier { qubits } => {
                let q_ids = self.resolve_qubits(qubits)?;
                if q_ids.is_empty() {
                    circuit.barrier_all()?;
                } else {
                    circuit.barrier(q_ids)?;
                }
                Ok(())
            }
        }
    }

    fn lower_gate_call(&self, circuit: &mut Circuit, call: &GateCall) -> ParseResult<()> {
        let lowered = call.name.to_lowercase();
        let mut params: Vec<_> = call
            .params
            .iter()
            .map(expr_to_param)
            .collect::<ParseResult<_>>()?;

        let name = match lowered.as_str() {
            "u3" => "u",
            "u1" => "p",
            "cphase" => "cp",
            "u2" => {
                check_param_count("u2", &params, 2)?;
                params.insert(0, ParameterExpression::Pi / ParameterExpression::from(2));
                "u"
            }
            other => other,
        };

        let arity = StandardGate::arity_of(name)
            .ok_or_else(|| ParseError::UnknownGate(call.name.clone()))?;
        let expected_params = StandardGate::param_count_of(name).unwrap_or(0);
        check_param_count(name, &params, expected_params)?;

        if call.qubits.len() != arity as usize {
            return Err(ParseError::WrongQubitCount {
                gate: name.into(),
                expected: arity as usize,
                got: call.qubits.len(),
            });
        }

        let operands: Vec<Vec<QubitId>> = call
            .qubits
            .iter()
            .map(|r| self.resolve_qubits(std::slice::from_ref(r)))
            .collect::<ParseResult<_>>()?;

        for qubits in broadcast(name, &operands)? {
            let gate = StandardGate::from_name(name, params.clone())
                .ok_or_else(|| ParseError::UnknownGate(call.name.clone()))?;
            circuit.gate(gate, qubits)?;
        }
        Ok(())
    }

    fn resolve_qubits(&self, refs: &[OperandRef]) -> ParseResult<Vec<QubitId>> {
        Ok(resolve(&self.qregs, refs)?.into_iter().map(QubitId).collect())
    }

    fn resolve_clbits(&self, refs: &[OperandRef]) -> ParseResult<Vec<ClbitId>> {
        Ok(resolve(&self.cregs, refs)?.into_iter().map(ClbitId).collect())
    }
}

fn declare(
    registers: &mut FxHashMap<String, (u32, u32)>,
    next: &mut u32,
    name: &str,
    size: u32,
) -> ParseResult<()> {
    if registers.contains_key(name) {
        return Err(ParseError::DuplicateDeclaration(name.to_string()));
    }
    registers.insert(name.to_string(), (*next, size));
    *next += size;
    Ok(())
}

fn resolve(
    registers: &FxHashMap<String, (u32, u32)>,
    refs: &[OperandRef],
) -> ParseResult<Vec<u32>> {
    let mut ids = Vec::new();
    for r in refs {
        let (start, size) = registers
            .get(&r.register)
            .ok_or_else(|| ParseError::UndefinedIdentifier(r.register.clone()))?;
        match r.index {
            Some(idx) if idx >= *size => {
                return Err(ParseError::IndexOutOfBounds {
                    register: r.register.clone(),
                    index: idx as usize,
                    size: *size as usize,
                });
            }
            Some(idx) => ids.push(start + idx),
            None => ids.extend(*start..start + size),
        }
    }
    Ok(ids)
}

/// Expand register operands: single elements are repeated, whole registers
/// are zipped element by element and must all have the same size.
fn broadcast(gate: &str, operands: &[Vec<QubitId>]) -> ParseResult<Vec<Vec<QubitId>>> {
    let width = operands
        .iter()
        .map(Vec::len)
        .filter(|&len| len != 1)
        .try_fold(None, |acc: Option<usize>, len| match acc {
            Some(w) if w != len => Err(()),
            _ => Ok(Some(len)),
        })
        .map_err(|()| ParseError::BroadcastMismatch {
            gate: gate.into(),
            sizes: operands.iter().map(Vec::len).collect(),
        })?
        .unwrap_or(1);

    Ok((0..width)
        .map(|i| {
            operands
                .iter()
                .map(|op| if op.len() == 1 { op[0] } else { op[i] })
                .collect()
        })
        .collect())
}

/// Convert a syntax-tree expression to a gate parameter.
pub(super) fn expr_to_param(expr: &Expression) -> ParseResult<ParameterExpression> {
    Ok(match expr {
        #[allow(clippy::cast_precision_loss)]
        Expression::Int(v) => ParameterExpression::Constant(*v as f64),
        Expression::Float(v) => ParameterExpression::Constant(*v),
        Expression::Pi => ParameterExpression::Pi,
        Expression::Tau => ParameterExpression::from(2) * ParameterExpression::Pi,
        Expression::Euler => ParameterExpression::Constant(std::f64::consts::E),
        Expression::Identifier(name) => {
            return Err(ParseError::InvalidParameter(format!(
                "unknown name '{name}'"
            )));
        }
        Expression::Neg(e) => -expr_to_param(e)?,
        Expression::BinOp { left, op, right } => {
            let l = expr_to_param(left)?;
            let r = expr_to_param(right)?;
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Pow => ParameterExpression::Pow(Box::new(l), Box::new(r)),
                BinOp::Mod => {
                    let (a, b) = (evaluate(&l)?, evaluate(&r)?);
                    ParameterExpression::Constant(a % b)
                }
            }
        }
        Expression::FnCall { name, args } => {
            let [arg] = args.as_slice() else {
                return Err(ParseError::InvalidParameter(format!(
                    "{name}() takes exactly one argument"
                )));
            };
            let arg = expr_to_param(arg)?;
            match name.as_str() {
                "exp" => ParameterExpression::Exp(Box::new(arg)),
                "sin" => ParameterExpression::Constant(evaluate(&arg)?.sin()),
                "cos" => ParameterExpression::Constant(evaluate(&arg)?.cos()),
                "tan" => ParameterExpression::Constant(evaluate(&arg)?.tan()),
                "sqrt" => ParameterExpression::Constant(evaluate(&arg)?.sqrt()),
                "ln" => ParameterExpression::Constant(evaluate(&arg)?.ln()),
                _ => {
                    return Err(ParseError::InvalidParameter(format!(
                        "unknown function '{name}'"
                    )));
                }
            }
        }
    })
}

fn evaluate(param: &ParameterExpression) -> ParseResult<f64> {
    param
        .as_f64()
        .ok_or_else(|| ParseError::InvalidParameter(format!("'{param}' is not a finite number")))
}

fn check_param_count(
    gate: &str,
    params: &[ParameterExpression],
    expected: usize,
) -> ParseResult<()> {
    if params.len() == expected {
        Ok(())
    } else {
        Err(ParseError::WrongParameterCount {
            gate: gate.into(),
            expected,
            got: params.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_single_operands() {
        let ops = vec![vec![QubitId(0)], vec![QubitId(1)]];
        assert_eq!(
            broadcast("cx", &ops).unwrap(),
            vec![vec![QubitId(0), QubitId(1)]]
        );
    }

    #[test]
    fn test_broadcast_register_with_single() {
        let ops = vec![vec![QubitId(0)], vec![QubitId(1), QubitId(2)]];
        assert_eq!(
            broadcast("cx", &ops).unwrap(),
            vec![vec![QubitId(0), QubitId(1)], vec![QubitId(0), QubitId(2)]]
        );
    }

    #[test]
    fn test_expr_to_param_rejects_identifier() {
        let err = expr_to_param(&Expression::Identifier("theta".into())).unwrap_err();
        assert!(matches!(err, ParseError::InvalidParameter(_)));
    }
}
