//! Parse → unparse → parse stability.
//!
//! Unparsed text must parse back to the same tree, both for realistic
//! programs and for randomly generated operator expressions where the
//! unparser has to choose parentheses.

use proptest::prelude::*;
use qobf_script::ast::{BoolOperator, CmpOp, Operator, UnaryOperator};
use qobf_script::{Expr, parse, parse_expression, unparse, unparse_expr};

const PAYLOAD: &str = r#"
import math
import random
from collections import defaultdict


class Calculator:
    """Adds two numbers and takes the sine."""

    def __init__(self, a, b=2):
        self.a = a
        self.b = b

    @staticmethod
    def describe(*args, **kwargs):
        return ", ".join(str(a) for a in args)

    def sine_of_sum(self):
        return math.sin(self.a + self.b)


def fibonacci(n: int) -> list:
    seq = [0, 1]
    while len(seq) < n:
        seq.append(seq[-1] + seq[-2])
    return seq[:n]


total = 0


def bump(step=1):
    global total
    total += step
    return total


counts = defaultdict(int)
for word in "the quick brown the".split():
    counts[word] += 1
ranked = sorted(counts.items(), key=lambda kv: (-kv[1], kv[0]))

try:
    ratio = 10 / 0
except ZeroDivisionError as exc:
    ratio = None
else:
    pass
finally:
    done = True

if __name__ == "__main__":
    calc = Calculator(3, b=4)
    print(f"{calc.sine_of_sum():.3f}", fibonacci(10), dict(counts))
    print(ranked[0] if ranked else None, bump(), random.random() > 2)
"#;

const HOST_SCRIPT: &str = r#"
from qiskit import QuantumCircuit


def get_circuit():
    qc = QuantumCircuit(3, 3, name='ghz')
    qc.h(0)
    for i in range(2):
        qc.cx(i, i + 1)
    qc.rz(3.141592653589793 / 4, 2)
    qc.barrier()
    qc.measure([0, 1, 2], [0, 1, 2])
    return qc
"#;

#[test]
fn test_payload_roundtrip() {
    let tree = parse(PAYLOAD).unwrap();
    let text = unparse(&tree).unwrap();
    assert_eq!(parse(&text).unwrap(), tree);
    assert_eq!(unparse(&parse(&text).unwrap()).unwrap(), text);
}

#[test]
fn test_host_script_roundtrip() {
    let tree = parse(HOST_SCRIPT).unwrap();
    let text = unparse(&tree).unwrap();
    assert_eq!(parse(&text).unwrap(), tree);
    assert!(text.starts_with("from qiskit import QuantumCircuit\ndef get_circuit():"));
}

fn arb_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(Expr::name),
        (0_u32..100).prop_map(|n| Expr::Number(n.to_string())),
    ]
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    let binary_ops = vec![
        Operator::Add,
        Operator::Sub,
        Operator::Mult,
        Operator::Div,
        Operator::FloorDiv,
        Operator::Mod,
        Operator::Pow,
        Operator::LShift,
        Operator::BitOr,
        Operator::BitXor,
        Operator::BitAnd,
    ];
    let unary_ops = vec![
        UnaryOperator::USub,
        UnaryOperator::Invert,
        UnaryOperator::Not,
    ];
    let cmp_ops = vec![CmpOp::Lt, CmpOp::Eq, CmpOp::In, CmpOp::IsNot];

    arb_leaf().prop_recursive(4, 32, 2, move |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(binary_ops.clone()),
                inner.clone()
            )
                .prop_map(|(left, op, right)| Expr::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                }),
            (prop::sample::select(unary_ops.clone()), inner.clone()).prop_map(|(op, operand)| {
                Expr::UnaryOp {
                    op,
                    operand: Box::new(operand),
                }
            }),
            (any::<bool>(), inner.clone(), inner.clone()).prop_map(|(and, x, y)| Expr::BoolOp {
                op: if and {
                    BoolOperator::And
                } else {
                    BoolOperator::Or
                },
                values: vec![x, y],
            }),
            (inner.clone(), prop::sample::select(cmp_ops.clone()), inner.clone()).prop_map(
                |(left, op, right)| Expr::Compare {
                    left: Box::new(left),
                    ops: vec![op],
                    comparators: vec![right],
                }
            ),
        ]
    })
}

proptest! {
    #[test]
    fn unparsed_expression_parses_to_same_tree(expr in arb_expr()) {
        let text = unparse_expr(&expr).unwrap();
        let reparsed = parse_expression(&text).unwrap();
        prop_assert_eq!(reparsed, expr, "text: {}", text);
    }
}
