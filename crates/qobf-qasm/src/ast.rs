//! Syntax tree for the `OpenQASM` gate-list subset.

/// A parsed QASM program.
#[derive(Debug, Clone)]
pub struct Program {
    /// Statements in the program, after the version header.
    pub statements: Vec<Statement>,
}

/// A statement in a QASM program.
#[derive(Debug, Clone)]
pub enum Statement {
    /// `include "...";`, accepted and ignored.
    Include,

    /// `qreg q[n];` or `qubit[n] q;`
    QubitDecl { name: String, size: u32 },

    /// `creg c[n];` or `bit[n] c;`
    BitDecl { name: String, size: u32 },

    /// Gate application.
    Gate(GateCall),

    /// `measure q -> c;` or `c = measure q;`
    Measure {
        qubits: Vec<OperandRef>,
        bits: Vec<OperandRef>,
    },

    /// `reset q;`
    Reset { qubits: Vec<OperandRef> },

    /// `barrier q;` or `barrier;`
    Barrier { qubits: Vec<OperandRef> },

    /// `gate name(params) a, b { ... }`; only the name is kept, since
    /// definitions are accepted for standard gates alone.
    GateDef { name: String },
}

/// A gate call.
#[derive(Debug, Clone)]
pub struct GateCall {
    /// Gate name as written.
    pub name: String,
    /// Gate parameters.
    pub params: Vec<Expression>,
    /// Operands.
    pub qubits: Vec<OperandRef>,
}

/// Reference to a register or one element of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandRef {
    pub register: String,
    pub index: Option<u32>,
}

impl OperandRef {
    /// Reference a single element.
    pub fn single(register: impl Into<String>, index: u32) -> Self {
        Self {
            register: register.into(),
            index: Some(index),
        }
    }

    /// Reference a whole register.
    pub fn register(register: impl Into<String>) -> Self {
        Self {
            register: register.into(),
            index: None,
        }
    }
}

/// An angle expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Int(u64),
    Float(f64),
    Identifier(String),
    Pi,
    Tau,
    Euler,
    Neg(Box<Expression>),
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    FnCall {
        name: String,
        args: Vec<Expression>,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinOp {
    /// Precedence for precedence climbing, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 2,
            BinOp::Pow => 3,
        }
    }

    /// Exponentiation groups to the right.
    pub fn is_right_assoc(self) -> bool {
        matches!(self, BinOp::Pow)
    }
}
