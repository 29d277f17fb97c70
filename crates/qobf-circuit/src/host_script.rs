//! Host scripts: Python files that build a circuit in `get_circuit()`.
//!
//! Loading does not run the script. The builder body is evaluated
//! statically: circuit construction, gate method calls, numeric
//! assignments and `for ... in range(...)` loops are followed, and anything
//! else is reported as [`ObfuscationError::HostScript`]. Top-level numeric
//! assignments are visible inside the builder; other top-level statements
//! are ignored.
//!
//! Export goes the other way: the circuit becomes a straight-line builder
//! function that imports `QuantumCircuit` from `qiskit`.

use std::f64::consts::{E, PI, TAU};

use qobf_ir::{
    Circuit, ClbitId, Instruction, InstructionKind, ParameterExpression, QubitId, StandardGate,
};
use qobf_script::ast::{Alias, Arg, FunctionDef, Operator, StringPiece, UnaryOperator};
use qobf_script::{Expr, ExprContext, Module, Stmt};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{ObfuscationError, ObfuscationResult};

/// Name of the builder function a host script must define.
pub const ENTRY_POINT: &str = "get_circuit";

/// Ceiling on `range` lengths and on loop iterations across one builder
/// run, nested loops included.
const MAX_LOOP_ITERATIONS: usize = 1_000_000;

/// Build the circuit described by a host script.
pub fn circuit_from_script(source: &str) -> ObfuscationResult<Circuit> {
    let module = qobf_script::parse(source)?;
    let mut builder = Builder::default();

    for stmt in &module.body {
        if let Stmt::Assign { targets, value } = stmt {
            match builder.eval(value) {
                Ok(v) => {
                    for target in targets {
                        let _ = builder.bind(target, v.clone());
                    }
                }
                Err(message) => debug!("Skipping top-level assignment: {message}"),
            }
        }
    }

    let entry = module
        .body
        .iter()
        .find_map(|stmt| match stmt {
            Stmt::FunctionDef(def) if def.name == ENTRY_POINT => Some(def),
            _ => None,
        })
        .ok_or_else(|| ObfuscationError::MissingEntryPoint(ENTRY_POINT.into()))?;

    builder.run(entry)
}

/// Render a circuit as a host script exposing `get_circuit()`.
pub fn circuit_to_script(circuit: &Circuit) -> ObfuscationResult<String> {
    let var = "qc";
    let mut body = vec![Stmt::Assign {
        targets: vec![store(var)],
        value: call(
            Expr::name("QuantumCircuit"),
            vec![
                Arg::Positional(int(circuit.num_qubits())),
                Arg::Positional(int(circuit.num_clbits())),
                Arg::Keyword {
                    name: "name".into(),
                    value: string(circuit.name()),
                },
            ],
        ),
    }];

    for inst in circuit.instructions() {
        let (method, mut args) = match &inst.kind {
            InstructionKind::Gate(gate) => {
                let params = gate
                    .parameters()
                    .into_iter()
                    .map(|p| float_arg(p, gate.name()))
                    .collect::<ObfuscationResult<Vec<_>>>()?;
                (gate.name(), params)
            }
            InstructionKind::Measure => ("measure", vec![]),
            InstructionKind::Reset => ("reset", vec![]),
            InstructionKind::Barrier => ("barrier", vec![]),
        };
        args.extend(inst.qubits.iter().map(|q| Arg::Positional(int(q.index()))));
        args.extend(inst.clbits.iter().map(|c| Arg::Positional(int(c.index()))));
        body.push(Stmt::Expr(call(
            Expr::Attribute {
                value: Box::new(Expr::name(var)),
                attr: method.to_string(),
                ctx: ExprContext::Load,
            },
            args,
        )));
    }
    body.push(Stmt::Return(Some(Expr::name(var))));

    let module = Module {
        body: vec![
            Stmt::ImportFrom {
                module: Some("qiskit".into()),
                names: vec![Alias {
                    name: "QuantumCircuit".into(),
                    asname: None,
                }],
                level: 0,
            },
            Stmt::FunctionDef(FunctionDef {
                name: ENTRY_POINT.into(),
                params: vec![],
                body,
                decorators: vec![],
                returns: None,
                is_async: false,
            }),
        ],
    };
    let mut text = qobf_script::unparse(&module)?;
    text.push('\n');
    Ok(text)
}

fn store(id: &str) -> Expr {
    Expr::Name {
        id: id.into(),
        ctx: ExprContext::Store,
    }
}

fn call(func: Expr, args: Vec<Arg>) -> Expr {
    Expr::Call {
        func: Box::new(func),
        args,
    }
}

fn int(value: usize) -> Expr {
    Expr::Number(value.to_string())
}

fn string(value: &str) -> Expr {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    Expr::Strings(vec![StringPiece::Plain(format!("'{escaped}'"))])
}

fn float_arg(param: &ParameterExpression, gate: &str) -> ObfuscationResult<Arg> {
    let value = param
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ObfuscationError::HostScript {
            statement: format!("{gate}({param})"),
            message: "parameter has no finite value".into(),
        })?;
    let literal = Expr::Number(format!("{:?}", value.abs()));
    Ok(Arg::Positional(if value.is_sign_negative() && value != 0.0 {
        Expr::UnaryOp {
            op: UnaryOperator::USub,
            operand: Box::new(literal),
        }
    } else {
        literal
    }))
}

/// A value the builder body can compute.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    fn as_f64(&self) -> Result<f64, String> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            other => Err(format!("expected a number, found {other:?}")),
        }
    }

    fn as_int(&self) -> Result<i64, String> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(format!("expected an integer, found {other:?}")),
        }
    }

    fn into_list(self) -> Result<Vec<Value>, String> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(format!("expected a sequence, found {other:?}")),
        }
    }
}

enum Flow {
    Next,
    Return,
}

/// Why a statement failed: its own problem, or one already attributed to a
/// statement nested inside it.
enum Failure {
    Message(String),
    Nested(ObfuscationError),
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Message(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::Message(message.to_string())
    }
}

/// Evaluation state of one builder run.
#[derive(Default)]
struct Builder {
    scope: FxHashMap<String, Value>,
    circuit: Option<(String, Circuit)>,
    iterations: usize,
}

impl Builder {
    fn run(mut self, entry: &FunctionDef) -> ObfuscationResult<Circuit> {
        if entry.params.iter().any(|p| p.binds_name() && p.default.is_none()) {
            return Err(ObfuscationError::HostScript {
                statement: format!("def {ENTRY_POINT}(...)"),
                message: "the builder must be callable without arguments".into(),
            });
        }
        for param in &entry.params {
            if let Some(default) = &param.default {
                if let Ok(value) = self.eval(default) {
                    self.scope.insert(param.name.clone(), value);
                }
            }
        }

        match self.exec_block(&entry.body)? {
            Flow::Return => self.circuit.map(|(_, c)| c).ok_or_else(|| {
                ObfuscationError::HostScript {
                    statement: format!("def {ENTRY_POINT}()"),
                    message: "no QuantumCircuit was created".into(),
                }
            }),
            Flow::Next => Err(ObfuscationError::HostScript {
                statement: format!("def {ENTRY_POINT}()"),
                message: "the builder does not return its circuit".into(),
            }),
        }
    }

    fn exec_block(&mut self, body: &[Stmt]) -> ObfuscationResult<Flow> {
        for stmt in body {
            let flow = self.exec(stmt).map_err(|failure| match failure {
                Failure::Message(message) => ObfuscationError::HostScript {
                    statement: statement_text(stmt),
                    message,
                },
                Failure::Nested(e) => e,
            })?;
            if let Flow::Return = flow {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Next)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, Failure> {
        match stmt {
            Stmt::Pass | Stmt::Import(_) | Stmt::ImportFrom { .. } => Ok(Flow::Next),
            Stmt::Expr(Expr::Strings(_)) => Ok(Flow::Next),

            Stmt::Assign { targets, value } => {
                if let Some((num_qubits, num_clbits, name)) = self.circuit_constructor(value)? {
                    let [Expr::Name { id, .. }] = targets.as_slice() else {
                        return Err("a circuit must be bound to a single name".into());
                    };
                    let circuit = Circuit::with_size(name, num_qubits, num_clbits);
                    self.circuit = Some((id.clone(), circuit));
                    return Ok(Flow::Next);
                }
                let value = self.eval(value)?;
                for target in targets {
                    self.bind(target, value.clone())?;
                }
                Ok(Flow::Next)
            }

            Stmt::AugAssign { target, op, value } => {
                let Expr::Name { id, .. } = target else {
                    return Err("only names can be updated in place".into());
                };
                let current = self
                    .scope
                    .get(id)
                    .cloned()
                    .ok_or_else(|| format!("name '{id}' is not defined"))?;
                let rhs = self.eval(value)?;
                let updated = binary(*op, current, rhs)?;
                self.scope.insert(id.clone(), updated);
                Ok(Flow::Next)
            }

            Stmt::Expr(Expr::Call { func, args }) => {
                let Expr::Attribute { value, attr, .. } = func.as_ref() else {
                    return Err("only circuit method calls are supported".into());
                };
                let receiver = value.as_name().unwrap_or_default();
                match &self.circuit {
                    Some((var, _)) if var == receiver => {}
                    _ => return Err(format!("'{receiver}' is not the circuit being built").into()),
                }
                self.apply(attr, args)?;
                Ok(Flow::Next)
            }

            Stmt::For {
                target,
                iter,
                body,
                orelse,
                is_async: false,
            } if orelse.is_empty() => {
                let items = self.eval(iter)?.into_list()?;
                if items.len() > MAX_LOOP_ITERATIONS {
                    return Err(format!("loop of {} iterations is too long", items.len()).into());
                }
                for item in items {
                    self.iterations += 1;
                    if self.iterations > MAX_LOOP_ITERATIONS {
                        return Err(format!("more than {MAX_LOOP_ITERATIONS} loop iterations").into());
                    }
                    self.bind(target, item)?;
                    if let Flow::Return = self.exec_block(body).map_err(Failure::Nested)? {
                        return Ok(Flow::Return);
                    }
                }
                Ok(Flow::Next)
            }

            Stmt::Return(Some(Expr::Name { id, .. })) => match &self.circuit {
                Some((var, _)) if var == id => Ok(Flow::Return),
                _ => Err(format!("'{id}' is not the circuit being built").into()),
            },

            _ => Err("statement is not supported in a circuit builder".into()),
        }
    }

    fn bind(&mut self, target: &Expr, value: Value) -> Result<(), String> {
        match target {
            Expr::Name { id, .. } => {
                self.scope.insert(id.clone(), value);
                Ok(())
            }
            Expr::Tuple { elts, .. } | Expr::List { elts, .. } => {
                let items = value.into_list()?;
                if items.len() != elts.len() {
                    return Err(format!(
                        "cannot unpack {} values into {} names",
                        items.len(),
                        elts.len()
                    ));
                }
                for (elt, item) in elts.iter().zip(items) {
                    self.bind(elt, item)?;
                }
                Ok(())
            }
            _ => Err("unsupported assignment target".into()),
        }
    }

    /// `QuantumCircuit(n[, m][, name=...])` → `(n, m, name)`.
    fn circuit_constructor(&self, expr: &Expr) -> Result<Option<(u32, u32, String)>, String> {
        let Expr::Call { func, args } = expr else {
            return Ok(None);
        };
        let callee = match func.as_ref() {
            Expr::Name { id, .. } => id.as_str(),
            Expr::Attribute { attr, .. } => attr.as_str(),
            _ => return Ok(None),
        };
        if callee != "QuantumCircuit" {
            return Ok(None);
        }

        let mut sizes = Vec::new();
        let mut name = String::from("circuit");
        for arg in args {
            match arg {
                Arg::Positional(e) => sizes.push(to_u32(self.eval(e)?.as_int()?)?),
                Arg::Keyword { name: key, value } if key == "name" => {
                    match self.eval(value)? {
                        Value::Str(s) => name = s,
                        other => return Err(format!("circuit name must be a string, found {other:?}")),
                    }
                }
                _ => return Err("QuantumCircuit takes register sizes and an optional name".into()),
            }
        }
        match sizes.as_slice() {
            [q] => Ok(Some((*q, 0, name))),
            [q, c] => Ok(Some((*q, *c, name))),
            _ => Err("QuantumCircuit takes one or two register sizes".into()),
        }
    }

    fn apply(&mut self, method: &str, args: &[Arg]) -> Result<(), String> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Positional(e) => values.push(self.eval(e)?),
                Arg::Starred(e) => values.extend(self.eval(e)?.into_list()?),
                // `label=...` and similar cosmetic keywords.
                Arg::Keyword { .. } => {}
                Arg::DoubleStarred(_) => return Err("'**' arguments are not supported".into()),
            }
        }

        let Some((_, circuit)) = self.circuit.as_mut() else {
            return Err("no circuit has been created".into());
        };
        let num_qubits = circuit.num_qubits();
        let num_clbits = circuit.num_clbits();
        let ir = |e: qobf_ir::IrError| e.to_string();

        match method {
            "measure_all" => {
                circuit.barrier_all().map_err(ir)?;
                circuit.measure_all().map_err(ir)?;
            }
            "barrier" => {
                if values.is_empty() {
                    circuit.barrier_all().map_err(ir)?;
                } else {
                    let mut qubits = Vec::new();
                    for v in values {
                        for q in operand(v, num_qubits)? {
                            qubits.push(QubitId(q));
                        }
                    }
                    circuit.barrier(qubits).map_err(ir)?;
                }
            }
            "measure" => {
                let [qubits, clbits] = <[Value; 2]>::try_from(values)
                    .map_err(|_| "measure takes a qubit and a classical bit".to_string())?;
                let operands = [operand(qubits, num_qubits)?, operand(clbits, num_clbits)?];
                for row in broadcast(&operands)? {
                    circuit
                        .push(Instruction::measure(QubitId(row[0]), ClbitId(row[1])))
                        .map_err(ir)?;
                }
            }
            "reset" => {
                for v in values {
                    for q in operand(v, num_qubits)? {
                        circuit.reset(QubitId(q)).map_err(ir)?;
                    }
                }
            }
            gate => {
                let (Some(arity), Some(param_count)) = (
                    StandardGate::arity_of(gate),
                    StandardGate::param_count_of(gate),
                ) else {
                    return Err(format!("unknown circuit method '{gate}'"));
                };
                if values.len() != param_count + arity as usize {
                    return Err(format!(
                        "'{gate}' takes {param_count} parameter(s) and {arity} qubit(s), got {} argument(s)",
                        values.len()
                    ));
                }
                let qubit_values = values.split_off(param_count);
                let params = values
                    .iter()
                    .map(|v| v.as_f64().map(ParameterExpression::constant))
                    .collect::<Result<Vec<_>, _>>()?;
                let standard = StandardGate::from_name(gate, params)
                    .ok_or_else(|| format!("cannot build gate '{gate}'"))?;
                let operands = qubit_values
                    .into_iter()
                    .map(|v| operand(v, num_qubits))
                    .collect::<Result<Vec<_>, _>>()?;
                for row in broadcast(&operands)? {
                    circuit
                        .push(Instruction::gate(
                            standard.clone(),
                            row.into_iter().map(QubitId),
                        ))
                        .map_err(ir)?;
                }
            }
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr) -> Result<Value, String> {
        match expr {
            Expr::Number(text) => number(text),
            Expr::Bool(b) => Ok(Value::Int(i64::from(*b))),
            Expr::Strings(pieces) => {
                let mut out = String::new();
                for piece in pieces {
                    match piece {
                        StringPiece::Plain(raw) => out.push_str(
                            &string_literal(raw).ok_or_else(|| format!("unsupported string {raw}"))?,
                        ),
                        StringPiece::Formatted(_) => return Err("f-strings are not supported".into()),
                    }
                }
                Ok(Value::Str(out))
            }
            Expr::Name { id, .. } => self
                .scope
                .get(id)
                .cloned()
                .or_else(|| constant(id).map(Value::Float))
                .ok_or_else(|| format!("name '{id}' is not defined")),
            Expr::Attribute { value, attr, .. } => match value.as_name() {
                Some(m) if is_math_module(m) => constant(attr)
                    .map(Value::Float)
                    .ok_or_else(|| format!("unknown constant {m}.{attr}")),
                _ => Err("attribute access is not supported".into()),
            },
            Expr::UnaryOp { op, operand } => match (op, self.eval(operand)?) {
                (UnaryOperator::UAdd, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
                (UnaryOperator::USub, Value::Int(i)) => Ok(Value::Int(-i)),
                (UnaryOperator::USub, Value::Float(f)) => Ok(Value::Float(-f)),
                (op, v) => Err(format!("cannot apply '{}' to {v:?}", op.symbol())),
            },
            Expr::BinOp { left, op, right } => binary(*op, self.eval(left)?, self.eval(right)?),
            Expr::List { elts, .. } | Expr::Tuple { elts, .. } => elts
                .iter()
                .map(|e| self.eval(e))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Subscript { value, index, .. } => {
                let items = self.eval(value)?.into_list()?;
                let i = self.eval(index)?.as_int()?;
                let len = i64::try_from(items.len()).map_err(|e| e.to_string())?;
                let at = if i < 0 { i + len } else { i };
                usize::try_from(at)
                    .ok()
                    .and_then(|at| items.get(at).cloned())
                    .ok_or_else(|| format!("index {i} out of range"))
            }
            Expr::Call { func, args } => self.call(func, args),
            _ => Err("expression is not supported in a circuit builder".into()),
        }
    }

    fn call(&self, func: &Expr, args: &[Arg]) -> Result<Value, String> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Positional(e) => values.push(self.eval(e)?),
                _ => return Err("only positional arguments are supported".into()),
            }
        }

        let name = match func {
            Expr::Name { id, .. } => id.as_str(),
            Expr::Attribute { value, attr, .. }
                if value.as_name().is_some_and(is_math_module) =>
            {
                attr.as_str()
            }
            _ => return Err("unsupported call".into()),
        };

        match (name, values.as_slice()) {
            ("range", [stop]) => range(0, stop.as_int()?, 1),
            ("range", [start, stop]) => range(start.as_int()?, stop.as_int()?, 1),
            ("range", [start, stop, step]) => range(start.as_int()?, stop.as_int()?, step.as_int()?),
            ("list" | "tuple", [Value::List(items)]) => Ok(Value::List(items.clone())),
            ("len", [Value::List(items)]) => {
                Ok(Value::Int(i64::try_from(items.len()).map_err(|e| e.to_string())?))
            }
            ("int", [v]) => {
                #[allow(clippy::cast_possible_truncation)]
                let truncated = v.as_f64()?.trunc() as i64;
                Ok(Value::Int(truncated))
            }
            ("float", [v]) => Ok(Value::Float(v.as_f64()?)),
            ("abs", [Value::Int(i)]) => Ok(Value::Int(i.abs())),
            ("abs" | "fabs", [v]) => Ok(Value::Float(v.as_f64()?.abs())),
            ("sqrt", [v]) => Ok(Value::Float(v.as_f64()?.sqrt())),
            ("sin", [v]) => Ok(Value::Float(v.as_f64()?.sin())),
            ("cos", [v]) => Ok(Value::Float(v.as_f64()?.cos())),
            ("tan", [v]) => Ok(Value::Float(v.as_f64()?.tan())),
            ("exp", [v]) => Ok(Value::Float(v.as_f64()?.exp())),
            ("log", [v]) => Ok(Value::Float(v.as_f64()?.ln())),
            ("asin" | "arcsin", [v]) => Ok(Value::Float(v.as_f64()?.asin())),
            ("acos" | "arccos", [v]) => Ok(Value::Float(v.as_f64()?.acos())),
            ("atan" | "arctan", [v]) => Ok(Value::Float(v.as_f64()?.atan())),
            _ => Err(format!("unsupported call to '{name}'")),
        }
    }
}

fn statement_text(stmt: &Stmt) -> String {
    let text = qobf_script::unparse_stmt(stmt).unwrap_or_else(|_| format!("{stmt:?}"));
    text.lines().next().unwrap_or_default().to_string()
}

fn is_math_module(name: &str) -> bool {
    matches!(name, "math" | "np" | "numpy")
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(PI),
        "tau" => Some(TAU),
        "e" => Some(E),
        _ => None,
    }
}

fn number(text: &str) -> Result<Value, String> {
    let clean = text.replace('_', "");
    if let Ok(i) = clean.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    if let Some(hex) = clean.strip_prefix("0x").or_else(|| clean.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(Value::Int)
            .map_err(|e| e.to_string());
    }
    clean
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| format!("unsupported numeric literal {text}"))
}

/// Contents of a plain, non-raw-escaped string literal.
fn string_literal(raw: &str) -> Option<String> {
    let body = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let prefix = &raw[..raw.len() - body.len()];
    if prefix.chars().any(|c| matches!(c, 'b' | 'B' | 'f' | 'F')) {
        return None;
    }
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find_map(|q| body.strip_prefix(q)?.strip_suffix(q))?;
    if prefix.contains(['r', 'R']) {
        return Some(inner.to_string());
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Some(out)
}

fn binary(op: Operator, left: Value, right: Value) -> Result<Value, String> {
    use Value::{Float, Int, List};

    match (op, left, right) {
        (Operator::Add, List(mut a), List(b)) => {
            a.extend(b);
            Ok(List(a))
        }
        (Operator::Mult, List(items), Int(n)) | (Operator::Mult, Int(n), List(items)) => {
            let n = usize::try_from(n).unwrap_or(0);
            Ok(List(items.iter().cloned().cycle().take(items.len() * n).collect()))
        }
        (op, Int(a), Int(b)) => match op {
            Operator::Add => a.checked_add(b).map(Int).ok_or_else(overflow),
            Operator::Sub => a.checked_sub(b).map(Int).ok_or_else(overflow),
            Operator::Mult => a.checked_mul(b).map(Int).ok_or_else(overflow),
            Operator::FloorDiv | Operator::Mod if b == 0 => Err("division by zero".into()),
            Operator::FloorDiv => Ok(Int(floor_div(a, b))),
            Operator::Mod => Ok(Int(a - b * floor_div(a, b))),
            Operator::Pow if b >= 0 => u32::try_from(b)
                .ok()
                .and_then(|e| a.checked_pow(e))
                .map(Int)
                .ok_or_else(overflow),
            _ => float_op(op, Value::Int(a).as_f64()?, Value::Int(b).as_f64()?),
        },
        (op, a @ (Int(_) | Float(_)), b @ (Int(_) | Float(_))) => float_op(op, a.as_f64()?, b.as_f64()?),
        (op, a, b) => Err(format!("cannot apply '{}' to {a:?} and {b:?}", op.symbol())),
    }
}

/// Integer division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a.div_euclid(b);
    if b < 0 && a.rem_euclid(b) != 0 { q - 1 } else { q }
}

fn float_op(op: Operator, a: f64, b: f64) -> Result<Value, String> {
    let value = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mult => a * b,
        Operator::Div | Operator::FloorDiv | Operator::Mod if b == 0.0 => {
            return Err("division by zero".into());
        }
        Operator::Div => a / b,
        Operator::FloorDiv => (a / b).floor(),
        Operator::Mod => a - b * (a / b).floor(),
        Operator::Pow => a.powf(b),
        other => return Err(format!("operator '{}' is not supported", other.symbol())),
    };
    Ok(Value::Float(value))
}

fn overflow() -> String {
    "integer overflow".into()
}

fn range(start: i64, stop: i64, step: i64) -> Result<Value, String> {
    if step == 0 {
        return Err("range() step must not be zero".into());
    }
    let mut items = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        if items.len() >= MAX_LOOP_ITERATIONS {
            return Err("range is too long".into());
        }
        items.push(Value::Int(i));
        // Past i64 means past `stop` as well.
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(Value::List(items))
}

fn to_u32(value: i64) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{value} is not a valid register size"))
}

/// Qubit or clbit indices named by one argument. Negative indices count
/// from the end, as in Python.
fn operand(value: Value, size: usize) -> Result<Vec<u32>, String> {
    let resolve = |i: i64| -> Result<u32, String> {
        let size = i64::try_from(size).map_err(|e| e.to_string())?;
        let index = if i < 0 { i + size } else { i };
        u32::try_from(index).map_err(|_| format!("bit index {i} out of range"))
    };
    match value {
        Value::Int(i) => Ok(vec![resolve(i)?]),
        Value::List(items) => items.iter().map(|v| resolve(v.as_int()?)).collect(),
        other => Err(format!("expected a bit index or list, found {other:?}")),
    }
}

/// Zip operand lists into per-instruction rows; single indices repeat.
fn broadcast(operands: &[Vec<u32>]) -> Result<Vec<Vec<u32>>, String> {
    let width = operands
        .iter()
        .map(Vec::len)
        .filter(|&n| n != 1)
        .try_fold(None, |acc: Option<usize>, n| match acc {
            Some(m) if m != n => Err(format!("operand lists of length {m} and {n} do not match")),
            _ => Ok(Some(n)),
        })?
        .unwrap_or(1);
    Ok((0..width)
        .map(|i| {
            operands
                .iter()
                .map(|list| if list.len() == 1 { list[0] } else { list[i] })
                .collect()
        })
        .collect())
}
