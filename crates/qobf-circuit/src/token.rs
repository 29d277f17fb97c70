//! Gate tokens: the textual gate references stored in catalogs.
//!
//! A token is `name` or `name(expr[, expr...])`, e.g. `h`, `rz(pi/4)` or
//! `u(0, pi, -pi/2)`. Names are case-insensitive. A token carries no qubit
//! operands; they are supplied when the token is instantiated.

use std::fmt;
use std::str::FromStr;

use qobf_ir::{Circuit, Instruction, ParameterExpression, QubitId, StandardGate};
use tracing::debug;

use crate::error::TokenError;

/// A parsed catalog token.
#[derive(Debug, Clone, PartialEq)]
pub struct GateToken {
    name: String,
    params: Vec<ParameterExpression>,
}

impl GateToken {
    /// Parse a token.
    pub fn parse(token: &str) -> Result<Self, TokenError> {
        let text = token.trim().to_ascii_lowercase();
        let (name, args) = match text.find('(') {
            Some(open) => {
                let inner = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| TokenError::Malformed(token.to_string()))?;
                (text[..open].trim(), Some(inner))
            }
            None => (text.as_str(), None),
        };
        if name.is_empty() {
            return Err(TokenError::Malformed(token.to_string()));
        }

        let expected =
            StandardGate::param_count_of(name).ok_or_else(|| TokenError::UnknownGate(name.into()))?;

        let mut params = Vec::new();
        if let Some(args) = args {
            for arg in split_top_level(args).ok_or_else(|| TokenError::Malformed(token.into()))? {
                let param = qobf_qasm::parse_parameter(&spell_constants(arg)).map_err(|e| {
                    TokenError::InvalidParameter {
                        token: token.to_string(),
                        param: arg.trim().to_string(),
                        message: e.to_string(),
                    }
                })?;
                params.push(param);
            }
        }
        if params.len() != expected {
            return Err(TokenError::ParameterCount {
                gate: name.to_string(),
                expected,
                got: params.len(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            params,
        })
    }

    /// Gate name, lowercased.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParameterExpression] {
        &self.params
    }

    /// Number of qubits the gate acts on.
    pub fn arity(&self) -> usize {
        StandardGate::arity_of(&self.name).map_or(0, |n| n as usize)
    }

    /// Build an instruction on the first `arity` of `targets`; extra targets
    /// are ignored.
    pub fn instantiate(&self, targets: &[QubitId]) -> Result<Instruction, TokenError> {
        let arity = self.arity();
        if targets.len() < arity {
            return Err(TokenError::NotEnoughQubits {
                gate: self.name.clone(),
                expected: arity,
                got: targets.len(),
            });
        }
        let gate = StandardGate::from_name(&self.name, self.params.clone())
            .ok_or_else(|| TokenError::UnknownGate(self.name.clone()))?;
        Ok(Instruction::gate(gate, targets[..arity].iter().copied()))
    }
}

impl FromStr for GateToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
            write!(f, "({})", params.join(", "))?;
        }
        Ok(())
    }
}

/// Arity of the gate a token names, without parsing its parameters.
pub fn token_arity(token: &str) -> Option<usize> {
    let text = token.trim().to_ascii_lowercase();
    let name = text.split('(').next().unwrap_or_default().trim();
    StandardGate::arity_of(name).map(|n| n as usize)
}

/// Append every token of `sequence` on `targets`, skipping tokens that do
/// not instantiate or do not fit the circuit. Returns the number of
/// instructions added.
pub fn apply_sequence(circuit: &mut Circuit, sequence: &[String], targets: &[QubitId]) -> usize {
    let mut added = 0;
    for token in sequence {
        let instruction = match GateToken::parse(token).and_then(|t| t.instantiate(targets)) {
            Ok(instruction) => instruction,
            Err(e) => {
                debug!("Dropping token '{token}': {e}");
                continue;
            }
        };
        match circuit.push(instruction) {
            Ok(_) => added += 1,
            Err(e) => debug!("Dropping token '{token}': {e}"),
        }
    }
    added
}

/// Split `a, b(c, d), e` at top-level commas. `None` on unbalanced
/// parentheses.
fn split_top_level(args: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            ',' if depth == 0 => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&args[start..]);
    Some(parts)
}

/// Rewrite the bare constant `e` as `euler`, the spelling the angle parser
/// knows. Exponents inside numeric literals such as `1e-3` are left alone.
fn spell_constants(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = i + c.len_utf8();
            while let Some(&(j, d)) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' {
                    end = j + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &expr[i..end];
            let in_number = expr[..i]
                .chars()
                .next_back()
                .is_some_and(|p| p.is_ascii_digit() || p == '.');
            out.push_str(if word == "e" && !in_number { "euler" } else { word });
        } else {
            out.push(c);
        }
    }
    out
}
