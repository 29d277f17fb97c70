//! Parser for the `OpenQASM` gate-list subset.

mod expression;
mod lowering;
mod statement;

use qobf_ir::{Circuit, ParameterExpression};

use crate::ast::Program;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse a QASM 2.0 or 3.0 source string into a circuit named `circuit`.
pub fn parse(source: &str) -> ParseResult<Circuit> {
    let mut parser = Parser::new(source)?;
    let program = parser.parse_program()?;
    lowering::lower_to_circuit(&program)
}

/// Parse a standalone angle expression such as `pi/4`, `-2*pi` or `exp(1)`.
///
/// Python-style `**` and QASM-style `^` both mean exponentiation. Only `pi`,
/// `tau`, `euler` and the functions `exp`, `sin`, `cos`, `tan`, `sqrt`, `ln`
/// are recognised; any other identifier is rejected.
pub fn parse_parameter(source: &str) -> ParseResult<ParameterExpression> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expression()?;
    if let Some(extra) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            line: parser.line(),
            expected: "end of expression".into(),
            found: extra.to_string(),
        });
    }
    lowering::expr_to_param(&expr)
}

/// Parser state.
pub(super) struct Parser {
    pub(super) tokens: Vec<SpannedToken>,
    pub(super) pos: usize,
}

impl Parser {
    fn new(source: &str) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        for result in tokenize(source) {
            match result {
                Ok(t) => tokens.push(t),
                Err((line, message)) => return Err(ParseError::LexerError { line, message }),
            }
        }
        Ok(Self { tokens, pos: 0 })
    }

    /// Line of the current token, or of the last token at end of input.
    pub(super) fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    pub(super) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        Some(token)
    }

    #[allow(clippy::needless_pass_by_value)]
    pub(super) fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let line = self.line();
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(format!("expected {expected}")))?;

        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(ParseError::UnexpectedToken {
                line,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_program(&mut self) -> ParseResult<Program> {
        self.expect(Token::OpenQasm)?;
        self.parse_version()?;
        self.expect(Token::Semicolon)?;

        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }

        Ok(Program { statements })
    }

    /// Accept a 2.x or 3.x version header.
    fn parse_version(&mut self) -> ParseResult<()> {
        let version = match self.advance() {
            Some(Token::FloatLiteral(v)) => format!("{v:.1}"),
            Some(Token::IntLiteral(v)) => format!("{v}.0"),
            Some(other) => return Err(ParseError::InvalidVersion(other.to_string())),
            None => return Err(ParseError::UnexpectedEof("version number".into())),
        };
        if version.starts_with("2.") || version.starts_with("3.") {
            Ok(())
        } else {
            Err(ParseError::InvalidVersion(version))
        }
    }

    pub(super) fn parse_identifier_list(&mut self) -> ParseResult<Vec<String>> {
        let mut ids = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            ids.push(self.parse_identifier()?);
        }
        Ok(ids)
    }

    pub(super) fn parse_identifier(&mut self) -> ParseResult<String> {
        let line = self.line();
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => Err(ParseError::UnexpectedToken {
                line,
                expected: "identifier".into(),
                found: other.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("identifier".into())),
        }
    }

    pub(super) fn parse_index(&mut self) -> ParseResult<u32> {
        let line = self.line();
        match self.advance() {
            Some(Token::IntLiteral(v)) => {
                u32::try_from(v).map_err(|_| ParseError::UnexpectedToken {
                    line,
                    expected: "index below 2^32".into(),
                    found: v.to_string(),
                })
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                line,
                expected: "integer".into(),
                found: other.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("integer".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qobf_ir::{InstructionKind, QubitId};
    use std::f64::consts::PI;

    #[test]
    fn test_parse_qasm2_bell() {
        let source = r#"
            OPENQASM 2.0;
            include "qelib1.inc";
            qreg q[2];
            creg c[2];
            h q[0];
            cx q[0],q[1];
            measure q[0] -> c[0];
            measure q[1] -> c[1];
        "#;

        let circuit = parse(source).unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.len(), 4);
        assert_eq!(circuit.instructions()[1].qubits, vec![QubitId(0), QubitId(1)]);
    }

    #[test]
    fn test_parse_qasm3_measure_assignment() {
        let source = r"
            OPENQASM 3.0;
            qubit[3] q;
            bit[3] c;
            h q[0];
            c = measure q;
        ";

        let circuit = parse(source).unwrap();
        assert_eq!(circuit.len(), 4);
        assert!(circuit.instructions()[1..].iter().all(|i| i.is_measure()));
    }

    #[test]
    fn test_parse_multiple_registers_are_flattened() {
        let source = r"
            OPENQASM 2.0;
            qreg a[2];
            qreg b[2];
            cx a[1], b[0];
        ";

        let circuit = parse(source).unwrap();
        assert_eq!(circuit.num_qubits(), 4);
        assert_eq!(circuit.instructions()[0].qubits, vec![QubitId(1), QubitId(2)]);
    }

    #[test]
    fn test_parse_broadcast() {
        let source = r"
            OPENQASM 2.0;
            qreg a[3];
            qreg b[3];
            h a;
            cx a, b;
            cx a[0], b;
        ";

        let circuit = parse(source).unwrap();
        assert_eq!(circuit.len(), 9);
    }

    #[test]
    fn test_parse_broadcast_size_mismatch() {
        let source = "OPENQASM 2.0; qreg a[2]; qreg b[3]; cx a, b;";
        assert!(matches!(
            parse(source),
            Err(ParseError::BroadcastMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_uppercase_builtins() {
        let source = "OPENQASM 2.0; qreg q[2]; U(pi, 0, pi) q[0]; CX q[0], q[1];";
        let circuit = parse(source).unwrap();
        assert_eq!(circuit.instructions()[0].name(), "u");
        assert_eq!(circuit.instructions()[1].name(), "cx");
    }

    #[test]
    fn test_parse_standard_gate_definition_is_skipped() {
        let source = r"
            OPENQASM 2.0;
            gate iswap a, b { s a; s b; h a; cx a,b; cx b,a; h b; }
            qreg q[2];
            iswap q[0], q[1];
        ";
        let circuit = parse(source).unwrap();
        assert_eq!(circuit.len(), 1);
        assert_eq!(circuit.instructions()[0].name(), "iswap");
    }

    #[test]
    fn test_parse_custom_gate_definition_rejected() {
        let source = "OPENQASM 2.0; gate mygate a { h a; } qreg q[1]; mygate q[0];";
        assert!(matches!(parse(source), Err(ParseError::Unsupported(_))));
    }

    #[test]
    fn test_parse_header_validation() {
        assert!(matches!(
            parse("OPENQASM 4.0; qreg q[1];"),
            Err(ParseError::InvalidVersion(_))
        ));
        assert!(matches!(
            parse("OPENQASM 2.0; include qelib1; qreg q[1];"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        let circuit = parse("OPENQASM 3; include \"stdgates.inc\"; qubit[1] q; x q[0];").unwrap();
        assert_eq!(circuit.len(), 1);
    }

    #[test]
    fn test_parse_error_undefined() {
        let source = "OPENQASM 3.0; h undefined[0];";
        assert!(matches!(
            parse(source),
            Err(ParseError::UndefinedIdentifier(_))
        ));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let source = "OPENQASM 2.0;\nqreg q[1];\nh q[0]\nx q[0];";
        match parse(source) {
            Err(ParseError::UnexpectedToken { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected UnexpectedToken, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_parameter_expressions() {
        let cases = [
            ("pi/2", PI / 2.0),
            ("-pi/4", -PI / 4.0),
            ("2*pi", 2.0 * PI),
            ("2**3", 8.0),
            ("2^3", 8.0),
            ("exp(0)", 1.0),
            ("(1+2)*3", 9.0),
            ("0.5", 0.5),
        ];
        for (source, expected) in cases {
            let value = parse_parameter(source).unwrap().as_f64().unwrap();
            assert!((value - expected).abs() < 1e-12, "{source} = {value}");
        }
    }

    #[test]
    fn test_parse_parameter_rejects_unknown_names() {
        assert!(parse_parameter("theta").is_err());
        assert!(parse_parameter("pi pi").is_err());
        assert!(parse_parameter("").is_err());
    }

    #[test]
    fn test_parse_keeps_symbolic_angle() {
        let source = "OPENQASM 2.0; qreg q[1]; rz(pi/4) q[0];";
        let circuit = parse(source).unwrap();
        match &circuit.instructions()[0].kind {
            InstructionKind::Gate(g) => assert_eq!(g.parameters()[0].to_string(), "pi/4"),
            other => panic!("expected gate, got {other:?}"),
        }
    }
}
