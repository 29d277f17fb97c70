//! Statement parsing.

use super::Parser;
use crate::ast::{GateCall, OperandRef, Statement};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

impl Parser {
    /// Parse a statement.
    pub(super) fn parse_statement(&mut self) -> ParseResult<Statement> {
        let line = self.line();
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof("statement".into()))?;

        match token {
            Token::Include => self.parse_include(),
            Token::Qreg | Token::Creg => self.parse_qasm2_register(),
            Token::Qubit | Token::Bit => self.parse_qasm3_register(),
            Token::Measure => self.parse_measure(),
            Token::Reset => self.parse_reset(),
            Token::Barrier => self.parse_barrier(),
            Token::Gate => self.parse_gate_def(),
            Token::Identifier(_) => self.parse_identifier_statement(),
            _ => Err(ParseError::UnexpectedToken {
                line,
                expected: "statement".into(),
                found: token.to_string(),
            }),
        }
    }

    fn parse_include(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Include)?;
        let line = self.line();
        match self.advance() {
            Some(Token::StringLiteral(_)) => {}
            Some(other) => {
                return Err(ParseError::UnexpectedToken {
                    line,
                    expected: "string literal".into(),
                    found: other.to_string(),
                });
            }
            None => return Err(ParseError::UnexpectedEof("include path".into())),
        }
        self.expect(Token::Semicolon)?;
        Ok(Statement::Include)
    }

    /// `qreg q[n];` / `creg c[n];`
    fn parse_qasm2_register(&mut self) -> ParseResult<Statement> {
        let quantum = self.check(&Token::Qreg);
        self.advance();
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let size = self.parse_index()?;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;

        Ok(if quantum {
            Statement::QubitDecl { name, size }
        } else {
            Statement::BitDecl { name, size }
        })
    }

    /// `qubit[n] q;` / `bit c;`
    fn parse_qasm3_register(&mut self) -> ParseResult<Statement> {
        let quantum = self.check(&Token::Qubit);
        self.advance();
        let size = if self.consume(&Token::LBracket) {
            let size = self.parse_index()?;
            self.expect(Token::RBracket)?;
            size
        } else {
            1
        };
        let name = self.parse_identifier()?;
        self.expect(Token::Semicolon)?;

        Ok(if quantum {
            Statement::QubitDecl { name, size }
        } else {
            Statement::BitDecl { name, size }
        })
    }

    fn parse_measure(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Measure)?;
        let qubits = self.parse_operand_refs()?;
        let bits = if self.consume(&Token::Arrow) {
            self.parse_operand_refs()?
        } else {
            vec![]
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Measure { qubits, bits })
    }

    fn parse_reset(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Reset)?;
        let qubits = self.parse_operand_refs()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Reset { qubits })
    }

    fn parse_barrier(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Barrier)?;
        let qubits = if self.check(&Token::Semicolon) {
            vec![]
        } else {
            self.parse_operand_refs()?
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Barrier { qubits })
    }

    /// Parse a gate definition header and skip its body.
    fn parse_gate_def(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Gate)?;
        let name = self.parse_identifier()?;

        if self.consume(&Token::LParen) {
            if !self.check(&Token::RParen) {
                self.parse_identifier_list()?;
            }
            self.expect(Token::RParen)?;
        }
        self.parse_identifier_list()?;

        self.expect(Token::LBrace)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.advance() {
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => depth -= 1,
                Some(_) => {}
                None => return Err(ParseError::UnexpectedEof(format!("end of gate '{name}'"))),
            }
        }

        Ok(Statement::GateDef { name })
    }

    /// Gate call, or `c = measure q;` / `c[i] = measure q[j];`.
    fn parse_identifier_statement(&mut self) -> ParseResult<Statement> {
        let name = self.parse_identifier()?;

        if self.check(&Token::Eq) || self.check(&Token::LBracket) {
            return self.parse_measure_assignment(name);
        }

        self.parse_gate_call(name)
    }

    fn parse_measure_assignment(&mut self, target: String) -> ParseResult<Statement> {
        let bits = if self.consume(&Token::LBracket) {
            let index = self.parse_index()?;
            self.expect(Token::RBracket)?;
            vec![OperandRef::single(&target, index)]
        } else {
            vec![OperandRef::register(&target)]
        };

        self.expect(Token::Eq)?;
        let line = self.line();
        if !self.consume(&Token::Measure) {
            return Err(ParseError::Unsupported(format!(
                "classical assignment to '{target}' at line {line}"
            )));
        }
        let qubits = self.parse_operand_refs()?;
        self.expect(Token::Semicolon)?;

        Ok(Statement::Measure { qubits, bits })
    }

    fn parse_gate_call(&mut self, name: String) -> ParseResult<Statement> {
        let params = if self.consume(&Token::LParen) {
            let p = self.parse_expression_list()?;
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let qubits = self.parse_operand_refs()?;
        self.expect(Token::Semicolon)?;

        Ok(Statement::Gate(GateCall {
            name,
            params,
            qubits,
        }))
    }

    fn parse_operand_refs(&mut self) -> ParseResult<Vec<OperandRef>> {
        let mut refs = vec![self.parse_operand_ref()?];
        while self.consume(&Token::Comma) {
            refs.push(self.parse_operand_ref()?);
        }
        Ok(refs)
    }

    fn parse_operand_ref(&mut self) -> ParseResult<OperandRef> {
        let register = self.parse_identifier()?;

        if self.consume(&Token::LBracket) {
            let index = self.parse_index()?;
            self.expect(Token::RBracket)?;
            Ok(OperandRef::single(register, index))
        } else {
            Ok(OperandRef::register(register))
        }
    }
}
