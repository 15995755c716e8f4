//! Statement parsing and gate checks.

use qoc_ir::{IrError, StandardGate};

use super::Parser;
use crate::ast::{GateLine, ParsedGate, Statement};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

impl Parser {
    /// Parse one statement, leaving the line break in place.
    pub(super) fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.peek() {
            Some(Token::Qubit) => {
                self.advance();
                let name = self.parse_identifier()?;
                Ok(Statement::QubitDecl { name })
            }
            Some(Token::Identifier(_)) => self.parse_gate_line().map(Statement::Gate),
            Some(other) => Err(self.unexpected("statement", &other.to_string())),
            None => Err(self.unexpected("statement", "end of input")),
        }
    }

    /// Parse `<op> [<angle>] <wires>`.
    fn parse_gate_line(&mut self) -> ParseResult<GateLine> {
        let name = self.parse_identifier()?;
        let rotation = match self.peek() {
            Some(Token::Number(_)) => Some(self.parse_number()?),
            _ => None,
        };
        let wires = self.parse_identifier_list()?;
        Ok(GateLine {
            name,
            rotation,
            wires,
        })
    }
}

/// Check a gate line against the gate set: known op-code, angle present
/// exactly for rotations, wire count, no wire listed twice.
pub(super) fn check_gate(line_gate: GateLine, line: usize) -> ParseResult<ParsedGate> {
    let GateLine {
        name,
        rotation,
        wires,
    } = line_gate;

    let gate = StandardGate::from_name(&name, rotation).map_err(|e| match e {
        IrError::MissingRotation(gate) => ParseError::MissingRotation { line, gate },
        IrError::UnexpectedRotation(gate) => ParseError::UnexpectedRotation { line, gate },
        IrError::UnknownGate(name) => ParseError::UnknownGate { line, name },
        other => ParseError::CircuitError(other),
    })?;

    let expected = gate.num_qubits() as usize;
    if wires.len() != expected {
        return Err(ParseError::WrongQubitCount {
            line,
            gate: name,
            expected,
            got: wires.len(),
        });
    }

    for (i, wire) in wires.iter().enumerate() {
        if wires[..i].contains(wire) {
            return Err(ParseError::DuplicateQubit {
                line,
                gate: format!("{name} {}", wires.join(",")),
                qubit: wire.clone(),
            });
        }
    }

    Ok(ParsedGate { line, gate, wires })
}
