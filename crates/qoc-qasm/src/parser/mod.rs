//! Parser for the circuit and gate-duration formats.

mod lowering;
mod statement;

use qoc_ir::GateDurations;
use rustc_hash::FxHashSet;

use crate::ast::{ParsedCircuit, Statement};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse a circuit file.
///
/// Each non-empty line is either `qubit <name>`, `<op> <wires>` or
/// `<op> <angle> <wires>`, wires being comma separated. Every gate is
/// checked for a known op-code, its wire count and repeated wires. Wires are
/// resolved against the declarations only when the DAG is built, see
/// [`ParsedCircuit::into_dag`].
pub fn parse_circuit(source: &str) -> ParseResult<ParsedCircuit> {
    let mut parser = Parser::new(source)?;
    let mut circuit = ParsedCircuit::default();
    let mut declared = FxHashSet::default();

    while parser.skip_blank_lines() {
        let line = parser.line;
        match parser.parse_statement()? {
            Statement::QubitDecl { name } => {
                if !declared.insert(name.clone()) {
                    return Err(ParseError::DuplicateDeclaration { line, name });
                }
                circuit.qubits.push(name);
            }
            Statement::Gate(gate) => circuit.gates.push(statement::check_gate(gate, line)?),
        }
        parser.expect_end_of_line()?;
    }

    Ok(circuit)
}

/// Parse a gate-duration file of `<op> <duration>` lines.
///
/// A later line for the same op-code overrides an earlier one.
pub fn parse_durations(source: &str) -> ParseResult<GateDurations> {
    let mut parser = Parser::new(source)?;
    let mut durations = GateDurations::new();

    while parser.skip_blank_lines() {
        let name = parser.parse_identifier()?;
        let duration = parser.parse_number()?;
        durations.insert(name, duration)?;
        parser.expect_end_of_line()?;
    }

    Ok(durations)
}

/// Parser state.
pub(super) struct Parser {
    pub(super) tokens: Vec<SpannedToken>,
    pub(super) pos: usize,
    /// Current line, 1-based.
    pub(super) line: usize,
}

impl Parser {
    /// Create a new parser from source.
    fn new(source: &str) -> ParseResult<Self> {
        let mut tokens = Vec::new();

        for result in tokenize(source) {
            match result {
                Ok(t) => tokens.push(t),
                Err((span, message)) => {
                    let line = source[..span.start].matches('\n').count() + 1;
                    return Err(ParseError::LexerError { line, message });
                }
            }
        }

        Ok(Self {
            tokens,
            pos: 0,
            line: 1,
        })
    }

    /// Check if we've reached the end.
    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Peek at the current token.
    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Advance and return the current token.
    pub(super) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        if token == Token::Newline {
            self.line += 1;
        }
        Some(token)
    }

    /// Consume token if it matches.
    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip empty lines. Returns `false` at the end of input.
    fn skip_blank_lines(&mut self) -> bool {
        while self.consume(&Token::Newline) {}
        !self.is_eof()
    }

    /// Expect a line break or the end of input.
    fn expect_end_of_line(&mut self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(Token::Newline) => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(self.unexpected("end of line", &other.to_string())),
        }
    }

    pub(super) fn unexpected(&self, expected: &str, found: &str) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Parse an identifier.
    pub(super) fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Identifier(s)) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            Some(other) => Err(self.unexpected("identifier", &other.to_string())),
            None => Err(self.unexpected("identifier", "end of input")),
        }
    }

    /// Parse a number.
    pub(super) fn parse_number(&mut self) -> ParseResult<f64> {
        match self.peek() {
            Some(Token::Number(v)) => {
                let v = *v;
                self.advance();
                Ok(v)
            }
            Some(other) => Err(self.unexpected("number", &other.to_string())),
            None => Err(self.unexpected("number", "end of input")),
        }
    }

    /// Parse a comma-separated identifier list.
    pub(super) fn parse_identifier_list(&mut self) -> ParseResult<Vec<String>> {
        let mut ids = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            ids.push(self.parse_identifier()?);
        }
        Ok(ids)
    }
}
