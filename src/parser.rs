use crate::ast::{Expression, Identifier, InfixOperator, PrefixOperator, Section, Statement};
use crate::lexer::{Lexer, Token, TokenKind};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("no prefix parse function for {0} found")]
    NoPrefixParseFn(TokenKind),
    #[error("illegal character '{0}'")]
    IllegalCharacter(String),
    #[error("could not parse {0:?} as an integer")]
    InvalidInteger(String),
    #[error("could not parse {0:?} as a float")]
    InvalidFloat(String),
    #[error("expected next token to be {expected}, got {found} instead")]
    UnexpectedToken { expected: TokenKind, found: TokenKind },
    #[error("repeat block is never closed")]
    UnterminatedBlock,
}

/// A parse failure, recorded with the token being examined and the one after it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub token: Token,
    pub peek: Token,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse Error [line {}, col {}]: {}",
            self.token.line + 1,
            self.token.start_col + 1,
            self.kind
        )
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Sum,     // + or -
    Product, // * or /
    Prefix,  // -x
    Call,    // f(x)
}

impl Precedence {
    fn of(kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
            TokenKind::LParen => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
    peek: Token,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Parser {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        }
    }

    /// Errors recorded so far. A non-empty list means the parsed tree is unusable.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Parses the whole token stream into a section, recording errors as it goes.
    pub fn parse(&mut self) -> Section {
        let mut section = Section::default();

        while !self.current_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                section.push(stmt);
            }
            self.next_token();
        }

        section
    }

    fn next_token(&mut self) {
        let next = self.lexer.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current.is(kind)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.is(kind)
    }

    // Advances only if the next token has the expected kind.
    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.next_token();
            true
        } else {
            self.error(ParseErrorKind::UnexpectedToken {
                expected: kind,
                found: self.peek.kind,
            });
            false
        }
    }

    fn error(&mut self, kind: ParseErrorKind) {
        let error = ParseError {
            kind,
            token: self.current.clone(),
            peek: self.peek.clone(),
        };
        tracing::debug!(%error, "recorded parse error");
        self.errors.push(error);
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        while self.current_is(TokenKind::Newline) {
            self.next_token();
        }

        // A single leading colon separates statements on one line
        if self.current_is(TokenKind::Colon) {
            self.next_token();
        }

        match self.current.kind {
            TokenKind::Eof => None,
            TokenKind::LBrace => Some(self.parse_repeat_block()),
            TokenKind::Question => self.parse_input_assignment(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expression = self.parse_expression(Precedence::Lowest)?;

        if self.peek_is(TokenKind::Arrow) {
            self.next_token(); // current token is now ->
            let target = self.parse_assignment_target()?;
            Some(Statement::Assignment {
                target,
                value: expression,
            })
        } else {
            Some(Statement::Expression(expression))
        }
    }

    fn parse_input_assignment(&mut self) -> Option<Statement> {
        let token = self.current.clone();
        if !self.expect_peek(TokenKind::Arrow) {
            return None;
        }
        let target = self.parse_assignment_target()?;
        Some(Statement::InputAssignment { token, target })
    }

    // Expects the current token to be `->`; leaves the target name as current.
    fn parse_assignment_target(&mut self) -> Option<Identifier> {
        let constant = self.peek_is(TokenKind::Bang);
        if constant {
            self.next_token();
        }
        if !self.expect_peek(TokenKind::Identifier) {
            return None;
        }
        let token = self.current.clone();
        Some(if constant {
            Identifier::constant(token)
        } else {
            Identifier::new(token)
        })
    }

    fn parse_repeat_block(&mut self) -> Statement {
        let token = self.current.clone();
        let mut body = Section::default();

        self.next_token();
        loop {
            while self.current_is(TokenKind::Newline) {
                self.next_token();
            }

            match self.current.kind {
                TokenKind::RBrace => break,
                TokenKind::Eof => {
                    let error = ParseError {
                        kind: ParseErrorKind::UnterminatedBlock,
                        token: token.clone(),
                        peek: self.current.clone(),
                    };
                    tracing::debug!(%error, "recorded parse error");
                    self.errors.push(error);
                    break;
                }
                _ => {}
            }

            if let Some(stmt) = self.parse_statement() {
                body.push(stmt);
            }
            self.next_token();
        }

        Statement::RepeatBlock { token, body }
    }

    // Precedence climbing: parse a prefix form, then fold in infix forms
    // that bind tighter than `precedence`.
    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let mut left = self.parse_prefix()?;

        while !self.peek_is(TokenKind::Eof) && precedence < Precedence::of(self.peek.kind) {
            self.next_token();
            left = self.parse_infix(left)?;
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        match self.current.kind {
            TokenKind::Identifier => Some(Expression::Identifier(Identifier::new(
                self.current.clone(),
            ))),
            TokenKind::Int => self.parse_integer_literal(),
            TokenKind::Float => self.parse_float_literal(),
            TokenKind::Minus => self.parse_prefix_expression(),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::Illegal => {
                self.error(ParseErrorKind::IllegalCharacter(self.current.literal.clone()));
                None
            }
            other => {
                self.error(ParseErrorKind::NoPrefixParseFn(other));
                None
            }
        }
    }

    fn parse_infix(&mut self, left: Expression) -> Option<Expression> {
        let operator = match self.current.kind {
            TokenKind::Plus => InfixOperator::Add,
            TokenKind::Minus => InfixOperator::Subtract,
            TokenKind::Asterisk => InfixOperator::Multiply,
            TokenKind::Slash => InfixOperator::Divide,
            TokenKind::LParen => return self.parse_call_expression(left),
            // Only tokens with a binding power above Lowest reach here
            other => {
                self.error(ParseErrorKind::NoPrefixParseFn(other));
                return None;
            }
        };

        let token = self.current.clone();
        let precedence = Precedence::of(token.kind);
        self.next_token();
        let right = self.parse_expression(precedence)?;

        Some(Expression::Infix {
            token,
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<i64>() {
            Ok(value) => Some(Expression::IntegerLiteral {
                token: self.current.clone(),
                value,
            }),
            Err(_) => {
                self.error(ParseErrorKind::InvalidInteger(self.current.literal.clone()));
                None
            }
        }
    }

    fn parse_float_literal(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<f64>() {
            Ok(value) => Some(Expression::FloatLiteral {
                token: self.current.clone(),
                value,
            }),
            Err(_) => {
                self.error(ParseErrorKind::InvalidFloat(self.current.literal.clone()));
                None
            }
        }
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        let token = self.current.clone();
        self.next_token();
        let operand = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix {
            token,
            operator: PrefixOperator::Negate,
            operand: Box::new(operand),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expression)
    }

    // some_expression ( 1, 2 )
    //                 ^ current token
    fn parse_call_expression(&mut self, callee: Expression) -> Option<Expression> {
        let token = self.current.clone();
        let arguments = self.parse_call_arguments()?;
        Some(Expression::Call {
            token,
            callee: Box::new(callee),
            arguments,
        })
    }

    fn parse_call_arguments(&mut self) -> Option<Vec<Expression>> {
        let mut arguments = Vec::new();

        if self.peek_is(TokenKind::RParen) {
            self.next_token();
            return Some(arguments);
        }

        self.next_token();
        arguments.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            arguments.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }

        Some(arguments)
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> Result<Section, Vec<ParseError>> {
    let mut parser = Parser::new(input);
    let section = parser.parse();
    if parser.errors().is_empty() {
        Ok(section)
    } else {
        Err(parser.into_errors())
    }
}
