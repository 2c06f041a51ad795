//! Syntax tree produced by the parser.
//!
//! Every node keeps the token it was built from so diagnostics can point back
//! into the source. `Display` renders expressions fully parenthesized, which
//! makes operator precedence visible in tests and in the REPL's parse mode.

use crate::lexer::Token;
use crate::source::Span;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PrefixOperator {
    Negate,
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOperator::Negate => write!(f, "-"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InfixOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            InfixOperator::Add => "+",
            InfixOperator::Subtract => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
        };
        write!(f, "{}", symbol)
    }
}

/// A name reference. `constant` is only ever set on assignment targets
/// written as `-> !name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub token: Token,
    pub name: String,
    pub constant: bool,
}

impl Identifier {
    pub fn new(token: Token) -> Self {
        Identifier {
            name: token.literal.clone(),
            token,
            constant: false,
        }
    }

    pub fn constant(token: Token) -> Self {
        Identifier {
            constant: true,
            ..Identifier::new(token)
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constant {
            write!(f, "!")?;
        }
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    IntegerLiteral {
        token: Token,
        value: i64,
    },
    FloatLiteral {
        token: Token,
        value: f64,
    },
    Prefix {
        token: Token,
        operator: PrefixOperator,
        operand: Box<Expression>,
    },
    Infix {
        token: Token,
        left: Box<Expression>,
        operator: InfixOperator,
        right: Box<Expression>,
    },
    /// `token` is the opening parenthesis.
    Call {
        token: Token,
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    pub fn token(&self) -> &Token {
        match self {
            Expression::Identifier(identifier) => &identifier.token,
            Expression::IntegerLiteral { token, .. }
            | Expression::FloatLiteral { token, .. }
            | Expression::Prefix { token, .. }
            | Expression::Infix { token, .. }
            | Expression::Call { token, .. } => token,
        }
    }

    /// Source range covered by the whole expression.
    pub fn span(&self) -> Span {
        match self {
            Expression::Identifier(_)
            | Expression::IntegerLiteral { .. }
            | Expression::FloatLiteral { .. } => self.token().span,
            Expression::Prefix { token, operand, .. } => token.span.merge(operand.span()),
            Expression::Infix { left, right, .. } => left.span().merge(right.span()),
            Expression::Call {
                token,
                callee,
                arguments,
            } => arguments
                .iter()
                .fold(callee.span().merge(token.span), |span, arg| {
                    span.merge(arg.span())
                }),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(identifier) => write!(f, "{}", identifier),
            Expression::IntegerLiteral { value, .. } => write!(f, "{}", value),
            Expression::FloatLiteral { value, .. } => write!(f, "{}", value),
            Expression::Prefix {
                operator, operand, ..
            } => write!(f, "({}{})", operator, operand),
            Expression::Infix {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator, right),
            Expression::Call {
                callee, arguments, ..
            } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    /// `value -> target`; the statement's token is the target's.
    Assignment {
        target: Identifier,
        value: Expression,
    },
    /// `? -> target`
    InputAssignment {
        token: Token,
        target: Identifier,
    },
    RepeatBlock {
        token: Token,
        body: Section,
    },
}

impl Statement {
    pub fn token(&self) -> &Token {
        match self {
            Statement::Expression(expression) => expression.token(),
            Statement::Assignment { target, .. } => &target.token,
            Statement::InputAssignment { token, .. } | Statement::RepeatBlock { token, .. } => {
                token
            }
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Statement::Expression(expression) => expression.span(),
            Statement::Assignment { target, value } => value.span().merge(target.token.span),
            Statement::InputAssignment { token, target } => token.span.merge(target.token.span),
            Statement::RepeatBlock { token, body } => body
                .statements
                .iter()
                .fold(token.span, |span, stmt| span.merge(stmt.span())),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Expression(expression) => write!(f, "{}", expression),
            Statement::Assignment { target, value } => write!(f, "{} -> {}", value, target),
            Statement::InputAssignment { target, .. } => write!(f, "? -> {}", target),
            Statement::RepeatBlock { body, .. } => {
                writeln!(f, "{{")?;
                for stmt in &body.statements {
                    writeln!(f, "{}", stmt)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// An ordered list of statements: a whole program or one block's body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    pub statements: Vec<Statement>,
}

impl Section {
    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}
