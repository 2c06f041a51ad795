use crate::ast::{Expression, Identifier, InfixOperator, PrefixOperator, Section, Statement};
use crate::builtins::Registry;
use crate::environment::{EnvError, Environment};
use crate::interpreter::InputSource;
use crate::parser::parse_str;
use crate::types::Value;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),
    #[error("cannot assign to builtin: {0}")]
    CannotAssignToBuiltin(String),
    #[error(transparent)]
    Environment(#[from] EnvError),
    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: &'static str,
        operator: InfixOperator,
        right: &'static str,
    },
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("division error: division by zero")]
    DivisionByZero,
    #[error("integer overflow: {0}")]
    IntegerOverflow(String),
    #[error("not a subroutine, function or builtin: {0}")]
    NotASubroutine(&'static str),
    #[error("{0}")]
    InvalidArguments(String),
    #[error("math error: {0}")]
    MathError(String),
    #[error("no input available for {0}")]
    NoInput(String),
    #[error("invalid input for {name}: {reason}")]
    InvalidInput { name: String, reason: String },
    #[error("could not read input: {0}")]
    Input(String),
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Tree-walking evaluator. Borrows the builtin registry and, optionally, a
/// source of lines for `? -> name` statements.
pub struct Evaluator<'a> {
    builtins: &'a Registry,
    input: Option<&'a mut dyn InputSource>,
}

impl<'a> Evaluator<'a> {
    pub fn new(builtins: &'a Registry) -> Self {
        Evaluator {
            builtins,
            input: None,
        }
    }

    pub fn with_input(mut self, input: &'a mut dyn InputSource) -> Self {
        self.input = Some(input);
        self
    }

    /// Evaluates a section, discarding intermediate values.
    pub fn eval(&mut self, section: &Section, env: &mut Environment) -> EvalResult<Option<Value>> {
        self.eval_section(section, env, &mut |_| {})
    }

    /// Evaluates statements in order, handing each value to `observer`, and
    /// stops at the first error. Returns the last value produced, if any.
    pub fn eval_section(
        &mut self,
        section: &Section,
        env: &mut Environment,
        observer: &mut dyn FnMut(&Value),
    ) -> EvalResult<Option<Value>> {
        let mut last = None;
        for stmt in &section.statements {
            if let Some(value) = self.eval_statement(stmt, env, observer)? {
                last = Some(value);
            }
        }
        Ok(last)
    }

    /// Evaluates one statement. A repeat block reports each of its own
    /// statements to `observer` and yields its last value.
    pub fn eval_statement(
        &mut self,
        stmt: &Statement,
        env: &mut Environment,
        observer: &mut dyn FnMut(&Value),
    ) -> EvalResult<Option<Value>> {
        tracing::trace!(line = stmt.token().line, %stmt, "evaluating statement");

        let value = match stmt {
            // Runs once, sharing the enclosing scope
            Statement::RepeatBlock { body, .. } => return self.eval_section(body, env, observer),
            Statement::Expression(expression) => self.eval_expression(expression, env),
            Statement::Assignment { target, value } => self
                .eval_expression(value, env)
                .and_then(|value| self.assign(target, value, env)),
            Statement::InputAssignment { target, .. } => self.eval_input(target, env),
        }
        .inspect_err(|error| tracing::debug!(%error, "statement failed"))?;

        observer(&value);
        Ok(Some(value))
    }

    fn assign(&self, target: &Identifier, value: Value, env: &mut Environment) -> EvalResult {
        if self.builtins.contains(&target.name) {
            return Err(EvalError::CannotAssignToBuiltin(target.name.clone()));
        }
        if target.constant {
            env.set_constant(&target.name, value.clone())?;
        } else {
            env.set(&target.name, value.clone())?;
        }
        Ok(value)
    }

    // Reads one line, which must hold exactly one expression, and assigns its value.
    fn eval_input(&mut self, target: &Identifier, env: &mut Environment) -> EvalResult {
        let name = &target.name;
        let input = self
            .input
            .as_deref_mut()
            .ok_or_else(|| EvalError::NoInput(name.clone()))?;
        let line = input
            .read_line(name)
            .map_err(|err| EvalError::Input(err.to_string()))?
            .ok_or_else(|| EvalError::NoInput(name.clone()))?;

        let invalid = |reason: String| EvalError::InvalidInput {
            name: name.clone(),
            reason,
        };
        let section = parse_str(&line).map_err(|errors| {
            invalid(
                errors
                    .iter()
                    .map(|e| e.kind.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;
        let expression = match section.statements.as_slice() {
            [Statement::Expression(expression)] => expression,
            [] => return Err(invalid("expected an expression, got nothing".to_string())),
            [_] => return Err(invalid("expected an expression, got a statement".to_string())),
            _ => return Err(invalid("expected a single expression".to_string())),
        };

        let value = self.eval_expression(expression, env)?;
        self.assign(target, value, env)
    }

    pub fn eval_expression(&self, expression: &Expression, env: &Environment) -> EvalResult {
        match expression {
            Expression::IntegerLiteral { value, .. } => Ok(Value::Integer(*value)),
            Expression::FloatLiteral { value, .. } => Ok(Value::Float(*value)),
            Expression::Identifier(identifier) => self.eval_identifier(identifier, env),
            Expression::Prefix {
                operator, operand, ..
            } => {
                let operand = self.eval_expression(operand, env)?;
                eval_prefix(*operator, operand)
            }
            Expression::Infix {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.eval_expression(left, env)?;
                let right = self.eval_expression(right, env)?;
                eval_infix(left, *operator, right)
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                let builtin = match self.eval_expression(callee, env)? {
                    Value::Builtin(builtin) => builtin,
                    other => return Err(EvalError::NotASubroutine(other.type_name())),
                };
                let args = arguments
                    .iter()
                    .map(|arg| self.eval_expression(arg, env))
                    .collect::<EvalResult<Vec<_>>>()?;
                builtin.call(&args)
            }
        }
    }

    fn eval_identifier(&self, identifier: &Identifier, env: &Environment) -> EvalResult {
        if let Some(value) = env.get(&identifier.name) {
            return Ok(value.clone());
        }
        match self.builtins.get(&identifier.name) {
            Some(builtin) => Ok(Value::Builtin(builtin.clone())),
            None => Err(EvalError::IdentifierNotFound(identifier.name.clone())),
        }
    }
}

fn eval_prefix(operator: PrefixOperator, operand: Value) -> EvalResult {
    match (operator, operand) {
        (PrefixOperator::Negate, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| EvalError::IntegerOverflow(format!("-({})", i))),
        (PrefixOperator::Negate, Value::Float(x)) => Ok(Value::Float(-x)),
        (operator, other) => Err(EvalError::UnknownOperator(format!(
            "{}{}",
            operator,
            other.type_name()
        ))),
    }
}

// One integer side is promoted when the other is a float.
fn coerce(left: Value, right: Value) -> (Value, Value) {
    match (left, right) {
        (Value::Integer(i), Value::Float(x)) => (Value::Float(i as f64), Value::Float(x)),
        (Value::Float(x), Value::Integer(i)) => (Value::Float(x), Value::Float(i as f64)),
        pair => pair,
    }
}

fn eval_infix(left: Value, operator: InfixOperator, right: Value) -> EvalResult {
    match coerce(left, right) {
        (Value::Integer(l), Value::Integer(r)) => eval_integer_infix(l, operator, r),
        (Value::Float(l), Value::Float(r)) => eval_float_infix(l, operator, r),
        (left, right) if left.type_name() != right.type_name() => Err(EvalError::TypeMismatch {
            left: left.type_name(),
            operator,
            right: right.type_name(),
        }),
        (left, right) => Err(EvalError::UnknownOperator(format!(
            "{} {} {}",
            left.type_name(),
            operator,
            right.type_name()
        ))),
    }
}

fn eval_integer_infix(l: i64, operator: InfixOperator, r: i64) -> EvalResult {
    let overflow = || EvalError::IntegerOverflow(format!("{} {} {}", l, operator, r));
    let result = match operator {
        InfixOperator::Add => l.checked_add(r),
        InfixOperator::Subtract => l.checked_sub(r),
        InfixOperator::Multiply => l.checked_mul(r),
        InfixOperator::Divide => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            // Exact quotients stay integers; anything else becomes a float
            if l.checked_rem(r).ok_or_else(overflow)? != 0 {
                return Ok(Value::Float(l as f64 / r as f64));
            }
            l.checked_div(r)
        }
    };
    result.map(Value::Integer).ok_or_else(overflow)
}

fn eval_float_infix(l: f64, operator: InfixOperator, r: f64) -> EvalResult {
    let result = match operator {
        InfixOperator::Add => l + r,
        InfixOperator::Subtract => l - r,
        InfixOperator::Multiply => l * r,
        InfixOperator::Divide => {
            // Also catches -0.0
            if r == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            l / r
        }
    };
    Ok(Value::Float(result))
}
