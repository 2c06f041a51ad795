//! Front door for running calclang source: parse, then evaluate against a
//! long-lived environment so successive runs (REPL lines, for instance)
//! see each other's bindings.

use crate::builtins::Registry;
use crate::environment::Environment;
use crate::evaluator::{EvalError, Evaluator};
use crate::parser::{ParseError, parse_str};
use crate::source::Span;
use crate::types::Value;
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write};

/// Supplies the text for `? -> name` statements.
pub trait InputSource {
    /// Returns the next line of input, or `None` once the source is exhausted.
    fn read_line(&mut self, name: &str) -> io::Result<Option<String>>;
}

/// Prompts on stdout with `name? ` and reads one line from stdin.
#[derive(Debug, Default)]
pub struct StdinInput;

impl InputSource for StdinInput {
    fn read_line(&mut self, name: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}? ", name)?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

// Scripted input, one entry per request
impl InputSource for VecDeque<String> {
    fn read_line(&mut self, _name: &str) -> io::Result<Option<String>> {
        Ok(self.pop_front())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(Vec<ParseError>),
    /// `span` covers the top-level statement that failed.
    Eval { error: EvalError, span: Span },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(errors) => {
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", error)?;
                }
                Ok(())
            }
            Error::Eval { error, .. } => write!(f, "Evaluation Error: {}", error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(errors) => errors
                .first()
                .map(|e| e as &(dyn std::error::Error + 'static)),
            Error::Eval { error, .. } => Some(error),
        }
    }
}

/// An environment plus the builtins it can call.
#[derive(Debug, Clone)]
pub struct Interpreter {
    env: Environment,
    builtins: Registry,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(Registry::with_defaults())
    }
}

impl Interpreter {
    pub fn new(builtins: Registry) -> Self {
        Interpreter {
            env: Environment::new(),
            builtins,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn builtins(&self) -> &Registry {
        &self.builtins
    }

    /// Parses and runs `source`, passing each statement's value to
    /// `observer`. Returns the last value, or the first error.
    pub fn run(
        &mut self,
        source: &str,
        input: Option<&mut dyn InputSource>,
        observer: &mut dyn FnMut(&Value),
    ) -> Result<Option<Value>, Error> {
        let section = parse_str(source).map_err(Error::Parse)?;

        let mut evaluator = Evaluator::new(&self.builtins);
        if let Some(input) = input {
            evaluator = evaluator.with_input(input);
        }

        let mut last = None;
        for stmt in &section.statements {
            match evaluator.eval_statement(stmt, &mut self.env, observer) {
                Ok(Some(value)) => last = Some(value),
                Ok(None) => {}
                Err(error) => {
                    return Err(Error::Eval {
                        error,
                        span: stmt.span(),
                    });
                }
            }
        }
        Ok(last)
    }

    /// Runs `source` with no input source and no observer.
    pub fn eval_str(&mut self, source: &str) -> Result<Option<Value>, Error> {
        self.run(source, None, &mut |_| {})
    }
}
