// Declare modules publicly so they are part of the library interface
pub mod ast;
pub mod builtins;
pub mod config;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod source;
pub mod types;

pub use ast::{Expression, Section, Statement};
pub use builtins::Registry;
pub use environment::{EnvError, Environment};
pub use evaluator::{EvalError, EvalResult, Evaluator};
pub use interpreter::{Error, InputSource, Interpreter, StdinInput};
pub use lexer::{Lexer, Token, TokenKind, tokenize};
pub use parser::{ParseError, ParseErrorKind, Parser, parse_str};
pub use source::Span;
pub use types::{Arity, Builtin, Value};

/// Installs a `tracing` subscriber filtered by `RUST_LOG`. Does nothing when
/// the variable is unset, so normal output stays clean.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(EnvFilter::from_default_env())
        .init();
}
