use crate::evaluator::{EvalError, EvalResult};
use std::fmt; // For custom display formatting

/// A runtime value produced by evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Builtin(Builtin),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Builtin(_) => "BUILTIN",
        }
    }

    /// Numeric view of the value, promoting integers. Builtins have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            Value::Builtin(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name),
        }
    }
}

pub type BuiltinFn = fn(&[Value]) -> EvalResult;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic { min: usize },
}

impl Arity {
    pub fn check(self, got: usize) -> Result<(), EvalError> {
        match self {
            Arity::Fixed(want) if got != want => Err(EvalError::InvalidArguments(format!(
                "wrong number of arguments. got={}, want={}",
                got, want
            ))),
            Arity::Variadic { min } if got < min => Err(EvalError::InvalidArguments(format!(
                "wrong number of arguments. got={}, want>={}",
                got, min
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic { min } => write!(f, "{}+", min),
        }
    }
}

/// A named native subroutine. `strict` marks builtins that only accept
/// numbers; the evaluator passes every argument either way.
#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub arity: Arity,
    pub strict: bool,
    pub func: BuiltinFn,
}

impl Builtin {
    /// Checks the argument count against `arity`, then runs the builtin.
    pub fn call(&self, args: &[Value]) -> EvalResult {
        self.arity.check(args.len())?;
        (self.func)(args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({}/{})", self.name, self.arity)
    }
}

// Function pointers don't compare meaningfully, so builtins are equal by name.
impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(args: &[Value]) -> EvalResult {
        Ok(args[0].clone())
    }

    fn builtin(name: &str) -> Builtin {
        Builtin {
            name: name.to_string(),
            arity: Arity::Fixed(1),
            strict: true,
            func: identity,
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(-42).to_string(), "-42");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(4.0).to_string(), "4");
        assert_eq!(Value::Float(1e21).to_string(), "1000000000000000000000");
        assert_eq!(Value::Builtin(builtin("SQRT")).to_string(), "<builtin SQRT>");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Integer(1).type_name(), "INTEGER");
        assert_eq!(Value::Float(1.0).type_name(), "FLOAT");
        assert_eq!(Value::Builtin(builtin("P")).type_name(), "BUILTIN");
    }

    #[test]
    fn test_arity_check() {
        assert!(Arity::Fixed(1).check(1).is_ok());
        assert_eq!(
            Arity::Fixed(1).check(2),
            Err(EvalError::InvalidArguments(
                "wrong number of arguments. got=2, want=1".to_string()
            ))
        );
        assert!(Arity::Variadic { min: 1 }.check(5).is_ok());
        assert_eq!(
            Arity::Variadic { min: 1 }.check(0),
            Err(EvalError::InvalidArguments(
                "wrong number of arguments. got=0, want>=1".to_string()
            ))
        );
    }

    #[test]
    fn test_builtins_compare_by_name() {
        let a = builtin("P");
        let mut b = builtin("P");
        b.strict = false;
        assert_eq!(a, b);
        assert_ne!(a, builtin("SQRT"));
        assert_eq!(format!("{:?}", a), "Builtin(P/1)");
        assert_eq!(a.call(&[Value::Integer(3)]), Ok(Value::Integer(3)));
    }

    #[test]
    fn test_call_checks_arity_before_running() {
        let p = builtin("P");
        assert_eq!(
            p.call(&[]),
            Err(EvalError::InvalidArguments(
                "wrong number of arguments. got=0, want=1".to_string()
            ))
        );
    }
}
