use crate::evaluator::{EvalError, EvalResult};
use crate::types::{Arity, Builtin, BuiltinFn, Value};
use rand::Rng;
use std::collections::BTreeMap;

/// Arguments to `DELTA` closer than this count as equal.
pub const FLOAT_EQUALITY_TOL: f64 = 1e-6;

/// Name → builtin dispatch table. Names are stored upper cased and looked up
/// case insensitively, so `sqrt` and `SQRT` are the same subroutine.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    builtins: BTreeMap<String, Builtin>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry holding the standard builtins. Their bodies index `args`
    /// directly, relying on [`Builtin::call`] to enforce the registered arity.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();
        registry.register("SQRT", Arity::Fixed(1), true, builtin_sqrt);
        registry.register("FLOOR", Arity::Fixed(1), true, builtin_floor);
        registry.register("CEIL", Arity::Fixed(1), true, builtin_ceil);
        registry.register("ROUND", Arity::Fixed(1), true, builtin_round);
        registry.register("RANDOM_INT", Arity::Fixed(2), true, builtin_random_int);
        registry.register("P", Arity::Fixed(1), false, builtin_print);
        registry.register("DELTA", Arity::Variadic { min: 1 }, false, builtin_delta);
        registry
    }

    /// Adds or replaces a builtin.
    pub fn register(&mut self, name: &str, arity: Arity, strict: bool, func: BuiltinFn) {
        let name = name.to_ascii_uppercase();
        tracing::trace!(%name, %arity, "registering builtin");
        self.builtins.insert(
            name.clone(),
            Builtin {
                name,
                arity,
                strict,
                func,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.builtins.get(&name.to_ascii_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builtins.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.builtins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty()
    }
}

// Extracts a number (promoting integers) or returns an InvalidArguments error
macro_rules! expect_number {
    ($value:expr, $name:expr) => {
        match $value.as_f64() {
            Some(n) => n,
            None => {
                return Err(EvalError::InvalidArguments(format!(
                    "argument to `{}` not supported, got={}",
                    $name,
                    $value.type_name()
                )));
            }
        }
    };
}

fn float_to_integer(x: f64, name: &str) -> EvalResult {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Ok(Value::Integer(x as i64))
    } else {
        Err(EvalError::MathError(format!(
            "`{}` result {} does not fit in an integer",
            name, x
        )))
    }
}

// FLOOR, CEIL and ROUND share everything but the rounding function.
fn round_with(args: &[Value], name: &str, round: fn(f64) -> f64) -> EvalResult {
    match &args[0] {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        Value::Float(x) => float_to_integer(round(*x), name),
        other => Err(EvalError::InvalidArguments(format!(
            "argument to `{}` not supported, got={}",
            name,
            other.type_name()
        ))),
    }
}

fn builtin_floor(args: &[Value]) -> EvalResult {
    round_with(args, "FLOOR", f64::floor)
}

fn builtin_ceil(args: &[Value]) -> EvalResult {
    round_with(args, "CEIL", f64::ceil)
}

/// Rounds half away from zero.
fn builtin_round(args: &[Value]) -> EvalResult {
    round_with(args, "ROUND", f64::round)
}

fn builtin_sqrt(args: &[Value]) -> EvalResult {
    let n = expect_number!(args[0], "SQRT");
    let root = n.sqrt();
    if root.is_nan() {
        return Err(EvalError::MathError(format!(
            "cannot take the square root of {}",
            args[0]
        )));
    }
    Ok(Value::Float(root))
}

/// A uniformly chosen integer between the two bounds, inclusive.
fn builtin_random_int(args: &[Value]) -> EvalResult {
    let (lower, upper) = match (&args[0], &args[1]) {
        (Value::Integer(lower), Value::Integer(upper)) => (*lower, *upper),
        (Value::Integer(_), other) => {
            return Err(EvalError::InvalidArguments(format!(
                "argument 2 to `RANDOM_INT` not supported, got={}",
                other.type_name()
            )));
        }
        (other, _) => {
            return Err(EvalError::InvalidArguments(format!(
                "argument 1 to `RANDOM_INT` not supported, got={}",
                other.type_name()
            )));
        }
    };
    if lower > upper {
        return Err(EvalError::InvalidArguments(format!(
            "`RANDOM_INT` lower bound {} is greater than upper bound {}",
            lower, upper
        )));
    }
    Ok(Value::Integer(rand::thread_rng().gen_range(lower..=upper)))
}

/// Prints its argument on its own line and hands it back unchanged.
fn builtin_print(args: &[Value]) -> EvalResult {
    println!("{}", args[0]);
    Ok(args[0].clone())
}

/// Kronecker delta: `1` when every numeric argument is within
/// [`FLOAT_EQUALITY_TOL`] of the first, `0` otherwise. Non-numeric
/// arguments are ignored.
fn builtin_delta(args: &[Value]) -> EvalResult {
    let mut numbers = args.iter().filter_map(Value::as_f64);
    let Some(first) = numbers.next() else {
        return Err(EvalError::InvalidArguments(
            "`DELTA` needs at least one numeric argument".to_string(),
        ));
    };
    let same = numbers.all(|n| (n - first).abs() <= FLOAT_EQUALITY_TOL);
    Ok(Value::Integer(same as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> EvalResult {
        let registry = Registry::with_defaults();
        let builtin = registry
            .get(name)
            .unwrap_or_else(|| panic!("builtin {} is not registered", name));
        builtin.call(args)
    }

    fn sqrt_builtin() -> Value {
        Value::Builtin(Registry::with_defaults().get("SQRT").unwrap().clone())
    }

    #[test]
    fn test_default_names() {
        let registry = Registry::with_defaults();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["CEIL", "DELTA", "FLOOR", "P", "RANDOM_INT", "ROUND", "SQRT"]
        );
        assert_eq!(registry.len(), 7);
        assert!(Registry::new().is_empty());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let registry = Registry::with_defaults();
        assert!(registry.contains("sqrt"));
        assert!(registry.contains("Random_Int"));
        assert_eq!(registry.get("floor").map(|b| b.name.as_str()), Some("FLOOR"));
        assert!(!registry.contains("tanh"));
    }

    #[test]
    fn test_register_upper_cases_and_replaces() {
        fn zero(_: &[Value]) -> EvalResult {
            Ok(Value::Integer(0))
        }
        let mut registry = Registry::with_defaults();
        registry.register("sqrt", Arity::Fixed(0), false, zero);
        let builtin = registry.get("SQRT").unwrap();
        assert_eq!(builtin.name, "SQRT");
        assert_eq!(builtin.arity, Arity::Fixed(0));
        assert_eq!(builtin.call(&[]), Ok(Value::Integer(0)));
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_registered_arity_is_enforced() {
        fn first(args: &[Value]) -> EvalResult {
            Ok(args[0].clone())
        }
        let mut registry = Registry::new();
        registry.register("FIRST", Arity::Fixed(2), true, first);
        registry.register("ANY", Arity::Variadic { min: 1 }, false, first);

        assert_eq!(
            registry.get("FIRST").unwrap().call(&[Value::Integer(1)]),
            Err(EvalError::InvalidArguments(
                "wrong number of arguments. got=1, want=2".to_string()
            ))
        );
        assert_eq!(
            registry.get("ANY").unwrap().call(&[]),
            Err(EvalError::InvalidArguments(
                "wrong number of arguments. got=0, want>=1".to_string()
            ))
        );
        assert_eq!(
            registry
                .get("ANY")
                .unwrap()
                .call(&[Value::Integer(1), Value::Integer(2), Value::Integer(3)]),
            Ok(Value::Integer(1))
        );
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(call("SQRT", &[Value::Integer(16)]), Ok(Value::Float(4.0)));
        assert_eq!(call("SQRT", &[Value::Float(2.25)]), Ok(Value::Float(1.5)));
        assert!(matches!(
            call("SQRT", &[Value::Integer(-1)]),
            Err(EvalError::MathError(_))
        ));
        assert_eq!(
            call("SQRT", &[sqrt_builtin()]),
            Err(EvalError::InvalidArguments(
                "argument to `SQRT` not supported, got=BUILTIN".to_string()
            ))
        );
        assert_eq!(
            call("SQRT", &[]),
            Err(EvalError::InvalidArguments(
                "wrong number of arguments. got=0, want=1".to_string()
            ))
        );
    }

    #[test]
    fn test_rounding() {
        assert_eq!(call("FLOOR", &[Value::Float(2.7)]), Ok(Value::Integer(2)));
        assert_eq!(call("FLOOR", &[Value::Float(-2.5)]), Ok(Value::Integer(-3)));
        assert_eq!(call("CEIL", &[Value::Float(2.1)]), Ok(Value::Integer(3)));
        assert_eq!(call("ROUND", &[Value::Float(2.5)]), Ok(Value::Integer(3)));
        assert_eq!(call("ROUND", &[Value::Float(-2.5)]), Ok(Value::Integer(-3)));
        assert_eq!(call("ROUND", &[Value::Integer(7)]), Ok(Value::Integer(7)));
        assert!(matches!(
            call("FLOOR", &[Value::Float(f64::INFINITY)]),
            Err(EvalError::MathError(_))
        ));
        assert!(matches!(
            call("CEIL", &[Value::Float(1e300)]),
            Err(EvalError::MathError(_))
        ));
        assert!(matches!(
            call("ROUND", &[sqrt_builtin()]),
            Err(EvalError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_random_int() {
        for _ in 0..100 {
            match call("RANDOM_INT", &[Value::Integer(-2), Value::Integer(3)]) {
                Ok(Value::Integer(n)) => assert!((-2..=3).contains(&n)),
                other => panic!("unexpected RANDOM_INT result {:?}", other),
            }
        }
        assert_eq!(
            call("RANDOM_INT", &[Value::Integer(5), Value::Integer(5)]),
            Ok(Value::Integer(5))
        );
        assert_eq!(
            call("RANDOM_INT", &[Value::Integer(1), Value::Float(2.0)]),
            Err(EvalError::InvalidArguments(
                "argument 2 to `RANDOM_INT` not supported, got=FLOAT".to_string()
            ))
        );
        assert!(matches!(
            call("RANDOM_INT", &[Value::Integer(3), Value::Integer(1)]),
            Err(EvalError::InvalidArguments(_))
        ));
        assert!(matches!(
            call("RANDOM_INT", &[Value::Integer(1)]),
            Err(EvalError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_print_returns_argument() {
        assert_eq!(call("P", &[Value::Float(1.5)]), Ok(Value::Float(1.5)));
        assert_eq!(call("P", &[sqrt_builtin()]), Ok(sqrt_builtin()));
    }

    #[test]
    fn test_delta() {
        assert_eq!(call("DELTA", &[Value::Integer(1)]), Ok(Value::Integer(1)));
        assert_eq!(
            call("DELTA", &[Value::Integer(1), Value::Float(1.0000001)]),
            Ok(Value::Integer(1))
        );
        assert_eq!(
            call("DELTA", &[Value::Integer(1), Value::Integer(1), Value::Integer(2)]),
            Ok(Value::Integer(0))
        );
        assert_eq!(
            call("DELTA", &[sqrt_builtin(), Value::Integer(4), Value::Float(4.0)]),
            Ok(Value::Integer(1))
        );
        assert!(matches!(call("DELTA", &[]), Err(EvalError::InvalidArguments(_))));
        assert!(matches!(
            call("DELTA", &[sqrt_builtin()]),
            Err(EvalError::InvalidArguments(_))
        ));
    }
}
