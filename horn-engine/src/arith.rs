//! Arithmetic evaluation for `is/2` and the numeric comparisons.
//!
//! Expressions are terms built from numbers and the standard function
//! set.  Integer arithmetic is checked: overflow raises
//! `evaluation_error(int_overflow)`, division and modulus by zero
//! raise `evaluation_error(zero_divisor)`.  A float result that is not
//! finite raises `evaluation_error(float_overflow)` (or `undefined`
//! for indeterminate forms).  Mixed integer/float operands widen to
//! float.

use crate::error::PrologError;
use horn_terms::{Arena, Env, Term, View};
use std::cmp::Ordering;

/// An evaluated number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Real(f64),
}

impl Number {
    pub fn into_term(self) -> Term {
        match self {
            Number::Int(i) => Term::int(i),
            Number::Real(r) => Term::real(r),
        }
    }

    fn as_real(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Real(r) => r,
        }
    }

    /// Numeric comparison across kinds.
    pub fn compare(self, other: Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (a, b) => a.as_real().total_cmp(&b.as_real()),
        }
    }
}

const CONTEXT: &str = "is/2";

fn int_overflow(arena: &mut Arena) -> PrologError {
    PrologError::evaluation_error(arena, "int_overflow", CONTEXT)
}

fn zero_divisor(arena: &mut Arena) -> PrologError {
    PrologError::evaluation_error(arena, "zero_divisor", CONTEXT)
}

fn undefined(arena: &mut Arena) -> PrologError {
    PrologError::evaluation_error(arena, "undefined", CONTEXT)
}

fn finite(arena: &mut Arena, r: f64) -> Result<Number, PrologError> {
    if r.is_infinite() {
        return Err(PrologError::evaluation_error(
            arena,
            "float_overflow",
            CONTEXT,
        ));
    }
    if r.is_nan() {
        return Err(undefined(arena));
    }
    Ok(Number::Real(r))
}

fn checked(arena: &mut Arena, v: Option<i64>) -> Result<Number, PrologError> {
    match v {
        Some(i) => Ok(Number::Int(i)),
        None => Err(int_overflow(arena)),
    }
}

/// Evaluates `expr` under `env` to a number.
pub fn eval(arena: &mut Arena, env: &Env, expr: Term) -> Result<Number, PrologError> {
    let expr = env.resolve(expr);

    enum Node {
        Num(Number),
        Nullary(smartstring::alias::String),
        Unary(smartstring::alias::String, Term),
        Binary(smartstring::alias::String, Term, Term),
        Unbound,
        Bad,
    }
    let node = match expr.view(arena) {
        Ok(View::Int(i)) => Node::Num(Number::Int(i)),
        Ok(View::Real(r)) => Node::Num(Number::Real(r)),
        Ok(View::Atom(name)) => Node::Nullary(name.into()),
        Ok(View::Func(ar, functor, args)) => match (ar.atom_name(functor), args.len()) {
            (Ok(name), 1) => Node::Unary(name.into(), args[0]),
            (Ok(name), 2) => Node::Binary(name.into(), args[0], args[1]),
            _ => Node::Bad,
        },
        Ok(View::Var(_)) => Node::Unbound,
        Err(_) => Node::Bad,
    };

    match node {
        Node::Num(n) => Ok(n),
        Node::Nullary(name) => match name.as_str() {
            "pi" => Ok(Number::Real(std::f64::consts::PI)),
            "e" => Ok(Number::Real(std::f64::consts::E)),
            "max_integer" => Ok(Number::Int(i64::MAX)),
            "min_integer" => Ok(Number::Int(i64::MIN)),
            "epsilon" => Ok(Number::Real(f64::EPSILON)),
            _ => {
                let culprit = expr;
                Err(PrologError::type_error(
                    arena,
                    "evaluable",
                    culprit,
                    CONTEXT,
                ))
            }
        },
        Node::Unary(name, arg) => {
            let a = eval(arena, env, arg)?;
            eval_unary(arena, name.as_str(), a, expr)
        }
        Node::Binary(name, lhs, rhs) => {
            let a = eval(arena, env, lhs)?;
            let b = eval(arena, env, rhs)?;
            eval_binary(arena, name.as_str(), a, b, expr)
        }
        Node::Unbound => Err(PrologError::instantiation(arena, CONTEXT)),
        Node::Bad => Err(PrologError::type_error(arena, "evaluable", expr, CONTEXT)),
    }
}

fn eval_unary(
    arena: &mut Arena,
    name: &str,
    a: Number,
    expr: Term,
) -> Result<Number, PrologError> {
    match (name, a) {
        ("-", Number::Int(i)) => checked(arena, i.checked_neg()),
        ("-", Number::Real(r)) => Ok(Number::Real(-r)),
        ("+", n) => Ok(n),
        ("abs", Number::Int(i)) => checked(arena, i.checked_abs()),
        ("abs", Number::Real(r)) => Ok(Number::Real(r.abs())),
        ("sign", Number::Int(i)) => Ok(Number::Int(i.signum())),
        ("sign", Number::Real(r)) => Ok(Number::Real(if r == 0.0 { 0.0 } else { r.signum() })),
        ("sqrt", n) => {
            let r = n.as_real();
            if r < 0.0 {
                Err(undefined(arena))
            } else {
                finite(arena, r.sqrt())
            }
        }
        ("sin", n) => finite(arena, n.as_real().sin()),
        ("cos", n) => finite(arena, n.as_real().cos()),
        ("tan", n) => finite(arena, n.as_real().tan()),
        ("atan", n) => finite(arena, n.as_real().atan()),
        ("exp", n) => finite(arena, n.as_real().exp()),
        ("log", n) => {
            let r = n.as_real();
            if r <= 0.0 {
                Err(undefined(arena))
            } else {
                finite(arena, r.ln())
            }
        }
        ("float", n) => Ok(Number::Real(n.as_real())),
        ("integer", Number::Int(i)) => Ok(Number::Int(i)),
        ("integer", Number::Real(r)) => to_int(arena, r.round()),
        ("floor", Number::Int(i)) => Ok(Number::Int(i)),
        ("floor", Number::Real(r)) => to_int(arena, r.floor()),
        ("ceiling", Number::Int(i)) => Ok(Number::Int(i)),
        ("ceiling", Number::Real(r)) => to_int(arena, r.ceil()),
        ("round", Number::Int(i)) => Ok(Number::Int(i)),
        ("round", Number::Real(r)) => to_int(arena, r.round()),
        ("truncate", Number::Int(i)) => Ok(Number::Int(i)),
        ("truncate", Number::Real(r)) => to_int(arena, r.trunc()),
        ("float_integer_part", n) => Ok(Number::Real(n.as_real().trunc())),
        ("float_fractional_part", n) => Ok(Number::Real(n.as_real().fract())),
        ("\\", Number::Int(i)) => Ok(Number::Int(!i)),
        ("\\", Number::Real(_)) => Err(PrologError::type_error(arena, "integer", expr, CONTEXT)),
        _ => Err(PrologError::type_error(arena, "evaluable", expr, CONTEXT)),
    }
}

fn to_int(arena: &mut Arena, r: f64) -> Result<Number, PrologError> {
    if r >= (i64::MIN as f64) && r <= (i64::MAX as f64) {
        Ok(Number::Int(r as i64))
    } else {
        Err(int_overflow(arena))
    }
}

fn eval_binary(
    arena: &mut Arena,
    name: &str,
    a: Number,
    b: Number,
    expr: Term,
) -> Result<Number, PrologError> {
    use Number::{Int, Real};
    match (name, a, b) {
        ("+", Int(x), Int(y)) => checked(arena, x.checked_add(y)),
        ("+", x, y) => finite(arena, x.as_real() + y.as_real()),
        ("-", Int(x), Int(y)) => checked(arena, x.checked_sub(y)),
        ("-", x, y) => finite(arena, x.as_real() - y.as_real()),
        ("*", Int(x), Int(y)) => checked(arena, x.checked_mul(y)),
        ("*", x, y) => finite(arena, x.as_real() * y.as_real()),
        ("/", Int(x), Int(y)) => {
            if y == 0 {
                Err(zero_divisor(arena))
            } else {
                checked(arena, x.checked_div(y))
            }
        }
        ("/", x, y) => {
            if y.as_real() == 0.0 {
                Err(zero_divisor(arena))
            } else {
                finite(arena, x.as_real() / y.as_real())
            }
        }
        ("//", Int(x), Int(y)) => {
            if y == 0 {
                Err(zero_divisor(arena))
            } else {
                checked(arena, x.checked_div(y))
            }
        }
        ("//", _, _) => Err(PrologError::type_error(arena, "integer", expr, CONTEXT)),
        ("mod", Int(x), Int(y)) => {
            if y == 0 {
                Err(zero_divisor(arena))
            } else {
                checked(arena, x.checked_rem_euclid(y).map(|r| {
                    // Result takes the sign of the divisor.
                    if r != 0 && (y < 0) != (r < 0) {
                        r + y
                    } else {
                        r
                    }
                }))
            }
        }
        ("mod", _, _) => Err(PrologError::type_error(arena, "integer", expr, CONTEXT)),
        ("rem", Int(x), Int(y)) => {
            if y == 0 {
                Err(zero_divisor(arena))
            } else {
                checked(arena, x.checked_rem(y))
            }
        }
        ("rem", _, _) => Err(PrologError::type_error(arena, "integer", expr, CONTEXT)),
        ("min", x, y) => Ok(if x.compare(y) == Ordering::Greater { y } else { x }),
        ("max", x, y) => Ok(if x.compare(y) == Ordering::Less { y } else { x }),
        ("**", x, y) => finite(arena, x.as_real().powf(y.as_real())),
        ("^", Int(x), Int(y)) => {
            if y < 0 {
                match x {
                    1 => Ok(Int(1)),
                    -1 => Ok(Int(if y % 2 == 0 { 1 } else { -1 })),
                    0 => Err(zero_divisor(arena)),
                    _ => Err(undefined(arena)),
                }
            } else {
                let exp = u32::try_from(y).map_err(|_| int_overflow(arena))?;
                checked(arena, x.checked_pow(exp))
            }
        }
        ("^", x, y) => finite(arena, x.as_real().powf(y.as_real())),
        (">>", Int(x), Int(y)) => {
            let shift = u32::try_from(y).map_err(|_| undefined(arena))?;
            checked(arena, x.checked_shr(shift))
        }
        ("<<", Int(x), Int(y)) => {
            let shift = u32::try_from(y).map_err(|_| undefined(arena))?;
            checked(arena, x.checked_shl(shift))
        }
        ("/\\", Int(x), Int(y)) => Ok(Int(x & y)),
        ("\\/", Int(x), Int(y)) => Ok(Int(x | y)),
        ("xor", Int(x), Int(y)) => Ok(Int(x ^ y)),
        (">>" | "<<" | "/\\" | "\\/" | "xor", _, _) => {
            Err(PrologError::type_error(arena, "integer", expr, CONTEXT))
        }
        _ => Err(PrologError::type_error(arena, "evaluable", expr, CONTEXT)),
    }
}
