//! Numbers: `Comparable`, `Numeric`, `Integer`, `Float` and `Math`, plus the
//! arithmetic operators shared with strings and lists.

use std::{cmp::Ordering, f64::consts};

use super::{Arity, Constant, TypeDef, TypeKind, callable_arg, float_arg, int_arg};
use crate::{
    exception::{ExcKind, Exception, RunResult},
    expressions::BinOp,
    interp::Interp,
    value::Value,
};

fn overflow() -> Exception {
    Exception::new(ExcKind::ArithmeticError, "integer overflow")
}

fn divided_by_zero() -> Exception {
    Exception::new(ExcKind::ZeroDivisionError, "divided by 0")
}

fn undefined_operator(op: &str, value: &Value) -> Exception {
    Exception::new(
        ExcKind::NoMethodError,
        format!("undefined method `{op}' for {}:{}", value.inspect(), value.type_name()),
    )
}

/// Evaluates `+ - * / %`.
///
/// Integer arithmetic is checked; mixing integers and floats yields a float.
/// Division and modulo round toward negative infinity, so `-7 / 2 == -4` and
/// `-7 % 2 == 1`.
pub(crate) fn arithmetic(op: BinOp, left: &Value, right: &Value) -> RunResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b).map(Value::Int),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Ok(Value::Float(float_arithmetic(op, float_arg(left)?, float_arg(right)?)))
        }
        (Value::Int(_) | Value::Float(_), other) => Err(Exception::type_error(format!(
            "{} can't be coerced into {}",
            other.type_name(),
            left.type_name()
        ))),
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => Ok(Value::Str(format!("{a}{b}"))),
        (Value::Str(a), Value::Int(count)) if op == BinOp::Mul => Ok(Value::Str(a.repeat(repeat_count(*count)?))),
        (Value::Str(_), other) if matches!(op, BinOp::Add) => Err(Exception::type_error(format!(
            "no implicit conversion of {} into String",
            other.type_name()
        ))),
        (Value::List(a), Value::List(b)) if op == BinOp::Add => Ok(Value::List(a.iter().chain(b).cloned().collect())),
        (Value::List(a), Value::Int(count)) if op == BinOp::Mul => {
            let count = repeat_count(*count)?;
            Ok(Value::List(a.iter().cloned().cycle().take(a.len() * count).collect()))
        }
        _ => Err(undefined_operator(op.symbol(), left)),
    }
}

fn repeat_count(count: i64) -> RunResult<usize> {
    usize::try_from(count).map_err(|_| Exception::argument_error("negative argument"))
}

fn int_arithmetic(op: BinOp, a: i64, b: i64) -> RunResult<i64> {
    match op {
        BinOp::Add => a.checked_add(b).ok_or_else(overflow),
        BinOp::Sub => a.checked_sub(b).ok_or_else(overflow),
        BinOp::Mul => a.checked_mul(b).ok_or_else(overflow),
        BinOp::Div => floor_div(a, b),
        BinOp::Mod => floor_mod(a, b),
        _ => Err(Exception::argument_error(format!("`{}` is not arithmetic", op.symbol()))),
    }
}

fn floor_div(a: i64, b: i64) -> RunResult<i64> {
    if b == 0 {
        return Err(divided_by_zero());
    }
    let quotient = a.checked_div(b).ok_or_else(overflow)?;
    Ok(if a % b != 0 && ((a < 0) != (b < 0)) { quotient - 1 } else { quotient })
}

fn floor_mod(a: i64, b: i64) -> RunResult<i64> {
    if b == 0 {
        return Err(divided_by_zero());
    }
    let remainder = a.checked_rem(b).unwrap_or(0);
    Ok(if remainder != 0 && ((remainder < 0) != (b < 0)) { remainder + b } else { remainder })
}

fn float_arithmetic(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Mod => {
            let remainder = a % b;
            if remainder != 0.0 && ((remainder < 0.0) != (b < 0.0)) {
                remainder + b
            } else {
                remainder
            }
        }
        _ => f64::NAN,
    }
}

/// Unary minus.
pub(crate) fn negate(value: &Value) -> RunResult<Value> {
    match value {
        Value::Int(int) => int.checked_neg().map(Value::Int).ok_or_else(overflow),
        Value::Float(float) => Ok(Value::Float(-float)),
        other => Err(undefined_operator("-@", other)),
    }
}

/// Converts a float to an integer, failing for NaN, infinities and out of range values.
fn float_to_int(value: f64) -> RunResult<i64> {
    if value.is_nan() || value.is_infinite() {
        return Err(Exception::new(ExcKind::ArithmeticError, Value::Float(value).to_string()));
    }
    if value >= 9_223_372_036_854_775_807.0 || value < -9_223_372_036_854_775_808.0 {
        return Err(Exception::new(
            ExcKind::ArithmeticError,
            format!("float {value} out of range of integer"),
        ));
    }
    Ok(value as i64)
}

// ============================================================================
// Comparable
// ============================================================================

pub(super) fn comparable() -> TypeDef {
    TypeDef {
        doc: "Ordering helpers for values that support `<`.\n\n\
              Included by Numeric and String.",
        instance_methods: vec![
            native!(
                "between?",
                "(min, max)",
                Arity::exact(2),
                comparable_between,
                "Tests `min <= self && self <= max`.\n\
                 @param [Comparable] min\n\
                 @param [Comparable] max\n\
                 @return [Boolean]",
            ),
            native!(
                "clamp",
                "(min, max)",
                Arity::exact(2),
                comparable_clamp,
                "Returns +min+ if the receiver is below it, +max+ if above, otherwise the receiver.\n\
                 @raise [ArgumentError] if +min+ is greater than +max+\n\
                 @example\n  15.clamp(0, 10) # => 10",
            ),
        ],
        ..TypeDef::new("Comparable", TypeKind::Module, here!())
    }
}

fn comparable_between(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(
        receiver.compare(&args[0])? != Ordering::Less && receiver.compare(&args[1])? != Ordering::Greater,
    ))
}

fn comparable_clamp(_: &mut Interp<'_>, receiver: &Value, mut args: Vec<Value>) -> RunResult<Value> {
    let max = args.pop().unwrap_or(Value::Nil);
    let min = args.pop().unwrap_or(Value::Nil);
    if min.compare(&max)? == Ordering::Greater {
        return Err(Exception::argument_error(
            "min argument must be less than or equal to max argument",
        ));
    }
    Ok(if receiver.compare(&min)? == Ordering::Less {
        min
    } else if receiver.compare(&max)? == Ordering::Greater {
        max
    } else {
        receiver.clone()
    })
}

// ============================================================================
// Numeric
// ============================================================================

pub(super) fn numeric() -> TypeDef {
    TypeDef {
        includes: &["Comparable"],
        doc: "Common behaviour of Integer and Float.",
        instance_methods: vec![
            native!("abs", "()", Arity::exact(0), numeric_abs, "Returns the absolute value.\n@return [Numeric]"),
            native!("zero?", "()", Arity::exact(0), numeric_is_zero, "@return [Boolean]"),
            native!("positive?", "()", Arity::exact(0), numeric_is_positive, "@return [Boolean]"),
            native!("negative?", "()", Arity::exact(0), numeric_is_negative, "@return [Boolean]"),
            native!(
                "integer?",
                "()",
                Arity::exact(0),
                numeric_is_integer,
                "True for integers, false for floats.\n@return [Boolean]",
            ),
            native!(
                "to_i",
                "()",
                Arity::exact(0),
                numeric_to_i,
                "Truncates toward zero.\n\
                 @raise [ArithmeticError] for NaN, infinities and floats outside the integer range\n\
                 @return [Integer]",
            ),
            native!("to_f", "()", Arity::exact(0), numeric_to_f, "@return [Float]"),
            native!(
                "round",
                "(digits = 0)",
                Arity::range(0, 1),
                numeric_round,
                "Rounds half away from zero.\n\
                 @param [Integer] digits decimal places to keep\n\
                 @return [Integer] when +digits+ is zero\n\
                 @return [Float] otherwise",
            ),
            native!("floor", "()", Arity::exact(0), numeric_floor, "Largest integer not above the receiver.\n@return [Integer]"),
            native!("ceil", "()", Arity::exact(0), numeric_ceil, "Smallest integer not below the receiver.\n@return [Integer]"),
            native!(
                "divmod",
                "(divisor)",
                Arity::exact(1),
                numeric_divmod,
                "Returns `[quotient, modulus]` using floored division.\n\
                 @param [Numeric] divisor\n\
                 @return [List<Numeric>]\n\
                 @example\n  -7.divmod(2) # => [-4, 1]",
            ),
        ],
        ..TypeDef::new("Numeric", TypeKind::Class, here!())
    }
}

fn numeric_abs(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    match receiver {
        Value::Int(int) => int.checked_abs().map(Value::Int).ok_or_else(overflow),
        other => Ok(Value::Float(float_arg(other)?.abs())),
    }
}

fn sign(receiver: &Value) -> RunResult<Ordering> {
    receiver.compare(&Value::Int(0))
}

fn numeric_is_zero(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(float_arg(receiver)? == 0.0))
}

fn numeric_is_positive(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(sign(receiver).is_ok_and(Ordering::is_gt)))
}

fn numeric_is_negative(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(sign(receiver).is_ok_and(Ordering::is_lt)))
}

fn numeric_is_integer(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(matches!(receiver, Value::Int(_))))
}

fn numeric_to_i(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    match receiver {
        Value::Int(int) => Ok(Value::Int(*int)),
        other => float_to_int(float_arg(other)?.trunc()).map(Value::Int),
    }
}

fn numeric_to_f(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Float(float_arg(receiver)?))
}

fn numeric_round(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let digits = match args.first() {
        Some(digits) => int_arg(digits)?,
        None => 0,
    };
    match receiver {
        Value::Int(int) if digits >= 0 => Ok(Value::Int(*int)),
        Value::Int(int) => {
            let scale = 10_i64.checked_pow(u32::try_from(-digits).unwrap_or(u32::MAX)).ok_or_else(overflow)?;
            let rounded = (*int as f64 / scale as f64).round() * scale as f64;
            float_to_int(rounded).map(Value::Int)
        }
        other => {
            let value = float_arg(other)?;
            if digits <= 0 && digits > -19 {
                let scale = 10_f64.powi(i32::try_from(-digits).unwrap_or(0));
                float_to_int((value / scale).round() * scale).map(Value::Int)
            } else {
                let scale = 10_f64.powi(i32::try_from(digits).unwrap_or(i32::MAX));
                Ok(Value::Float((value * scale).round() / scale))
            }
        }
    }
}

fn numeric_floor(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    match receiver {
        Value::Int(int) => Ok(Value::Int(*int)),
        other => float_to_int(float_arg(other)?.floor()).map(Value::Int),
    }
}

fn numeric_ceil(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    match receiver {
        Value::Int(int) => Ok(Value::Int(*int)),
        other => float_to_int(float_arg(other)?.ceil()).map(Value::Int),
    }
}

fn numeric_divmod(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    if let (Value::Int(a), Value::Int(b)) = (receiver, &args[0]) {
        return Ok(Value::List(vec![
            Value::Int(floor_div(*a, *b)?),
            Value::Int(floor_mod(*a, *b)?),
        ]));
    }
    let (a, b) = (float_arg(receiver)?, float_arg(&args[0])?);
    if b == 0.0 {
        return Err(divided_by_zero());
    }
    let quotient = (a / b).floor();
    Ok(Value::List(vec![
        Value::Int(float_to_int(quotient)?),
        Value::Float(float_arithmetic(BinOp::Mod, a, b)),
    ]))
}

// ============================================================================
// Integer
// ============================================================================

pub(super) fn integer() -> TypeDef {
    TypeDef {
        superclass: Some("Numeric"),
        doc: "64-bit signed integers.\n\n\
              Arithmetic is checked: overflowing `+`, `-` or `*` raises ArithmeticError.\n\
              @see Float",
        instance_methods: vec![
            native!("even?", "()", Arity::exact(0), integer_is_even, "@return [Boolean]"),
            native!("odd?", "()", Arity::exact(0), integer_is_odd, "@return [Boolean]"),
            native!("succ", "()", Arity::exact(0), integer_succ, "Returns the receiver plus one.\n@return [Integer]"),
            native!("pred", "()", Arity::exact(0), integer_pred, "Returns the receiver minus one.\n@return [Integer]"),
            native!(
                "pow",
                "(exponent)",
                Arity::exact(1),
                integer_pow,
                "Raises the receiver to +exponent+.\n\
                 @param [Integer] exponent negative exponents produce a Float\n\
                 @raise [ArithmeticError] on overflow\n\
                 @return [Numeric]",
            ),
            native!("gcd", "(other)", Arity::exact(1), integer_gcd, "Greatest common divisor.\n@return [Integer]"),
            native!("lcm", "(other)", Arity::exact(1), integer_lcm, "Least common multiple.\n@return [Integer]"),
            native!(
                "digits",
                "()",
                Arity::exact(0),
                integer_digits,
                "Decimal digits, least significant first.\n\
                 @raise [ArgumentError] for negative receivers\n\
                 @return [List<Integer>]",
            ),
            native!(
                "to_s",
                "(base = 10)",
                Arity::range(0, 1),
                integer_to_s,
                "Formats the receiver in +base+.\n\
                 @param [Integer] base between 2 and 36\n\
                 @return [String]\n\
                 @example\n  255.to_s(16) # => \"ff\"",
            ),
            native!(
                "chr",
                "()",
                Arity::exact(0),
                integer_chr,
                "The character with this code point.\n@raise [ArgumentError] if out of range\n@return [String]",
            ),
            native!(
                "times",
                "(f)",
                Arity::exact(1),
                integer_times,
                "Calls +f+ with each integer from 0 up to the receiver, exclusive.\n\
                 @param [Function] f\n\
                 @return [Integer] the receiver",
            ),
            native!(
                "upto",
                "(limit)",
                Arity::exact(1),
                integer_upto,
                "Integers from the receiver to +limit+, inclusive.\n@return [List<Integer>]",
            ),
            native!(
                "bit_length",
                "()",
                Arity::exact(0),
                integer_bit_length,
                "Number of bits needed to represent the receiver, sign excluded.\n@return [Integer]",
            ),
        ],
        constants: vec![
            Constant {
                name: "MAX",
                value: Value::Int(i64::MAX),
                doc: "Largest representable integer.",
            },
            Constant {
                name: "MIN",
                value: Value::Int(i64::MIN),
                doc: "Smallest representable integer.",
            },
        ],
        ..TypeDef::new("Integer", TypeKind::Class, here!())
    }
}

fn receiver_int(receiver: &Value) -> RunResult<i64> {
    int_arg(receiver)
}

fn integer_is_even(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(receiver_int(receiver)? % 2 == 0))
}

fn integer_is_odd(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(receiver_int(receiver)? % 2 != 0))
}

fn integer_succ(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    receiver_int(receiver)?.checked_add(1).map(Value::Int).ok_or_else(overflow)
}

fn integer_pred(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    receiver_int(receiver)?.checked_sub(1).map(Value::Int).ok_or_else(overflow)
}

fn integer_pow(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let base = receiver_int(receiver)?;
    let exponent = int_arg(&args[0])?;
    match u32::try_from(exponent) {
        Ok(exponent) => base.checked_pow(exponent).map(Value::Int).ok_or_else(overflow),
        Err(_) if exponent < 0 => Ok(Value::Float((base as f64).powf(exponent as f64))),
        Err(_) => Err(overflow()),
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn integer_gcd(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let (a, b) = (receiver_int(receiver)?, int_arg(&args[0])?);
    i64::try_from(gcd(a.unsigned_abs(), b.unsigned_abs()))
        .map(Value::Int)
        .map_err(|_| overflow())
}

fn integer_lcm(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let (a, b) = (receiver_int(receiver)?, int_arg(&args[0])?);
    if a == 0 || b == 0 {
        return Ok(Value::Int(0));
    }
    let divisor = gcd(a.unsigned_abs(), b.unsigned_abs());
    (a.unsigned_abs() / divisor)
        .checked_mul(b.unsigned_abs())
        .and_then(|lcm| i64::try_from(lcm).ok())
        .map(Value::Int)
        .ok_or_else(overflow)
}

fn integer_digits(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let mut value = receiver_int(receiver)?;
    if value < 0 {
        return Err(Exception::new(ExcKind::ArgumentError, "out of domain"));
    }
    let mut digits = vec![Value::Int(value % 10)];
    value /= 10;
    while value > 0 {
        digits.push(Value::Int(value % 10));
        value /= 10;
    }
    Ok(Value::List(digits))
}

fn integer_to_s(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let value = receiver_int(receiver)?;
    let base = match args.first() {
        Some(base) => int_arg(base)?,
        None => 10,
    };
    let radix = u32::try_from(base)
        .ok()
        .filter(|radix| (2..=36).contains(radix))
        .ok_or_else(|| Exception::argument_error(format!("invalid radix {base}")))?;
    let mut magnitude = value.unsigned_abs();
    let mut digits = Vec::new();
    loop {
        let digit = u32::try_from(magnitude % u64::from(radix)).unwrap_or(0);
        digits.push(char::from_digit(digit, radix).unwrap_or('?'));
        magnitude /= u64::from(radix);
        if magnitude == 0 {
            break;
        }
    }
    if value < 0 {
        digits.push('-');
    }
    Ok(Value::Str(digits.into_iter().rev().collect()))
}

fn integer_chr(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let code = receiver_int(receiver)?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|ch| Value::Str(ch.to_string()))
        .ok_or_else(|| Exception::argument_error(format!("{code} out of char range")))
}

fn integer_times(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let count = receiver_int(receiver)?;
    let f = callable_arg(&args[0])?.clone();
    for index in 0..count.max(0) {
        interp.call(&f, vec![Value::Int(index)])?;
    }
    Ok(Value::Int(count))
}

/// Longest list `upto` will build.
const MAX_RANGE_LEN: i64 = 10_000_000;

fn integer_upto(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let (start, limit) = (receiver_int(receiver)?, int_arg(&args[0])?);
    if limit.saturating_sub(start) >= MAX_RANGE_LEN {
        return Err(Exception::argument_error("range too large"));
    }
    Ok(Value::List((start..=limit).map(Value::Int).collect()))
}

fn integer_bit_length(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let value = receiver_int(receiver)?;
    let magnitude = if value < 0 { !value } else { value };
    Ok(Value::Int(i64::from(64 - magnitude.leading_zeros())))
}

// ============================================================================
// Float
// ============================================================================

pub(super) fn float() -> TypeDef {
    TypeDef {
        superclass: Some("Numeric"),
        doc: "Double precision floating point numbers.\n\n\
              Division by zero yields Infinity or NaN instead of raising.",
        instance_methods: vec![
            native!("nan?", "()", Arity::exact(0), float_is_nan, "@return [Boolean]"),
            native!("infinite?", "()", Arity::exact(0), float_is_infinite, "@return [Boolean]"),
            native!("finite?", "()", Arity::exact(0), float_is_finite, "@return [Boolean]"),
            native!(
                "truncate",
                "()",
                Arity::exact(0),
                float_truncate,
                "Drops the fractional part.\n@return [Integer]",
            ),
        ],
        constants: vec![
            Constant {
                name: "INFINITY",
                value: Value::Float(f64::INFINITY),
                doc: "Positive infinity.",
            },
            Constant {
                name: "NAN",
                value: Value::Float(f64::NAN),
                doc: "Not a number.",
            },
            Constant {
                name: "EPSILON",
                value: Value::Float(f64::EPSILON),
                doc: "Difference between 1.0 and the next representable float.",
            },
            Constant {
                name: "MAX",
                value: Value::Float(f64::MAX),
                doc: "Largest finite float.",
            },
            Constant {
                name: "MIN",
                value: Value::Float(f64::MIN_POSITIVE),
                doc: "Smallest positive normalized float.",
            },
        ],
        ..TypeDef::new("Float", TypeKind::Class, here!())
    }
}

fn float_is_nan(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(float_arg(receiver)?.is_nan()))
}

fn float_is_infinite(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(float_arg(receiver)?.is_infinite()))
}

fn float_is_finite(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(float_arg(receiver)?.is_finite()))
}

fn float_truncate(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    float_to_int(float_arg(receiver)?.trunc()).map(Value::Int)
}

// ============================================================================
// Math
// ============================================================================

pub(super) fn math() -> TypeDef {
    TypeDef {
        doc: "Floating point functions and constants.\n\
              @example\n  Math.sqrt(2) * Math.sqrt(2)\n  Math::PI",
        class_methods: vec![
            native!(
                "sqrt",
                "(x)",
                Arity::exact(1),
                math_sqrt,
                "Square root.\n\
                 @param [Numeric] x\n\
                 @raise [ArgumentError] when +x+ is negative\n\
                 @return [Float]",
            ),
            native!("cbrt", "(x)", Arity::exact(1), math_cbrt, "Cube root.\n@return [Float]"),
            native!("sin", "(x)", Arity::exact(1), math_sin, "Sine of +x+ radians.\n@return [Float]"),
            native!("cos", "(x)", Arity::exact(1), math_cos, "Cosine of +x+ radians.\n@return [Float]"),
            native!("tan", "(x)", Arity::exact(1), math_tan, "Tangent of +x+ radians.\n@return [Float]"),
            native!("atan", "(x)", Arity::exact(1), math_atan, "Arc tangent.\n@return [Float]"),
            native!(
                "atan2",
                "(y, x)",
                Arity::exact(2),
                math_atan2,
                "Arc tangent of `y / x` using the signs of both to pick the quadrant.\n\
                 @return [Float] between -PI and PI",
            ),
            native!("exp", "(x)", Arity::exact(1), math_exp, "`e` raised to +x+.\n@return [Float]"),
            native!(
                "log",
                "(x, base = E)",
                Arity::range(1, 2),
                math_log,
                "Logarithm of +x+.\n\
                 @param [Numeric] x\n\
                 @param [Numeric] base defaults to the natural logarithm\n\
                 @return [Float]",
            ),
            native!("log2", "(x)", Arity::exact(1), math_log2, "Base 2 logarithm.\n@return [Float]"),
            native!("log10", "(x)", Arity::exact(1), math_log10, "Base 10 logarithm.\n@return [Float]"),
            native!(
                "hypot",
                "(x, y)",
                Arity::exact(2),
                math_hypot,
                "Length of the hypotenuse of a right triangle.\n@return [Float]",
            ),
        ],
        constants: vec![
            Constant {
                name: "PI",
                value: Value::Float(consts::PI),
                doc: "Ratio of a circle's circumference to its diameter.",
            },
            Constant {
                name: "E",
                value: Value::Float(consts::E),
                doc: "Base of the natural logarithm.",
            },
        ],
        ..TypeDef::new("Math", TypeKind::Module, here!())
    }
}

fn domain_error(function: &str) -> Exception {
    Exception::argument_error(format!("Numerical argument is out of domain - \"{function}\""))
}

fn math_sqrt(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    let x = float_arg(&args[0])?;
    if x < 0.0 {
        return Err(domain_error("sqrt"));
    }
    Ok(Value::Float(x.sqrt()))
}

fn math_cbrt(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Float(float_arg(&args[0])?.cbrt()))
}

fn math_sin(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Float(float_arg(&args[0])?.sin()))
}

fn math_cos(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Float(float_arg(&args[0])?.cos()))
}

fn math_tan(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Float(float_arg(&args[0])?.tan()))
}

fn math_atan(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Float(float_arg(&args[0])?.atan()))
}

fn math_atan2(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Float(float_arg(&args[0])?.atan2(float_arg(&args[1])?)))
}

fn math_exp(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Float(float_arg(&args[0])?.exp()))
}

fn math_log(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    let x = float_arg(&args[0])?;
    if x < 0.0 {
        return Err(domain_error("log"));
    }
    Ok(Value::Float(match args.get(1) {
        Some(base) => x.ln() / float_arg(base)?.ln(),
        None => x.ln(),
    }))
}

fn math_log2(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    let x = float_arg(&args[0])?;
    if x < 0.0 {
        return Err(domain_error("log2"));
    }
    Ok(Value::Float(x.log2()))
}

fn math_log10(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    let x = float_arg(&args[0])?;
    if x < 0.0 {
        return Err(domain_error("log10"));
    }
    Ok(Value::Float(x.log10()))
}

fn math_hypot(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Float(float_arg(&args[0])?.hypot(float_arg(&args[1])?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_floors() {
        assert_eq!(arithmetic(BinOp::Div, &Value::Int(-7), &Value::Int(2)).unwrap(), Value::Int(-4));
        assert_eq!(arithmetic(BinOp::Mod, &Value::Int(-7), &Value::Int(2)).unwrap(), Value::Int(1));
        assert_eq!(arithmetic(BinOp::Mod, &Value::Int(7), &Value::Int(-2)).unwrap(), Value::Int(-1));
    }

    #[test]
    fn overflow_and_zero_division_raise() {
        let err = arithmetic(BinOp::Add, &Value::Int(i64::MAX), &Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), ExcKind::ArithmeticError);
        let err = arithmetic(BinOp::Div, &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert_eq!(err.to_string(), "ZeroDivisionError: divided by 0");
        assert_eq!(negate(&Value::Int(i64::MIN)).unwrap_err().kind(), ExcKind::ArithmeticError);
    }

    #[test]
    fn mixed_operands() {
        assert_eq!(arithmetic(BinOp::Mul, &Value::Int(2), &Value::Float(1.5)).unwrap(), Value::Float(3.0));
        assert_eq!(
            arithmetic(BinOp::Mul, &Value::str("ab"), &Value::Int(2)).unwrap(),
            Value::str("abab")
        );
        let err = arithmetic(BinOp::Add, &Value::Int(1), &Value::str("a")).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: String can't be coerced into Integer");
        let err = arithmetic(BinOp::Sub, &Value::Nil, &Value::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "NoMethodError: undefined method `-' for nil:NilClass");
    }
}
