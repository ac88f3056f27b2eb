use crate::{
    add_operation,
    runtime::{
        data_structures::value::Value,
        error::{self, ErrorKind, script_error_str, type_mismatch},
        interpreter::{Interpreter, OperationRegistry},
    },
};
use num_bigint::BigInt;

/// The three ways an arithmetic operation can be carried out.  Machine integers report overflow by
/// returning None, in which case the big integer version is used instead.
struct NumericOp {
    int: fn(i64, i64) -> Option<i64>,
    big: fn(&BigInt, &BigInt) -> BigInt,
    double: fn(f64, f64) -> f64,
}

/// Apply an operation to two numbers, promoting as needed.  A double on either side makes the
/// result a double, otherwise machine integers are tried before big integers.
fn apply(op: &NumericOp, a: &Value, b: &Value) -> error::Result<Value> {
    if !Value::both_are_numeric(a, b) {
        return type_mismatch("two numbers");
    }

    if Value::either_is_double(a, b) {
        return Ok(Value::Double((op.double)(a.as_f64()?, b.as_f64()?)));
    }

    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        if let Some(result) = (op.int)(*x, *y) {
            return Ok(Value::Int(result));
        }
    }

    Ok(Value::from((op.big)(&a.as_big_int()?, &b.as_big_int()?)))
}

fn check_divisor(divisor: &Value) -> error::Result<()> {
    if divisor.is_zero() {
        script_error_str(ErrorKind::Runtime, "Division by zero.")
    } else {
        Ok(())
    }
}

/// Pop two numbers, apply the operation and push the result.
fn math_op(interpreter: &mut dyn Interpreter, op: &NumericOp, divides: bool) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    if divides {
        check_divisor(&b)?;
    }

    let result = apply(op, &a, &b)?;
    interpreter.push(result)
}

const ADD: NumericOp = NumericOp {
    int: i64::checked_add,
    big: |a, b| a + b,
    double: |a, b| a + b,
};

const SUBTRACT: NumericOp = NumericOp {
    int: i64::checked_sub,
    big: |a, b| a - b,
    double: |a, b| a - b,
};

const MULTIPLY: NumericOp = NumericOp {
    int: i64::checked_mul,
    big: |a, b| a * b,
    double: |a, b| a * b,
};

const DIVIDE: NumericOp = NumericOp {
    int: i64::checked_div,
    big: |a, b| a / b,
    double: |a, b| a / b,
};

const MODULO: NumericOp = NumericOp {
    int: i64::checked_rem,
    big: |a, b| a % b,
    double: |a, b| a % b,
};

/// Add two numbers, or concatenate when either one is a string.
///
/// Signature: `a b -- sum`
fn word_add(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    if Value::either_is_string(&a, &b) {
        return interpreter.push(Value::Str(format!("{}{}", a, b)));
    }

    let result = apply(&ADD, &a, &b)?;
    interpreter.push(result)
}

/// Signature: `a b -- difference`
fn word_subtract(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    math_op(interpreter, &SUBTRACT, false)
}

/// Signature: `a b -- product`
fn word_multiply(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    math_op(interpreter, &MULTIPLY, false)
}

/// Integer division truncates towards zero.
///
/// Signature: `a b -- quotient`
fn word_divide(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    math_op(interpreter, &DIVIDE, true)
}

/// The remainder takes the sign of the dividend.
///
/// Signature: `a b -- remainder`
fn word_modulo(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    math_op(interpreter, &MODULO, true)
}

/// Signature: `a b -- remainder quotient`
fn word_divide_modulo(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    check_divisor(&b)?;

    let remainder = apply(&MODULO, &a, &b)?;
    let quotient = apply(&DIVIDE, &a, &b)?;

    interpreter.push(remainder)?;
    interpreter.push(quotient)
}

/// Register the arithmetic words.
pub fn register_arithmetic_words(registry: &mut dyn OperationRegistry) {
    add_operation!(
        registry,
        "+",
        word_add,
        "Add two numbers or concatenate two strings.",
        "a b -- sum"
    );

    add_operation!(
        registry,
        "-",
        word_subtract,
        "Subtract two numbers.",
        "a b -- difference"
    );

    add_operation!(
        registry,
        "*",
        word_multiply,
        "Multiply two numbers.",
        "a b -- product"
    );

    add_operation!(
        registry,
        "/",
        word_divide,
        "Divide two numbers.",
        "a b -- quotient"
    );

    add_operation!(
        registry,
        "mod",
        word_modulo,
        "The remainder of dividing two numbers.",
        "a b -- remainder"
    );

    add_operation!(
        registry,
        "/mod",
        word_divide_modulo,
        "Divide two numbers, keeping both the remainder and the quotient.",
        "a b -- remainder quotient"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_promotes_to_big_integers() {
        let result = apply(&ADD, &Value::Int(i64::MAX), &Value::Int(1)).unwrap();
        assert_eq!(result, Value::BigInt(BigInt::from(i64::MAX) + 1));

        let result = apply(&SUBTRACT, &result, &Value::Int(1)).unwrap();
        assert_eq!(result, Value::Int(i64::MAX));
    }

    #[test]
    fn doubles_win_over_integers() {
        let result = apply(&MULTIPLY, &Value::Int(3), &Value::Double(0.5)).unwrap();
        assert_eq!(result, Value::Double(1.5));
    }

    #[test]
    fn non_numbers_are_rejected() {
        let error = apply(&ADD, &Value::Bool(true), &Value::Int(1)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::TypeMismatch);
    }
}
