use crate::{
    add_operation,
    runtime::{
        data_structures::value::Value,
        error,
        interpreter::{Interpreter, OperationRegistry},
    },
};
use std::cmp::Ordering;

/// Pop two values, order them, and push whether the ordering passes the test.
fn ordering_op(
    interpreter: &mut dyn Interpreter,
    test: fn(Ordering) -> bool,
) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;
    let ordering = Value::compare(&a, &b)?;

    interpreter.push(Value::Bool(test(ordering)))
}

fn logic_op(interpreter: &mut dyn Interpreter, op: fn(bool, bool) -> bool) -> error::Result<()> {
    let b = interpreter.pop_as_bool()?;
    let a = interpreter.pop_as_bool()?;

    interpreter.push(Value::Bool(op(a, b)))
}

/// Loose equality, numbers by value and everything else by its printed form.
///
/// Signature: `a b -- bool`
fn word_equals(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(Value::Bool(Value::loose_eq(&a, &b)))
}

/// Identity, the same kind of value with the same payload.
///
/// Signature: `a b -- bool`
fn word_identical(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(Value::Bool(a == b))
}

/// Signature: `a b -- bool`
fn word_less_than(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    ordering_op(interpreter, |ordering| ordering == Ordering::Less)
}

/// Signature: `a b -- bool`
fn word_greater_than(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    ordering_op(interpreter, |ordering| ordering == Ordering::Greater)
}

/// Signature: `a b -- bool`
fn word_less_or_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    ordering_op(interpreter, |ordering| ordering != Ordering::Greater)
}

/// Signature: `a b -- bool`
fn word_greater_or_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    ordering_op(interpreter, |ordering| ordering != Ordering::Less)
}

/// Signature: `a b -- bool`
fn word_and(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    logic_op(interpreter, |a, b| a && b)
}

/// Signature: `a b -- bool`
fn word_or(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    logic_op(interpreter, |a, b| a || b)
}

/// Signature: `bool -- !bool`
fn word_not(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop_as_bool()?;
    interpreter.push(Value::Bool(!value))
}

/// Register the comparison and logic words.
pub fn register_comparison_words(registry: &mut dyn OperationRegistry) {
    add_operation!(
        registry,
        "=",
        word_equals,
        "Are the two values loosely equal?",
        "a b -- bool"
    );

    add_operation!(
        registry,
        "equals",
        word_equals,
        "Are the two values loosely equal?",
        "a b -- bool"
    );

    add_operation!(
        registry,
        "eq",
        word_identical,
        "Are the two values of the same kind and equal?",
        "a b -- bool"
    );

    add_operation!(
        registry,
        "<",
        word_less_than,
        "Is a less than b?",
        "a b -- bool"
    );

    add_operation!(
        registry,
        ">",
        word_greater_than,
        "Is a greater than b?",
        "a b -- bool"
    );

    add_operation!(
        registry,
        "<=",
        word_less_or_equal,
        "Is a less than or equal to b?",
        "a b -- bool"
    );

    add_operation!(
        registry,
        ">=",
        word_greater_or_equal,
        "Is a greater than or equal to b?",
        "a b -- bool"
    );

    add_operation!(
        registry,
        "and",
        word_and,
        "Logical and of two booleans.",
        "a b -- bool"
    );

    add_operation!(
        registry,
        "or",
        word_or,
        "Logical or of two booleans.",
        "a b -- bool"
    );

    add_operation!(
        registry,
        "not",
        word_not,
        "Logical negation of a boolean.",
        "bool -- !bool"
    );
}
