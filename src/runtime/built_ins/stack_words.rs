use crate::{
    add_operation,
    runtime::{
        data_structures::value::ToValue,
        error::{self, ErrorKind, script_error},
        interpreter::{Interpreter, OperationRegistry},
    },
};

/// Push the number of values on the current scope's stack.
///
/// Signature: ` -- length`
fn word_len(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let len = interpreter.stack_len()?;
    interpreter.push(len.to_value())
}

/// Swap the top 2 values on the data stack.
///
/// Signature: `a b -- b a`
fn word_swap(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(b)?;
    interpreter.push(a)
}

/// Swap two values of the stack by position, counting from the bottom.
///
/// Signature: `i j -- `
fn word_swap_at(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let j = interpreter.pop_as_usize()?;
    let i = interpreter.pop_as_usize()?;
    let mut values = interpreter.stack_values()?;

    if i >= values.len() || j >= values.len() {
        return script_error(
            ErrorKind::InvalidIndex,
            format!(
                "Can not swap {} and {} in a stack of {} values.",
                i,
                j,
                values.len()
            ),
        );
    }

    values.swap(i, j);
    interpreter.set_stack_values(values)
}

/// Duplicate the top value on the data stack.
///
/// Signature: `value -- value value`
fn word_dup(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.peek()?;
    interpreter.push(value)
}

/// Copy the second value to the top.
///
/// Signature: `a b -- a b a`
fn word_over(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(a.clone())?;
    interpreter.push(b)?;
    interpreter.push(a)
}

/// Rotate the top 3 values on the stack.
///
/// Signature: `a b c -- b c a`
fn word_rot(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let c = interpreter.pop()?;
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(b)?;
    interpreter.push(c)?;
    interpreter.push(a)
}

/// Signature: `value -- `
fn word_drop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let _ = interpreter.pop()?;
    Ok(())
}

/// Swap the top two pairs of values.
///
/// Signature: `a b c d -- c d a b`
fn word_2swap(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let d = interpreter.pop()?;
    let c = interpreter.pop()?;
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(c)?;
    interpreter.push(d)?;
    interpreter.push(a)?;
    interpreter.push(b)
}

/// Signature: `a b -- a b a b`
fn word_2dup(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(a.clone())?;
    interpreter.push(b.clone())?;
    interpreter.push(a)?;
    interpreter.push(b)
}

/// Copy the second pair of values to the top.
///
/// Signature: `a b c d -- a b c d a b`
fn word_2over(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let d = interpreter.pop()?;
    let c = interpreter.pop()?;
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(a.clone())?;
    interpreter.push(b.clone())?;
    interpreter.push(c)?;
    interpreter.push(d)?;
    interpreter.push(a)?;
    interpreter.push(b)
}

/// Signature: `a b -- `
fn word_2drop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let _ = interpreter.pop()?;
    let _ = interpreter.pop()?;

    Ok(())
}

/// Register the stack manipulation words.
pub fn register_stack_words(registry: &mut dyn OperationRegistry) {
    add_operation!(
        registry,
        "len",
        word_len,
        "Push the depth of the current stack.",
        " -- length"
    );

    add_operation!(
        registry,
        "swap",
        word_swap,
        "Swap the top 2 values.",
        "a b -- b a"
    );

    add_operation!(
        registry,
        "swap-at",
        word_swap_at,
        "Swap two values by their position from the bottom of the stack.",
        "i j -- "
    );

    add_operation!(
        registry,
        "dup",
        word_dup,
        "Duplicate the top value.",
        "value -- value value"
    );

    add_operation!(
        registry,
        "over",
        word_over,
        "Copy the second value to the top.",
        "a b -- a b a"
    );

    add_operation!(
        registry,
        "rot",
        word_rot,
        "Rotate the top 3 values.",
        "a b c -- b c a"
    );

    add_operation!(
        registry,
        "drop",
        word_drop,
        "Discard the top value.",
        "value -- "
    );

    add_operation!(
        registry,
        "2swap",
        word_2swap,
        "Swap the top two pairs of values.",
        "a b c d -- c d a b"
    );

    add_operation!(
        registry,
        "2dup",
        word_2dup,
        "Duplicate the top pair of values.",
        "a b -- a b a b"
    );

    add_operation!(
        registry,
        "2over",
        word_2over,
        "Copy the second pair of values to the top.",
        "a b c d -- a b c d a b"
    );

    add_operation!(
        registry,
        "2drop",
        word_2drop,
        "Discard the top pair of values.",
        "a b -- "
    );
}
