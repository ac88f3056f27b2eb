use crate::{
    add_operation,
    runtime::{
        error::{self, ErrorKind, script_error},
        interpreter::{Interpreter, OperationRegistry},
    },
};
use std::time::Duration;

/// Print the top value followed by a space.
///
/// Signature: `value -- `
fn word_print(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;
    interpreter.write_output(&format!("{} ", value))
}

/// Print the top value with nothing after it.
///
/// Signature: `value -- `
fn word_print_no_space(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;
    interpreter.write_output(&value.to_string())
}

/// Signature: `value -- `
fn word_discard(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let _ = interpreter.pop()?;
    Ok(())
}

/// Print the whole of the current scope's stack, bottom first, without changing it.
///
/// Signature: ` -- `
fn word_print_stack(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let values = interpreter.stack_values()?;
    let mut text = String::new();

    for value in values {
        text.push_str(&format!("{} ", value));
    }

    text.push('\n');
    interpreter.write_output(&text)
}

/// Print the character with the given code point.
///
/// Signature: `code -- `
fn word_emit(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let code = interpreter.pop_as_int()?;

    let character = u32::try_from(code).ok().and_then(char::from_u32);

    match character {
        Some(character) => interpreter.write_output(&character.to_string()),
        None => script_error(
            ErrorKind::Runtime,
            format!("{} is not a valid character code.", code),
        ),
    }
}

/// Signature: ` -- `
fn word_newline(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.write_output("\n")
}

/// Signature: ` -- `
fn word_space(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.write_output(" ")
}

/// Stop the current process.  At the top level this ends the read loop.
///
/// Signature: ` -- `
fn word_quit(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.stop()
}

/// Throw away everything on the current scope's stack.
///
/// Signature: `... -- `
fn word_clear(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let _ = interpreter.drain_stack()?;
    Ok(())
}

/// Sleep for a number of milliseconds.  The sleep ends early if the process is stopped.
///
/// Signature: `milliseconds -- `
fn word_sleep(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let milliseconds = interpreter.pop_as_int()?;

    if milliseconds > 0 {
        interpreter.sleep(Duration::from_millis(milliseconds as u64))?;
    }

    Ok(())
}

/// Register the output words and the whole-stack words.
pub fn register_io_words(registry: &mut dyn OperationRegistry) {
    add_operation!(
        registry,
        ".",
        word_print,
        "Print the top value followed by a space.",
        "value -- "
    );

    add_operation!(
        registry,
        ".ns",
        word_print_no_space,
        "Print the top value without a trailing space.",
        "value -- "
    );

    add_operation!(
        registry,
        ",",
        word_discard,
        "Discard the top value without printing it.",
        "value -- "
    );

    add_operation!(
        registry,
        ".s",
        word_print_stack,
        "Print the stack, bottom first.",
        " -- "
    );

    add_operation!(
        registry,
        "emit",
        word_emit,
        "Print the character with the given code.",
        "code -- "
    );

    add_operation!(
        registry,
        "newline",
        word_newline,
        "Print a new line.",
        " -- "
    );

    add_operation!(registry, "space", word_space, "Print a space.", " -- ");

    add_operation!(
        registry,
        ".q",
        word_quit,
        "Stop the current process.",
        " -- "
    );

    add_operation!(
        registry,
        ".clr",
        word_clear,
        "Clear the current stack.",
        "... -- "
    );

    add_operation!(
        registry,
        "sleep",
        word_sleep,
        "Sleep for a number of milliseconds.",
        "milliseconds -- "
    );
}
