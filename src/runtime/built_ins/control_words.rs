use crate::{
    add_operation,
    runtime::{
        data_structures::value::Value,
        error::{self, ErrorKind, script_error_str, type_mismatch},
        interpreter::{Interpreter, OperationRegistry},
    },
};

fn is_runnable(value: &Value) -> bool {
    matches!(value, Value::Block(_) | Value::Word(_) | Value::Str(_))
}

/// Run a runnable if asked to, then let go of it.  The block is reclaimed even if running it
/// failed.
fn run_then_discard(
    interpreter: &mut dyn Interpreter,
    runnable: &Value,
    should_run: bool,
) -> error::Result<()> {
    let result = if should_run {
        interpreter.run_value(runnable)
    } else {
        Ok(())
    };

    interpreter.discard_transient(runnable)?;
    result
}

/// Run a block, word, or string naming a word.
///
/// Signature: `runnable -- `
fn word_run(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let runnable = interpreter.pop_as_runnable()?;
    run_then_discard(interpreter, &runnable, true)
}

/// Either `cond runnable if`, which runs on true and pushes the condition back so it can be
/// chained into `elif` or `else`.  Or `cond then-runnable else-runnable if`, which runs exactly one
/// of the branches and pushes nothing.
///
/// Signature: `bool runnable -- bool` or `bool then else -- `
fn word_if(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let top = interpreter.pop_as_runnable()?;
    let second = interpreter.pop()?;

    match second {
        Value::Bool(condition) => {
            run_then_discard(interpreter, &top, condition)?;
            interpreter.push(Value::Bool(condition))
        }

        then_branch if is_runnable(&then_branch) => {
            let condition = interpreter.pop_as_bool()?;

            let (taken, skipped) = if condition {
                (then_branch, top)
            } else {
                (top, then_branch)
            };

            interpreter.discard_transient(&skipped)?;
            run_then_discard(interpreter, &taken, true)
        }

        _ => type_mismatch("a boolean"),
    }
}

/// Runs only if no earlier branch of the chain ran and the new condition holds.
///
/// Signature: `previous cond runnable -- previous-or-cond`
fn word_elif(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let runnable = interpreter.pop_as_runnable()?;
    let condition = interpreter.pop_as_bool()?;
    let previous = interpreter.pop_as_bool()?;

    run_then_discard(interpreter, &runnable, !previous && condition)?;
    interpreter.push(Value::Bool(previous || condition))
}

/// Signature: `previous runnable -- `
fn word_else(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let runnable = interpreter.pop_as_runnable()?;
    let previous = interpreter.pop_as_bool()?;

    run_then_discard(interpreter, &runnable, !previous)
}

/// Signature: `cond runnable -- `
fn word_when(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let runnable = interpreter.pop_as_runnable()?;
    let condition = interpreter.pop_as_bool()?;

    run_then_discard(interpreter, &runnable, condition)
}

/// Signature: `cond runnable -- `
fn word_unless(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let runnable = interpreter.pop_as_runnable()?;
    let condition = interpreter.pop_as_bool()?;

    run_then_discard(interpreter, &runnable, !condition)
}

/// Keep running the body while the condition runnable leaves true on the stack.
///
/// Signature: `cond-runnable body-runnable -- `
fn word_while(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let body = interpreter.pop_as_runnable()?;
    let condition = interpreter.pop_as_runnable()?;

    let mut run_loop = || -> error::Result<()> {
        loop {
            interpreter.run_value(&condition)?;

            if !interpreter.pop_as_bool()? {
                return Ok(());
            }

            interpreter.run_value(&body)?;
        }
    };

    let result = run_loop();

    interpreter.discard_transient(&body)?;
    interpreter.discard_transient(&condition)?;

    result
}

/// Run a runnable for every counter value from zero up to, but not including, the count.
fn counted_loop(
    interpreter: &mut dyn Interpreter,
    runnable: &Value,
    count: i64,
    step: i64,
) -> error::Result<()> {
    let mut run_loop = || -> error::Result<()> {
        let mut counter = 0;

        while counter < count {
            interpreter.push(Value::Int(counter))?;
            interpreter.run_value(runnable)?;

            counter = match counter.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(())
    };

    let result = run_loop();

    interpreter.discard_transient(runnable)?;
    result
}

/// Signature: `runnable count -- `
fn word_times(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let count = interpreter.pop_as_int()?;
    let runnable = interpreter.pop_as_runnable()?;

    counted_loop(interpreter, &runnable, count, 1)
}

/// Signature: `runnable count step -- `
fn word_times_by(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let step = interpreter.pop_as_int()?;
    let count = interpreter.pop_as_int()?;
    let runnable = interpreter.pop_as_runnable()?;

    if step <= 0 {
        interpreter.discard_transient(&runnable)?;
        return script_error_str(ErrorKind::Runtime, "The step of times-by must be positive.");
    }

    counted_loop(interpreter, &runnable, count, step)
}

/// Register the words that run blocks.
pub fn register_control_words(registry: &mut dyn OperationRegistry) {
    add_operation!(
        registry,
        "!",
        word_run,
        "Run a block or a word.",
        "runnable -- "
    );

    add_operation!(
        registry,
        "if",
        word_if,
        "Run a block if the condition is true.",
        "bool runnable -- bool"
    );

    add_operation!(
        registry,
        "elif",
        word_elif,
        "Run a block if no earlier branch ran and the condition is true.",
        "previous bool runnable -- bool"
    );

    add_operation!(
        registry,
        "else",
        word_else,
        "Run a block if no earlier branch ran.",
        "previous runnable -- "
    );

    add_operation!(
        registry,
        "when",
        word_when,
        "Run a block if the condition is true.",
        "bool runnable -- "
    );

    add_operation!(
        registry,
        "unless",
        word_unless,
        "Run a block if the condition is false.",
        "bool runnable -- "
    );

    add_operation!(
        registry,
        "while",
        word_while,
        "Run the body while the condition block leaves true on the stack.",
        "cond-runnable body-runnable -- "
    );

    add_operation!(
        registry,
        "times",
        word_times,
        "Run a block count times, pushing the counter before each run.",
        "runnable count -- "
    );

    add_operation!(
        registry,
        "times-by",
        word_times_by,
        "Run a block, stepping the counter up to the count.",
        "runnable count step -- "
    );
}
