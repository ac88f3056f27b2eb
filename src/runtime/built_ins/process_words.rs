use crate::{
    add_operation,
    runtime::{
        data_structures::value::Value,
        error::{self, type_mismatch},
        interpreter::{Interpreter, OperationRegistry},
        process::table::Pid,
    },
};

fn pop_pid(interpreter: &mut dyn Interpreter) -> error::Result<Pid> {
    interpreter.pop_as_int()
}

/// Start a block as a new process.  The process starts with a copy of the current stack.
///
/// Signature: `block -- pid`
fn word_spawn(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let handle = match interpreter.pop()? {
        Value::Block(handle) => handle,
        _ => return type_mismatch("a block"),
    };

    let pid = interpreter.spawn(handle)?;
    interpreter.push(Value::Int(pid))
}

/// Signature: ` -- pid`
fn word_self(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = interpreter.pid()?;
    interpreter.push(Value::Int(pid))
}

/// The id of the process that started this one.
///
/// Signature: ` -- pid`
fn word_super(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = interpreter.super_pid()?;
    interpreter.push(Value::Int(pid))
}

/// Wait until the stack holds at least count values.
///
/// Signature: `count -- `
fn word_receive(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let count = interpreter.pop_as_usize()?;
    interpreter.receive(count)
}

/// Signature: `value pid -- `
fn word_send(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = pop_pid(interpreter)?;
    let value = interpreter.pop()?;

    interpreter.send_to(pid, value)
}

/// Move the whole stack to another process, the values arrive in reverse order.
///
/// Signature: `... pid -- `
fn word_send_all(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = pop_pid(interpreter)?;
    interpreter.send_all_to(pid)
}

/// Signature: `pid -- value`
fn word_take(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = pop_pid(interpreter)?;
    let value = interpreter.take_from(pid)?;

    interpreter.push(value)
}

/// Signature: `pid -- ...`
fn word_take_all(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = pop_pid(interpreter)?;
    interpreter.take_all_from(pid)
}

/// Signature: `value -- `
fn word_send_super(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = interpreter.super_pid()?;
    let value = interpreter.pop()?;

    interpreter.send_to(pid, value)
}

/// Signature: `... -- `
fn word_send_all_super(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = interpreter.super_pid()?;
    interpreter.send_all_to(pid)
}

/// Signature: ` -- value`
fn word_take_super(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = interpreter.super_pid()?;
    let value = interpreter.take_from(pid)?;

    interpreter.push(value)
}

/// Signature: ` -- ...`
fn word_take_all_super(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = interpreter.super_pid()?;
    interpreter.take_all_from(pid)
}

/// Send every following push to another process, until `end-sync-push`.
///
/// Signature: `pid -- `
fn word_sync_push(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let pid = pop_pid(interpreter)?;
    interpreter.begin_sync_push(pid)
}

/// Signature: ` -- `
fn word_end_sync_push(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.end_sync_push()
}

/// Register the process words.
pub fn register_process_words(registry: &mut dyn OperationRegistry) {
    add_operation!(
        registry,
        "!!",
        word_spawn,
        "Run a block as a new process.",
        "block -- pid"
    );

    add_operation!(
        registry,
        "self",
        word_self,
        "The id of the current process.",
        " -- pid"
    );

    add_operation!(
        registry,
        "super",
        word_super,
        "The id of the process that started this one.",
        " -- pid"
    );

    add_operation!(
        registry,
        "recv",
        word_receive,
        "Wait for the stack to hold at least count values.",
        "count -- "
    );

    add_operation!(
        registry,
        "send",
        word_send,
        "Push a value onto another process's stack.",
        "value pid -- "
    );

    add_operation!(
        registry,
        "send-all",
        word_send_all,
        "Move the whole stack to another process.",
        "... pid -- "
    );

    add_operation!(
        registry,
        "take",
        word_take,
        "Pop a value from another process's stack.",
        "pid -- value"
    );

    add_operation!(
        registry,
        "take-all",
        word_take_all,
        "Move another process's whole stack onto this one.",
        "pid -- ..."
    );

    add_operation!(
        registry,
        "<<",
        word_send_super,
        "Push a value onto the parent process's stack.",
        "value -- "
    );

    add_operation!(
        registry,
        "<<<",
        word_send_all_super,
        "Move the whole stack to the parent process.",
        "... -- "
    );

    add_operation!(
        registry,
        ">>",
        word_take_super,
        "Pop a value from the parent process's stack.",
        " -- value"
    );

    add_operation!(
        registry,
        ">>>",
        word_take_all_super,
        "Move the parent process's whole stack onto this one.",
        " -- ..."
    );

    add_operation!(
        registry,
        "sync-push",
        word_sync_push,
        "Redirect every push to another process.",
        "pid -- "
    );

    add_operation!(
        registry,
        "end-sync-push",
        word_end_sync_push,
        "Stop redirecting pushes.",
        " -- "
    );
}
