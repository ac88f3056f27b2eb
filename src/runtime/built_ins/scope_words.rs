use crate::{
    add_operation,
    runtime::{
        error::{self, ErrorKind, script_error},
        interpreter::{Interpreter, OperationRegistry},
    },
};

/// Bind a value to a name.
fn define(interpreter: &mut dyn Interpreter, strict: bool) -> error::Result<()> {
    let name = interpreter.pop_as_string()?;
    let value = interpreter.pop()?;
    let cell = interpreter.intern_value(value)?;

    interpreter.define_variable(&name, cell, strict)
}

/// Define a variable, or update the nearest existing one of the same name.
///
/// Signature: `value name -- `
fn word_define(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    define(interpreter, false)
}

/// Define a variable in the current scope, leaving it alone if it is already bound there.
///
/// Signature: `value name -- `
fn word_define_strict(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    define(interpreter, true)
}

/// Signature: `name -- `
fn word_forget(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let name = interpreter.pop_as_string()?;

    if interpreter.forget_variable(&name)? {
        Ok(())
    } else {
        script_error(
            ErrorKind::UnknownWord,
            format!("Variable '{}' not found.", name),
        )
    }
}

/// Compile and run source code in the current scope.
///
/// Signature: `source -- `
fn word_eval(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let source = interpreter.pop_as_string()?;
    interpreter.process_source("<eval>", &source)
}

/// Signature: `path -- `
fn word_load(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let path = interpreter.pop_as_string()?;
    interpreter.process_source_file(&path)
}

/// Register the variable and source words.
pub fn register_scope_words(registry: &mut dyn OperationRegistry) {
    add_operation!(
        registry,
        ";",
        word_define,
        "Define or update a variable.",
        "value name -- "
    );

    add_operation!(
        registry,
        ";;",
        word_define_strict,
        "Define a variable only if it isn't already bound in this scope.",
        "value name -- "
    );

    add_operation!(
        registry,
        "forget",
        word_forget,
        "Remove the nearest binding of a variable.",
        "name -- "
    );

    add_operation!(
        registry,
        "eval",
        word_eval,
        "Evaluate a string of source code.",
        "source -- "
    );

    add_operation!(
        registry,
        "load",
        word_load,
        "Evaluate a source file.",
        "path -- "
    );
}
