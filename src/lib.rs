/// Module for managing source code, tokenizing it and turning it into cells.
#[macro_use]
pub mod lang;

/// Module for the runtime and the data structures used by the interpreter.  As well as the scopes
/// and processes that do the interpreting.
#[macro_use]
pub mod runtime;

/// The host facing side of the runtime, an input, an output and a root scope.
pub mod environment;

pub use environment::{Environment, SharedOutput};
pub use runtime::{
    config::RuntimeConfig,
    data_structures::value::Value,
    error::{ErrorKind, Result, ScriptError},
    interpreter::{
        CodeManagement, Interpreter, InterpreterStack, OperationManagement, OperationRegistry,
        ProcessManagement, ScopeManagement, scope::Scope,
    },
    process::table::Pid,
};
