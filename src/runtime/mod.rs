use std::sync::{Mutex, MutexGuard, PoisonError};

/// All of the core data structures used by the runtime.
pub mod data_structures;

/// Module for defining the built-in operations that are available to every root scope.
pub mod built_ins;

/// Module for defining the error reporting of the runtime.
pub mod error;

/// Tunables read from the environment.
pub mod config;

/// Module for defining the core functionality of the interpreter.  This includes the traits
/// operations are written against and the scope handle that implements them.
pub mod interpreter;

/// Spawned processes, their ids and the worker pools that run them.
pub mod process;

/// Lock a mutex, carrying on with the data even if another thread panicked while holding it.  A
/// crashed process must not wedge the whole runtime.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
