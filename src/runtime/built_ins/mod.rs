use crate::runtime::data_structures::operation_table::OperationTable;
use lazy_static::lazy_static;

/// Words that print, and the handful of words that manage the current scope's stack as a whole.
pub mod io_words;

/// Words that shuffle the data stack.
pub mod stack_words;

/// Arithmetic with automatic promotion to big integers.
pub mod arithmetic_words;

/// Equality, ordering and boolean logic.
pub mod comparison_words;

/// Words that work with strings.
pub mod string_words;

/// Words that treat the data stack as a list.
pub mod list_words;

/// Conditionals and loops.
pub mod control_words;

/// Variables, evaluation and loading of source code.
pub mod scope_words;

/// Spawning processes and moving values between them.
pub mod process_words;

use crate::runtime::{
    built_ins::{
        arithmetic_words::register_arithmetic_words,
        comparison_words::register_comparison_words, control_words::register_control_words,
        io_words::register_io_words, list_words::register_list_words,
        process_words::register_process_words, scope_words::register_scope_words,
        stack_words::register_stack_words, string_words::register_string_words,
    },
    interpreter::OperationRegistry,
};

lazy_static! {
    /// The default operations, built once and shared by every root scope.
    static ref DEFAULT_OPERATIONS: OperationTable = {
        let mut table = OperationTable::new();

        register_default_operations(&mut table);
        table
    };
}

/// Register every built in word with a registry.
pub fn register_default_operations(registry: &mut dyn OperationRegistry) {
    register_io_words(registry);
    register_stack_words(registry);
    register_arithmetic_words(registry);
    register_comparison_words(registry);
    register_string_words(registry);
    register_list_words(registry);
    register_control_words(registry);
    register_scope_words(registry);
    register_process_words(registry);
}

/// A copy of the default operation table.  The handlers themselves are shared, only the map is
/// copied.
pub fn default_operations() -> OperationTable {
    DEFAULT_OPERATIONS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_the_core_words() {
        let table = default_operations();

        for name in [
            ".", ".s", "+", "/mod", "=", "eq", "and", "swap", "2over", "str-len", "at", "bsearch",
            "if", "elif", "times-by", ";", ";;", "forget", "!", "!!", "recv", "<<<", "sync-push",
        ] {
            assert!(table.find(name).is_some(), "missing word {}", name);
        }
    }
}
