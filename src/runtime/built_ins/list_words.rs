use crate::{
    add_operation,
    runtime::{
        data_structures::value::Value,
        error::{self, ErrorKind, script_error},
        interpreter::{Interpreter, OperationRegistry},
    },
};

// These words treat the current scope's own stack as a list.  Positions count from the bottom.

fn check_index(index: usize, values: &[Value]) -> error::Result<()> {
    if index >= values.len() {
        script_error(
            ErrorKind::InvalidIndex,
            format!(
                "Index {} is out of range for a stack of {} values.",
                index,
                values.len()
            ),
        )
    } else {
        Ok(())
    }
}

fn position_of(values: &[Value], key: &Value) -> Option<usize> {
    values.iter().position(|value| Value::loose_eq(value, key))
}

/// Copy the value at a position to the top.
///
/// Signature: `index -- value`
fn word_at(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let index = interpreter.pop_as_usize()?;
    let values = interpreter.stack_values()?;

    check_index(index, &values)?;
    interpreter.push(values[index].clone())
}

/// Signature: `index -- `
fn word_remove_at(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let index = interpreter.pop_as_usize()?;
    let mut values = interpreter.stack_values()?;

    check_index(index, &values)?;

    let _ = values.remove(index);
    interpreter.set_stack_values(values)
}

/// Signature: `... -- `
fn word_remove_all(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.set_stack_values(Vec::new())
}

/// Remove the first value equal to the given one.
///
/// Signature: `value -- `
fn word_remove(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let key = interpreter.pop()?;
    let mut values = interpreter.stack_values()?;

    if let Some(index) = position_of(&values, &key) {
        let _ = values.remove(index);
        interpreter.set_stack_values(values)?;
    }

    Ok(())
}

/// Treat the stack as a property list and push the value that follows the key.  Nothing is pushed
/// if the key isn't found.
///
/// Signature: `key -- value`
fn word_get(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let key = interpreter.pop()?;
    let values = interpreter.stack_values()?;

    match position_of(&values, &key).and_then(|index| values.get(index + 1)) {
        Some(value) => interpreter.push(value.clone()),
        None => Ok(()),
    }
}

/// Update the value that follows a key, or add the key and value to the top if there is none.
///
/// Signature: `key value -- `
fn word_set(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;
    let key = interpreter.pop()?;
    let mut values = interpreter.stack_values()?;

    match position_of(&values, &key) {
        Some(index) if index + 1 < values.len() => values[index + 1] = value,
        _ => {
            values.push(key);
            values.push(value);
        }
    }

    interpreter.set_stack_values(values)
}

/// Signature: `... -- ...`
fn word_reverse(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let mut values = interpreter.stack_values()?;

    values.reverse();
    interpreter.set_stack_values(values)
}

/// Sort the stack so the largest value ends up on top.
///
/// Signature: `... -- ...`
fn word_sort(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let mut values = interpreter.stack_values()?;

    values.sort_by(Value::sort_cmp);
    interpreter.set_stack_values(values)
}

/// Binary search of a sorted stack.  Pushes the index of the value if found, otherwise
/// `-(insertion point) - 1`.
///
/// Signature: `value -- index`
fn word_binary_search(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let key = interpreter.pop()?;
    let values = interpreter.stack_values()?;

    let index = match values.binary_search_by(|value| Value::sort_cmp(value, &key)) {
        Ok(index) => index as i64,
        Err(insertion) => -(insertion as i64) - 1,
    };

    interpreter.push(Value::Int(index))
}

/// Replace the first value equal to `old`.
///
/// Signature: `old new -- `
fn word_replace(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let new = interpreter.pop()?;
    let old = interpreter.pop()?;
    let mut values = interpreter.stack_values()?;

    if let Some(index) = position_of(&values, &old) {
        values[index] = new;
        interpreter.set_stack_values(values)?;
    }

    Ok(())
}

/// Signature: `old new -- `
fn word_replace_all(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let new = interpreter.pop()?;
    let old = interpreter.pop()?;
    let values = interpreter.stack_values()?;

    let values = values
        .into_iter()
        .map(|value| {
            if Value::loose_eq(&value, &old) {
                new.clone()
            } else {
                value
            }
        })
        .collect();

    interpreter.set_stack_values(values)
}

/// Register the words that work with the stack as a list.
pub fn register_list_words(registry: &mut dyn OperationRegistry) {
    add_operation!(
        registry,
        "at",
        word_at,
        "Copy the value at a position, counted from the bottom, to the top.",
        "index -- value"
    );

    add_operation!(
        registry,
        "remove-at",
        word_remove_at,
        "Remove the value at a position, counted from the bottom.",
        "index -- "
    );

    add_operation!(
        registry,
        "remove-all",
        word_remove_all,
        "Remove every value from the stack.",
        "... -- "
    );

    add_operation!(
        registry,
        "remove",
        word_remove,
        "Remove the first value equal to the given one.",
        "value -- "
    );

    add_operation!(
        registry,
        "get",
        word_get,
        "Push the value that follows a key.",
        "key -- value"
    );

    add_operation!(
        registry,
        "set",
        word_set,
        "Set the value that follows a key.",
        "key value -- "
    );

    add_operation!(
        registry,
        "reverse",
        word_reverse,
        "Reverse the stack.",
        "... -- ..."
    );

    add_operation!(registry, "sort", word_sort, "Sort the stack.", "... -- ...");

    add_operation!(
        registry,
        "bsearch",
        word_binary_search,
        "Binary search of a sorted stack.",
        "value -- index"
    );

    add_operation!(
        registry,
        "replace",
        word_replace,
        "Replace the first value equal to old.",
        "old new -- "
    );

    add_operation!(
        registry,
        "replace-all",
        word_replace_all,
        "Replace every value equal to old.",
        "old new -- "
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn keys_match_loosely() {
        let values = vec![Value::from("a"), Value::Int(1), Value::Int(2)];

        assert_eq!(position_of(&values, &Value::from("1")), Some(1));
        assert_eq!(position_of(&values, &Value::from("z")), None);
        assert_eq!(Ordering::Less, Value::sort_cmp(&values[1], &values[2]));
    }
}
