use crate::{
    add_operation,
    runtime::{
        data_structures::value::{ToValue, Value},
        error::{self, ErrorKind, script_error},
        interpreter::{Interpreter, OperationRegistry},
    },
};

/// Pop a string, transform it, and push the result.
fn string_op(interpreter: &mut dyn Interpreter, op: fn(&str) -> String) -> error::Result<()> {
    let text = interpreter.pop_as_string()?;
    interpreter.push(Value::Str(op(&text)))
}

fn out_of_range<T>(index: usize, text: &str) -> error::Result<T> {
    script_error(
        ErrorKind::InvalidIndex,
        format!(
            "Index {} is out of range for a string of length {}.",
            index,
            text.chars().count()
        ),
    )
}

/// The length of a string in characters.
///
/// Signature: `string -- length`
fn word_string_length(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let text = interpreter.pop_as_string()?;
    interpreter.push(text.chars().count().to_value())
}

/// The code of the character at an index.
///
/// Signature: `string index -- code`
fn word_string_at(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let index = interpreter.pop_as_usize()?;
    let text = interpreter.pop_as_string()?;

    match text.chars().nth(index) {
        Some(character) => interpreter.push(Value::Int(character as i64)),
        None => out_of_range(index, &text),
    }
}

/// Signature: `a b -- bool`
fn word_string_equals(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop_as_string()?;
    let a = interpreter.pop_as_string()?;

    interpreter.push(Value::Bool(a == b))
}

/// Case insensitive string equality.
///
/// Signature: `a b -- bool`
fn word_string_equals_ignore_case(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop_as_string()?;
    let a = interpreter.pop_as_string()?;

    interpreter.push(Value::Bool(a.to_lowercase() == b.to_lowercase()))
}

/// Signature: `string -- lower-string`
fn word_string_to_lower(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    string_op(interpreter, str::to_lowercase)
}

/// Signature: `string -- upper-string`
fn word_string_to_upper(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    string_op(interpreter, str::to_uppercase)
}

/// Signature: `string -- trimmed-string`
fn word_string_trim(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    string_op(interpreter, |text| text.trim().to_string())
}

/// Extract the characters from start up to, but not including, end.
///
/// Signature: `string start end -- substring`
fn word_substring(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let end = interpreter.pop_as_usize()?;
    let start = interpreter.pop_as_usize()?;
    let text = interpreter.pop_as_string()?;
    let length = text.chars().count();

    if end > length {
        return out_of_range(end, &text);
    }

    if start > end {
        return out_of_range(start, &text);
    }

    let substring: String = text.chars().skip(start).take(end - start).collect();
    interpreter.push(Value::Str(substring))
}

/// Replace the first occurrence of a search string.
///
/// Signature: `string search replacement -- new-string`
fn word_string_replace(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let replacement = interpreter.pop_as_string()?;
    let search = interpreter.pop_as_string()?;
    let text = interpreter.pop_as_string()?;

    interpreter.push(Value::Str(text.replacen(&search, &replacement, 1)))
}

/// Replace every occurrence of a search string.
///
/// Signature: `string search replacement -- new-string`
fn word_string_replace_all(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let replacement = interpreter.pop_as_string()?;
    let search = interpreter.pop_as_string()?;
    let text = interpreter.pop_as_string()?;

    interpreter.push(Value::Str(text.replace(&search, &replacement)))
}

/// The character index of the first occurrence of a search string, or -1 if it isn't there.
///
/// Signature: `string search -- index`
fn word_string_find(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let search = interpreter.pop_as_string()?;
    let text = interpreter.pop_as_string()?;

    let index = match text.find(&search) {
        Some(byte_index) => text[..byte_index].chars().count() as i64,
        None => -1,
    };

    interpreter.push(Value::Int(index))
}

/// Register the string words.
pub fn register_string_words(registry: &mut dyn OperationRegistry) {
    add_operation!(
        registry,
        "str-len",
        word_string_length,
        "The length of a string.",
        "string -- length"
    );

    add_operation!(
        registry,
        "str-at",
        word_string_at,
        "The character code at an index of a string.",
        "string index -- code"
    );

    add_operation!(
        registry,
        "str-eq",
        word_string_equals,
        "Are two strings equal?",
        "a b -- bool"
    );

    add_operation!(
        registry,
        "str-eqi",
        word_string_equals_ignore_case,
        "Are two strings equal, ignoring case?",
        "a b -- bool"
    );

    add_operation!(
        registry,
        "str-tolower",
        word_string_to_lower,
        "Convert a string to lower case.",
        "string -- lower-string"
    );

    add_operation!(
        registry,
        "str-toupper",
        word_string_to_upper,
        "Convert a string to upper case.",
        "string -- upper-string"
    );

    add_operation!(
        registry,
        "str-trim",
        word_string_trim,
        "Remove leading and trailing whitespace.",
        "string -- trimmed-string"
    );

    add_operation!(
        registry,
        "substring",
        word_substring,
        "Extract part of a string.",
        "string start end -- substring"
    );

    add_operation!(
        registry,
        "str-replace",
        word_string_replace,
        "Replace the first occurrence of a search string.",
        "string search replacement -- new-string"
    );

    add_operation!(
        registry,
        "str-replace-all",
        word_string_replace_all,
        "Replace every occurrence of a search string.",
        "string search replacement -- new-string"
    );

    add_operation!(
        registry,
        "str-find",
        word_string_find,
        "Find a search string, -1 if not found.",
        "string search -- index"
    );
}
