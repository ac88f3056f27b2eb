// Table driven tests of the default words, each case runs in a fresh environment.

use scopevm::{Environment, ErrorKind, Result, SharedOutput};
use std::io::Cursor;
use test_case::test_case;

fn environment() -> (Environment, SharedOutput) {
    let output = SharedOutput::new();
    let environment = Environment::new(Cursor::new(Vec::new()), output.clone());

    (environment, output)
}

/// Evaluate some source and return the root stack, bottom first, in its printed form.
fn eval_stack(source: &str) -> Result<Vec<String>> {
    let (mut environment, _) = environment();

    environment.eval(source)?;

    Ok(environment
        .stack()?
        .iter()
        .map(|value| value.to_string())
        .collect())
}

fn eval_output(source: &str) -> Result<String> {
    let (mut environment, output) = environment();

    environment.eval(source)?;
    Ok(output.contents())
}

fn eval_error(source: &str) -> ErrorKind {
    match eval_stack(source) {
        Ok(stack) => panic!("Expected {:?} to fail, got stack {:?}", source, stack),
        Err(error) => error.kind(),
    }
}

#[test_case("42", &["42"]; "integer")]
#[test_case("-17", &["-17"]; "negative integer")]
#[test_case("0x1f", &["31"]; "hex integer")]
#[test_case("017", &["15"]; "octal integer")]
#[test_case("L42", &["42"]; "forced big integer")]
#[test_case("2.5", &["2.5"]; "double")]
#[test_case("true false", &["true", "false"]; "booleans")]
#[test_case("\"a b\" 'c", &["a b", "c"]; "strings")]
#[test_case("1 ( a comment ) 2", &["1", "2"]; "comment")]
#[test_case("\"tab\\there\"", &["tab\there"]; "escaped string")]
fn literals(source: &str, expected: &[&str]) {
    assert_eq!(eval_stack(source).unwrap(), expected);
}

#[test_case("2 3 +", &["5"]; "add")]
#[test_case("\"ab\" \"cd\" +", &["abcd"]; "concatenate")]
#[test_case("\"n=\" 5 +", &["n=5"]; "concatenate number")]
#[test_case("5 2 -", &["3"]; "subtract")]
#[test_case("3 4 *", &["12"]; "multiply")]
#[test_case("7 2 /", &["3"]; "divide")]
#[test_case("-7 2 /", &["-3"]; "divide truncates")]
#[test_case("7 2 mod", &["1"]; "modulo")]
#[test_case("13 5 /mod", &["3", "2"]; "divide modulo")]
#[test_case("1.5 2 *", &["3.0"]; "double wins")]
#[test_case("9223372036854775807 1 +", &["9223372036854775808"]; "overflow promotes")]
#[test_case("9223372036854775807 1 + 1 -", &["9223372036854775807"]; "narrows back")]
#[test_case("L100 L23 -", &["77"]; "big integers")]
fn arithmetic(source: &str, expected: &[&str]) {
    assert_eq!(eval_stack(source).unwrap(), expected);
}

#[test_case("1 \"1\" =", &["true"]; "loose equality")]
#[test_case("1 \"2\" =", &["false"]; "loose inequality")]
#[test_case("1 \"1\" equals", &["true"]; "equals alias")]
#[test_case("1 \"1\" eq", &["false"]; "identity across kinds")]
#[test_case("\"x\" \"x\" eq", &["true"]; "identity")]
#[test_case("2 10 <", &["true"]; "less than")]
#[test_case("2 10.5 >", &["false"]; "greater than mixed")]
#[test_case("3 3 <=", &["true"]; "less or equal")]
#[test_case("\"b\" \"a\" >=", &["true"]; "lexical ordering")]
#[test_case("true false and", &["false"]; "and")]
#[test_case("true false or", &["true"]; "or")]
#[test_case("true not", &["false"]; "not")]
fn comparison_and_logic(source: &str, expected: &[&str]) {
    assert_eq!(eval_stack(source).unwrap(), expected);
}

#[test_case("1 2 swap", &["2", "1"]; "swap")]
#[test_case("1 \"a\" swap swap", &["1", "a"]; "swap twice is identity")]
#[test_case("1 2 dup drop", &["1", "2"]; "dup drop is identity")]
#[test_case("1 2 over", &["1", "2", "1"]; "over")]
#[test_case("1 2 3 rot", &["2", "3", "1"]; "rot")]
#[test_case("1 2 3 4 2swap", &["3", "4", "1", "2"]; "two swap")]
#[test_case("1 2 2dup", &["1", "2", "1", "2"]; "two dup")]
#[test_case("1 2 3 4 2over", &["1", "2", "3", "4", "1", "2"]; "two over")]
#[test_case("1 2 3 2drop", &["1"]; "two drop")]
#[test_case("1 2 3 len", &["1", "2", "3", "3"]; "length")]
#[test_case("1 2 3 0 2 swap-at", &["3", "2", "1"]; "swap at")]
#[test_case("1 2 3 .clr", &[]; "clear")]
#[test_case("1 2 ,", &["1"]; "discard")]
fn stack_words(source: &str, expected: &[&str]) {
    assert_eq!(eval_stack(source).unwrap(), expected);
}

#[test_case("\"hello\" str-len", &["5"]; "length")]
#[test_case("\"abc\" 1 str-at", &["98"]; "character code")]
#[test_case("\"abc\" \"abc\" str-eq", &["true"]; "equal")]
#[test_case("\"ABC\" \"abc\" str-eqi", &["true"]; "equal ignoring case")]
#[test_case("\"ABC\" str-tolower", &["abc"]; "lower case")]
#[test_case("\"abc\" str-toupper", &["ABC"]; "upper case")]
#[test_case("\"  hi  \" str-trim", &["hi"]; "trim")]
#[test_case("\"hello\" 1 3 substring", &["el"]; "substring")]
#[test_case("\"a-b-c\" \"-\" \"+\" str-replace", &["a+b-c"]; "replace first")]
#[test_case("\"a-b-c\" \"-\" \"+\" str-replace-all", &["a+b+c"]; "replace all")]
#[test_case("\"hello\" \"ll\" str-find", &["2"]; "find")]
#[test_case("\"hello\" \"z\" str-find", &["-1"]; "find nothing")]
fn string_words(source: &str, expected: &[&str]) {
    assert_eq!(eval_stack(source).unwrap(), expected);
}

#[test_case("10 20 30 1 at", &["10", "20", "30", "20"]; "at")]
#[test_case("10 20 30 1 remove-at", &["10", "30"]; "remove at")]
#[test_case("1 2 3 remove-all", &[]; "remove all")]
#[test_case("1 2 1 remove", &["2"]; "remove first match")]
#[test_case("\"a\" 1 \"b\" 2 \"b\" get", &["a", "1", "b", "2", "2"]; "get")]
#[test_case("\"a\" 1 \"a\" 5 set", &["a", "5"]; "set existing")]
#[test_case("\"a\" 1 \"b\" 5 set", &["a", "1", "b", "5"]; "set new")]
#[test_case("1 2 3 reverse", &["3", "2", "1"]; "reverse")]
#[test_case("3 1 2 sort", &["1", "2", "3"]; "sort")]
#[test_case("1 2 3 2 bsearch", &["1", "2", "3", "1"]; "binary search")]
#[test_case("1 3 2 bsearch", &["1", "3", "-2"]; "binary search miss")]
#[test_case("1 2 1 1 9 replace", &["9", "2", "1"]; "replace")]
#[test_case("1 2 1 1 9 replace-all", &["9", "2", "9"]; "replace all")]
fn list_words(source: &str, expected: &[&str]) {
    assert_eq!(eval_stack(source).unwrap(), expected);
}

#[test_case("true [ 1 ] [ 0 ] if", &["1"]; "if with both branches")]
#[test_case("false [ 1 ] [ 0 ] if", &["0"]; "if taking the else branch")]
#[test_case("true [ 1 ] if", &["1", "true"]; "if re-pushes the condition")]
#[test_case("false [ 1 ] if", &["false"]; "if not taken")]
#[test_case("false [ 1 ] if true [ 2 ] elif", &["2", "true"]; "elif taken")]
#[test_case("true [ 1 ] if true [ 2 ] elif", &["1", "true"]; "elif skipped")]
#[test_case("false [ 1 ] if [ 3 ] else", &["3"]; "else taken")]
#[test_case("true [ 1 ] if [ 3 ] else", &["1"]; "else skipped")]
#[test_case("true [ 1 ] when", &["1"]; "when")]
#[test_case("true [ 1 ] unless", &[]; "unless")]
#[test_case("7 [ 1 ] 0 times", &["7"]; "zero times")]
#[test_case("[ ] 3 times", &["0", "1", "2"]; "times pushes counters")]
#[test_case("[ ] 10 3 times-by", &["0", "3", "6", "9"]; "times by")]
#[test_case("0 \"i\" ; [ i 3 < ] [ i 1 + \"i\" ; ] while i", &["3"]; "while")]
#[test_case("[ 1 2 ] !", &["1", "2"]; "run a block")]
#[test_case("\"dup\" 4 swap !", &["4", "4"]; "run a word by name")]
fn control_words(source: &str, expected: &[&str]) {
    assert_eq!(eval_stack(source).unwrap(), expected);
}

#[test]
fn times_runs_the_block_with_each_counter() {
    let output = eval_output("[ dup . ] 5 times").unwrap();
    assert_eq!(output, "0 1 2 3 4 ");
}

#[test_case("1 2 . .", "2 1 "; "print")]
#[test_case("1 .ns 2 .ns", "12"; "print without space")]
#[test_case("1 2 .s", "1 2 \n"; "print stack")]
#[test_case("72 emit 105 emit newline", "Hi\n"; "emit")]
#[test_case("1 . space 2 .", "1  2 "; "space")]
#[test_case("[ 1 2 ] .", "<block 2> "; "print a block")]
fn output_words(source: &str, expected: &str) {
    assert_eq!(eval_output(source).unwrap(), expected);
}

#[test_case("drop", ErrorKind::EmptyStack; "empty stack")]
#[test_case("frobnicate", ErrorKind::UnknownWord; "unknown word")]
#[test_case("1 true +", ErrorKind::TypeMismatch; "arithmetic on a boolean")]
#[test_case("1 0 /", ErrorKind::Runtime; "division by zero")]
#[test_case("1 0 mod", ErrorKind::Runtime; "modulo by zero")]
#[test_case("5 at", ErrorKind::InvalidIndex; "index out of range")]
#[test_case("\"abc\" 2 9 substring", ErrorKind::InvalidIndex; "substring out of range")]
#[test_case("\"unterminated", ErrorKind::UnterminatedString; "unterminated string")]
#[test_case("]", ErrorKind::UnbalancedBlock; "unbalanced block")]
#[test_case("[ 1 }", ErrorKind::UnbalancedBlock; "mismatched block")]
#[test_case("[ ] 5 0 times-by", ErrorKind::Runtime; "zero step")]
#[test_case("1 [ 2 ] if", ErrorKind::TypeMismatch; "if without a boolean")]
#[test_case("\"nothing\" forget", ErrorKind::UnknownWord; "forget unknown variable")]
#[test_case("42 999 send", ErrorKind::InvalidProcess; "send to missing process")]
fn errors(source: &str, expected: ErrorKind) {
    assert_eq!(eval_error(source), expected);
}

#[test]
fn errors_carry_the_token_location() {
    let error = eval_stack("1 2\n  frobnicate").unwrap_err();
    let location = error.location().clone().unwrap();

    assert_eq!(location.line(), 2);
    assert_eq!(location.column(), 3);
    assert!(error.to_string().contains("Word 'frobnicate' not found."));
}
