// Scopes, blocks, variables and interning, driven through an environment.

use scopevm::{
    CodeManagement, Environment, ErrorKind, Interpreter, InterpreterStack, OperationRegistry,
    ScopeManagement, SharedOutput, Value, add_operation,
};
use std::io::Cursor;
use test_case::test_case;

fn environment() -> (Environment, SharedOutput) {
    let output = SharedOutput::new();
    let environment = Environment::new(Cursor::new(Vec::new()), output.clone());

    (environment, output)
}

fn stack_of(environment: &Environment) -> Vec<String> {
    environment
        .stack()
        .unwrap()
        .iter()
        .map(|value| value.to_string())
        .collect()
}

fn scope_count(environment: &Environment) -> usize {
    environment.root().runtime().arena().len()
}

#[test_case("5 [ 1 2 ] !", &["5", "1", "2"]; "sharing blocks push onto the caller")]
#[test_case("5 { 1 2 } !", &["5", "2"]; "isolated blocks hand back their top value")]
#[test_case("5 { } !", &["5"]; "empty isolated blocks hand back nothing")]
#[test_case("5 { 1 + } !", &["6"]; "isolated blocks pop through to the caller")]
#[test_case("[ [ 1 ] ! 2 ] !", &["1", "2"]; "nested blocks")]
#[test_case("[ [ 1 ] ! ] \"f\" ; f f", &["1", "1"]; "nested blocks survive being replayed")]
#[test_case("5 \"x\" ; x x +", &["10"]; "variables")]
#[test_case("[ 2 * ] \"double\" ; 4 double", &["8"]; "block variables run when named")]
#[test_case("1 \"x\" ; [ 2 \"x\" ; ] ! x", &["2"]; "define updates the nearest binding")]
#[test_case("1 \"x\" ; [ 2 \"x\" ;; ] ! x", &["2"]; "strict define writes through")]
#[test_case("1 \"x\" ; 2 \"x\" ;; x", &["1"]; "strict define keeps a local binding")]
#[test_case("{ 3 \"y\" ;; y } !", &["3"]; "strict define binds locally when unbound")]
#[test_case("[ \"x\" ; ] \"f\" ; 1 f 2 \"x\" ; 3 f x", &["3"]; "define prefers the enclosing binding")]
#[test_case("{ 3 \"y\" ; y } !", &["3"]; "variables local to a block")]
#[test_case("\"1 2 +\" eval", &["3"]; "eval")]
fn blocks_and_variables(source: &str, expected: &[&str]) {
    let (mut environment, _) = environment();

    environment.eval(source).unwrap();
    assert_eq!(stack_of(&environment), expected);
}

#[test]
fn variables_local_to_a_block_are_not_visible_outside() {
    let (mut environment, _) = environment();

    let error = environment.eval("{ 3 \"y\" ; } ! y").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnknownWord);
}

#[test]
fn forgotten_variables_are_gone() {
    let (mut environment, _) = environment();

    environment.eval("1 \"x\" ; \"x\" forget").unwrap();

    let error = environment.eval("x").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnknownWord);
}

#[test]
fn forgetting_keeps_text_that_is_still_in_use() {
    let (mut environment, _) = environment();

    environment.eval("\"a\" \"x\" ; \"a\" \"x\" forget").unwrap();
    assert_eq!(stack_of(&environment), ["a"]);
}

#[test]
fn top_level_blocks_are_discarded_after_running() {
    let (mut environment, _) = environment();
    let before = scope_count(&environment);

    environment.eval("[ 1 ] ! [ 2 ] 3 times true [ 4 ] when").unwrap();
    assert_eq!(scope_count(&environment), before);
}

#[test]
fn referenced_blocks_are_kept() {
    let (mut environment, _) = environment();
    let before = scope_count(&environment);

    // One block is bound to a variable, the other is still sitting on the stack.
    environment.eval("[ 1 ] \"f\" ; f [ 2 ] dup !").unwrap();
    assert_eq!(scope_count(&environment), before + 2);

    environment.eval("\"f\" forget").unwrap();
    assert_eq!(scope_count(&environment), before + 1);
}

#[test]
fn blocks_on_the_stack_stay_runnable() {
    let (mut environment, _) = environment();

    environment.eval("[ 7 ] dup ! swap !").unwrap();
    assert_eq!(stack_of(&environment), ["7", "7"]);
}

#[test]
fn interning_is_idempotent() {
    let (environment, _) = environment();
    let mut root = environment.root();

    let first = root.intern_string("hello").unwrap();
    let second = root.intern_string("hello").unwrap();

    assert_eq!(first, second);
    assert_eq!(root.resolve_string(first).unwrap(), "hello");
}

#[test]
fn child_interning_is_visible_to_the_parent() {
    let (environment, _) = environment();
    let root = environment.root();
    let runtime = root.runtime();

    let mut arena = runtime.arena();
    let child = arena.create_child(root.scope_id(), false).unwrap();
    let handle = arena.intern(child, "from the child".to_string()).unwrap();

    let resolved: String = arena.resolve(root.scope_id(), handle).unwrap();
    assert_eq!(resolved, "from the child");
}

#[test]
fn values_round_trip_through_the_stack() {
    let (environment, _) = environment();
    let mut root = environment.root();

    for value in [
        Value::from("some text"),
        Value::Int(-3),
        Value::Double(0.25),
        Value::Bool(true),
    ] {
        root.push(value.clone()).unwrap();
        assert_eq!(root.pop().unwrap(), value);
    }
}

#[test]
fn embedders_can_add_operations() {
    let (mut environment, output) = environment();
    let mut root = environment.root();

    add_operation!(
        root,
        "greet",
        |interpreter| {
            let name = interpreter.pop_as_string()?;
            interpreter.write_output(&format!("Hello {}!", name))
        },
        "Greet someone.",
        "name -- "
    );

    environment.eval("\"world\" greet").unwrap();
    assert_eq!(output.contents(), "Hello world!");
}

#[test]
fn loading_a_file_runs_it_in_the_current_scope() {
    let path = std::env::temp_dir().join(format!("scopevm-load-{}.svm", std::process::id()));
    std::fs::write(&path, "( a library )\n21 \"half\" ;\n").unwrap();

    let (mut environment, _) = environment();
    let source = format!("\"{}\" load half 2 *", path.display());

    environment.eval(&source).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(stack_of(&environment), ["42"]);
}

#[test]
fn loading_a_missing_file_is_an_io_error() {
    let (mut environment, _) = environment();
    let mut root = environment.root();

    let error = root.process_source_file("/no/such/scopevm/file").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Io);

    // The environment is still usable.
    environment.eval("1").unwrap();
}
