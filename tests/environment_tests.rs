// The read loop over an input stream and the lifetime of an environment.

use scopevm::{Environment, ErrorKind, SharedOutput};
use std::io::Cursor;

fn environment_with_input(input: &str) -> (Environment, SharedOutput) {
    let output = SharedOutput::new();
    let environment = Environment::new(Cursor::new(input.as_bytes().to_vec()), output.clone());

    (environment, output)
}

#[test]
fn the_read_loop_reports_errors_and_carries_on() {
    let (mut environment, output) = environment_with_input("1 2 + . foo 3 .");

    environment.run().unwrap();

    let contents = output.contents();
    let error_at = contents.find("Word 'foo' not found.").unwrap();

    assert!(contents.starts_with("3 "), "{}", contents);
    assert!(contents[error_at..].ends_with("3 "), "{}", contents);
}

#[test]
fn the_read_loop_keeps_state_between_lines() {
    let (mut environment, output) = environment_with_input("5 \"x\" ;\nx x * .\n");

    environment.run().unwrap();
    assert_eq!(output.contents(), "25 ");
}

#[test]
fn blocks_may_span_lines() {
    let (mut environment, output) = environment_with_input("[ 1 .\n  2 .\n] !\n");

    environment.run().unwrap();
    assert_eq!(output.contents(), "1 2 ");
}

#[test]
fn quitting_ends_the_read_loop() {
    let (mut environment, output) = environment_with_input("1 . .q 2 .");

    environment.run().unwrap();
    assert_eq!(output.contents(), "1 ");
}

#[test]
fn tokenizer_errors_end_the_read_loop() {
    let (mut environment, _) = environment_with_input("1 \"never closed");

    let error = environment.run().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnterminatedString);
}

#[test]
fn the_input_is_only_read_once() {
    let (mut environment, output) = environment_with_input("7 .");

    environment.run().unwrap();
    environment.run().unwrap();

    assert_eq!(output.contents(), "7 ");
}

#[test]
fn a_shut_down_environment_refuses_work() {
    let (mut environment, _) = environment_with_input("");

    environment.shutdown();

    let error = environment.eval("1").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Stopped);
}
