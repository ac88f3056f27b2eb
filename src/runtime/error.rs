use crate::lang::source_buffer::SourceLocation;
use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    process::{ExitCode, Termination},
};

pub type Result<T> = std::result::Result<T, ScriptError>;

/// The broad category of a script error.  Every failure is reported through the single
/// `ScriptError` type so that the top level loop can print it and carry on, the kind only exists so
/// that embedders can tell failures apart without parsing the message.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ErrorKind {
    /// A pop or peek found nothing on the stack, or on any stack it delegates to.
    EmptyStack,

    /// An operation received a cell of the wrong kind.
    TypeMismatch,

    /// A word resolved to neither a variable nor an operation.
    UnknownWord,

    /// A handle could not be found in the interning tables of a scope or its ancestors.
    NotInterned,

    /// The tokenizer hit the end of the stream inside of a quoted string.
    UnterminatedString,

    /// An explicit stack index was out of range.
    InvalidIndex,

    /// A process id did not name a live process.
    InvalidProcess,

    /// A synchronized push session was opened while another one was still active.
    AlreadyPushing,

    /// The scope has been stopped and refuses to do any more work.
    Stopped,

    /// A block close was found without a matching block open.
    UnbalancedBlock,

    /// Reading or writing a file or stream failed.
    Io,

    /// Any other failure raised by an operation.
    Runtime,
}

/// Any error that occurs while compiling or executing a script.
#[derive(Clone)]
pub struct ScriptError {
    /// What category of failure this is.
    kind: ErrorKind,

    /// The location in the source code the error occurred, if available.
    location: Option<SourceLocation>,

    /// The description of the error.
    error: String,
}

impl Error for ScriptError {}

/// When returned from main, convert the error result to an operating system exit code.
impl Termination for ScriptError {
    /// Because this type represents an error, the exit code is always FAILURE.
    fn report(self) -> ExitCode {
        eprintln!("Error: {}", self);
        ExitCode::FAILURE
    }
}

/// Pretty print the error for the user, including where it happened if we know.
impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl Debug for ScriptError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self)
    }
}

impl ScriptError {
    /// Create a new ScriptError.
    pub fn new(kind: ErrorKind, location: Option<SourceLocation>, error: String) -> ScriptError {
        ScriptError {
            kind,
            location,
            error,
        }
    }

    /// Create a new ScriptError and wrap it in a Result::Err.
    pub fn new_as_result<T>(
        kind: ErrorKind,
        location: Option<SourceLocation>,
        error: String,
    ) -> Result<T> {
        Err(ScriptError::new(kind, location, error))
    }

    /// The category of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// If available, the location in the source code the error occurred.
    pub fn location(&self) -> &Option<SourceLocation> {
        &self.location
    }

    /// The description of the error.
    pub fn error(&self) -> &String {
        &self.error
    }

    /// Attach a location to the error, unless a more precise one was already recorded.
    pub fn or_location(mut self, location: &SourceLocation) -> ScriptError {
        if self.location.is_none() {
            self.location = Some(location.clone());
        }

        self
    }
}

/// Allow for the conversion of a std::io::Error into a ScriptError.
impl From<std::io::Error> for ScriptError {
    fn from(error: std::io::Error) -> ScriptError {
        ScriptError::new(ErrorKind::Io, None, format!("I/O error: {}", error))
    }
}

/// Shorthand for failing with a kind and a message.
pub fn script_error<T>(kind: ErrorKind, message: String) -> Result<T> {
    ScriptError::new_as_result(kind, None, message)
}

pub fn script_error_str<T>(kind: ErrorKind, message: &str) -> Result<T> {
    script_error(kind, message.to_string())
}

pub fn empty_stack<T>() -> Result<T> {
    script_error_str(ErrorKind::EmptyStack, "<empty-stack>")
}

pub fn type_mismatch<T>(expected: &str) -> Result<T> {
    script_error(
        ErrorKind::TypeMismatch,
        format!("Unexpected value on stack, expected {}.", expected),
    )
}

pub fn stopped<T>() -> Result<T> {
    script_error_str(ErrorKind::Stopped, "Scope has been stopped.")
}
