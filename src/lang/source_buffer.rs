use crate::runtime::error;
use std::{
    collections::VecDeque,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
    io::{BufRead, Cursor},
};

impl Default for SourceLocation {
    fn default() -> Self {
        Self::new()
    }
}

/// The location in the source code where a token was found.  This is used mostly for error
/// reporting.
///
/// This is a read-only structure.  Use the field accessor methods to get the values.
#[derive(Clone, PartialEq, PartialOrd, Eq, Debug)]
pub struct SourceLocation {
    /// Either the path to the file or a description of the source code.  For example code typed
    /// into the repl has a tag of "\<stdin\>".
    path: String,

    /// The 1 based line number in the source code where the token was found.
    line: usize,

    /// The 1 based column number in the source code where the token was found.
    column: usize,
}

impl Hash for SourceLocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.line.hash(state);
        self.column.hash(state);
    }
}

/// Used for error reporting to show where in the source code an error originated.
impl Display for SourceLocation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(formatter, "{} ({}, {})", self.path, self.line, self.column)
    }
}

impl SourceLocation {
    /// Create a new SourceLocation with default values.
    pub fn new() -> SourceLocation {
        SourceLocation {
            path: "unspecified".to_string(),
            line: 1,
            column: 1,
        }
    }

    /// Create a new SourceLocation with the path to the source code.
    pub fn new_from_path(path: &str) -> Self {
        SourceLocation {
            path: path.to_owned(),
            line: 1,
            column: 1,
        }
    }

    /// Create a new SourceLocation with all of the needed information.
    pub fn new_from_info(path: &str, line: usize, column: usize) -> Self {
        SourceLocation {
            path: path.to_owned(),
            line,
            column,
        }
    }

    /// The path to the source code or a meaningful description of the source code.
    pub fn path(&self) -> &String {
        &self.path
    }

    /// The 1 based line number in the source code.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The 1 based column number in the source code.
    pub fn column(&self) -> usize {
        self.column
    }
}

/// Helper macro to get the location of the macro invocation.  Operations registered from Rust use
/// it to record where they were defined.
#[macro_export]
macro_rules! location_here {
    () => {
        $crate::lang::source_buffer::SourceLocation::new_from_info(
            file!(),
            line!() as usize,
            column!() as usize,
        )
    };
}

/// A forward only buffer over a character stream.  Unlike a string slice the stream is pulled
/// lazily, a line at a time, so an interactive session produces tokens as soon as the user hits
/// enter.  As characters are consumed the location of the cursor is maintained.
pub struct SourceBuffer<'a> {
    /// Where the characters come from.
    reader: Box<dyn BufRead + 'a>,

    /// Characters read from the stream but not yet consumed.
    pending: VecDeque<char>,

    /// The logical location of the cursor in the source code.
    location: SourceLocation,

    /// Set once the reader has reported the end of its stream.
    exhausted: bool,
}

impl<'a> SourceBuffer<'a> {
    /// Create a new SourceBuffer reading from the given stream.  The path is only used for
    /// reporting locations.
    pub fn new(path: &str, reader: impl BufRead + 'a) -> Self {
        SourceBuffer {
            reader: Box::new(reader),
            pending: VecDeque::new(),
            location: SourceLocation::new_from_path(path),
            exhausted: false,
        }
    }

    /// Create a SourceBuffer over an in-memory piece of source code.
    pub fn from_source(path: &str, source: &str) -> SourceBuffer<'static> {
        SourceBuffer::new(path, Cursor::new(source.as_bytes().to_vec()))
    }

    /// The location the cursor is at in the source code being processed.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Take a peek at the next character in the source code without consuming it.
    pub fn peek_next(&mut self) -> error::Result<Option<char>> {
        self.fill()?;
        Ok(self.pending.front().copied())
    }

    /// Get and consume the next character in the source code.
    pub fn next_char(&mut self) -> error::Result<Option<char>> {
        self.fill()?;

        let next = self.pending.pop_front();

        if let Some(next_char) = next {
            self.increment_location(next_char);
        }

        Ok(next)
    }

    /// Make sure there is at least one pending character, unless the stream is done.
    fn fill(&mut self) -> error::Result<()> {
        while self.pending.is_empty() && !self.exhausted {
            let mut line = String::new();

            if self.reader.read_line(&mut line)? == 0 {
                self.exhausted = true;
            } else {
                self.pending.extend(line.chars());
            }
        }

        Ok(())
    }

    /// Advance one column for regular characters.  Reset the column to 1 and increment the line for
    /// new line characters.
    fn increment_location(&mut self, next: char) {
        if next == '\n' {
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
    }
}
