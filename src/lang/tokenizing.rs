use crate::{
    lang::source_buffer::{SourceBuffer, SourceLocation},
    runtime::error::{self, ErrorKind, ScriptError},
};
use std::{
    fmt::{self, Debug, Display, Formatter},
    io::BufRead,
};

/// Which of the two quoting styles introduced a string literal.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Quoting {
    /// `"text"`, terminated by an unescaped closing quote and supporting escape sequences.
    Double,

    /// `'text`, running up to the next whitespace character with no escape processing.
    Single,
}

/// A token is a simple unit of the language.  The tokenizer only knows about quoted strings and
/// everything else.  Numbers, booleans and words are all told apart later by the compiler.
///
/// The token also holds the location in the original source code where it was found.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A quoted string literal along with the quoting style it was written in.
    String(SourceLocation, Quoting, String),

    /// Any other whitespace delimited run of characters.
    Word(SourceLocation, String),
}

/// A list of tokens found in the source code.
pub type TokenList = Vec<Token>;

/// Print the token the way it was written in the source code.
impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Token::String(_, Quoting::Double, text) => write!(f, "\"{}\"", text),
            Token::String(_, Quoting::Single, text) => write!(f, "'{}", text),
            Token::Word(_, text) => write!(f, "{}", text),
        }
    }
}

/// Include the original location when debugging.
impl Debug for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self)
    }
}

impl Token {
    /// Get the token's location in the original source text.
    pub fn location(&self) -> &SourceLocation {
        match self {
            Token::String(location, _, _) => location,
            Token::Word(location, _) => location,
        }
    }

    /// The text of the token, without any quoting.
    pub fn text(&self) -> &String {
        match self {
            Token::String(_, _, text) => text,
            Token::Word(_, text) => text,
        }
    }

    /// Check if the token is a string literal.
    pub fn is_string(&self) -> bool {
        matches!(self, Token::String(_, _, _))
    }

    /// Check if the token is a word, that is if it is the given bare text.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Word(_, text) if text == word)
    }
}

/// Check if the given character is considered whitespace.
fn is_whitespace(next: &char) -> bool {
    next.is_whitespace()
}

/// Pulls tokens one at a time out of a character stream.  The tokenizer never looks further ahead
/// than the token it is building so it can sit directly on top of an interactive input.
pub struct Tokenizer<'a> {
    buffer: SourceBuffer<'a>,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer over an arbitrary buffered reader.
    pub fn new(path: &str, reader: impl BufRead + 'a) -> Self {
        Tokenizer {
            buffer: SourceBuffer::new(path, reader),
        }
    }

    /// Create a tokenizer over an in-memory piece of source code.
    pub fn from_source(path: &str, source: &str) -> Tokenizer<'static> {
        Tokenizer {
            buffer: SourceBuffer::from_source(path, source),
        }
    }

    /// Where the tokenizer currently is in the stream.
    pub fn location(&self) -> &SourceLocation {
        self.buffer.location()
    }

    /// Get the next token from the stream, or None once the stream is exhausted.  Comments are
    /// consumed silently.
    pub fn next_token(&mut self) -> error::Result<Option<Token>> {
        loop {
            self.skip_whitespace()?;

            match self.buffer.peek_next()? {
                None => return Ok(None),
                Some('(') => self.skip_comment()?,
                Some('"') => return self.process_string().map(Some),
                Some('\'') => return self.process_single_quoted().map(Some),
                Some(_) => return self.process_word().map(Some),
            }
        }
    }

    /// Read the remaining tokens into a list.
    pub fn tokenize(&mut self) -> error::Result<TokenList> {
        let mut token_list = TokenList::new();

        while let Some(token) = self.next_token()? {
            token_list.push(token);
        }

        Ok(token_list)
    }

    /// Skip over whitespace in the text.  Stopping only at either the end of the buffer or the next
    /// non-whitespace character.
    fn skip_whitespace(&mut self) -> error::Result<()> {
        while let Some(next) = self.buffer.peek_next()? {
            if !is_whitespace(&next) {
                break;
            }

            let _ = self.buffer.next_char()?;
        }

        Ok(())
    }

    /// Comments run from the opening ( to the first ), they do not nest.  A comment left open at
    /// the end of the stream simply ends there.
    fn skip_comment(&mut self) -> error::Result<()> {
        while let Some(next) = self.buffer.next_char()? {
            if next == ')' {
                break;
            }
        }

        Ok(())
    }

    /// Process an escape sequence in a string literal.  The backslash has already been consumed.
    fn process_literal(&mut self, location: &SourceLocation) -> error::Result<char> {
        match self.buffer.next_char()? {
            // Perform a simple translation of the escape sequence.
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('0') => Ok('\0'),

            // The escape was on a non-special character so just pass it through.  This covers both
            // \" and \\.
            Some(next) => Ok(next),

            None => unterminated(location),
        }
    }

    /// Process a double quoted string.  New lines are allowed within the literal, only the end of
    /// the stream is an error.
    fn process_string(&mut self) -> error::Result<Token> {
        let location = self.buffer.location().clone();
        let mut text = String::new();

        // Skip the opening ".
        let _ = self.buffer.next_char()?;

        loop {
            match self.buffer.next_char()? {
                Some('"') => break,
                Some('\\') => text.push(self.process_literal(&location)?),
                Some(next) => text.push(next),
                None => return unterminated(&location),
            }
        }

        Ok(Token::String(location, Quoting::Double, text))
    }

    /// Process a single quoted string, which ends at the next whitespace or the end of the stream.
    fn process_single_quoted(&mut self) -> error::Result<Token> {
        let location = self.buffer.location().clone();

        // Skip the opening '.
        let _ = self.buffer.next_char()?;

        let text = self.until_whitespace()?;

        Ok(Token::String(location, Quoting::Single, text))
    }

    /// Words can contain any character except whitespace.
    fn process_word(&mut self) -> error::Result<Token> {
        let location = self.buffer.location().clone();
        let text = self.until_whitespace()?;

        Ok(Token::Word(location, text))
    }

    /// Pull text out of the buffer until we hit a whitespace character.
    fn until_whitespace(&mut self) -> error::Result<String> {
        let mut text = String::new();

        while let Some(next) = self.buffer.peek_next()? {
            if is_whitespace(&next) {
                break;
            }

            text.push(next);
            let _ = self.buffer.next_char()?;
        }

        Ok(text)
    }
}

fn unterminated<T>(location: &SourceLocation) -> error::Result<T> {
    ScriptError::new_as_result(
        ErrorKind::UnterminatedString,
        Some(location.clone()),
        "Unexpected end of file in string literal.".to_string(),
    )
}

/// Tokenize a complete piece of source code held in memory.
pub fn tokenize_from_source(path: &str, source: &str) -> error::Result<TokenList> {
    Tokenizer::from_source(path, source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        tokenize_from_source("<test>", source)
            .unwrap()
            .iter()
            .map(|token| token.to_string())
            .collect()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(texts("  1 2\t+\n  dup "), vec!["1", "2", "+", "dup"]);
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(texts("1 ( a comment ) 2 (open"), vec!["1", "2"]);
    }

    #[test]
    fn double_quoted_strings_keep_spaces_and_escapes() {
        let tokens = tokenize_from_source("<test>", r#""hello \"world\"" x"#).unwrap();

        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].is_string());
        assert_eq!(tokens[0].text(), "hello \"world\"");
        assert!(tokens[1].is_word("x"));
    }

    #[test]
    fn single_quoted_strings_end_at_whitespace_or_end_of_stream() {
        let tokens = tokenize_from_source("<test>", "'abc 'x\\y").unwrap();

        assert_eq!(tokens[0], Token::String(tokens[0].location().clone(), Quoting::Single, "abc".into()));
        assert_eq!(tokens[1].text(), "x\\y");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let error = tokenize_from_source("<test>", "1 \"never closed").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnterminatedString);
    }

    #[test]
    fn locations_are_tracked() {
        let tokens = tokenize_from_source("<test>", "a\n  b").unwrap();

        assert_eq!(tokens[1].location().line(), 2);
        assert_eq!(tokens[1].location().column(), 3);
    }
}
