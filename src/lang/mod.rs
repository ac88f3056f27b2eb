/// Module for managing the original source code.
pub mod source_buffer;

/// Module for managing the turning of the source code into a list of tokens for further processing.
pub mod tokenizing;

/// Module for defining the cells that make up both the data stack and compiled code.
pub mod code;

/// Module for classifying tokens into literals, words and block delimiters.  Interning the result is
/// up to the scope doing the compiling.
pub mod compilation;
