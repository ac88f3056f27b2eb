use crate::lang::source_buffer::SourceLocation;
use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// An opaque key into one of a scope's interning tables.
pub type Handle = u64;

/// The fixed size cell that makes up both the data stack and compiled code.  Small values are held
/// inline, everything else is a handle that has to be resolved through the interning tables of the
/// scope chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Cell {
    /// A boolean literal.
    Bool(bool),

    /// A value that fits in a machine integer.
    Int(i64),

    /// Handle into the number table for an arbitrary precision integer.
    BigInt(Handle),

    /// Handle into the number table for a floating point value.
    Double(Handle),

    /// Handle into the string table.
    Str(Handle),

    /// Handle into the string table for the name of a word, resolved when executed.
    Word(Handle),

    /// Handle into the block table, naming a compiled child scope.
    Block(Handle),
}

/// A cell sitting on a data stack.
pub type StackCell = Cell;

/// A cell produced by the compiler.
pub type CodeCell = Cell;

impl Cell {
    /// A user facing name for the kind of cell, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Cell::Bool(_) => "boolean",
            Cell::Int(_) => "integer",
            Cell::BigInt(_) => "big integer",
            Cell::Double(_) => "double",
            Cell::Str(_) => "string",
            Cell::Word(_) => "word",
            Cell::Block(_) => "block",
        }
    }

    /// Can this cell be handed to a control word to be run?
    pub fn is_runnable(&self) -> bool {
        matches!(self, Cell::Block(_) | Cell::Word(_) | Cell::Str(_))
    }

    /// The block handle held by this cell, if it is a block.
    pub fn block(&self) -> Option<Handle> {
        match self {
            Cell::Block(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// A compiled cell and the place in the source code it was compiled from.
#[derive(Clone, PartialEq, Debug)]
pub struct Instruction {
    pub location: Option<SourceLocation>,
    pub cell: CodeCell,
}

impl Instruction {
    pub fn new(location: Option<SourceLocation>, cell: CodeCell) -> Instruction {
        Instruction { location, cell }
    }
}

/// An ordered, index addressable and replayable list of instructions.  The instructions are shared
/// so a block can take a cheap snapshot of itself before running.  This way the block's code can
/// be extended while it is executing without disturbing the running copy.
#[derive(Clone, Default, Debug)]
pub struct CodeBlock {
    instructions: Arc<Vec<Instruction>>,
    cursor: usize,
}

impl CodeBlock {
    pub fn new() -> CodeBlock {
        CodeBlock::default()
    }

    /// Append an instruction to the end of the block.
    pub fn push(&mut self, instruction: Instruction) {
        Arc::make_mut(&mut self.instructions).push(instruction);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Random access to the instruction at the given index.
    pub fn at(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Get the instruction under the cursor and advance.  Returns None once the end is reached.
    pub fn next_instruction(&mut self) -> Option<Instruction> {
        let instruction = self.instructions.get(self.cursor).cloned();

        if instruction.is_some() {
            self.cursor += 1;
        }

        instruction
    }

    /// Rewind the cursor so that the block can be replayed.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// A copy of the block sharing the same instructions, with its cursor at the start.
    pub fn snapshot(&self) -> CodeBlock {
        CodeBlock {
            instructions: self.instructions.clone(),
            cursor: 0,
        }
    }

    /// Iterate over the cells of the block.
    pub fn cells(&self) -> impl Iterator<Item = &CodeCell> {
        self.instructions.iter().map(|instruction| &instruction.cell)
    }
}

/// Pretty print the block's cells, one per line.
impl Display for CodeBlock {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (index, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{:4}  {:?}", index, instruction.cell)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_replay_after_reset() {
        let mut block = CodeBlock::new();

        block.push(Instruction::new(None, Cell::Int(1)));
        block.push(Instruction::new(None, Cell::Bool(true)));

        let first: Vec<Cell> = std::iter::from_fn(|| block.next_instruction())
            .map(|instruction| instruction.cell)
            .collect();

        assert!(block.next_instruction().is_none());
        block.reset();

        let second: Vec<Cell> = std::iter::from_fn(|| block.next_instruction())
            .map(|instruction| instruction.cell)
            .collect();

        assert_eq!(first, second);
        assert_eq!(block.at(1).map(|instruction| instruction.cell), Some(Cell::Bool(true)));
    }

    #[test]
    fn snapshots_do_not_see_later_pushes() {
        let mut block = CodeBlock::new();
        block.push(Instruction::new(None, Cell::Int(1)));

        let snapshot = block.snapshot();
        block.push(Instruction::new(None, Cell::Int(2)));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(block.len(), 2);
    }
}
