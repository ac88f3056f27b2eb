/// Module contains the Value enumeration, the resolved form of a stack cell, as well as the payload
/// type of the number table.
pub mod value;

/// The handle to payload tables that keep stack cells small.
pub mod intern_table;

/// Maps word names to native operations.
pub mod operation_table;

/// The arena that owns every scope of a runtime and implements scope chain resolution.
pub mod scope_arena;
