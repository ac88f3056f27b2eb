use crate::{
    lang::{
        code::{CodeCell, Handle, StackCell},
        source_buffer::SourceLocation,
        tokenizing::Token,
    },
    runtime::{
        config::RuntimeConfig,
        data_structures::{scope_arena::ScopeId, value::Value},
        error,
        process::table::Pid,
    },
};
use std::{sync::Arc, time::Duration};

/// The Scope handle, the one implementation of the interpreter traits.
pub mod scope;

/// The context shared by every scope of an environment.
pub mod runtime;

/// Trait for managing a scope's data stack.  Intended to be called by operations.
///
/// Popping resolves a cell through the scope chain into a Value, pushing interns whatever the
/// value needs into the scope chain.  When a scope's own stack is empty a pop falls through to the
/// parent scope's stack, up to the top of the process.
pub trait InterpreterStack {
    /// Push a value onto the stack, or onto the target process's stack during a synchronized push
    /// session.
    fn push(&mut self, value: Value) -> error::Result<()>;

    /// Push a raw cell.  The cell's handles must resolve in this scope's chain.
    fn push_cell(&mut self, cell: StackCell) -> error::Result<()>;

    /// Pop the top cell and resolve it.  An empty stack, with nothing to fall through to, is an
    /// EmptyStack error.
    fn pop(&mut self) -> error::Result<Value>;

    /// Pop the top cell without resolving it.
    fn pop_cell(&mut self) -> error::Result<StackCell>;

    /// Look at the top value without removing it.
    fn peek(&mut self) -> error::Result<Value>;

    /// Pop the top value and require it to be a machine integer.
    fn pop_as_int(&mut self) -> error::Result<i64>;

    /// Pop the top value and require it to be a non-negative machine integer.
    fn pop_as_usize(&mut self) -> error::Result<usize>;

    /// Pop the top value and require it to be a boolean.
    fn pop_as_bool(&mut self) -> error::Result<bool>;

    /// Pop the top value and require it to be a string.  Words pushed as values are accepted too.
    fn pop_as_string(&mut self) -> error::Result<String>;

    /// Pop the top value and require it to be something that can be run, that is a block, a word or
    /// a string naming a word.
    fn pop_as_runnable(&mut self) -> error::Result<Value>;

    /// How many cells are on this scope's own stack.
    fn stack_len(&self) -> error::Result<usize>;

    /// The resolved contents of this scope's own stack, bottom first.
    fn stack_values(&self) -> error::Result<Vec<Value>>;

    /// Replace this scope's own stack with the given values, bottom first.
    fn set_stack_values(&mut self, values: Vec<Value>) -> error::Result<()>;

    /// Remove and return every value of this scope's own stack, top first.
    fn drain_stack(&mut self) -> error::Result<Vec<Value>>;
}

/// Trait for the variable and interning tables of a scope.
pub trait ScopeManagement {
    /// The id of the scope in the arena.
    fn scope_id(&self) -> ScopeId;

    /// Bind a variable.  Strict bindings are only created when the name is not already bound
    /// locally.  Otherwise an existing binding in an ancestor, within the same process, is updated
    /// in place, and only if there is none is a new local binding created.
    fn define_variable(&mut self, name: &str, cell: StackCell, strict: bool) -> error::Result<()>;

    /// Remove the nearest binding of a variable, along with its interned payload.  Returns false if
    /// the name wasn't bound.
    fn forget_variable(&mut self, name: &str) -> error::Result<bool>;

    /// Look a variable up through the scope chain.
    fn find_variable(&self, name: &str) -> error::Result<Option<StackCell>>;

    fn intern_string(&mut self, text: &str) -> error::Result<Handle>;

    fn resolve_string(&self, handle: Handle) -> error::Result<String>;

    /// Resolve a cell of any kind into a value.
    fn resolve_cell(&self, cell: StackCell) -> error::Result<Value>;

    /// Intern whatever the value needs and build the matching cell.
    fn intern_value(&mut self, value: Value) -> error::Result<StackCell>;
}

/// Trait for compiling and executing code.
pub trait CodeManagement {
    /// Compile a token against the scope being compiled into, or execute it right away if no block
    /// is open.  Errors are stamped with the token's location.
    fn execute(&mut self, token: &Token) -> error::Result<()>;

    /// Execute a compiled cell.  Words are resolved, everything else is pushed.
    fn execute_cell(&mut self, cell: CodeCell) -> error::Result<()>;

    /// Resolve and execute a word by name.  Variables are searched first, then operations.
    fn execute_word_named(&mut self, name: &str) -> error::Result<()>;

    /// Replay this scope's compiled code from the start.
    fn run(&mut self) -> error::Result<()>;

    /// Run a block as a nested call of this scope.  `[ ]` blocks work on this scope's stack, `{ }`
    /// blocks get a fresh stack and hand their top value back.
    fn run_block(&mut self, handle: Handle) -> error::Result<()>;

    /// Run a block, a word, or a string naming a word.
    fn run_value(&mut self, runnable: &Value) -> error::Result<()>;

    /// Reclaim a block that a control word has finished with, if nothing else can reach it.
    fn discard_transient(&mut self, runnable: &Value) -> error::Result<()>;

    /// Tokenize and execute source code in this scope.  The path is only used for locations.
    fn process_source(&mut self, path: &str, source: &str) -> error::Result<()>;

    /// Read a file and execute it in this scope.
    fn process_source_file(&mut self, path: &str) -> error::Result<()>;
}

/// Definition of an operation handler function.  This is the function that is called when a word
/// resolves to an operation.  Can be a lambda, a callable object or a Rust function, as long as it
/// can be shared between processes.
pub type OperationHandler = dyn Fn(&mut dyn Interpreter) -> error::Result<()> + Send + Sync;

/// Information about an operation.  Once created it's fields are read-only and accessed by member
/// methods.
#[derive(Clone)]
pub struct OperationInfo {
    name: String,
    description: String,
    signature: String,
    location: SourceLocation,
    handler: Arc<OperationHandler>,
}

impl OperationInfo {
    pub fn new(
        name: String,
        description: String,
        signature: String,
        location: SourceLocation,
        handler: Arc<OperationHandler>,
    ) -> OperationInfo {
        OperationInfo {
            name,
            description,
            signature,
            location,
            handler,
        }
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    /// A simple description of what the operation does.
    pub fn description(&self) -> &String {
        &self.description
    }

    /// The stack signature, in Forth notation.
    pub fn signature(&self) -> &String {
        &self.signature
    }

    /// Where the operation was registered from.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn handler(&self) -> Arc<OperationHandler> {
        self.handler.clone()
    }
}

/// Anything operations can be registered with, the default table or a live scope.
pub trait OperationRegistry {
    fn add_operation(
        &mut self,
        location: SourceLocation,
        name: String,
        handler: Arc<OperationHandler>,
        description: String,
        signature: String,
    );
}

/// Simplify registering a native operation.
///
/// Required parameters are, the registry to register with.  The name of the word to register.  The
/// operation function handler to execute for the word.  A simple description of the word.  As well
/// as the word's stack signature.
#[macro_export]
macro_rules! add_operation {
    (
        $registry:expr ,
        $name:expr ,
        $function:expr ,
        $description:expr ,
        $signature:expr
    ) => {{
        // Register the operation while recording where in the source code it was registered from.
        $registry.add_operation(
            $crate::location_here!(),
            $name.to_string(),
            $crate::runtime::interpreter::operation_handler($function),
            $description.to_string(),
            $signature.to_string(),
        );
    }};
}

/// Wrap a function or closure as a shareable operation handler.  Going through a generic function
/// lets closures have their argument types inferred.
pub fn operation_handler<F>(function: F) -> Arc<OperationHandler>
where
    F: Fn(&mut dyn Interpreter) -> error::Result<()> + Send + Sync + 'static,
{
    Arc::new(function)
}

/// Trait for looking operations up.
pub trait OperationManagement: OperationRegistry {
    /// Find an operation by walking the scope chain.
    fn find_operation(&self, name: &str) -> error::Result<Option<Arc<OperationInfo>>>;

    /// The names of every operation visible from this scope.
    fn operation_names(&self) -> error::Result<Vec<String>>;
}

/// Trait for spawning processes and moving values between them.
pub trait ProcessManagement {
    /// The id of the process this scope runs in.
    fn pid(&self) -> error::Result<Pid>;

    /// The id of the process that owns this process's parent scope.  0 at the top level.
    fn super_pid(&self) -> error::Result<Pid>;

    /// Start a block as a new process, with a copy of this scope's stack.  Returns the new id.
    fn spawn(&mut self, handle: Handle) -> error::Result<Pid>;

    /// Wait until this scope's stack holds at least `count` values.
    fn receive(&mut self, count: usize) -> error::Result<()>;

    /// Push a value onto another process's stack.
    fn send_to(&mut self, pid: Pid, value: Value) -> error::Result<()>;

    /// Move this scope's whole stack to another process.  Values arrive in reverse order.
    fn send_all_to(&mut self, pid: Pid) -> error::Result<()>;

    /// Pop a value from another process's stack.
    fn take_from(&mut self, pid: Pid) -> error::Result<Value>;

    /// Move another process's whole stack onto this one.
    fn take_all_from(&mut self, pid: Pid) -> error::Result<()>;

    /// Redirect every push of this scope to another process until the session is ended.
    fn begin_sync_push(&mut self, pid: Pid) -> error::Result<()>;

    fn end_sync_push(&mut self) -> error::Result<()>;

    /// Stop the process this scope belongs to, cancelling any processes it spawned.
    fn stop(&mut self) -> error::Result<()>;

    fn is_stopped(&self) -> bool;
}

/// Core interpreter trait.
///
/// This trait brings together everything an operation can do with the scope it was invoked in.
pub trait Interpreter:
    InterpreterStack + ScopeManagement + CodeManagement + OperationManagement + ProcessManagement
{
    /// Write text to the environment's output.
    fn write_output(&mut self, text: &str) -> error::Result<()>;

    /// The configuration of the runtime this scope belongs to.
    fn config(&self) -> &RuntimeConfig;

    /// Sleep, waking early with a Stopped error if the process is cancelled.
    fn sleep(&mut self, duration: Duration) -> error::Result<()>;
}
