use crate::{
    lang::{
        code::{Cell, CodeCell, Handle, Instruction, StackCell},
        compilation::{BlockKind, Classified, classify},
        source_buffer::SourceLocation,
        tokenizing::{Token, Tokenizer},
    },
    runtime::{
        config::RuntimeConfig,
        data_structures::{
            scope_arena::{ScopeArena, ScopeData, ScopeId, StackRef, new_stack},
            value::{Number, Value},
        },
        error::{self, ErrorKind, empty_stack, script_error, stopped, type_mismatch},
        interpreter::{
            CodeManagement, Interpreter, InterpreterStack, OperationHandler, OperationInfo,
            OperationManagement, OperationRegistry, ProcessManagement, ScopeManagement,
            runtime::Runtime,
        },
        lock,
        process::{
            controller::{CancelToken, ProcessController},
            table::{Pid, ROOT_PID},
        },
    },
};
use log::{debug, trace, warn};
use std::{
    fs::read_to_string,
    sync::{Arc, MutexGuard},
    thread,
    time::{Duration, Instant},
};

/// A handle to one scope of a runtime.  Handles are cheap to clone and can be moved between
/// threads, all of the scope's state lives in the runtime's arena.
///
/// The handle also carries what belongs to one particular run of the scope rather than to the
/// scope itself: the process it runs under, that process's cancel token, and for a running block
/// the stack of that call.  A named block can be running in several processes at once, each call
/// works on its own stack.
#[derive(Clone)]
pub struct Scope {
    runtime: Arc<Runtime>,
    id: ScopeId,
    process: ScopeId,
    halt: CancelToken,
    frame: Option<Arc<Frame>>,
}

/// The stack one call of a block works on, and the scope its pops fall through to once that stack
/// runs dry.
struct Frame {
    stack: StackRef,
    caller: Option<Scope>,
}

/// What a word turned out to be.
enum Resolution {
    Variable(StackCell),
    Operation(Arc<OperationInfo>),
}

impl Scope {
    /// A handle on a scope that heads its own process, the root or a spawned block.
    pub(crate) fn new(runtime: Arc<Runtime>, id: ScopeId, halt: CancelToken) -> Scope {
        Scope {
            runtime,
            id,
            process: id,
            halt,
            frame: None,
        }
    }

    /// A handle to another scope, running under the same process.
    fn with_id(&self, id: ScopeId) -> Scope {
        Scope {
            runtime: self.runtime.clone(),
            id,
            process: self.process,
            halt: self.halt.clone(),
            frame: None,
        }
    }

    /// Like `with_id`, but keeps this handle's call stack when the id is our own.
    fn at(&self, id: ScopeId) -> Scope {
        if id == self.id {
            self.clone()
        } else {
            self.with_id(id)
        }
    }

    fn with_frame(&self, id: ScopeId, frame: Arc<Frame>) -> Scope {
        Scope {
            frame: Some(frame),
            ..self.with_id(id)
        }
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    fn arena(&self) -> MutexGuard<'_, ScopeArena> {
        self.runtime.arena()
    }

    /// Read something out of this scope's data.
    fn with_data<R>(&self, reader: impl FnOnce(&ScopeData) -> R) -> error::Result<R> {
        Ok(reader(self.arena().get(self.id)?))
    }

    fn stack_ref(&self) -> error::Result<StackRef> {
        match &self.frame {
            Some(frame) => Ok(frame.stack.clone()),
            None => self.with_data(|data| data.stack.clone()),
        }
    }

    /// Where pops go once our own stack is empty.  A running block falls through to whoever called
    /// it, any other scope to its parent, but never out of a process.
    fn outer(&self) -> error::Result<Option<Scope>> {
        if let Some(frame) = &self.frame {
            return Ok(frame.caller.clone());
        }

        let (parent, spawned) = self.with_data(|data| (data.parent, data.spawned))?;

        Ok(match parent {
            Some(parent) if !spawned => Some(self.with_id(parent)),
            _ => None,
        })
    }

    /// The open push session of our process, if any.
    fn push_target(&self) -> error::Result<Option<Pid>> {
        Ok(self.arena().get(self.process)?.push_target)
    }

    fn check_running(&self) -> error::Result<()> {
        if self.halt.is_cancelled() {
            stopped()
        } else {
            Ok(())
        }
    }

    /// A handle on the scope running the given process.
    fn process_scope(&self, pid: Pid) -> error::Result<Scope> {
        let id = self.runtime.processes().get(pid)?;

        Ok(Scope {
            process: id,
            ..self.with_id(id)
        })
    }

    /// Intern whatever the value needs into this scope's chain and build the matching cell.
    fn intern(&self, value: Value) -> error::Result<Cell> {
        let cell = match value {
            Value::Bool(value) => Cell::Bool(value),
            Value::Int(value) => Cell::Int(value),
            Value::BigInt(value) => Cell::BigInt(self.arena().intern(self.id, Number::Big(value))?),
            Value::Double(value) => {
                Cell::Double(self.arena().intern(self.id, Number::Double(value))?)
            }
            Value::Str(text) => Cell::Str(self.arena().intern(self.id, text)?),
            Value::Word(name) => Cell::Word(self.arena().intern(self.id, name)?),
            Value::Block(handle) => Cell::Block(handle),
        };

        Ok(cell)
    }

    /// Push onto this scope's own stack, ignoring any open push session.
    fn push_local(&self, value: Value) -> error::Result<()> {
        let cell = self.intern(value)?;
        let stack = self.stack_ref()?;

        lock(&stack).push(cell);
        Ok(())
    }

    /// Push a batch in one go, so that no other thread sees half of it.
    fn push_many_local(&self, values: Vec<Value>) -> error::Result<()> {
        let cells = values
            .into_iter()
            .map(|value| self.intern(value))
            .collect::<error::Result<Vec<Cell>>>()?;

        let stack = self.stack_ref()?;

        lock(&stack).extend(cells);
        Ok(())
    }

    /// Pop from this scope's own stack only.
    fn pop_local(&self) -> error::Result<Value> {
        let stack = self.stack_ref()?;
        let cell = lock(&stack).pop();

        match cell {
            Some(cell) => self.resolve_cell(cell),
            None => empty_stack(),
        }
    }

    /// Look for the top cell, falling through to outer stacks while ours is empty.  With `take`
    /// set the top cell is removed.
    fn top_cell(&self, take: bool) -> error::Result<StackCell> {
        let stack = self.stack_ref()?;

        let cell = {
            let mut stack = lock(&stack);

            if take { stack.pop() } else { stack.last().copied() }
        };

        match (cell, self.outer()?) {
            (Some(cell), _) => Ok(cell),
            (None, Some(outer)) => outer.top_cell(take),
            (None, None) => empty_stack(),
        }
    }

    /// Turn a classified literal into a cell, interning into this scope.
    fn compile_literal(&mut self, classified: Classified) -> error::Result<CodeCell> {
        let cell = match classified {
            Classified::Int(value) => Cell::Int(value),
            Classified::Bool(value) => Cell::Bool(value),
            Classified::Number(number) => {
                let is_double = matches!(number, Number::Double(_));
                let handle = self.arena().intern(self.id, number)?;

                if is_double {
                    Cell::Double(handle)
                } else {
                    Cell::BigInt(handle)
                }
            }
            Classified::Str(text) => Cell::Str(self.arena().intern(self.id, text)?),
            Classified::Word(name) => Cell::Word(self.arena().intern(self.id, name)?),
            Classified::BlockOpen(_) | Classified::BlockClose(_) => {
                return script_error(
                    ErrorKind::UnbalancedBlock,
                    "Block delimiters can not be compiled as values.".to_string(),
                );
            }
        };

        Ok(cell)
    }

    /// The scope new code should be compiled into, the innermost open block of this process or
    /// this scope itself if there is none.
    fn compile_target(&self, arena: &ScopeArena) -> error::Result<ScopeId> {
        Ok(arena
            .get(self.process)?
            .compile_stack
            .last()
            .copied()
            .unwrap_or(self.id))
    }

    fn open_block(&mut self, kind: BlockKind) -> error::Result<()> {
        let mut arena = self.arena();
        let target = self.compile_target(&arena)?;
        let child = arena.create_child(target, kind == BlockKind::Sharing)?;

        arena.get_mut(self.process)?.compile_stack.push(child);
        debug!("Opened block {} in scope {}.", child, target);

        Ok(())
    }

    fn close_block(&mut self, kind: BlockKind, location: &SourceLocation) -> error::Result<()> {
        let (child, parent, parent_compiling) = {
            let mut arena = self.arena();
            let root = self.process;

            let child = match arena.get(root)?.compile_stack.last().copied() {
                Some(child) => child,
                None => {
                    return script_error(
                        ErrorKind::UnbalancedBlock,
                        "Found a block close without a matching block open.".to_string(),
                    );
                }
            };

            if arena.get(child)?.shares_stack != (kind == BlockKind::Sharing) {
                return script_error(
                    ErrorKind::UnbalancedBlock,
                    "Mismatched block delimiters.".to_string(),
                );
            }

            let _ = arena.get_mut(root)?.compile_stack.pop();

            let data = arena.get_mut(child)?;
            data.compiling = false;

            let parent = data.parent.unwrap_or(self.id);

            arena.register_block(child)?;

            let parent_data = arena.get_mut(parent)?;

            if parent_data.compiling {
                parent_data
                    .code
                    .push(Instruction::new(Some(location.clone()), Cell::Block(child)));
            }

            (child, parent, parent_data.compiling)
        };

        debug!("Closed block {} in scope {}.", child, parent);

        if !parent_compiling {
            self.at(parent).push_cell(Cell::Block(child))?;
        }

        Ok(())
    }

    fn execute_token(&mut self, token: &Token) -> error::Result<()> {
        match classify(token) {
            Classified::BlockOpen(kind) => self.open_block(kind),
            Classified::BlockClose(kind) => self.close_block(kind, token.location()),

            literal => {
                let target = {
                    let arena = self.arena();
                    self.compile_target(&arena)?
                };

                let mut target = self.at(target);
                let cell = target.compile_literal(literal)?;

                let mut arena = self.arena();
                let data = arena.get_mut(target.id)?;

                if data.compiling {
                    data.code
                        .push(Instruction::new(Some(token.location().clone()), cell));
                    Ok(())
                } else {
                    drop(arena);
                    target.execute_cell(cell)
                }
            }
        }
    }

    fn resolve_word(&self, name: &str) -> error::Result<Option<Resolution>> {
        let arena = self.arena();
        let chain = arena.chain(self.id);

        for scope in &chain {
            if let Some(cell) = arena.get(*scope)?.variables.get(name) {
                return Ok(Some(Resolution::Variable(*cell)));
            }
        }

        for scope in &chain {
            if let Some(info) = arena.get(*scope)?.operations.find(name) {
                return Ok(Some(Resolution::Operation(info.clone())));
            }
        }

        Ok(None)
    }

    /// Run this scope as the body of the process `pid`, then clean up after it.  Errors are
    /// reported to the output instead of being returned, a failed process never takes its spawner
    /// down with it.
    fn run_process(mut self, pid: Pid) {
        debug!("Process {} starting in scope {}.", pid, self.id);

        if let Err(error) = self.run() {
            if error.kind() != ErrorKind::Stopped {
                let message = format!("{} in process {}", error, pid);

                warn!("{}", message);

                if let Err(output_error) = self.runtime.write_output(&format!("{}\n", message)) {
                    warn!("Could not report process failure: {}", output_error);
                }
            }
        }

        self.finish_process(pid);
        debug!("Process {} finished.", pid);
    }

    /// Take a finished process out of the table, shut down any controller it owned, and reclaim
    /// its scope unless something still refers to it.
    fn finish_process(&self, pid: Pid) {
        let controllers = {
            let mut arena = self.arena();
            let _ = self.runtime.processes().remove(pid);

            let mut controllers = Vec::new();

            if let Ok(data) = arena.get_mut(self.id) {
                data.running = false;
                data.spawned = false;
                data.push_target = None;
                data.compile_stack.clear();
                controllers.extend(data.controller.take());

                if !arena.is_referenced(self.id) {
                    match arena.discard(self.id) {
                        Ok(owned) => {
                            debug!("Discarded finished process scope {}.", self.id);
                            controllers.extend(owned);
                        }
                        Err(error) => warn!("Could not discard scope {}: {}", self.id, error),
                    }
                }
            }

            controllers
        };

        for controller in controllers {
            controller.shutdown();
        }
    }
}

impl InterpreterStack for Scope {
    fn push(&mut self, value: Value) -> error::Result<()> {
        match self.push_target()? {
            Some(pid) => self.send_to(pid, value),
            None => self.push_local(value),
        }
    }

    fn push_cell(&mut self, cell: StackCell) -> error::Result<()> {
        match self.push_target()? {
            Some(pid) => {
                let value = self.resolve_cell(cell)?;
                self.send_to(pid, value)
            }
            None => {
                let stack = self.stack_ref()?;

                lock(&stack).push(cell);
                Ok(())
            }
        }
    }

    fn pop(&mut self) -> error::Result<Value> {
        let cell = self.pop_cell()?;
        self.resolve_cell(cell)
    }

    fn pop_cell(&mut self) -> error::Result<StackCell> {
        self.top_cell(true)
    }

    fn peek(&mut self) -> error::Result<Value> {
        let cell = self.top_cell(false)?;
        self.resolve_cell(cell)
    }

    fn pop_as_int(&mut self) -> error::Result<i64> {
        match self.pop()? {
            Value::Int(value) => Ok(value),
            _ => type_mismatch("an integer"),
        }
    }

    fn pop_as_usize(&mut self) -> error::Result<usize> {
        let value = self.pop_as_int()?;

        match usize::try_from(value) {
            Ok(value) => Ok(value),
            Err(_) => script_error(
                ErrorKind::InvalidIndex,
                format!("Expected a non-negative integer, found {}.", value),
            ),
        }
    }

    fn pop_as_bool(&mut self) -> error::Result<bool> {
        match self.pop()? {
            Value::Bool(value) => Ok(value),
            _ => type_mismatch("a boolean"),
        }
    }

    fn pop_as_string(&mut self) -> error::Result<String> {
        match self.pop()? {
            Value::Str(text) | Value::Word(text) => Ok(text),
            _ => type_mismatch("a string"),
        }
    }

    fn pop_as_runnable(&mut self) -> error::Result<Value> {
        let value = self.pop()?;

        match value {
            Value::Block(_) | Value::Word(_) | Value::Str(_) => Ok(value),
            _ => type_mismatch("a block or a word"),
        }
    }

    fn stack_len(&self) -> error::Result<usize> {
        let stack = self.stack_ref()?;
        let len = lock(&stack).len();

        Ok(len)
    }

    fn stack_values(&self) -> error::Result<Vec<Value>> {
        let stack = self.stack_ref()?;
        let cells = lock(&stack).clone();

        cells.into_iter().map(|cell| self.resolve_cell(cell)).collect()
    }

    fn set_stack_values(&mut self, values: Vec<Value>) -> error::Result<()> {
        let cells = values
            .into_iter()
            .map(|value| self.intern(value))
            .collect::<error::Result<Vec<Cell>>>()?;

        let stack = self.stack_ref()?;
        *lock(&stack) = cells;

        Ok(())
    }

    fn drain_stack(&mut self) -> error::Result<Vec<Value>> {
        let stack = self.stack_ref()?;
        let cells: Vec<Cell> = lock(&stack).drain(..).rev().collect();

        cells.into_iter().map(|cell| self.resolve_cell(cell)).collect()
    }
}

impl ScopeManagement for Scope {
    fn scope_id(&self) -> ScopeId {
        self.id
    }

    fn define_variable(&mut self, name: &str, cell: StackCell, strict: bool) -> error::Result<()> {
        let mut arena = self.arena();
        let data = arena.get(self.id)?;

        if strict && data.variables.contains_key(name) {
            return Ok(());
        }

        // Update the nearest enclosing binding first, but never write out of a spawned process.
        if !data.spawned {
            if let Some(parent) = data.parent {
                for scope in arena.chain(parent) {
                    let ancestor = arena.get_mut(scope)?;

                    if let Some(existing) = ancestor.variables.get_mut(name) {
                        *existing = cell;
                        return Ok(());
                    }

                    if ancestor.spawned {
                        break;
                    }
                }
            }
        }

        arena.get_mut(self.id)?.variables.insert(name.to_string(), cell);
        Ok(())
    }

    fn forget_variable(&mut self, name: &str) -> error::Result<bool> {
        let controllers = {
            let mut arena = self.arena();
            let owner = arena
                .chain(self.id)
                .into_iter()
                .find(|scope| matches!(arena.get(*scope), Ok(data) if data.variables.contains_key(name)));

            let owner = match owner {
                Some(owner) => owner,
                None => return Ok(false),
            };

            let data = arena.get_mut(owner)?;
            let cell = data.variables.remove(name);

            // Identical content shares a handle, so the payload only goes once nothing else uses it.
            let shared = matches!(cell, Some(cell) if arena.is_cell_in_use(cell));

            match cell {
                Some(Cell::Str(handle)) | Some(Cell::Word(handle)) if !shared => {
                    let _ = arena.get_mut(owner)?.strings.remove(handle);
                    Vec::new()
                }
                Some(Cell::BigInt(handle)) | Some(Cell::Double(handle)) if !shared => {
                    let _ = arena.get_mut(owner)?.numbers.remove(handle);
                    Vec::new()
                }
                Some(Cell::Block(handle)) => {
                    // The block stays registered while anything else can still reach it.
                    if arena.contains(handle) && !arena.is_referenced(handle) {
                        debug!("Discarded block {} along with its variable.", handle);
                        arena.discard(handle)?
                    } else {
                        Vec::new()
                    }
                }
                _ => Vec::new(),
            }
        };

        for controller in controllers {
            controller.shutdown();
        }

        Ok(true)
    }

    fn find_variable(&self, name: &str) -> error::Result<Option<StackCell>> {
        let arena = self.arena();

        for scope in arena.chain(self.id) {
            if let Some(cell) = arena.get(scope)?.variables.get(name) {
                return Ok(Some(*cell));
            }
        }

        Ok(None)
    }

    fn intern_string(&mut self, text: &str) -> error::Result<Handle> {
        self.arena().intern(self.id, text.to_string())
    }

    fn resolve_string(&self, handle: Handle) -> error::Result<String> {
        self.arena().resolve(self.id, handle)
    }

    fn resolve_cell(&self, cell: StackCell) -> error::Result<Value> {
        let value = match cell {
            Cell::Bool(value) => Value::Bool(value),
            Cell::Int(value) => Value::Int(value),
            Cell::BigInt(handle) | Cell::Double(handle) => {
                Value::from(self.arena().resolve::<Number>(self.id, handle)?)
            }
            Cell::Str(handle) => Value::Str(self.resolve_string(handle)?),
            Cell::Word(handle) => Value::Word(self.resolve_string(handle)?),
            Cell::Block(handle) => {
                let _ = self.arena().resolve_block(self.id, handle)?;
                Value::Block(handle)
            }
        };

        Ok(value)
    }

    fn intern_value(&mut self, value: Value) -> error::Result<StackCell> {
        self.intern(value)
    }
}

impl CodeManagement for Scope {
    fn execute(&mut self, token: &Token) -> error::Result<()> {
        self.check_running()?;

        self.execute_token(token)
            .map_err(|error| error.or_location(token.location()))
    }

    fn execute_cell(&mut self, cell: CodeCell) -> error::Result<()> {
        match cell {
            Cell::Word(handle) => {
                let name = self.resolve_string(handle)?;
                self.execute_word_named(&name)
            }
            _ => self.push_cell(cell),
        }
    }

    fn execute_word_named(&mut self, name: &str) -> error::Result<()> {
        match self.resolve_word(name)? {
            Some(Resolution::Variable(Cell::Block(handle))) => self.run_block(handle),
            Some(Resolution::Variable(cell)) => self.push_cell(cell),
            Some(Resolution::Operation(info)) => {
                let handler: Arc<OperationHandler> = info.handler();
                handler(self)
            }
            None => script_error(ErrorKind::UnknownWord, format!("Word '{}' not found.", name)),
        }
    }

    fn run(&mut self) -> error::Result<()> {
        self.check_running()?;

        let mut code = self.with_data(|data| data.code.snapshot())?;

        while let Some(instruction) = code.next_instruction() {
            self.check_running()?;

            if let Err(error) = self.execute_cell(instruction.cell) {
                return Err(match &instruction.location {
                    Some(location) => error.or_location(location),
                    None => error,
                });
            }
        }

        code.reset();
        Ok(())
    }

    fn run_block(&mut self, handle: Handle) -> error::Result<()> {
        let (block, shares_stack) = {
            let arena = self.arena();
            let block = arena.resolve_block(self.id, handle)?;
            let data = arena.get(block)?;

            if data.running {
                return script_error(
                    ErrorKind::InvalidProcess,
                    format!("Block {} is running as process {}.", block, data.pid),
                );
            }

            (block, data.shares_stack)
        };

        // A `[ ]` block works on its caller's stack and falls through wherever the caller would.
        // A `{ }` block gets a fresh stack and falls through to the caller itself.
        let frame = Arc::new(if shares_stack {
            Frame {
                stack: self.stack_ref()?,
                caller: self.outer()?,
            }
        } else {
            Frame {
                stack: new_stack(),
                caller: Some(self.clone()),
            }
        });

        self.arena()
            .get_mut(block)?
            .call_stacks
            .push(frame.stack.clone());

        let mut callee = self.with_frame(block, frame.clone());
        let result = callee.run();

        if let Ok(data) = self.arena().get_mut(block) {
            if let Some(index) = data
                .call_stacks
                .iter()
                .position(|stack| Arc::ptr_eq(stack, &frame.stack))
            {
                let _ = data.call_stacks.swap_remove(index);
            }
        }

        result?;

        if !shares_stack {
            // The isolated block's result is its top value.  Its handles live in the block's
            // chain, so resolve there and re-intern for the caller.
            let top = lock(&frame.stack).pop();

            if let Some(top) = top {
                let value = callee.resolve_cell(top)?;
                self.push(value)?;
            }
        }

        Ok(())
    }

    fn run_value(&mut self, runnable: &Value) -> error::Result<()> {
        match runnable {
            Value::Block(handle) => self.run_block(*handle),
            Value::Word(name) | Value::Str(name) => self.execute_word_named(name),
            _ => type_mismatch("a block or a word"),
        }
    }

    fn discard_transient(&mut self, runnable: &Value) -> error::Result<()> {
        let handle = match runnable {
            Value::Block(handle) => *handle,
            _ => return Ok(()),
        };

        let controllers = {
            let mut arena = self.arena();

            // Only blocks written directly at the top level are transient.  Anything else may be
            // replayed by the code it was compiled into.
            if arena.get(self.id)?.parent.is_some() {
                return Ok(());
            }

            let block = match arena.resolve_block(self.id, handle) {
                Ok(block) => block,
                Err(_) => return Ok(()),
            };

            let data = arena.get(block)?;

            if data.parent != Some(self.id) || data.running || arena.is_referenced(block) {
                return Ok(());
            }

            debug!("Discarded block {}.", block);
            arena.discard(block)?
        };

        for controller in controllers {
            controller.shutdown();
        }

        Ok(())
    }

    fn process_source(&mut self, path: &str, source: &str) -> error::Result<()> {
        let mut tokenizer = Tokenizer::from_source(path, source);

        while let Some(token) = tokenizer.next_token()? {
            self.execute(&token)?;
        }

        Ok(())
    }

    fn process_source_file(&mut self, path: &str) -> error::Result<()> {
        let source = match read_to_string(path) {
            Ok(source) => source,
            Err(error) => {
                return script_error(
                    ErrorKind::Io,
                    format!("Could not read file {}: {}", path, error),
                );
            }
        };

        self.process_source(path, &source)
    }
}

impl OperationRegistry for Scope {
    fn add_operation(
        &mut self,
        location: SourceLocation,
        name: String,
        handler: Arc<OperationHandler>,
        description: String,
        signature: String,
    ) {
        let mut arena = self.arena();

        if let Ok(data) = arena.get_mut(self.id) {
            data.operations.insert(OperationInfo::new(
                name,
                description,
                signature,
                location,
                handler,
            ));
        }
    }
}

impl OperationManagement for Scope {
    fn find_operation(&self, name: &str) -> error::Result<Option<Arc<OperationInfo>>> {
        let arena = self.arena();

        for scope in arena.chain(self.id) {
            if let Some(info) = arena.get(scope)?.operations.find(name) {
                return Ok(Some(info.clone()));
            }
        }

        Ok(None)
    }

    fn operation_names(&self) -> error::Result<Vec<String>> {
        let arena = self.arena();
        let mut names = Vec::new();

        for scope in arena.chain(self.id) {
            names.extend(arena.get(scope)?.operations.names());
        }

        names.sort();
        names.dedup();

        Ok(names)
    }
}

impl ProcessManagement for Scope {
    fn pid(&self) -> error::Result<Pid> {
        Ok(self.arena().get(self.process)?.pid)
    }

    fn super_pid(&self) -> error::Result<Pid> {
        let arena = self.arena();

        match arena.get(self.process)?.parent {
            Some(parent) => {
                let owner = arena.process_root(parent)?;
                Ok(arena.get(owner)?.pid)
            }
            None => Ok(ROOT_PID),
        }
    }

    fn spawn(&mut self, handle: Handle) -> error::Result<Pid> {
        let values = self.stack_values()?;

        let (block, pid, controller, token) = {
            let mut arena = self.arena();
            let block = arena.resolve_block(self.id, handle)?;
            let owner = self.process;

            if let Ok(data) = arena.get(block) {
                if data.running {
                    return script_error(
                        ErrorKind::InvalidProcess,
                        format!("Block {} is already running as process {}.", block, data.pid),
                    );
                }
            }

            // The controller belongs to the spawning process, created the first time it's needed.
            let config = self.runtime.config();
            let owner_data = arena.get_mut(owner)?;
            let controller = match &owner_data.controller {
                Some(controller) if !controller.is_shut_down() => controller.clone(),
                _ => {
                    let controller = ProcessController::new(
                        owner_data.pid,
                        config.max_idle_workers,
                        config.worker_keep_alive,
                        config.shutdown_grace,
                    );

                    owner_data.controller = Some(controller.clone());
                    controller
                }
            };

            let pid = {
                let mut processes = self.runtime.processes();
                let pid = processes.allocate();

                processes.insert(pid, block);
                pid
            };

            let data = arena.get_mut(block)?;
            let token = CancelToken::new();

            data.spawned = true;
            data.running = true;
            data.pid = pid;
            data.stack = new_stack();
            data.compile_stack.clear();
            data.push_target = None;
            data.halt = token.clone();

            (block, pid, controller, token)
        };

        let process = Scope::new(self.runtime.clone(), block, token.clone());

        debug!("Spawned block {} as process {}.", block, pid);

        let started = process
            .push_many_local(values)
            .and_then(|_| {
                let process = process.clone();
                controller.submit(token, move || process.run_process(pid))
            });

        if let Err(error) = started {
            process.finish_process(pid);
            return Err(error);
        }

        Ok(pid)
    }

    fn receive(&mut self, count: usize) -> error::Result<()> {
        let interval = self.runtime.config().receive_poll_interval;

        loop {
            let available = self.stack_len()?;

            if available >= count {
                return Ok(());
            }

            self.check_running()?;
            trace!(
                "Scope {} waiting for {} values, has {}.",
                self.id, count, available
            );

            thread::sleep(interval);
        }
    }

    fn send_to(&mut self, pid: Pid, value: Value) -> error::Result<()> {
        self.process_scope(pid)?.push_local(value)
    }

    fn send_all_to(&mut self, pid: Pid) -> error::Result<()> {
        let target = self.process_scope(pid)?;
        let values = self.drain_stack()?;

        target.push_many_local(values)
    }

    fn take_from(&mut self, pid: Pid) -> error::Result<Value> {
        self.process_scope(pid)?.pop_local()
    }

    fn take_all_from(&mut self, pid: Pid) -> error::Result<()> {
        let mut source = self.process_scope(pid)?;
        let values = source.drain_stack()?;

        self.push_many_local(values)
    }

    fn begin_sync_push(&mut self, pid: Pid) -> error::Result<()> {
        // Make sure the target exists before opening the session.
        let _ = self.runtime.processes().get(pid)?;

        let mut arena = self.arena();
        let data = arena.get_mut(self.process)?;

        if data.push_target.is_some() {
            return script_error(
                ErrorKind::AlreadyPushing,
                "Already pushing data to another process.".to_string(),
            );
        }

        data.push_target = Some(pid);
        Ok(())
    }

    fn end_sync_push(&mut self) -> error::Result<()> {
        let mut arena = self.arena();
        let data = arena.get_mut(self.process)?;

        match data.push_target.take() {
            Some(_) => Ok(()),
            None => script_error(
                ErrorKind::InvalidProcess,
                "Not pushing data to another process.".to_string(),
            ),
        }
    }

    fn stop(&mut self) -> error::Result<()> {
        let controller = {
            let mut arena = self.arena();
            let data = arena.get_mut(self.process)?;

            data.halt.cancel();
            data.controller.clone()
        };

        self.halt.cancel();

        if let Some(controller) = controller {
            controller.shutdown();
        }

        Ok(())
    }

    fn is_stopped(&self) -> bool {
        self.halt.is_cancelled()
    }
}

impl Interpreter for Scope {
    fn write_output(&mut self, text: &str) -> error::Result<()> {
        self.runtime.write_output(text)
    }

    fn config(&self) -> &RuntimeConfig {
        self.runtime.config()
    }

    fn sleep(&mut self, duration: Duration) -> error::Result<()> {
        let deadline = Instant::now() + duration;
        let interval = self.runtime.config().receive_poll_interval.max(Duration::from_millis(1));

        loop {
            self.check_running()?;

            let now = Instant::now();

            if now >= deadline {
                return Ok(());
            }

            thread::sleep(interval.min(deadline - now));
        }
    }
}
