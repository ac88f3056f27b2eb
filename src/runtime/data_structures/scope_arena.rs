use crate::{
    lang::code::{Cell, CodeBlock, Handle},
    runtime::{
        data_structures::{
            intern_table::InternTable,
            operation_table::OperationTable,
            value::{InternKey, Number},
        },
        error::{self, ErrorKind, script_error},
        lock,
        process::{
            controller::{CancelToken, ProcessController},
            table::{Pid, ROOT_PID},
        },
    },
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

/// Scopes are addressed by id, never by pointer.  A block's handle is its scope id.
pub type ScopeId = u64;

/// A data stack that can be shared between a `[ ]` block and whoever calls it.
pub type StackRef = Arc<Mutex<Vec<Cell>>>;

pub fn new_stack() -> StackRef {
    Arc::new(Mutex::new(Vec::new()))
}

/// Everything a scope owns.
pub struct ScopeData {
    pub parent: Option<ScopeId>,
    pub children: HashSet<ScopeId>,

    /// The scope's own stack, used by the top level scope and spawned processes.  Blocks that are
    /// called get a stack per call instead.
    pub stack: StackRef,
    pub shares_stack: bool,

    /// The stacks of the calls to this block that are in progress, one entry per call.
    pub call_stacks: Vec<StackRef>,

    pub variables: HashMap<String, Cell>,
    pub strings: InternTable<String>,
    pub numbers: InternTable<Number>,
    pub blocks: InternTable<ScopeId>,
    pub operations: OperationTable,

    /// Only meaningful on process roots, the top level scope and spawned scopes.
    pub pid: Pid,
    pub spawned: bool,
    pub running: bool,
    pub halt: CancelToken,
    pub controller: Option<Arc<ProcessController>>,
    pub compile_stack: Vec<ScopeId>,

    pub compiling: bool,
    pub code: CodeBlock,

    /// Open synchronized push session, if any.
    pub push_target: Option<Pid>,
}

impl ScopeData {
    fn new(parent: Option<ScopeId>, stack: StackRef, shares_stack: bool) -> ScopeData {
        ScopeData {
            parent,
            children: HashSet::new(),
            stack,
            shares_stack,
            call_stacks: Vec::new(),
            variables: HashMap::new(),
            strings: InternTable::new(),
            numbers: InternTable::new(),
            blocks: InternTable::new(),
            operations: OperationTable::new(),
            pid: ROOT_PID,
            spawned: false,
            running: false,
            halt: CancelToken::new(),
            controller: None,
            compile_stack: Vec::new(),
            compiling: false,
            code: CodeBlock::new(),
            push_target: None,
        }
    }

    /// The scope's own stack followed by the stacks of its calls in progress.
    pub fn stacks(&self) -> impl Iterator<Item = &StackRef> {
        std::iter::once(&self.stack).chain(self.call_stacks.iter())
    }

}

/// Lets the arena pick the right table for each kind of interned payload.
pub trait Interned: InternKey {
    fn table(data: &ScopeData) -> &InternTable<Self>;
    fn table_mut(data: &mut ScopeData) -> &mut InternTable<Self>;
}

impl Interned for String {
    fn table(data: &ScopeData) -> &InternTable<Self> {
        &data.strings
    }

    fn table_mut(data: &mut ScopeData) -> &mut InternTable<Self> {
        &mut data.strings
    }
}

impl Interned for Number {
    fn table(data: &ScopeData) -> &InternTable<Self> {
        &data.numbers
    }

    fn table_mut(data: &mut ScopeData) -> &mut InternTable<Self> {
        &mut data.numbers
    }
}

/// Owns every scope of a runtime.  Parent and child links are ids into the arena, so the scope tree
/// has no reference cycles and a discarded scope simply stops resolving.
#[derive(Default)]
pub struct ScopeArena {
    scopes: HashMap<ScopeId, ScopeData>,
    next_id: ScopeId,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope with no parent.
    pub fn create_root(&mut self, operations: OperationTable) -> ScopeId {
        let mut data = ScopeData::new(None, new_stack(), false);

        data.operations = operations;
        self.insert(data)
    }

    /// Create a child scope in compile mode.  Sharing children alias the parent's current stack.
    pub fn create_child(&mut self, parent: ScopeId, shares_stack: bool) -> error::Result<ScopeId> {
        let mut data = ScopeData::new(Some(parent), new_stack(), shares_stack);
        data.compiling = true;

        let id = self.insert(data);
        self.get_mut(parent)?.children.insert(id);

        Ok(id)
    }

    fn insert(&mut self, data: ScopeData) -> ScopeId {
        self.next_id += 1;

        let id = self.next_id;
        self.scopes.insert(id, data);

        id
    }

    pub fn contains(&self, id: ScopeId) -> bool {
        self.scopes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn get(&self, id: ScopeId) -> error::Result<&ScopeData> {
        match self.scopes.get(&id) {
            Some(data) => Ok(data),
            None => missing_scope(id),
        }
    }

    pub fn get_mut(&mut self, id: ScopeId) -> error::Result<&mut ScopeData> {
        match self.scopes.get_mut(&id) {
            Some(data) => Ok(data),
            None => missing_scope(id),
        }
    }

    /// The scope and all of its ancestors, innermost first.
    pub fn chain(&self, id: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);

        while let Some(next) = current {
            match self.scopes.get(&next) {
                Some(data) => {
                    chain.push(next);
                    current = data.parent;
                }
                None => break,
            }
        }

        chain
    }

    /// The scope that heads the process this scope runs in.
    pub fn process_root(&self, id: ScopeId) -> error::Result<ScopeId> {
        let mut current = id;

        loop {
            let data = self.get(current)?;

            match data.parent {
                Some(parent) if !data.spawned => current = parent,
                _ => return Ok(current),
            }
        }
    }

    /// Intern a payload in the scope and every one of its ancestors, all under the same handle.
    /// The content hash is the first choice of handle, if any table in the chain already uses it
    /// for different content the next handle is tried.
    pub fn intern<T: Interned>(&mut self, id: ScopeId, value: T) -> error::Result<Handle> {
        let chain = self.chain(id);

        if chain.is_empty() {
            return missing_scope(id);
        }

        let mut handle = value.content_hash();

        while chain.iter().any(|scope| {
            self.scopes
                .get(scope)
                .is_some_and(|data| T::table(data).conflicts(handle, &value))
        }) {
            handle = handle.wrapping_add(1);
        }

        for scope in chain {
            if let Some(data) = self.scopes.get_mut(&scope) {
                T::table_mut(data).insert(handle, value.clone());
            }
        }

        Ok(handle)
    }

    /// Find a payload by walking from the scope outwards.
    pub fn resolve<T: Interned>(&self, id: ScopeId, handle: Handle) -> error::Result<T> {
        for scope in self.chain(id) {
            if let Some(value) = T::table(self.get(scope)?).get(handle) {
                return Ok(value.clone());
            }
        }

        not_interned(handle)
    }

    /// Record a finished block in its parent's block table and in every table above that.
    pub fn register_block(&mut self, block: ScopeId) -> error::Result<()> {
        let parent = match self.get(block)?.parent {
            Some(parent) => parent,
            None => return Ok(()),
        };

        for scope in self.chain(parent) {
            self.get_mut(scope)?.blocks.insert(block, block);
        }

        Ok(())
    }

    /// Find the scope behind a block handle, again walking outwards.
    pub fn resolve_block(&self, id: ScopeId, handle: Handle) -> error::Result<ScopeId> {
        for scope in self.chain(id) {
            if let Some(block) = self.get(scope)?.blocks.get(handle) {
                if self.scopes.contains_key(block) {
                    return Ok(*block);
                }
            }
        }

        not_interned(handle)
    }

    /// The scope and all of its descendants.
    pub fn subtree(&self, id: ScopeId) -> HashSet<ScopeId> {
        let mut found = HashSet::new();
        let mut pending = vec![id];

        while let Some(next) = pending.pop() {
            if let Some(data) = self.scopes.get(&next) {
                if found.insert(next) {
                    pending.extend(data.children.iter().copied());
                }
            }
        }

        found
    }

    /// Does anything outside of the block still point at it or at one of its nested blocks?  Stack
    /// cells count, as do variables and code of scopes outside the block.  A nested block that is
    /// still running, as a process or as a call, keeps the whole block alive.
    pub fn is_referenced(&self, id: ScopeId) -> bool {
        let subtree = self.subtree(id);
        let refers = |cell: &Cell| matches!(cell, Cell::Block(handle) if subtree.contains(handle));

        for (scope, data) in &self.scopes {
            if subtree.contains(scope) {
                if data.running || !data.call_stacks.is_empty() {
                    return true;
                }
            } else if data.code.cells().any(&refers) || data.variables.values().any(&refers) {
                return true;
            }

            if data
                .stacks()
                .any(|stack| lock(stack).iter().any(&refers))
            {
                return true;
            }
        }

        false
    }

    /// Is an interned payload still pointed at by a stack, a variable or compiled code anywhere in
    /// the runtime?
    pub fn is_cell_in_use(&self, cell: Cell) -> bool {
        self.scopes.values().any(|data| {
            data.variables.values().any(|other| *other == cell)
                || data.code.cells().any(|other| *other == cell)
                || data.stacks().any(|stack| lock(stack).contains(&cell))
        })
    }

    /// Remove the scope and all of its descendants from the arena.  Their handles are dropped from
    /// every block table they were registered in.  Returns the controllers owned by the removed
    /// scopes, the caller shuts them down once the arena lock is released.
    pub fn discard(&mut self, id: ScopeId) -> error::Result<Vec<Arc<ProcessController>>> {
        let parent = self.get(id)?.parent;
        let removed = self.subtree(id);

        if let Some(parent) = parent {
            let ancestors = self.chain(parent);

            for scope in &ancestors {
                let data = self.get_mut(*scope)?;

                for block in &removed {
                    let _ = data.blocks.remove(*block);
                }
            }

            self.get_mut(parent)?.children.remove(&id);
        }

        let mut controllers = Vec::new();

        for scope in removed {
            if let Some(data) = self.scopes.remove(&scope) {
                controllers.extend(data.controller);
            }
        }

        Ok(controllers)
    }
}

fn missing_scope<T>(id: ScopeId) -> error::Result<T> {
    script_error(ErrorKind::NotInterned, format!("Scope {} has been discarded.", id))
}

fn not_interned<T>(handle: Handle) -> error::Result<T> {
    script_error(ErrorKind::NotInterned, format!("Handle {} is not interned.", handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with_child() -> (ScopeArena, ScopeId, ScopeId) {
        let mut arena = ScopeArena::new();
        let root = arena.create_root(OperationTable::new());
        let child = arena.create_child(root, true).unwrap();

        (arena, root, child)
    }

    #[test]
    fn interning_is_idempotent_and_propagates_up() {
        let (mut arena, root, child) = arena_with_child();

        let first = arena.intern(child, "hello".to_string()).unwrap();
        let second = arena.intern(child, "hello".to_string()).unwrap();

        assert_eq!(first, second);
        assert_eq!(arena.resolve::<String>(root, first).unwrap(), "hello");
    }

    #[test]
    fn colliding_handles_are_probed() {
        let (mut arena, root, child) = arena_with_child();
        let hash = "b".to_string().content_hash();

        // Squat on the handle "b" would hash to with different content.
        arena.get_mut(root).unwrap().strings.insert(hash, "a".to_string());

        let handle = arena.intern(child, "b".to_string()).unwrap();

        assert_ne!(handle, hash);
        assert_eq!(arena.resolve::<String>(child, handle).unwrap(), "b");
        assert_eq!(arena.resolve::<String>(child, hash).unwrap(), "a");
    }

    #[test]
    fn calls_in_progress_keep_blocks_alive() {
        let (mut arena, root, child) = arena_with_child();
        let other = arena.create_child(root, false).unwrap();

        arena.register_block(child).unwrap();
        arena.register_block(other).unwrap();
        assert!(!arena.is_referenced(child));

        // A block cell sitting on the stack of another block's call.
        let call = new_stack();
        lock(&call).push(Cell::Block(child));
        arena.get_mut(other).unwrap().call_stacks.push(call.clone());
        assert!(arena.is_referenced(child));

        arena.get_mut(other).unwrap().call_stacks.clear();
        assert!(!arena.is_referenced(child));

        // The block itself being called.
        arena.get_mut(child).unwrap().call_stacks.push(call);
        assert!(arena.is_referenced(child));
    }

    #[test]
    fn discarded_blocks_stop_resolving() {
        let (mut arena, root, child) = arena_with_child();
        let nested = arena.create_child(child, false).unwrap();

        arena.register_block(nested).unwrap();
        arena.register_block(child).unwrap();

        assert_eq!(arena.resolve_block(root, child).unwrap(), child);
        assert!(!arena.is_referenced(child));

        arena.discard(child).unwrap();

        assert!(!arena.contains(nested));
        assert_eq!(
            arena.resolve_block(root, child).unwrap_err().kind(),
            ErrorKind::NotInterned
        );
        assert_eq!(
            arena.resolve_block(root, nested).unwrap_err().kind(),
            ErrorKind::NotInterned
        );
    }

    #[test]
    fn stack_cells_keep_blocks_alive() {
        let (mut arena, root, child) = arena_with_child();

        arena.register_block(child).unwrap();
        lock(&arena.get(root).unwrap().stack).push(Cell::Block(child));

        assert!(arena.is_referenced(child));
    }

    #[test]
    fn process_roots() {
        let (mut arena, root, child) = arena_with_child();
        let nested = arena.create_child(child, true).unwrap();

        assert_eq!(arena.process_root(nested).unwrap(), root);

        arena.get_mut(child).unwrap().spawned = true;

        assert_eq!(arena.process_root(nested).unwrap(), child);
    }
}
