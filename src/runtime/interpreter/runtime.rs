use crate::runtime::{
    built_ins::default_operations,
    config::RuntimeConfig,
    data_structures::scope_arena::ScopeArena,
    error,
    interpreter::scope::Scope,
    lock,
    process::table::{ProcessTable, ROOT_PID},
};
use std::{
    io::Write,
    sync::{Arc, Mutex, MutexGuard},
};

/// The state shared by every scope of one environment: the scope arena, the process table, the
/// output sink and the configuration.  Nothing here is global, two runtimes never see each other.
///
/// Locks are always taken in the order arena, process table, stack.  A stack lock is never held
/// while taking either of the others.
pub struct Runtime {
    arena: Mutex<ScopeArena>,
    processes: Mutex<ProcessTable>,
    output: Mutex<Box<dyn Write + Send>>,
    config: RuntimeConfig,
}

impl Runtime {
    pub fn new(output: impl Write + Send + 'static, config: RuntimeConfig) -> Arc<Runtime> {
        Arc::new(Runtime {
            arena: Mutex::new(ScopeArena::new()),
            processes: Mutex::new(ProcessTable::new()),
            output: Mutex::new(Box::new(output)),
            config,
        })
    }

    /// Create a top level scope seeded with the default operations.  The first one created becomes
    /// process 0.
    pub fn create_root(self: &Arc<Self>) -> Scope {
        let mut arena = self.arena();
        let id = arena.create_root(default_operations());
        let mut processes = self.processes();

        if !processes.contains(ROOT_PID) {
            processes.register_root(id);
        }

        let halt = arena
            .get(id)
            .map(|data| data.halt.clone())
            .unwrap_or_default();

        Scope::new(self.clone(), id, halt)
    }

    pub fn arena(&self) -> MutexGuard<'_, ScopeArena> {
        lock(&self.arena)
    }

    pub fn processes(&self) -> MutexGuard<'_, ProcessTable> {
        lock(&self.processes)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Write text to the output sink and flush it, so that interleaved process output shows up
    /// promptly.
    pub fn write_output(&self, text: &str) -> error::Result<()> {
        let mut output = lock(&self.output);

        output.write_all(text.as_bytes())?;
        output.flush()?;

        Ok(())
    }

    /// The number of spawned processes still alive.
    pub fn live_processes(&self) -> usize {
        self.processes().live_processes()
    }
}
