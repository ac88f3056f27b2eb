use crate::runtime::{
    data_structures::scope_arena::ScopeId,
    error::{self, ErrorKind, script_error},
};
use std::collections::HashMap;

/// Process ids live on the data stack, so they are plain integers.
pub type Pid = i64;

/// The implicit process every environment starts with.
pub const ROOT_PID: Pid = 0;

/// Maps live process ids to the scopes running them.
#[derive(Default, Debug)]
pub struct ProcessTable {
    processes: HashMap<Pid, ScopeId>,
    last_pid: Pid,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the scope that stands for process 0.
    pub fn register_root(&mut self, scope: ScopeId) {
        self.processes.insert(ROOT_PID, scope);
    }

    /// Hand out the next free process id.  Ids count up from 1 and wrap back to 1 before they
    /// would overflow, skipping any id that is still in use.
    pub fn allocate(&mut self) -> Pid {
        loop {
            self.last_pid = if self.last_pid == Pid::MAX {
                1
            } else {
                self.last_pid + 1
            };

            if !self.processes.contains_key(&self.last_pid) {
                return self.last_pid;
            }
        }
    }

    pub fn insert(&mut self, pid: Pid, scope: ScopeId) {
        self.processes.insert(pid, scope);
    }

    pub fn remove(&mut self, pid: Pid) -> Option<ScopeId> {
        self.processes.remove(&pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    /// Look up the scope of a live process.
    pub fn get(&self, pid: Pid) -> error::Result<ScopeId> {
        match self.processes.get(&pid) {
            Some(scope) => Ok(*scope),
            None => script_error(ErrorKind::InvalidProcess, format!("Process {} not found.", pid)),
        }
    }

    /// How many spawned processes are still alive, the root doesn't count.
    pub fn live_processes(&self) -> usize {
        self.processes.keys().filter(|pid| **pid != ROOT_PID).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_count_up_from_one() {
        let mut table = ProcessTable::new();

        table.register_root(10);

        assert_eq!(table.allocate(), 1);
        assert_eq!(table.allocate(), 2);
        assert_eq!(table.live_processes(), 0);
    }

    #[test]
    fn ids_wrap_before_overflow_and_skip_live_ones() {
        let mut table = ProcessTable::new();

        table.insert(1, 20);
        table.last_pid = Pid::MAX - 1;

        assert_eq!(table.allocate(), Pid::MAX);
        assert_eq!(table.allocate(), 2);
    }

    #[test]
    fn unknown_processes_are_errors() {
        let table = ProcessTable::new();
        let error = table.get(3).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvalidProcess);
        assert_eq!(error.error(), "Process 3 not found.");
    }
}
