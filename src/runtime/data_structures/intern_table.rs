use crate::lang::code::Handle;
use std::collections::HashMap;

/// A mapping from small handles to the larger payloads that stack cells can not hold directly.
///
/// The table itself is a plain map.  Picking handles that agree across a whole scope chain is the
/// job of the scope arena, which probes every table in the chain before committing to a handle.
#[derive(Clone, Debug)]
pub struct InternTable<T> {
    entries: HashMap<Handle, T>,
}

impl<T> Default for InternTable<T> {
    fn default() -> Self {
        InternTable {
            entries: HashMap::new(),
        }
    }
}

impl<T: PartialEq> InternTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.entries.get(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Is the handle already taken by some other payload?
    pub fn conflicts(&self, handle: Handle, value: &T) -> bool {
        matches!(self.entries.get(&handle), Some(existing) if existing != value)
    }

    /// Store the payload under the handle unless it's already there.
    pub fn insert(&mut self, handle: Handle, value: T) {
        self.entries.entry(handle).or_insert(value);
    }

    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        self.entries.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut table = InternTable::new();

        table.insert(1, "a".to_string());
        table.insert(1, "b".to_string());

        assert_eq!(table.get(1), Some(&"a".to_string()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn conflicts_only_with_other_content() {
        let mut table = InternTable::new();
        table.insert(5, "x".to_string());

        assert!(!table.conflicts(5, &"x".to_string()));
        assert!(table.conflicts(5, &"y".to_string()));
        assert!(!table.conflicts(6, &"y".to_string()));

        assert_eq!(table.remove(5), Some("x".to_string()));
        assert!(table.is_empty());
    }
}
