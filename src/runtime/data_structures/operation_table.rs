use crate::{
    lang::source_buffer::SourceLocation,
    runtime::interpreter::{OperationHandler, OperationInfo, OperationRegistry},
};
use std::{collections::HashMap, sync::Arc};

/// Maps word names to the native operations that implement them.  Entries are shared, so cloning a
/// table for a new root scope only copies the map.
#[derive(Clone, Default)]
pub struct OperationTable {
    operations: HashMap<String, Arc<OperationInfo>>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation, replacing any previous operation of the same name.
    pub fn insert(&mut self, info: OperationInfo) {
        self.operations.insert(info.name().clone(), Arc::new(info));
    }

    pub fn find(&self, name: &str) -> Option<&Arc<OperationInfo>> {
        self.operations.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<OperationInfo>> {
        self.operations.remove(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The names of all operations, sorted for display.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();

        names.sort();
        names
    }
}

impl OperationRegistry for OperationTable {
    fn add_operation(
        &mut self,
        location: SourceLocation,
        name: String,
        handler: Arc<OperationHandler>,
        description: String,
        signature: String,
    ) {
        self.insert(OperationInfo::new(
            name,
            description,
            signature,
            location,
            handler,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::add_operation;

    #[test]
    fn later_registrations_replace_earlier_ones() {
        let mut table = OperationTable::new();

        add_operation!(table, "noop", |_| Ok(()), "Do nothing.", " -- ");
        add_operation!(table, "noop", |_| Ok(()), "Still nothing.", " -- ");
        add_operation!(table, "also", |_| Ok(()), "Do nothing.", " -- ");

        assert_eq!(table.len(), 2);
        assert_eq!(table.find("noop").unwrap().description(), "Still nothing.");
        assert_eq!(table.names(), vec!["also".to_string(), "noop".to_string()]);
    }
}
