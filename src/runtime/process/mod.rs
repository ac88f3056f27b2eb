/// The worker pool that runs spawned processes.
pub mod controller;

/// The table of live process ids.
pub mod table;
