use lazy_static::lazy_static;
use std::{env::var, str::FromStr, time::Duration};
use sysinfo::System;

lazy_static! {
    // Asking the OS is comparatively slow, do it once per process.
    static ref LOGICAL_CPUS: usize = {
        let mut system = System::new();

        system.refresh_cpu_all();
        system.cpus().len()
    };
}

/// Tunables of a runtime.  Every environment owns its own copy so tests stay independent of each
/// other.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeConfig {
    /// How many finished workers a process controller keeps around waiting for new processes.
    /// Busy workers are never capped, every process that can't find an idle worker gets a new one.
    pub max_idle_workers: usize,

    /// How long an idle worker waits for a new process before it exits.
    pub worker_keep_alive: Duration,

    /// How long a `recv` sleeps between checks of its stack.
    pub receive_poll_interval: Duration,

    /// How long a controller shutdown waits for in-flight workers before giving up on them.
    pub shutdown_grace: Duration,

    /// How long the command line front end waits for live processes before exiting.
    pub exit_grace: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_idle_workers: *LOGICAL_CPUS,
            worker_keep_alive: Duration::from_secs(60),
            receive_poll_interval: Duration::from_millis(10),
            shutdown_grace: Duration::from_millis(10),
            exit_grace: Duration::from_millis(5000),
        }
    }
}

impl RuntimeConfig {
    /// Build a configuration from the SCOPEVM_* environment variables.  Missing or unparseable
    /// values keep their defaults.
    pub fn from_env() -> RuntimeConfig {
        let defaults = RuntimeConfig::default();

        RuntimeConfig {
            max_idle_workers: env_or("SCOPEVM_MAX_IDLE_WORKERS", defaults.max_idle_workers),
            worker_keep_alive: env_millis_or(
                "SCOPEVM_WORKER_KEEP_ALIVE_MS",
                defaults.worker_keep_alive,
            ),
            receive_poll_interval: env_millis_or(
                "SCOPEVM_RECEIVE_POLL_MS",
                defaults.receive_poll_interval,
            ),
            shutdown_grace: env_millis_or("SCOPEVM_SHUTDOWN_GRACE_MS", defaults.shutdown_grace),
            exit_grace: env_millis_or("SCOPEVM_EXIT_GRACE_MS", defaults.exit_grace),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn env_millis_or(name: &str, default: Duration) -> Duration {
    var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();

        assert_eq!(config.max_idle_workers, *LOGICAL_CPUS);
        assert_eq!(config.worker_keep_alive, Duration::from_secs(60));
        assert_eq!(config.receive_poll_interval, Duration::from_millis(10));
        assert_eq!(config.shutdown_grace, Duration::from_millis(10));
        assert_eq!(config.exit_grace, Duration::from_millis(5000));
    }

    #[test]
    fn unset_variables_fall_back() {
        assert_eq!(env_or("SCOPEVM_TEST_SURELY_UNSET", 7usize), 7);
        assert_eq!(
            env_millis_or("SCOPEVM_TEST_SURELY_UNSET", Duration::from_millis(3)),
            Duration::from_millis(3)
        );
    }
}
