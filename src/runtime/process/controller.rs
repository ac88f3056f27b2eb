use crate::runtime::{
    error::{self, stopped},
    lock,
    process::table::Pid,
};
use log::{debug, info, warn};
use std::{
    collections::VecDeque,
    sync::{
        Arc, Condvar, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// A flag that is set once to ask a piece of running work to give up.
#[derive(Clone, Default, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct ControllerState {
    queue: VecDeque<Task>,
    live_workers: usize,
    idle_workers: usize,
    workers: Vec<JoinHandle<()>>,
    tokens: Vec<CancelToken>,
    shut_down: bool,
}

/// Schedules process tasks onto a cached pool of worker threads.
///
/// A task is handed to an idle worker if there is one, otherwise a new worker is started for it.
/// Processes busy wait in `recv`, so the number of busy workers is never capped.  Once a worker
/// runs out of work it waits up to the keep alive time for more, unless `max_idle_workers` are
/// already waiting.  Each task comes with a cancel token which is tripped when the controller is
/// shut down, it's up to the task to notice.
pub struct ProcessController {
    owner: Pid,
    max_idle_workers: usize,
    keep_alive: Duration,
    shutdown_grace: Duration,
    state: Mutex<ControllerState>,
    work_ready: Condvar,
}

impl ProcessController {
    /// Create a controller on behalf of the process `owner`.
    pub fn new(
        owner: Pid,
        max_idle_workers: usize,
        keep_alive: Duration,
        shutdown_grace: Duration,
    ) -> Arc<ProcessController> {
        debug!("Creating process controller for process {}.", owner);

        Arc::new(ProcessController {
            owner,
            max_idle_workers,
            keep_alive,
            shutdown_grace,
            state: Mutex::new(ControllerState::default()),
            work_ready: Condvar::new(),
        })
    }

    /// Queue a task and make sure there is a worker to pick it up.  Fails once the controller has
    /// been shut down.
    pub fn submit(
        self: &Arc<Self>,
        token: CancelToken,
        task: impl FnOnce() + Send + 'static,
    ) -> error::Result<()> {
        let mut state = lock(&self.state);

        if state.shut_down {
            return stopped();
        }

        state.tokens.retain(|existing| !existing.is_cancelled());
        state.tokens.push(token);
        state.queue.push_back(Box::new(task));

        // Every queued task needs a worker of its own, waiting ones first.
        if state.queue.len() <= state.idle_workers {
            self.work_ready.notify_one();
            return Ok(());
        }

        state.workers.retain(|worker| !worker.is_finished());

        let controller = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("scopevm-worker-{}", self.owner))
            .spawn(move || controller.worker_loop());

        match spawned {
            Ok(worker) => {
                state.live_workers += 1;
                state.workers.push(worker);
                Ok(())
            }

            Err(error) => {
                let _ = state.queue.pop_back();
                Err(error.into())
            }
        }
    }

    /// Wait for the next task.  None means the worker should exit.
    fn next_task(&self) -> Option<Task> {
        let mut state = lock(&self.state);

        loop {
            if let Some(task) = state.queue.pop_front() {
                return Some(task);
            }

            if state.shut_down || state.idle_workers >= self.max_idle_workers {
                break;
            }

            state.idle_workers += 1;

            let (guard, waited) = self
                .work_ready
                .wait_timeout(state, self.keep_alive)
                .unwrap_or_else(PoisonError::into_inner);

            state = guard;
            state.idle_workers -= 1;

            if waited.timed_out() && state.queue.is_empty() {
                break;
            }
        }

        state.live_workers -= 1;
        None
    }

    fn worker_loop(self: Arc<Self>) {
        debug!("Worker for process {} starting.", self.owner);

        while let Some(task) = self.next_task() {
            task();
        }

        debug!("Worker for process {} finished.", self.owner);
    }

    /// Trip every task's cancel token and wait a short while for the workers to wind down.  Queued
    /// tasks still run, but they see their token already cancelled.  Returns true if every worker
    /// finished within the grace period.
    pub fn shutdown(&self) -> bool {
        let workers = {
            let mut state = lock(&self.state);

            if !state.shut_down {
                info!("Shutting down the process controller of process {}.", self.owner);
            }

            state.shut_down = true;

            for token in &state.tokens {
                token.cancel();
            }

            self.work_ready.notify_all();

            std::mem::take(&mut state.workers)
        };

        let current = thread::current().id();
        let deadline = Instant::now() + self.shutdown_grace;

        // A worker can end up shutting down its own controller, never wait on ourselves.
        let pending = || {
            workers
                .iter()
                .any(|worker| !worker.is_finished() && worker.thread().id() != current)
        };

        while pending() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        let finished = !pending();

        if !finished {
            warn!(
                "Process controller of process {} still has running workers after {:?}.",
                self.owner, self.shutdown_grace
            );
        }

        finished
    }

    pub fn is_shut_down(&self) -> bool {
        lock(&self.state).shut_down
    }

    /// The number of workers currently alive, busy or idle.
    pub fn live_workers(&self) -> usize {
        lock(&self.state).live_workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);

        while !condition() {
            if Instant::now() > deadline {
                return false;
            }

            thread::sleep(Duration::from_millis(1));
        }

        true
    }

    #[test]
    fn runs_every_submitted_task() {
        let controller = ProcessController::new(
            0,
            2,
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = counter.clone();
            controller
                .submit(CancelToken::new(), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        assert!(wait_for(|| counter.load(Ordering::SeqCst) == 10));
        assert!(wait_for(|| controller.live_workers() == 0));
    }

    #[test]
    fn waiting_tasks_never_hold_up_new_ones() {
        // Far more tasks wait on each other than idle workers are kept.
        let controller = ProcessController::new(
            0,
            1,
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        let arrived = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let arrived = arrived.clone();
            let finished = finished.clone();

            controller
                .submit(CancelToken::new(), move || {
                    arrived.fetch_add(1, Ordering::SeqCst);

                    while arrived.load(Ordering::SeqCst) < 6 {
                        thread::sleep(Duration::from_millis(1));
                    }

                    finished.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        assert!(wait_for(|| finished.load(Ordering::SeqCst) == 6));
    }

    #[test]
    fn idle_workers_pick_up_new_tasks() {
        let controller = ProcessController::new(
            0,
            1,
            Duration::from_secs(5),
            Duration::from_millis(10),
        );
        let counter = Arc::new(AtomicUsize::new(0));

        for round in 1..=3 {
            let task_counter = counter.clone();
            controller
                .submit(CancelToken::new(), move || {
                    task_counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();

            assert!(wait_for(|| counter.load(Ordering::SeqCst) == round));
            assert!(wait_for(|| lock(&controller.state).idle_workers == 1));
        }

        assert_eq!(controller.live_workers(), 1);
        assert!(controller.shutdown());
        assert!(wait_for(|| controller.live_workers() == 0));
    }

    #[test]
    fn shutdown_cancels_tokens_and_refuses_new_work() {
        let controller = ProcessController::new(
            0,
            1,
            Duration::from_millis(10),
            Duration::from_millis(500),
        );
        let token = CancelToken::new();
        let seen = token.clone();

        controller
            .submit(token, move || {
                while !seen.is_cancelled() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .unwrap();

        assert!(controller.shutdown());
        assert!(controller.is_shut_down());
        assert!(controller.submit(CancelToken::new(), || {}).is_err());
    }
}
