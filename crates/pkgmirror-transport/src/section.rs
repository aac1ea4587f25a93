/*! The Async Section: a scoped, bounded-concurrency worker pool with an
error budget.

Named for continuity with the originating design even though nothing here
is `async` — it is a direct structural port of that design's
`Executor`/`ExecutionScope` (a fixed pool of daemon threads pulling from a
bounded queue, plus a `Condvar`-backed scope tracking in-flight task count
and accumulated failures) onto `std::thread`/`std::sync::mpsc`, since the
specified concurrency model here is blocking worker threads, not futures.

A scope's counter/error state lives behind an `Arc` shared with every
submitted job's closure, rather than borrowed by raw pointer, so a submitted
`Job` is an ordinary `'static` closure with no unsafe aliasing to justify.
*/

use {
    crate::error::{Result, TransportError},
    std::{
        sync::{
            mpsc::{sync_channel, Receiver, SyncSender},
            Arc, Condvar, Mutex,
        },
        thread::JoinHandle,
    },
};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed pool of worker threads shared by every [ExecutionScope] created
/// from it. Construct once per process (or once per [crate] consumer) and
/// reuse across the Manager's DISCOVER/PARSE/RESOLVE/CLONE/COPY/REBUILD
/// transitions.
pub struct AsyncSection {
    sender: SyncSender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl AsyncSection {
    /// `thread_count` workers, each pulling from a queue of depth `queue_size`.
    pub fn new(thread_count: usize, queue_size: usize) -> Self {
        let thread_count = thread_count.max(1);
        let (sender, receiver) = sync_channel::<Job>(queue_size.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..thread_count)
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                std::thread::Builder::new()
                    .name(format!("pkgmirror-worker-{i}"))
                    .spawn(move || loop {
                        let job = {
                            let rx = receiver.lock().expect("worker queue mutex poisoned");
                            rx.recv()
                        };
                        match job {
                            Ok(job) => job(),
                            Err(_) => break,
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { sender, workers }
    }

    /// Open a new scope with its own error budget. Multiple scopes may be
    /// open concurrently against the same pool, e.g. while draining a
    /// previous phase's stragglers during shutdown.
    pub fn scope(&self, ignore_errors_budget: usize) -> ExecutionScope<'_> {
        ExecutionScope {
            pool: self,
            budget: ignore_errors_budget,
            shared: Arc::new((
                Mutex::new(ScopeState {
                    counter: 0,
                    errors: 0,
                }),
                Condvar::new(),
            )),
        }
    }
}

impl Drop for AsyncSection {
    fn drop(&mut self) {
        // Dropping `sender` closes the channel; workers see `Err` from
        // `recv()` and exit their loop on their own.
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

struct ScopeState {
    counter: usize,
    errors: usize,
}

/// A scoped batch of concurrent tasks sharing an error budget.
///
/// `ignore_errors_budget` of 0 means fail-fast: the first task failure
/// exceeds the budget. `execute()` itself never blocks on worker
/// availability beyond the underlying pool's queue depth; `exit()` blocks
/// until every submitted task has completed.
pub struct ExecutionScope<'a> {
    pool: &'a AsyncSection,
    budget: usize,
    shared: Arc<(Mutex<ScopeState>, Condvar)>,
}

impl<'a> ExecutionScope<'a> {
    /// Submit a unit of work. The task's `Result` determines whether it
    /// counts against the error budget; the error itself is only logged,
    /// never propagated directly (propagation is via [ExecutionScope::exit]).
    pub fn execute<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        {
            let (mutex, _) = &*self.shared;
            let state = mutex.lock().expect("scope mutex poisoned");
            if state.errors > self.budget {
                return Err(TransportError::SectionFailed {
                    failures: state.errors,
                    budget: self.budget,
                });
            }
        }

        let shared = Arc::clone(&self.shared);
        {
            let (mutex, _) = &*shared;
            mutex.lock().expect("scope mutex poisoned").counter += 1;
        }

        let job: Job = Box::new(move || {
            let failed = task().is_err();

            let (mutex, condvar) = &*shared;
            let mut guard = mutex.lock().expect("scope mutex poisoned");
            guard.counter -= 1;
            if failed {
                guard.errors += 1;
            }
            condvar.notify_all();
        });

        self.pool
            .sender
            .send(job)
            .map_err(|_| TransportError::SectionFailed {
                failures: 0,
                budget: self.budget,
            })
    }

    /// Block until all submitted tasks complete. If `raise_on_budget` and the
    /// accumulated error count exceeds the budget, returns
    /// [TransportError::SectionFailed]; otherwise always returns `Ok`, even
    /// if some tasks failed within budget.
    fn wait(&self, raise_on_budget: bool) -> Result<()> {
        let (mutex, condvar) = &*self.shared;
        let mut state = mutex.lock().expect("scope mutex poisoned");
        while state.counter > 0 {
            state = condvar.wait(state).expect("scope condvar poisoned");
        }

        if raise_on_budget && state.errors > self.budget {
            return Err(TransportError::SectionFailed {
                failures: state.errors,
                budget: self.budget,
            });
        }

        Ok(())
    }

    /// Normal exit: wait for all in-flight tasks, then raise
    /// [TransportError::SectionFailed] if the error budget was exceeded.
    pub fn exit(&self) -> Result<()> {
        self.wait(true)
    }

    /// Abnormal exit (e.g. the caller is already unwinding/erroring for an
    /// unrelated reason): wait for all in-flight tasks, but never raise.
    pub fn exit_without_raising(&self) {
        let _ = self.wait(false);
    }
}

impl<'a> Drop for ExecutionScope<'a> {
    fn drop(&mut self) {
        self.exit_without_raising();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn scope_waits_for_all_tasks() {
        let pool = AsyncSection::new(4, 16);
        let completed = Arc::new(AtomicUsize::new(0));

        {
            let scope = pool.scope(0);
            for _ in 0..10 {
                let completed = Arc::clone(&completed);
                scope
                    .execute(move || {
                        completed.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
            }
            scope.exit().unwrap();
        }

        assert_eq!(completed.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn scope_raises_past_budget() {
        let pool = AsyncSection::new(2, 16);
        let scope = pool.scope(1);

        for _ in 0..3 {
            scope
                .execute(|| Err(TransportError::RangeUnsupported("x".into())))
                .unwrap();
        }

        assert!(scope.exit().is_err());
    }

    #[test]
    fn scope_within_budget_does_not_raise() {
        let pool = AsyncSection::new(2, 16);
        let scope = pool.scope(2);

        for _ in 0..2 {
            scope
                .execute(|| Err(TransportError::RangeUnsupported("x".into())))
                .unwrap();
        }

        assert!(scope.exit().is_ok());
    }
}
