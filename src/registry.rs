//! Bookkeeping for live stream worker threads.
//!
//! Every player spawns its worker through a shared [`StreamRegistry`]. The
//! registry owns the join handles until each thread has exited, so shutdown
//! joins every worker in start order, including ones that already removed
//! themselves and are still tearing down.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Identifier of a worker tracked by a [`StreamRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    /// The raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Entry {
    id: WorkerId,
    handle: JoinHandle<()>,
    finished: bool,
}

/// Set of live worker threads for one host context.
pub struct StreamRegistry {
    entries: Mutex<VecDeque<Entry>>,
    next_id: AtomicU64,
}

impl StreamRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Spawn a named worker thread and register it.
    ///
    /// The registry lock is held across thread creation, so the entry exists
    /// before the worker can try to [`remove`](Self::remove) itself.
    pub fn spawn<F>(&self, name: impl Into<String>, body: F) -> io::Result<WorkerId>
    where
        F: FnOnce(WorkerId) + Send + 'static,
    {
        let id = WorkerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.lock();
        reap(&mut entries);
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || body(id))?;
        entries.push_back(Entry {
            id,
            handle,
            finished: false,
        });
        debug!(worker = %id, "worker registered");
        Ok(id)
    }

    /// Track an already running thread.
    pub fn add(&self, handle: JoinHandle<()>) -> WorkerId {
        let id = WorkerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.lock();
        reap(&mut entries);
        entries.push_back(Entry {
            id,
            handle,
            finished: false,
        });
        id
    }

    /// Mark a worker as done. Its handle is kept until the thread has
    /// actually exited, so [`wait_all`](Self::wait_all) still joins it.
    ///
    /// Returns `false` if the worker was not tracked or already removed.
    pub fn remove(&self, id: WorkerId) -> bool {
        let mut entries = self.entries.lock();
        match entries
            .iter_mut()
            .find(|entry| entry.id == id && !entry.finished)
        {
            Some(entry) => {
                entry.finished = true;
                true
            }
            None => false,
        }
    }

    /// Whether `id` is still tracked and not removed.
    pub fn contains(&self, id: WorkerId) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|entry| entry.id == id && !entry.finished)
    }

    /// Number of tracked workers that have not removed themselves.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| !entry.finished)
            .count()
    }

    /// Whether no workers are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Join every worker thread, removed or not, until none is left.
    ///
    /// Workers registered while this runs are joined too. The lock is released
    /// while joining so exiting workers can still remove themselves.
    pub fn wait_all(&self) {
        loop {
            let Some(entry) = self.entries.lock().pop_front() else {
                break;
            };
            if entry.handle.join().is_err() {
                warn!(worker = %entry.id, "worker panicked");
            }
        }
    }
}

/// Join removed workers whose threads have already exited.
fn reap(entries: &mut VecDeque<Entry>) {
    let mut index = 0;
    while index < entries.len() {
        if entries[index].finished && entries[index].handle.is_finished() {
            if let Some(entry) = entries.remove(index) {
                if entry.handle.join().is_err() {
                    warn!(worker = %entry.id, "worker panicked");
                }
            }
        } else {
            index += 1;
        }
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("workers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_spawn_registers_before_worker_runs() {
        let registry = Arc::new(StreamRegistry::new());
        let (tx, rx) = channel::bounded(1);

        let worker_registry = registry.clone();
        let id = registry
            .spawn("fast-exit", move |id| {
                tx.send(worker_registry.contains(id)).unwrap();
                worker_registry.remove(id);
            })
            .unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        registry.wait_all();
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_wait_all_joins_every_worker() {
        let registry = StreamRegistry::new();
        let finished = Arc::new(AtomicUsize::new(0));

        for index in 0..4 {
            let finished = finished.clone();
            registry
                .spawn(format!("worker-{index}"), move |_| {
                    std::thread::sleep(Duration::from_millis(10));
                    finished.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(registry.len(), 4);

        registry.wait_all();
        assert_eq!(finished.load(Ordering::SeqCst), 4);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_and_remove() {
        let registry = StreamRegistry::new();
        let id = registry.add(std::thread::spawn(|| {}));

        assert!(registry.contains(id));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
        registry.wait_all();
    }

    struct Teardown(Arc<AtomicUsize>);

    impl Drop for Teardown {
        fn drop(&mut self) {
            std::thread::sleep(Duration::from_millis(50));
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_wait_all_joins_workers_that_removed_themselves() {
        let registry = Arc::new(StreamRegistry::new());
        let torn_down = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = channel::bounded(1);

        let worker_registry = registry.clone();
        let guard = Teardown(torn_down.clone());
        registry
            .spawn("slow-teardown", move |id| {
                let _guard = guard;
                worker_registry.remove(id);
                tx.send(()).unwrap();
            })
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(registry.is_empty());
        registry.wait_all();
        assert_eq!(torn_down.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exited_workers_are_reaped_on_spawn() {
        let registry = Arc::new(StreamRegistry::new());
        let worker_registry = registry.clone();
        let first = registry
            .spawn("short", move |id| {
                worker_registry.remove(id);
            })
            .unwrap();

        while registry.entries.lock().iter().any(|e| !e.handle.is_finished()) {
            std::thread::sleep(Duration::from_millis(1));
        }
        registry.spawn("next", |_| {}).unwrap();

        let entries = registry.entries.lock();
        assert_eq!(entries.len(), 1);
        assert_ne!(entries[0].id, first);
        drop(entries);
        registry.wait_all();
    }

    #[test]
    fn test_wait_all_on_empty_registry_returns() {
        StreamRegistry::default().wait_all();
    }
}
