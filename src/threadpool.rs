// src/threadpool.rs
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::debug;

pub const INITIAL_QUEUE_CAPACITY: usize = 128;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Circular task buffer. Full iff advancing the tail lands on the head,
/// at which point it doubles.
struct TaskQueue {
    items: Vec<Option<Task>>,
    head: usize,
    tail: usize,
}

impl TaskQueue {
    fn with_capacity(capacity: usize) -> Self {
        let mut items = Vec::new();
        items.resize_with(capacity, || None);
        Self {
            items,
            head: 0,
            tail: 0,
        }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    fn pop(&mut self) -> Option<Task> {
        if self.is_empty() {
            return None;
        }
        let task = self.items[self.head].take();
        self.head = (self.head + 1) % self.items.len();
        task
    }

    fn push(&mut self, task: Task) {
        self.items[self.tail] = Some(task);
        self.tail = (self.tail + 1) % self.items.len();
        if self.tail == self.head {
            self.grow();
        }
    }

    /// Doubling copies the pending tasks out in FIFO order and reindexes
    /// head and tail against the fresh buffer.
    fn grow(&mut self) {
        let old_len = self.items.len();
        let mut items = Vec::with_capacity(old_len * 2);
        for offset in 0..old_len {
            items.push(self.items[(self.head + offset) % old_len].take());
        }
        items.resize_with(old_len * 2, || None);
        self.items = items;
        self.head = 0;
        self.tail = old_len;
    }
}

struct PoolShared {
    queue: Mutex<TaskQueue>,
    ready: Condvar,
    shutdown: AtomicBool,
}

/// Fixed set of worker threads fed from one growable FIFO ring.
///
/// Workers park on the condition variable while the ring is empty and are
/// woken only on the empty-to-non-empty transition; tasks run in
/// submission order relative to the queue, with no ordering across
/// workers after dequeue.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(num_threads: usize) -> io::Result<Self> {
        let shared = Arc::new(PoolShared {
            queue: Mutex::new(TaskQueue::with_capacity(INITIAL_QUEUE_CAPACITY)),
            ready: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let core_ids = core_affinity::get_core_ids().unwrap_or_default();
        let mut workers = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let shared = Arc::clone(&shared);
            let core_id = (!core_ids.is_empty()).then(|| core_ids[index % core_ids.len()]);
            let handle = thread::Builder::new()
                .name(format!("sonata-worker-{index}"))
                .spawn(move || {
                    if let Some(id) = core_id {
                        core_affinity::set_for_current(id);
                    }
                    debug!(worker = index, "worker started");
                    worker_loop(&shared);
                    debug!(worker = index, "worker exiting");
                })?;
            workers.push(handle);
        }

        Ok(Self { shared, workers })
    }

    /// Enqueue a task. Never blocks: a full ring grows under the lock.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        let wake = {
            let mut queue = self.shared.queue.lock().unwrap();
            let wake = queue.is_empty();
            queue.push(Box::new(task));
            wake
        };
        if wake {
            self.shared.ready.notify_all();
        }
    }

    /// Drain the queue and join the workers.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.ready.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(task) = queue.pop() {
                    break Some(task);
                }
                if shared.shutdown.load(Ordering::Acquire) {
                    break None;
                }
                queue = shared.ready.wait(queue).unwrap();
            }
        };
        match task {
            Some(task) => task(),
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn ring_preserves_fifo_across_growth() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let mut queue = TaskQueue::with_capacity(4);

        for index in 0..10 {
            let ran = Arc::clone(&ran);
            queue.push(Box::new(move || ran.lock().unwrap().push(index)));
        }
        assert_eq!(queue.items.len(), 16); // 4 -> 8 -> 16

        while let Some(task) = queue.pop() {
            task();
        }
        assert_eq!(*ran.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn single_worker_runs_tasks_in_submission_order() {
        let mut pool = ThreadPool::new(1).unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (result_tx, result_rx) = mpsc::channel::<usize>();

        // Hold the worker on the first task so the remaining submissions
        // pile up past the initial ring capacity.
        let first = result_tx.clone();
        pool.submit(move || {
            gate_rx.recv().unwrap();
            first.send(0).unwrap();
        });
        for index in 1..=300 {
            let tx = result_tx.clone();
            pool.submit(move || tx.send(index).unwrap());
        }
        gate_tx.send(()).unwrap();

        for expected in 0..=300 {
            assert_eq!(
                result_rx.recv_timeout(Duration::from_secs(10)).unwrap(),
                expected
            );
        }
        pool.shutdown();
    }

    #[test]
    fn shutdown_drains_pending_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pool = ThreadPool::new(2).unwrap();
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }
}
