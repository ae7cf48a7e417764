//! Goroutine pool and lifecycle coordination
//!
//! One OS thread per goroutine, no user-space scheduler. The pool tracks how
//! many goroutines (including the main thread) are currently live; when the
//! count drops to zero the main thread's wait returns and the process can
//! exit.

use std::sync::{Condvar, Mutex};

#[derive(Default)]
pub struct GoroutinePool {
    active: Mutex<u64>,
    empty: Condvar,
}

impl GoroutinePool {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(0),
            empty: Condvar::new(),
        }
    }

    /// Register a newly started goroutine (including the main thread at
    /// startup).
    pub fn register(&self) {
        *self.active.lock().unwrap() += 1;
    }

    /// Deregister a finished goroutine, notifying any waiter if the pool is
    /// now empty.
    pub fn deregister(&self) {
        let mut active = self.active.lock().unwrap();
        *active -= 1;
        if *active == 0 {
            self.empty.notify_all();
        }
    }

    /// Block until every registered goroutine has deregistered.
    pub fn wait_until_empty(&self) {
        let mut active = self.active.lock().unwrap();
        while *active != 0 {
            active = self.empty.wait(active).unwrap();
        }
    }

    pub fn active_count(&self) -> u64 {
        *self.active.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_returns_immediately_when_never_populated() {
        let pool = GoroutinePool::new();
        pool.wait_until_empty();
    }

    #[test]
    fn wait_blocks_until_last_goroutine_deregisters() {
        let pool = Arc::new(GoroutinePool::new());
        pool.register();
        pool.register();

        let worker_pool = pool.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            worker_pool.deregister();
        });

        pool.deregister();
        handle.join().unwrap();
        pool.wait_until_empty();
        assert_eq!(pool.active_count(), 0);
    }
}
