// src/pool.rs
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// Recycling freelist for fixed-size per-request objects, shared between
/// the accept thread and the workers. Access is serialized by the mutex;
/// the constructor callback runs only when the freelist is empty.
pub struct Pool<T> {
    free: Mutex<Vec<Box<T>>>,
    make: fn() -> T,
}

impl<T> Pool<T> {
    pub fn new(make: fn() -> T) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            make,
        }
    }

    /// Pop a recycled object or construct a fresh one. The guard returns
    /// the object on drop, so release survives handler panics.
    pub fn acquire(self: &Arc<Self>) -> PoolGuard<T> {
        let recycled = self.free.lock().unwrap().pop();
        let item = recycled.unwrap_or_else(|| Box::new((self.make)()));
        PoolGuard {
            item: Some(item),
            pool: Arc::clone(self),
        }
    }

    /// Number of objects currently parked in the freelist.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap().len()
    }
}

pub struct PoolGuard<T> {
    item: Option<Box<T>>,
    pool: Arc<Pool<T>>,
}

impl<T> Deref for PoolGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().unwrap()
    }
}

impl<T> DerefMut for PoolGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().unwrap()
    }
}

impl<T> Drop for PoolGuard<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.free.lock().unwrap().push(item);
        }
    }
}
