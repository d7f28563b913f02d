//! Bounded pool of reusable resources such as pre-connected clients.

use std::ops::{Deref, DerefMut};

use crossbeam_channel::{bounded, Receiver, Sender};

/// A fixed multiset of resources shared between threads.
///
/// Resources sit in a bounded channel; checking one out takes it from the
/// channel and its guard puts it back on drop. The pool holds both channel
/// ends, so a checkout can only ever wait, never fail.
pub struct ResourcePool<T> {
    home: Sender<T>,
    idle: Receiver<T>,
    capacity: usize,
}

impl<T> ResourcePool<T> {
    /// Create a pool holding `resources`.
    ///
    /// The capacity is the number of resources given. Checking out of an
    /// empty pool blocks forever.
    pub fn new(resources: impl IntoIterator<Item = T>) -> Self {
        let resources: Vec<T> = resources.into_iter().collect();
        let capacity = resources.len();
        let (home, idle) = bounded(capacity.max(1));
        for resource in resources {
            // Cannot fail: the channel has room for every resource
            let _ = home.try_send(resource);
        }
        Self {
            home,
            idle,
            capacity,
        }
    }

    /// Take a resource, blocking while none is available.
    pub fn checkout(&self) -> Checkout<T> {
        match self.idle.recv() {
            Ok(resource) => self.guard(resource),
            Err(_) => unreachable!("pool holds its own sender"),
        }
    }

    /// Take a resource if one is available right now.
    pub fn try_checkout(&self) -> Option<Checkout<T>> {
        self.idle.try_recv().ok().map(|r| self.guard(r))
    }

    /// Total number of resources owned by the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resources not currently checked out.
    pub fn available(&self) -> usize {
        self.idle.len()
    }

    fn guard(&self, resource: T) -> Checkout<T> {
        Checkout {
            resource: Some(resource),
            home: self.home.clone(),
        }
    }
}

/// A checked-out resource; returns to its pool when dropped.
pub struct Checkout<T> {
    resource: Option<T>,
    home: Sender<T>,
}

impl<T> Deref for Checkout<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.resource
            .as_ref()
            .expect("checked-out resource is present until drop")
    }
}

impl<T> DerefMut for Checkout<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.resource
            .as_mut()
            .expect("checked-out resource is present until drop")
    }
}

impl<T> Drop for Checkout<T> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            // Fails only if the pool itself is gone, in which case the resource is dropped
            let _ = self.home.send(resource);
        }
    }
}
